// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

#[derive(Debug, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed. Re-applying the current
    /// status is a no-op and always allowed.
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if current_status == new_status {
            return Ok(());
        }

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Cancelled,
                AppointmentStatus::Completed,
            ],
            // Terminal states
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    pub fn can_reschedule(&self, current_status: AppointmentStatus) -> Result<(), AppointmentError> {
        if current_status != AppointmentStatus::Scheduled {
            return Err(AppointmentError::NotReschedulable(current_status));
        }
        Ok(())
    }
}
