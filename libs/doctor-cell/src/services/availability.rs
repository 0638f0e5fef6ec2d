use chrono::NaiveTime;
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use shared_database::{AppState, Database};

use crate::models::{CreateScheduleRequest, DoctorError, DoctorSchedule, UpdateScheduleRequest};

const SCHEDULE_COLUMNS: &str = "id, doctor_id, weekday, start_time, end_time";

/// Weekly slots are half-open `[start, end)`. Two slots overlap iff
/// `existing.start < end && existing.end > start`, so touching slots are fine.
pub fn ranges_overlap(
    existing_start: NaiveTime,
    existing_end: NaiveTime,
    start: NaiveTime,
    end: NaiveTime,
) -> bool {
    existing_start < end && existing_end > start
}

pub fn validate_time_range(start: NaiveTime, end: NaiveTime) -> Result<(), DoctorError> {
    if start >= end {
        return Err(DoctorError::InvalidTimeRange);
    }
    Ok(())
}

pub fn validate_weekday(weekday: i32) -> Result<(), DoctorError> {
    if !(0..=6).contains(&weekday) {
        return Err(DoctorError::Validation(format!(
            "weekday must be between 0 (Monday) and 6 (Sunday), got {}",
            weekday
        )));
    }
    Ok(())
}

pub struct AvailabilityService {
    db: Database,
}

impl AvailabilityService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    /// True iff a slot of `doctor_id` on `weekday`, other than `exclude_id`,
    /// shares an instant with `[start, end)`.
    pub async fn overlaps(
        &self,
        conn: &mut SqliteConnection,
        doctor_id: i64,
        weekday: i32,
        start: NaiveTime,
        end: NaiveTime,
        exclude_id: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let existing: Vec<(i64, NaiveTime, NaiveTime)> = sqlx::query_as(
            "SELECT id, start_time, end_time FROM doctor_schedules WHERE doctor_id = ? AND weekday = ?",
        )
        .bind(doctor_id)
        .bind(weekday)
        .fetch_all(&mut *conn)
        .await?;

        let clash = existing
            .iter()
            .filter(|(id, _, _)| Some(*id) != exclude_id)
            .find(|(_, s, e)| ranges_overlap(*s, *e, start, end));

        if let Some((id, s, e)) = clash {
            warn!(
                "Slot {}-{} on weekday {} for doctor {} overlaps slot {} ({}-{})",
                start, end, weekday, doctor_id, id, s, e
            );
            return Ok(true);
        }

        Ok(false)
    }

    pub async fn create_schedule(
        &self,
        doctor_id: i64,
        request: CreateScheduleRequest,
    ) -> Result<DoctorSchedule, DoctorError> {
        debug!(
            "Creating slot for doctor {}: weekday {} {}-{}",
            doctor_id, request.weekday, request.start_time, request.end_time
        );

        validate_weekday(request.weekday)?;
        validate_time_range(request.start_time, request.end_time)?;

        let mut tx = self.db.begin_immediate().await?;

        if !doctor_exists(&mut tx, doctor_id).await? {
            return Err(DoctorError::NotFound);
        }

        if self
            .overlaps(&mut tx, doctor_id, request.weekday, request.start_time, request.end_time, None)
            .await?
        {
            return Err(DoctorError::ScheduleOverlap);
        }

        let schedule: DoctorSchedule = sqlx::query_as(&format!(
            "INSERT INTO doctor_schedules (doctor_id, weekday, start_time, end_time) \
             VALUES (?, ?, ?, ?) RETURNING {}",
            SCHEDULE_COLUMNS
        ))
        .bind(doctor_id)
        .bind(request.weekday)
        .bind(request.start_time)
        .bind(request.end_time)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Slot {} created for doctor {}", schedule.id, doctor_id);
        Ok(schedule)
    }

    pub async fn list_schedules(&self, doctor_id: i64) -> Result<Vec<DoctorSchedule>, DoctorError> {
        debug!("Listing slots for doctor {}", doctor_id);

        let mut conn = self.db.pool().acquire().await?;

        if !doctor_exists(&mut conn, doctor_id).await? {
            return Err(DoctorError::NotFound);
        }

        let schedules = sqlx::query_as(&format!(
            "SELECT {} FROM doctor_schedules WHERE doctor_id = ? ORDER BY id",
            SCHEDULE_COLUMNS
        ))
        .bind(doctor_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(schedules)
    }

    /// Merge `request` over the stored slot and re-validate. The slot is
    /// excluded from its own overlap check.
    pub async fn update_schedule(
        &self,
        doctor_id: i64,
        schedule_id: i64,
        request: UpdateScheduleRequest,
    ) -> Result<DoctorSchedule, DoctorError> {
        debug!("Updating slot {} of doctor {}", schedule_id, doctor_id);

        let mut tx = self.db.begin_immediate().await?;

        if !doctor_exists(&mut tx, doctor_id).await? {
            return Err(DoctorError::NotFound);
        }

        let mut schedule = fetch_schedule(&mut tx, doctor_id, schedule_id).await?;
        request.apply_to(&mut schedule);

        validate_weekday(schedule.weekday)?;
        validate_time_range(schedule.start_time, schedule.end_time)?;

        if self
            .overlaps(
                &mut tx,
                doctor_id,
                schedule.weekday,
                schedule.start_time,
                schedule.end_time,
                Some(schedule_id),
            )
            .await?
        {
            return Err(DoctorError::ScheduleOverlap);
        }

        sqlx::query("UPDATE doctor_schedules SET weekday = ?, start_time = ?, end_time = ? WHERE id = ?")
            .bind(schedule.weekday)
            .bind(schedule.start_time)
            .bind(schedule.end_time)
            .bind(schedule_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("Slot {} of doctor {} updated", schedule_id, doctor_id);
        Ok(schedule)
    }

    pub async fn delete_schedule(&self, doctor_id: i64, schedule_id: i64) -> Result<(), DoctorError> {
        debug!("Deleting slot {} of doctor {}", schedule_id, doctor_id);

        let mut tx = self.db.begin_immediate().await?;

        if !doctor_exists(&mut tx, doctor_id).await? {
            return Err(DoctorError::NotFound);
        }

        let result = sqlx::query("DELETE FROM doctor_schedules WHERE id = ? AND doctor_id = ?")
            .bind(schedule_id)
            .bind(doctor_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DoctorError::ScheduleNotFound);
        }

        tx.commit().await?;

        info!("Slot {} of doctor {} deleted", schedule_id, doctor_id);
        Ok(())
    }
}

async fn doctor_exists(conn: &mut SqliteConnection, doctor_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM doctor WHERE id = ?)")
        .bind(doctor_id)
        .fetch_one(&mut *conn)
        .await
}

async fn fetch_schedule(
    conn: &mut SqliteConnection,
    doctor_id: i64,
    schedule_id: i64,
) -> Result<DoctorSchedule, DoctorError> {
    sqlx::query_as(&format!(
        "SELECT {} FROM doctor_schedules WHERE id = ? AND doctor_id = ?",
        SCHEDULE_COLUMNS
    ))
    .bind(schedule_id)
    .bind(doctor_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(DoctorError::ScheduleNotFound)
}
