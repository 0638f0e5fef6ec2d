pub mod booking;
pub mod guard;
pub mod lifecycle;

pub use booking::BookingService;
pub use guard::AppointmentGuard;
pub use lifecycle::AppointmentLifecycleService;
