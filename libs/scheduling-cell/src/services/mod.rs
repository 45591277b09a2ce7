pub mod appointments;
pub mod conflict;
pub mod lifecycle;
pub mod patients;
pub mod store;

pub use lifecycle::AppointmentLifecycleService;
pub use store::SchedulingStore;
