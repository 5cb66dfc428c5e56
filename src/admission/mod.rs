//! Admission control logic and state management.

mod backend;
mod clock;
mod controller;
mod record;
mod sweeper;

pub use backend::AdmissionBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    AdmissionController, CleanupPolicy, Decision, EngineConfig, Stats, MAX_WINDOW_SECS,
};
pub use record::UsageRecord;
pub use sweeper::spawn_sweeper;
