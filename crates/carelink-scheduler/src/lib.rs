//! # carelink-scheduler
//!
//! The missed-check-in sweep: a fixed-period loop that, once the
//! morning grace window has passed, finds monitored users without a
//! check-in today, resolves their caregivers, and emits alert events
//! into the outbox, throttled to once per senior per day.

pub mod sweep;
pub mod window;

pub use sweep::MissedCheckInSweep;
pub use window::SweepWindow;
