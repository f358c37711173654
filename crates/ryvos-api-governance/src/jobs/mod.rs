//! Background jobs for the role-request API.
//!
//! - Long-poll sweep - completes blocked check calls every few seconds

pub mod long_poll_sweep_job;

pub use long_poll_sweep_job::{LongPollSweepJob, DEFAULT_SWEEP_INTERVAL_SECS};
