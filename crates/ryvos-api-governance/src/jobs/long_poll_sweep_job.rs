//! Long-poll sweep job.
//!
//! Drives [`LongPollingManager::sweep`] on a short fixed period so blocked
//! check calls observe request state changes promptly.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use ryvos_governance::services::{LongPollingManager, SweepStats};

/// Default sweep interval in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 2;

/// Job sweeping the long-poll subscriber table.
pub struct LongPollSweepJob {
    manager: Arc<LongPollingManager>,
    sweep_interval_secs: u64,
}

impl LongPollSweepJob {
    /// Create a new sweep job.
    pub fn new(manager: Arc<LongPollingManager>) -> Self {
        Self {
            manager,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }

    /// Create with a custom sweep interval.
    #[must_use]
    pub fn with_sweep_interval_secs(mut self, sweep_interval_secs: u64) -> Self {
        self.sweep_interval_secs = sweep_interval_secs.max(1);
        self
    }

    /// Run a single sweep cycle.
    #[instrument(skip(self))]
    pub async fn poll(&self) -> ryvos_governance::Result<SweepStats> {
        let stats = self.manager.sweep().await?;
        if stats.completed_executed + stats.completed_running + stats.dropped_disconnected > 0 {
            info!(
                executed = stats.completed_executed,
                running = stats.completed_running,
                dropped = stats.dropped_disconnected,
                "Long-poll sweep completed subscribers"
            );
        } else {
            debug!(skipped = stats.skipped, "Long-poll sweep found no changes");
        }
        Ok(stats)
    }

    /// Get the recommended poll interval.
    #[must_use]
    pub const fn poll_interval_secs(&self) -> u64 {
        self.sweep_interval_secs
    }
}
