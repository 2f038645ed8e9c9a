//! Background snapshot flushing for [`WriteMode::Deferred`](crate::limiter::WriteMode).

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::limiter::AdmissionController;

/// Spawn a task that writes the limiter's state every `interval` while it is
/// dirty.
///
/// The write runs on the blocking pool. Abort the returned handle to stop the
/// task, then call [`AdmissionController::flush`] once more for a final write.
pub fn spawn_flush_task(limiter: Arc<AdmissionController>, interval: Duration) -> JoinHandle<()> {
    info!(interval_ms = interval.as_millis() as u64, "Snapshot flush task started");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !limiter.is_dirty() {
                continue;
            }

            let limiter = Arc::clone(&limiter);
            match tokio::task::spawn_blocking(move || limiter.flush()).await {
                Ok(Ok(())) => debug!("Deferred snapshot written"),
                // Already logged and counted by flush().
                Ok(Err(_)) => {}
                Err(e) => error!(error = %e, "Snapshot flush task panicked"),
            }
        }
    })
}
