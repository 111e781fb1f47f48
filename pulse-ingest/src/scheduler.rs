//! Periodic insight generation
//!
//! Runs the aggregation + insight pipeline on a fixed cadence. A
//! compare-and-swap run-in-progress flag skips a tick whose predecessor is
//! still running, so overlapping cadences never double-generate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::insight::{self, DAILY_LOOKBACK_HOURS};
use crate::store::Store;

/// Spawn the daily insight job. Failures are logged and never fatal to the
/// service.
pub fn spawn_daily_insight_job(
    store: Store,
    running: Arc<AtomicBool>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_secs);
        loop {
            tokio::time::sleep(interval).await;

            if running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                warn!("Skipping insight run: previous run still in progress");
                continue;
            }

            match insight::generate_insight(
                &store,
                "daily",
                chrono::Duration::hours(DAILY_LOOKBACK_HOURS),
            )
            .await
            {
                Ok(generated) => info!("Daily insight generated: {}", generated.id),
                Err(e) => error!("Daily insight generation failed: {}", e),
            }

            running.store(false, Ordering::SeqCst);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_blocks_second_entrant() {
        let running = Arc::new(AtomicBool::new(false));

        assert!(running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok());
        // Second entrant sees the flag held
        assert!(running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err());

        running.store(false, Ordering::SeqCst);
        assert!(running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok());
    }
}
