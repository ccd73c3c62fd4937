//! Periodic storage compaction.

use crate::metrics::COMPACTIONS;
use benchcache_metadata::repos::MaintenanceRepo;
use benchcache_metadata::{MetadataResult, MetadataStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Compact the store once, recording the result.
pub async fn run_compaction(store: &dyn MetadataStore) -> MetadataResult<()> {
    let started = Instant::now();
    match store.compact().await {
        Ok(()) => {
            COMPACTIONS.with_label_values(&["ok"]).inc();
            tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Storage compaction finished"
            );
            Ok(())
        }
        Err(e) => {
            COMPACTIONS.with_label_values(&["error"]).inc();
            Err(e)
        }
    }
}

/// Spawn the compaction loop. The first run happens one `interval` after
/// startup; a failed run is logged and tried again on the next tick.
///
/// `interval` must be non-zero.
pub fn spawn_maintenance_task(store: Arc<dyn MetadataStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(interval_secs = interval.as_secs(), "Storage maintenance enabled");

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = run_compaction(store.as_ref()).await {
                tracing::error!(error = %e, "Storage compaction failed");
            }
        }
    })
}
