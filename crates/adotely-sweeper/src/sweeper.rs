use std::sync::Arc;
use std::time::Duration;

use adotely_core::sweep::{self, SweepReport};
use adotely_db::Database;
use tracing::{info, warn};

/// Run one pass on the blocking pool; the store calls are synchronous.
pub async fn sweep_once(db: Arc<Database>) -> anyhow::Result<SweepReport> {
    let report = tokio::task::spawn_blocking(move || sweep::reconcile(&*db)).await??;
    Ok(report)
}

/// Background task that converges interaction pairs left half-written.
pub async fn run_sweep_loop(db: Arc<Database>, interval: Duration) {
    let mut interval = tokio::time::interval(interval);

    loop {
        interval.tick().await;

        match sweep_once(db.clone()).await {
            Ok(report) => {
                if !report.is_clean() {
                    info!(
                        "Sweep: repaired {}, withdrew {} ({} scanned, {} orphaned)",
                        report.repaired, report.withdrawn, report.scanned, report.orphaned
                    );
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}
