mod config;
mod sweeper;

use std::sync::Arc;

use adotely_db::Database;
use tracing::{info, warn};

use crate::config::SweeperConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adotely_sweeper=debug,adotely_core=debug,adotely_db=info".into()),
        )
        .init();

    let config = SweeperConfig::from_env()?;
    let db = Arc::new(Database::open(&config.db_path)?);

    if config.once {
        let report = sweeper::sweep_once(db).await?;
        info!(
            "Sweep finished: {} scanned, {} repaired, {} withdrawn, {} orphaned",
            report.scanned, report.repaired, report.withdrawn, report.orphaned
        );
        return Ok(());
    }

    info!("Sweeping {} every {}s", config.db_path.display(), config.interval.as_secs());
    tokio::select! {
        _ = sweeper::run_sweep_loop(db, config.interval) => {}
        _ = shutdown_signal() => {}
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("No SIGTERM handler ({}), waiting for Ctrl+C", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
