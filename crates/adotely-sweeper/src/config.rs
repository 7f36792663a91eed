use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub db_path: PathBuf,
    pub interval: Duration,
    /// Run a single pass and exit.
    pub once: bool,
}

impl SweeperConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db_path: PathBuf = std::env::var("ADOTELY_DB_PATH")
            .unwrap_or_else(|_| "adotely.db".into())
            .into();
        let interval_secs: u64 = match std::env::var("ADOTELY_SWEEP_INTERVAL_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("ADOTELY_SWEEP_INTERVAL_SECS is not a number: {}", v))?,
            Err(_) => 300,
        };
        if interval_secs == 0 {
            anyhow::bail!("ADOTELY_SWEEP_INTERVAL_SECS must be positive");
        }
        let once = std::env::var("ADOTELY_SWEEP_ONCE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            db_path,
            interval: Duration::from_secs(interval_secs),
            once,
        })
    }
}
