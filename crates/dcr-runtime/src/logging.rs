//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Variable consulted before `RUST_LOG`.
pub const LOG_LEVEL_VAR: &str = "DCR_LOG_LEVEL";

/// Fallback directive when neither variable is set or valid.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Build the log filter from `DCR_LOG_LEVEL`, then `RUST_LOG`, then `info`.
pub fn log_filter(dcr_log_level: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    dcr_log_level
        .into_iter()
        .chain(rust_log)
        .find_map(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global fmt subscriber.
pub fn init_logging() -> anyhow::Result<()> {
    let dcr = std::env::var(LOG_LEVEL_VAR).ok();
    let rust = std::env::var("RUST_LOG").ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(dcr.as_deref(), rust.as_deref()))
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
