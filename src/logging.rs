use crate::config::LogConfig;
use anyhow::{anyhow, Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};
use tracing_subscriber::{fmt, EnvFilter};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Install the global subscriber: append-mode text log under `cfg.dir`.
/// `RUST_LOG` wins over `cfg.level` when set.
pub fn init(cfg: &LogConfig) -> Result<()> {
    fs::create_dir_all(&cfg.dir)
        .with_context(|| format!("creating log directory {:?}", cfg.dir))?;
    let path = cfg.path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {:?}", path))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&cfg.level)
            .with_context(|| format!("invalid log level {:?}", cfg.level))?,
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(fmt::time::ChronoLocal::new(TIME_FORMAT.to_string()))
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

/// Route tracing output to the test harness. Safe to call from every test.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
