//! Structured logging for Bastion.
//!
//! Installs a `tracing` subscriber with a human-readable console layer and,
//! when enabled in the config, a JSON file layer for later analysis. The
//! filter comes from `RUST_LOG` if set, otherwise from the config's
//! `log.level`.

use std::path::Path;

use bastion_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log inside the log directory.
pub const LOG_FILE: &str = "bastion.log";

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the JSON log file
/// * `file_logging` - Write the JSON log file (also enabled by `log.file_logging`)
/// * `config` - Optional configuration supplying the log level
///
/// # Examples
///
/// ```no_run
/// use bastion_config::Config;
/// use bastion_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, file_logging: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config_filter(config));
    let file_logging = file_logging || config.is_some_and(|c| c.log.file_logging);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if file_logging
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        tracing::debug!(log_dir = %log_dir.display(), "json file logging enabled");
        return;
    }

    subscriber.init();
}

/// Filter from the config's level, falling back to [`default_env_filter`].
fn config_filter(config: Option<&Config>) -> EnvFilter {
    config
        .map(|c| c.log.level.trim())
        .filter(|level| !level.is_empty())
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(default_env_filter)
}

/// `info` for every target.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
