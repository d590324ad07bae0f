//! Process-wide logger installation

use env_logger::Env;

use crate::config::LoggingConfig;

/// Install `env_logger` at the configured level
///
/// `RUST_LOG` overrides the configured level when set. Returns `false` when a
/// logger was already installed, which is not an error.
pub fn init_logging(config: &LoggingConfig) -> bool {
    env_logger::Builder::from_env(Env::default().default_filter_or(config.level.as_str()))
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init()
        .is_ok()
}
