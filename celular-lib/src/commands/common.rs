//! Logging setup and configuration loading shared by the commands.

use crate::Result;
use crate::config::Config;
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use log::LevelFilter;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

impl LogLevel {
    #[must_use]
    pub const fn filter(self) -> LevelFilter {
        match self {
            Self::None => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Install the global logger. Only the first call in a process has any effect.
pub fn init_logging(level: LevelFilter) {
    if level == LevelFilter::Off {
        return;
    }

    let env = env_logger::Env::default().filter_or("RUST_LOG", level.as_str());

    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(level >= LevelFilter::Debug)
        .try_init();
}

/// Find and load the configuration, setting up logging along the way.
///
/// An explicit `log_level` takes effect before the file is read. Otherwise the level comes
/// from the file's `logging` section once it has been loaded, and logging stays off if the
/// file does not set one.
///
/// # Errors
///
/// Returns an error if no configuration file is found or it cannot be loaded.
pub fn load_config(explicit: Option<&Utf8Path>, log_level: Option<LogLevel>) -> Result<(Utf8PathBuf, Config)> {
    if let Some(level) = log_level {
        init_logging(level.filter());
    }

    let path = Config::discover(explicit, &Config::default_locations())?;
    let config = Config::load(&path)?;

    if log_level.is_none() {
        init_logging(config.config.logging.level_filter().unwrap_or(LevelFilter::Off));
    }

    Ok((path, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_filters() {
        assert_eq!(LogLevel::None.filter(), LevelFilter::Off);
        assert_eq!(LogLevel::Warn.filter(), LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.filter(), LevelFilter::Trace);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Utf8Path::new("/nowhere/celular.json")), Some(LogLevel::None)).unwrap_err();
        assert!(err.to_string().contains("reading configuration file"));
    }
}
