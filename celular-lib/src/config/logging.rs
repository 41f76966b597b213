use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Settings under `config.logging`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// One of `NOTSET`, `DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`.
    ///
    /// Older configuration files spell this key `basename`.
    #[serde(default, alias = "basename", skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl LoggingSettings {
    /// The configured level, or `None` when the setting is absent. Unrecognized names mean `INFO`.
    #[must_use]
    pub fn level_filter(&self) -> Option<LevelFilter> {
        let level = match self.level.as_deref()? {
            "NOTSET" => LevelFilter::Trace,
            "DEBUG" => LevelFilter::Debug,
            "WARNING" => LevelFilter::Warn,
            "ERROR" | "CRITICAL" => LevelFilter::Error,
            _ => LevelFilter::Info,
        };

        Some(level)
    }
}
