use super::Host;
use super::common::{LogLevel, init_logging};
use crate::Result;
use crate::dump::dump;
use crate::providers::{ProviderKind, Registry, SystemPaths};
use log::LevelFilter;
use ohno::IntoAppError;
use std::io::Write;

/// Print raw provider records as pretty JSON. Needs no configuration file.
///
/// # Errors
///
/// Returns an error if a provider fails to enumerate or the output cannot be written.
pub fn dump_providers<H: Host>(
    host: &mut H,
    kinds: &[ProviderKind],
    all_fields: bool,
    log_level: Option<LogLevel>,
    paths: &SystemPaths,
) -> Result<()> {
    init_logging(log_level.map_or(LevelFilter::Off, LogLevel::filter));

    let registry = Registry::system(paths, false);
    let output = dump(&registry, kinds, all_fields)?;
    let text = serde_json::to_string_pretty(&output).into_app_err("serializing provider records")?;

    writeln!(host.output(), "{text}").into_app_err("writing provider records")?;
    Ok(())
}
