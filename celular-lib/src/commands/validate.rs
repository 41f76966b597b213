use super::Host;
use super::common::{LogLevel, load_config};
use crate::Result;
use crate::expr::{ExpressionSet, Materializer};
use crate::providers::{Registry, SystemPaths};
use camino::Utf8Path;
use ohno::IntoAppError;
use std::io::Write;

/// Load and compile the configuration without enumerating any provider.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, an expression does not compile,
/// or a field projection names an unknown field.
pub fn validate_config<H: Host>(host: &mut H, config_path: Option<&Utf8Path>, log_level: Option<LogLevel>) -> Result<()> {
    let (path, config) = load_config(config_path, log_level)?;

    let registry = Registry::system(&SystemPaths::default(), config.config.options.include_virtual_mounts);
    let set = ExpressionSet::load(&config.config.expressions, &registry)?;
    let _ = Materializer::new(&registry, config.config.options.materialize_options())?;

    writeln!(host.output(), "Configuration file '{path}' is valid ({} expressions)", set.len())
        .into_app_err("writing validation result")?;
    Ok(())
}
