use super::common::{LogLevel, load_config};
use super::{EXIT_IN_USE, EXIT_NOT_IN_USE};
use crate::Result;
use crate::decision::{Decision, decide};
use crate::providers::{Registry, SystemPaths};
use camino::Utf8Path;

/// Decide whether the host is in use and map the answer to an exit code.
///
/// # Errors
///
/// Returns an error when the configuration cannot be loaded or the decision fails; the
/// caller reports it as "in use".
pub fn decide_in_use(config_path: Option<&Utf8Path>, log_level: Option<LogLevel>, paths: &SystemPaths) -> Result<i32> {
    let (_, config) = load_config(config_path, log_level)?;
    let registry = Registry::system(paths, config.config.options.include_virtual_mounts);

    match decide(&config, &registry) {
        Decision::NotInUse => Ok(EXIT_NOT_IN_USE),
        Decision::InUse => Ok(EXIT_IN_USE),
        Decision::Failed(e) => Err(e),
    }
}
