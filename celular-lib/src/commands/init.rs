use super::Host;
use crate::Result;
use crate::config::Config;
use camino::Utf8Path;
use ohno::IntoAppError;
use std::io::Write;

/// Write the embedded example configuration to `output`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn init_config<H: Host>(host: &mut H, output: &Utf8Path) -> Result<()> {
    Config::save_default(output)?;
    writeln!(host.output(), "Generated default configuration file: {output}").into_app_err("writing init result")?;
    Ok(())
}
