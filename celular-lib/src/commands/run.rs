//! Command dispatch logic for celular

use super::common::LogLevel;
use super::decide::decide_in_use;
use super::dump::dump_providers;
use super::init::init_config;
use super::validate::validate_config;
use super::{EXIT_IN_USE, EXIT_NOT_IN_USE, EXIT_USAGE};
use crate::providers::{ProviderKind, SystemPaths};
use crate::{Host, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

const EXIT_STATUS_HELP: &str = "\
Exit status:
  0   not in use (or the requested dump, validation or init succeeded)
  1   in use, or the decision could not be made
  2   usage error, help or version output
  70  internal failure, treat as in use";

#[derive(Parser, Debug)]
#[command(name = "celular", version, long_about = None)]
#[command(about = "Decide whether this Linux host is in use by evaluating CEL predicates against live system state")]
#[command(after_help = EXIT_STATUS_HELP)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    /// Path to the configuration file (default is `celular.json` next to the executable, then `/usr/local/etc/celular.json`)
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output (default comes from the configuration file)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Print raw provider records as JSON instead of deciding, optionally only for the named providers
    #[arg(
        long,
        value_name = "NAME",
        value_delimiter = ',',
        num_args = 0..=1,
        require_equals = true,
        help_heading = "Inspection"
    )]
    json_output: Option<Vec<ProviderKind>>,

    /// Like --json-output, with every field each provider knows about
    #[arg(long, help_heading = "Inspection")]
    json_output_all: bool,

    /// Load and compile the configuration without reading system state, then exit
    #[arg(long, conflicts_with_all = ["json_output", "json_output_all", "default_config"], help_heading = "Inspection")]
    validate_config: bool,

    /// Write the example configuration to PATH, then exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["json_output", "json_output_all"])]
    default_config: Option<Utf8PathBuf>,

    /// Read system state below this directory instead of `/`
    #[arg(long, value_name = "PATH", hide = true)]
    root: Option<Utf8PathBuf>,
}

/// Parse command-line arguments, run the selected mode and report its exit code
///
/// This function is designed to be called from main.rs with the program arguments. It
/// calls [`Host::exit`] exactly once. Usage errors end with [`EXIT_USAGE`]; any other
/// failure is written to the host's error stream and ends with [`EXIT_IN_USE`].
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
pub fn run<I, T, H>(host: &mut H, args: I)
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let code = match Cli::try_parse_from(args) {
        Ok(cli) => match execute(host, &cli) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(host.error(), "{e:#}");
                EXIT_IN_USE
            }
        },

        Err(e) => {
            let text = e.render();
            if e.use_stderr() {
                let _ = write!(host.error(), "{text}");
            } else {
                let _ = write!(host.output(), "{text}");
            }

            EXIT_USAGE
        }
    };

    host.exit(code);
}

fn execute<H: Host>(host: &mut H, cli: &Cli) -> Result<i32> {
    if let Some(output) = &cli.default_config {
        init_config(host, output)?;
        return Ok(EXIT_NOT_IN_USE);
    }

    if cli.validate_config {
        validate_config(host, cli.config.as_deref(), cli.log_level)?;
        return Ok(EXIT_NOT_IN_USE);
    }

    let paths = cli.root.as_deref().map_or_else(SystemPaths::default, SystemPaths::rooted);

    if cli.json_output.is_some() || cli.json_output_all {
        let kinds = cli.json_output.as_deref().unwrap_or_default();
        dump_providers(host, kinds, cli.json_output_all, cli.log_level, &paths)?;
        return Ok(EXIT_NOT_IN_USE);
    }

    decide_in_use(cli.config.as_deref(), cli.log_level, &paths)
}
