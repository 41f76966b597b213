//! Command-line interface and orchestration for celular
//!
//! This module parses the command line, sets up logging and routes to one of four modes:
//!
//! - **decide** (the default): load the configuration, evaluate every predicate against
//!   live system state and turn the answer into an exit code
//! - **dump** (`--json-output`, `--json-output-all`): print raw provider records as JSON
//! - **validate** (`--validate-config`): load and compile the configuration without
//!   enumerating anything
//! - **init** (`--default-config`): write the embedded example configuration
//!
//! Every mode reports through a [`Host`], which ends the invocation with exactly one call
//! to [`Host::exit`]. Failures are printed to the error stream and mapped to
//! [`EXIT_IN_USE`] so that callers gating a disruptive action stay cautious.

mod common;
mod decide;
mod dump;
mod host;
mod init;
mod run;
mod validate;

/// Every predicate evaluated to false; the caller may proceed. Also used for successful
/// dump, validate and init invocations.
pub const EXIT_NOT_IN_USE: i32 = 0;

/// The host is in use, or the decision could not be made.
pub const EXIT_IN_USE: i32 = 1;

/// The command line could not be parsed, or help/version output was requested.
pub const EXIT_USAGE: i32 = 2;

/// A panic escaped the engine; reported by the binary.
pub const EXIT_FORCED: i32 = 70;

pub use host::Host;
#[cfg(test)]
pub use host::TestHost;
pub use run::run;
