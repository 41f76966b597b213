//! Configuration discovery, parsing and validation
//!
//! The configuration is a JSON document holding static bindings (`globals` and `vars`),
//! feature toggles, logging settings and the ordered list of predicates. It is read once
//! per invocation. Binding names are validated as part of loading, before any predicate is
//! compiled; predicate entries themselves are validated by the expression loader.

mod document;
mod logging;
mod options;

pub use document::{CONFIG_FILE_NAME, Config, DEFAULT_CONFIG_JSON, SYSTEM_CONFIG_PATH, Settings};
pub use logging::LoggingSettings;
pub use options::{FieldPreset, FieldSpec, Options};
