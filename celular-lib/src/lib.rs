#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for celular
//!
//! This library consolidates all functionality for the celular tool, which decides
//! whether a Linux host is currently in use by evaluating CEL predicates against
//! live system state.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`config`]: Configuration discovery, parsing, and validation
//! - [`providers`]: Live system data sources (processes, mounts, users)
//! - [`expr`]: Predicate compilation and evaluation
//! - [`decision`]: Fail-safe aggregation into a single in-use answer
//! - [`dump`]: Raw provider output for inspection

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod config;
#[cfg(not(any(debug_assertions, test)))]
mod config;

#[cfg(any(debug_assertions, test))]
pub mod decision;
#[cfg(not(any(debug_assertions, test)))]
mod decision;

#[cfg(any(debug_assertions, test))]
pub mod dump;
#[cfg(not(any(debug_assertions, test)))]
mod dump;

#[cfg(any(debug_assertions, test))]
pub mod expr;
#[cfg(not(any(debug_assertions, test)))]
mod expr;

#[cfg(any(debug_assertions, test))]
pub mod providers;
#[cfg(not(any(debug_assertions, test)))]
mod providers;

pub use crate::commands::{EXIT_FORCED, EXIT_IN_USE, EXIT_NOT_IN_USE, EXIT_USAGE, Host, run};
