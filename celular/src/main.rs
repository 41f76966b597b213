//! Decide whether a Linux host is in use by evaluating CEL predicates against live system state.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use celular_lib::{EXIT_FORCED, Host, run};
use core::panic::AssertUnwindSafe;
use std::io::Write;
use std::io::{stderr, stdout};

/// Host backed by the real process streams.
#[derive(Debug, Clone, Default)]
pub struct RealHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for RealHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

// A panic escaping `run` ends with EXIT_FORCED.
#[cfg_attr(coverage_nightly, coverage(off))]
fn main() {
    let mut host = RealHost;
    if std::panic::catch_unwind(AssertUnwindSafe(|| run(&mut host, std::env::args()))).is_err() {
        std::process::exit(EXIT_FORCED);
    }
}
