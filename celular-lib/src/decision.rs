//! Fail-safe aggregation of predicate results
//!
//! A host is in use when at least one predicate is true. Any failure on the way to that
//! answer (a bad configuration, a compile error, a provider that fails or times out, an
//! expression that errors at runtime) also counts as in use: the only way to get a
//! "not in use" answer is for every predicate to evaluate cleanly to false.

use crate::Result;
use crate::config::Config;
use crate::expr::{Evaluator, ExpressionSet, Materializer};
use crate::providers::Registry;
use ohno::AppError;

const LOG_TARGET: &str = "  decision";

/// The answer to "is this host in use?".
#[derive(Debug)]
pub enum Decision {
    /// Every predicate evaluated to false
    NotInUse,

    /// At least one predicate evaluated to true
    InUse,

    /// The decision could not be made; treated as in use
    Failed(AppError),
}

impl Decision {
    #[must_use]
    pub const fn in_use(&self) -> bool {
        !matches!(self, Self::NotInUse)
    }
}

/// Compile the configured predicates, evaluate them against `registry` and aggregate.
#[must_use]
pub fn decide(config: &Config, registry: &Registry) -> Decision {
    match try_decide(config, registry) {
        Ok(true) => Decision::InUse,
        Ok(false) => Decision::NotInUse,
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Decision failed, assuming the host is in use: {e:#}");
            Decision::Failed(e)
        }
    }
}

fn try_decide(config: &Config, registry: &Registry) -> Result<bool> {
    let set = ExpressionSet::load(&config.config.expressions, registry)?;
    let options = &config.config.options;
    let environment = config.environment();
    let materializer = Materializer::new(registry, options.materialize_options())?;
    let mut evaluator = Evaluator::new(&environment, materializer);

    if options.short_circuit {
        let in_use = evaluator.evaluate_until_one(&set)?;
        log::info!(target: LOG_TARGET, "In use: {in_use}");
        return Ok(in_use);
    }

    let results = evaluator.evaluate_all(&set)?;
    let matched: Vec<String> = results
        .iter()
        .enumerate()
        .filter(|(_, result)| **result)
        .map(|(index, _)| format!("#{index}"))
        .collect();

    if matched.is_empty() {
        log::info!(target: LOG_TARGET, "In use: false ({} expressions evaluated)", results.len());
        Ok(false)
    } else {
        log::info!(target: LOG_TARGET, "In use: true (matched expressions {})", matched.join(", "));
        Ok(true)
    }
}
