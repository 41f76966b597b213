//! Evaluating predicates against live provider data
//!
//! Every predicate runs in its own child scope of a shared base context. The child scope
//! receives one binding per provider the predicate uses, materialized just before the
//! predicate runs, so a predicate never sees providers it did not declare.

use super::{Environment, ExpressionSet, Materializer, Predicate};
use crate::Result;
use cel_interpreter::{Context, Value};
use ohno::IntoAppError;

const LOG_TARGET: &str = "      eval";

/// Runs an [`ExpressionSet`] in declared order.
#[derive(Debug)]
pub struct Evaluator<'a> {
    environment: &'a Environment,
    materializer: Materializer<'a>,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub const fn new(environment: &'a Environment, materializer: Materializer<'a>) -> Self {
        Self {
            environment,
            materializer,
        }
    }

    /// Evaluate every predicate, returning one result per predicate in declared order.
    ///
    /// # Errors
    ///
    /// Returns the first provider or expression failure encountered.
    pub fn evaluate_all(&mut self, set: &ExpressionSet) -> Result<Vec<bool>> {
        let base = self.environment.base_context();
        set.predicates()
            .iter()
            .map(|predicate| self.evaluate_predicate(&base, predicate))
            .collect()
    }

    /// Evaluate predicates in declared order, stopping at the first true one.
    ///
    /// Providers used only by later predicates are never enumerated.
    ///
    /// # Errors
    ///
    /// Returns the first provider or expression failure encountered.
    pub fn evaluate_until_one(&mut self, set: &ExpressionSet) -> Result<bool> {
        let base = self.environment.base_context();
        for predicate in set.predicates() {
            if self.evaluate_predicate(&base, predicate)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn evaluate_predicate(&mut self, base: &Context<'_>, predicate: &Predicate) -> Result<bool> {
        let mut scope = base.new_inner_scope();
        for kind in predicate.uses() {
            let records = self.materializer.materialize(*kind)?;
            scope.add_variable_from_value(kind.output_key(), records);
        }

        let index = predicate.index();
        let value = predicate
            .program()
            .execute(&scope)
            .into_app_err_with(|| format!("could not evaluate expression #{index} '{}'", predicate.source()))?;

        let result = is_truthy(&value);
        log::info!(target: LOG_TARGET, "Expression #{index} evaluated to {result}");
        Ok(result)
    }
}

/// Coerce a CEL value to a boolean.
///
/// `false`, `null`, numeric zero, and empty strings, bytes, lists and maps are false;
/// everything else is true.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Int(i) => *i != 0,
        Value::UInt(u) => *u != 0,
        Value::Float(f) => *f != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Bytes(b) => !b.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(map) => !map.map.is_empty(),
        _ => true,
    }
}
