//! Loading, validating and compiling the configured predicates

use super::Predicate;
use crate::Result;
use crate::providers::{ProviderKind, Registry};
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LOG_TARGET: &str = "      expr";

/// The configured shape of one predicate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PredicateSpec {
    pub uses: Vec<String>,
    pub expr: String,
}

/// The ordered, compiled predicates of one configuration.
#[derive(Debug, Clone)]
pub struct ExpressionSet {
    predicates: Vec<Predicate>,
}

impl ExpressionSet {
    /// Validate and compile raw configuration entries.
    ///
    /// Each entry must be an object with exactly the keys `uses` and `expr`.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry is malformed, references an unknown provider, or fails
    /// to compile. Nothing is returned on partial success.
    pub fn load(entries: &[Value], registry: &Registry) -> Result<Self> {
        let specs = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                PredicateSpec::deserialize(entry)
                    .into_app_err_with(|| format!("expression #{index} must be an object with exactly the keys 'uses' and 'expr'"))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::compile(specs, registry)
    }

    /// Validate and compile already-shaped predicate specs.
    ///
    /// Provider references are checked for every entry before anything is compiled.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is empty, an entry has no providers, a provider is
    /// unknown, or an expression fails to compile.
    pub fn compile(specs: Vec<PredicateSpec>, registry: &Registry) -> Result<Self> {
        if specs.is_empty() {
            return Err(app_err!("no expressions are configured"));
        }

        let mut resolved = Vec::with_capacity(specs.len());
        for (index, spec) in specs.into_iter().enumerate() {
            let uses = resolve_uses(index, &spec.uses, registry)?;
            resolved.push((index, uses, spec.expr));
        }

        let predicates = resolved
            .into_iter()
            .map(|(index, uses, expr)| Predicate::new(index, uses, expr))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(target: LOG_TARGET, "Compiled {} expressions", predicates.len());
        Ok(Self { predicates })
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.predicates.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Map provider names to kinds, keeping the first occurrence of duplicates.
fn resolve_uses(index: usize, uses: &[String], registry: &Registry) -> Result<Vec<ProviderKind>> {
    if uses.is_empty() {
        return Err(app_err!("expression #{index} must use at least one provider"));
    }

    let mut kinds = Vec::with_capacity(uses.len());
    for name in uses {
        let kind = registry.resolve(name).map_err(|e| app_err!("expression #{index}: {e}"))?.kind();
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    Ok(kinds)
}
