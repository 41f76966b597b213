//! Turning provider output into CEL values on demand

use super::environment::json_to_cel;
use crate::Result;
use crate::providers::{FieldSelection, Provider, ProviderKind, Registry};
use cel_interpreter::Value;
use core::time::Duration;
use ohno::app_err;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

const LOG_TARGET: &str = "      expr";

/// How providers are materialized during one decision.
#[derive(Debug, Clone, Default)]
pub struct MaterializeOptions {
    /// Field projection per provider; providers not listed use their defaults.
    pub fields: BTreeMap<ProviderKind, FieldSelection>,

    /// Reuse a provider's output for later predicates in the same decision.
    pub memoize: bool,

    /// Upper bound on a single enumeration.
    pub timeout: Option<Duration>,
}

/// Enumerates providers for the evaluator, optionally bounded in time and memoized.
#[derive(Debug)]
pub struct Materializer<'a> {
    registry: &'a Registry,
    options: MaterializeOptions,
    cache: HashMap<ProviderKind, Value>,
}

impl<'a> Materializer<'a> {
    /// Create a materializer after checking every configured field projection.
    ///
    /// # Errors
    ///
    /// Returns an error if a projection names a provider that is not registered or a field
    /// outside that provider's catalog.
    pub fn new(registry: &'a Registry, options: MaterializeOptions) -> Result<Self> {
        for (kind, selection) in &options.fields {
            let provider = registry
                .get(*kind)
                .ok_or_else(|| app_err!("field selection given for unregistered provider '{kind}'"))?;
            let _ = provider.projection(selection)?;
        }

        Ok(Self {
            registry,
            options,
            cache: HashMap::new(),
        })
    }

    /// Enumerate `kind` and convert its records into a CEL list.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not registered, fails, or exceeds the timeout.
    pub fn materialize(&mut self, kind: ProviderKind) -> Result<Value> {
        if let Some(value) = self.cache.get(&kind) {
            log::debug!(target: LOG_TARGET, "Reusing memoized output of provider '{kind}'");
            return Ok(value.clone());
        }

        let provider = self.registry.get(kind).ok_or_else(|| app_err!("provider '{kind}' is not registered"))?;
        let selection = self.options.fields.get(&kind).cloned().unwrap_or_default();

        let start = Instant::now();
        let records = match self.options.timeout {
            Some(timeout) => enumerate_with_timeout(Arc::clone(provider), selection, timeout)?,
            None => provider.enumerate(&selection)?,
        };

        log::debug!(
            target: LOG_TARGET,
            "Materialized provider '{kind}': {} records in {:.3}s",
            records.len(),
            start.elapsed().as_secs_f64()
        );

        let value = Value::List(Arc::new(records.iter().map(json_to_cel).collect()));
        if self.options.memoize {
            let _ = self.cache.insert(kind, value.clone());
        }

        Ok(value)
    }
}

/// Run an enumeration on a helper thread and stop waiting after `timeout`.
///
/// A timed-out enumeration is abandoned; the helper thread finishes on its own.
fn enumerate_with_timeout(provider: Arc<dyn Provider>, selection: FieldSelection, timeout: Duration) -> Result<Vec<JsonValue>> {
    let name = provider.name();
    let (sender, receiver) = mpsc::channel();

    let _ = thread::Builder::new()
        .name(format!("enumerate-{name}"))
        .spawn(move || {
            let result = provider.enumerate(&selection).map_err(|e| format!("{e:#}"));
            let _ = sender.send(result);
        })
        .map_err(|e| app_err!("could not start enumeration of provider '{name}': {e}"))?;

    match receiver.recv_timeout(timeout) {
        Ok(Ok(records)) => Ok(records),
        Ok(Err(message)) => Err(app_err!("{message}")),
        Err(mpsc::RecvTimeoutError::Timeout) => Err(app_err!("enumeration of provider '{name}' did not finish within {timeout:?}")),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(app_err!("enumeration of provider '{name}' ended without a result")),
    }
}
