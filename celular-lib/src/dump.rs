//! Raw provider output for inspection
//!
//! Produces `{"<provider>": {"<provider>": [record, ...]}, ...}` for a selection of
//! providers. This path never evaluates predicates.

use crate::Result;
use crate::providers::{FieldSelection, ProviderKind, Registry};
use ohno::app_err;
use serde_json::{Map, Value};

const LOG_TARGET: &str = "      dump";

/// Enumerate `kinds` (every registered provider when empty) and nest the records by provider name.
///
/// # Errors
///
/// Returns an error if a requested provider is not registered or fails to enumerate.
pub fn dump(registry: &Registry, kinds: &[ProviderKind], all_fields: bool) -> Result<Value> {
    let kinds: Vec<ProviderKind> = if kinds.is_empty() { registry.kinds().collect() } else { kinds.to_vec() };
    let selection = if all_fields { FieldSelection::All } else { FieldSelection::Default };

    let mut output = Map::new();
    for kind in kinds {
        let provider = registry.get(kind).ok_or_else(|| app_err!("provider '{kind}' is not registered"))?;
        let records = provider.enumerate(&selection)?;
        log::debug!(target: LOG_TARGET, "Dumping {} records from provider '{kind}'", records.len());

        let mut inner = Map::new();
        let _ = inner.insert(kind.name().to_string(), Value::Array(records));
        let _ = output.insert(kind.name().to_string(), Value::Object(inner));
    }

    Ok(Value::Object(output))
}
