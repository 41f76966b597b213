use crate::expr::MaterializeOptions;
use crate::providers::{FieldSelection, ProviderKind};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature toggles under `config.options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Stop at the first true predicate instead of evaluating all of them
    #[serde(default)]
    pub short_circuit: bool,

    /// Enumerate each provider at most once per decision
    #[serde(default)]
    pub memoize_providers: bool,

    /// Upper bound on a single provider enumeration
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub enumeration_timeout: Option<Duration>,

    /// List pseudo filesystems in the mounts provider
    #[serde(default)]
    pub include_virtual_mounts: bool,

    /// Field projection per provider
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<ProviderKind, FieldSpec>,
}

impl Options {
    #[must_use]
    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            fields: self.fields.iter().map(|(kind, spec)| (*kind, FieldSelection::from(spec))).collect(),
            memoize: self.memoize_providers,
            timeout: self.enumeration_timeout,
        }
    }
}

/// A configured field projection: `"default"`, `"all"`, or a list of field names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldSpec {
    Preset(FieldPreset),
    Only(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPreset {
    Default,
    All,
}

impl From<&FieldSpec> for FieldSelection {
    fn from(spec: &FieldSpec) -> Self {
        match spec {
            FieldSpec::Preset(FieldPreset::Default) => Self::Default,
            FieldSpec::Preset(FieldPreset::All) => Self::All,
            FieldSpec::Only(fields) => Self::Only(fields.clone()),
        }
    }
}
