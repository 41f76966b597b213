use super::ProviderKind;
use crate::Result;
use core::fmt::Debug;
use ohno::app_err;
use serde_json::{Map, Value};

/// A single projected entity (one process, one mount, one user).
pub type Record = Map<String, Value>;

/// Which fields a caller wants from a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// The provider's default (cheap, non-sensitive) fields
    #[default]
    Default,

    /// Every field in the provider's catalog, queried without restriction
    All,

    /// An explicit subset of the catalog
    Only(Vec<String>),
}

/// A live source of system facts.
///
/// Implementations perform fresh OS introspection on every call to [`Provider::collect`];
/// nothing is cached between calls.
pub trait Provider: Debug + Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Fields returned when the caller asks for [`FieldSelection::Default`].
    fn default_fields(&self) -> &'static [&'static str];

    /// The full field catalog.
    fn all_fields(&self) -> &'static [&'static str];

    /// Enumerate current OS state, producing one value per entity shaped by `projection`.
    fn collect(&self, projection: &Projection) -> Result<Vec<Value>>;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn output_key(&self) -> &'static str {
        self.kind().output_key()
    }

    /// Resolve `fields` against this provider's catalog and enumerate.
    fn enumerate(&self, fields: &FieldSelection) -> Result<Vec<Value>> {
        let projection = self.projection(fields)?;
        self.collect(&projection)
    }

    /// Validate `fields` against this provider's catalog.
    fn projection(&self, fields: &FieldSelection) -> Result<Projection> {
        Projection::resolve(self.name(), self.default_fields(), self.all_fields(), fields)
    }
}

/// A validated field selection for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<&'static str>,
}

impl Projection {
    /// Resolve a selection against a provider catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested field is not part of the catalog.
    pub fn resolve(
        provider: &str,
        default_fields: &'static [&'static str],
        all_fields: &'static [&'static str],
        selection: &FieldSelection,
    ) -> Result<Self> {
        match selection {
            FieldSelection::Default => Ok(Self {
                fields: default_fields.to_vec(),
            }),
            FieldSelection::All => Ok(Self {
                fields: all_fields.to_vec(),
            }),
            FieldSelection::Only(requested) => {
                let mut fields = Vec::with_capacity(requested.len());
                for name in requested {
                    let Some(field) = all_fields.iter().find(|f| **f == name.as_str()) else {
                        return Err(app_err!(
                            "'{name}' is not a field of provider '{provider}' (known fields: {})",
                            all_fields.join(", ")
                        ));
                    };

                    if !fields.contains(field) {
                        fields.push(*field);
                    }
                }

                Ok(Self { fields })
            }
        }
    }

    #[must_use]
    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| *f == field)
    }

    /// Shape `source` so it holds exactly the projected fields, using null for anything missing.
    #[must_use]
    pub fn apply(&self, mut source: Record) -> Record {
        self.fields
            .iter()
            .map(|field| ((*field).to_string(), source.remove(*field).unwrap_or(Value::Null)))
            .collect()
    }
}
