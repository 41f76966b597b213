use super::{CommonUsersProvider, MountsProvider, ProcessesProvider, Provider, ProviderKind, SystemPaths, UsersProvider};
use crate::Result;
use ohno::app_err;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps each provider kind to the instance that serves it.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    providers: BTreeMap<ProviderKind, Arc<dyn Provider>>,
}

impl Registry {
    /// The standard Linux providers reading from `paths`.
    #[must_use]
    pub fn system(paths: &SystemPaths, include_virtual_mounts: bool) -> Self {
        let users = UsersProvider::for_paths(paths);

        let providers: [Arc<dyn Provider>; 4] = [
            Arc::new(ProcessesProvider::new(paths.clone(), users.clone())),
            Arc::new(MountsProvider::new(paths, include_virtual_mounts)),
            Arc::new(CommonUsersProvider::new(users.clone())),
            Arc::new(users),
        ];

        Self::from_providers(providers)
    }

    /// Build a registry from arbitrary providers; a later provider of the same kind replaces an earlier one.
    pub fn from_providers(providers: impl IntoIterator<Item = Arc<dyn Provider>>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.kind(), p)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&Arc<dyn Provider>> {
        self.providers.get(&kind)
    }

    /// Look up a provider by its configuration name.
    ///
    /// # Errors
    ///
    /// Returns an error if no registered provider has that name.
    pub fn resolve(&self, name: &str) -> Result<&Arc<dyn Provider>> {
        name.parse::<ProviderKind>()
            .ok()
            .and_then(|kind| self.get(kind))
            .ok_or_else(|| app_err!("unknown provider '{name}' (known providers: {})", self.names().join(", ")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.providers.keys().copied()
    }

    fn names(&self) -> Vec<&'static str> {
        self.kinds().map(ProviderKind::name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_system_registry_covers_every_kind() {
        let registry = Registry::system(&SystemPaths::default(), false);
        for kind in ProviderKind::iter() {
            assert_eq!(registry.get(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_resolve_by_name() {
        let registry = Registry::system(&SystemPaths::default(), false);
        assert_eq!(registry.resolve("processes").unwrap().output_key(), "procs");

        let err = registry.resolve("packages").unwrap_err();
        assert!(err.to_string().contains("unknown provider 'packages'"));
    }

    #[test]
    fn test_resolve_respects_registration() {
        let registry = Registry::from_providers([]);
        let _ = registry.resolve("users").unwrap_err();
        assert_eq!(registry.kinds().count(), 0);
    }
}
