use super::{Projection, Provider, ProviderKind, UsersProvider};
use crate::Result;
use core::ops::RangeInclusive;
use serde_json::Value;
use std::collections::BTreeSet;

/// UIDs handed out to interactive accounts.
const COMMON_UID_RANGE: RangeInclusive<u32> = 1000..=1999;

/// Names of interactive accounts, as bare strings.
///
/// Field selection has no effect here; the output is always the sorted, de-duplicated
/// list of usernames.
#[derive(Debug, Clone)]
pub struct CommonUsersProvider {
    users: UsersProvider,
}

impl CommonUsersProvider {
    #[must_use]
    pub const fn new(users: UsersProvider) -> Self {
        Self { users }
    }
}

impl Provider for CommonUsersProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::CommonUsers
    }

    fn default_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn all_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn collect(&self, _projection: &Projection) -> Result<Vec<Value>> {
        let names: BTreeSet<String> = self
            .users
            .entries()?
            .into_iter()
            .filter(|entry| COMMON_UID_RANGE.contains(&entry.uid))
            .map(|entry| entry.name)
            .collect();

        Ok(names.into_iter().map(Value::String).collect())
    }
}
