//! Live system data sources
//!
//! A provider enumerates one kind of operating-system entity and projects each entity
//! into a JSON record holding a caller-selected set of fields. Providers never cache:
//! every call re-reads the system, so two enumerations may legitimately differ.
//!
//! # Implementation Model
//!
//! The closed set of providers is named by [`ProviderKind`]. Each kind maps to an
//! implementation of the [`Provider`] trait inside a [`Registry`]:
//! - **Processes**: one record per numeric directory under `/proc`
//! - **Mounts**: entries of `/proc/self/mounts`, physical filesystems only by default
//! - **Users**: accounts from the name service switch, credential field excluded
//! - **`CommonUsers`**: names of users with a UID in `1000..=1999`, delegating to Users
//!
//! All file locations come from [`SystemPaths`] so the whole layer can be pointed at a
//! fixture tree.

mod common_users;
#[cfg(test)]
mod fake_provider;
mod mounts;
mod proc_parsers;
mod processes;
mod provider;
mod provider_kind;
mod registry;
mod system_paths;
mod users;

pub use common_users::CommonUsersProvider;
#[cfg(test)]
pub use fake_provider::FakeProvider;
pub use mounts::MountsProvider;
pub use processes::ProcessesProvider;
pub use provider::{FieldSelection, Projection, Provider, Record};
pub use provider_kind::ProviderKind;
pub use registry::Registry;
pub use system_paths::SystemPaths;
pub use users::{PasswdEntry, UsersProvider};
