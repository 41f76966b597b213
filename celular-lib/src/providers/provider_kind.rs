use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The closed set of data providers known to celular.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString, ValueEnum, Deserialize, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Running processes
    Processes,

    /// Mounted filesystems
    Mounts,

    /// Entries of the system user database
    Users,

    /// Usernames of interactive accounts (UID 1000..=1999)
    CommonUsers,
}

impl ProviderKind {
    /// Name used in configuration `uses` lists and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Processes => "processes",
            Self::Mounts => "mounts",
            Self::Users => "users",
            Self::CommonUsers => "common_users",
        }
    }

    /// Name under which the provider's records are bound in a predicate's environment.
    #[must_use]
    pub const fn output_key(self) -> &'static str {
        match self {
            Self::Processes => "procs",
            Self::Mounts => "mounts",
            Self::Users => "users",
            Self::CommonUsers => "common_users",
        }
    }
}
