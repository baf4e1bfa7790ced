//! Named partitions of the record store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A collection of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collection {
    /// Authenticated accounts, keyed by account uuid
    Accounts,
    /// The selection pointer
    AccountsSelected,
    JavaPath,
    JavaArgs,
    Launcher,
    Profile,
    Ram,
    Screen,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Accounts,
        Collection::AccountsSelected,
        Collection::JavaPath,
        Collection::JavaArgs,
        Collection::Launcher,
        Collection::Profile,
        Collection::Ram,
        Collection::Screen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::AccountsSelected => "accounts-selected",
            Collection::JavaPath => "java-path",
            Collection::JavaArgs => "java-args",
            Collection::Launcher => "launcher",
            Collection::Profile => "profile",
            Collection::Ram => "ram",
            Collection::Screen => "screen",
        }
    }

    /// Singleton collections hold one record under the sentinel identifier.
    pub fn is_singleton(&self) -> bool {
        !matches!(self, Collection::Accounts)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}
