//! Identifier to record key derivation.
//!
//! The key is a 31-multiplier rolling hash over the UTF-16 code units of the
//! identifier, truncated to 32 bits:
//!
//! ```text
//! key = ((key << 5) - key + unit) mod 2^32
//! ```
//!
//! UTF-16 units (not bytes or chars) are hashed so keys match the ones
//! existing launcher installs already wrote. Distinct identifiers can collide;
//! collisions are not resolved and surface as duplicate keys on insert.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A derived record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(u32);

impl RecordKey {
    /// Derive the key for an identifier.
    pub fn derive(identifier: &str) -> Self {
        let key = identifier.encode_utf16().fold(0u32, |key, unit| {
            (key << 5).wrapping_sub(key).wrapping_add(u32::from(unit))
        });
        Self(key)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Unsigned key as stored.
    pub fn value(self) -> u32 {
        self.0
    }

    /// The same bits read as a signed 32-bit integer, the form earlier
    /// launcher versions exposed.
    pub fn legacy_value(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shorthand for [`RecordKey::derive`].
pub fn derive_key(identifier: &str) -> RecordKey {
    RecordKey::derive(identifier)
}
