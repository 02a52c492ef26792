//! Caller and owner identities.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length of an identity in bytes.
pub const IDENTITY_LEN: usize = 20;

/// An externally authenticated principal, addressed like an account.
///
/// Identities are 20-byte addresses rendered as `0x`-prefixed lowercase hex.
/// The all-zero address is the null identity: it never holds a role and
/// can never act as a parcel's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Identity([u8; IDENTITY_LEN]);

/// Error returned when parsing an identity from text fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentityError {
    #[error("identity must be {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("identity is not valid hex: {0}")]
    InvalidHex(String),
}

impl Identity {
    /// The null identity (all zero bytes).
    pub const NULL: Identity = Identity([0u8; IDENTITY_LEN]);

    /// Creates an identity from raw address bytes.
    pub fn from_bytes(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTITY_LEN] {
        &self.0
    }

    /// Returns true for the null identity.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; IDENTITY_LEN]
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Identity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.len() != IDENTITY_LEN * 2 {
            return Err(ParseIdentityError::InvalidLength {
                expected: IDENTITY_LEN * 2,
                actual: digits.len(),
            });
        }

        let mut bytes = [0u8; IDENTITY_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| ParseIdentityError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; IDENTITY_LEN]> for Identity {
    fn from(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
