//! Address identifiers used as per-entry keys within a namespace

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{KeychainError, Result};

/// Prefix reserved for bookkeeping accounts inside a namespace
pub(crate) const RESERVED_PREFIX: &str = "__";

/// Opaque address identifier.
///
/// Hex addresses (`0x...`) are case-insensitive and stored lowercase, so
/// `0xABC` and `0xabc` resolve to the same keychain entry. Anything else is
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    /// Parse and normalize an address string
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(KeychainError::InvalidAddress("address is empty".to_string()));
        }
        if trimmed.starts_with(RESERVED_PREFIX) {
            return Err(KeychainError::InvalidAddress(format!(
                "'{}' uses the reserved '{}' prefix",
                trimmed, RESERVED_PREFIX
            )));
        }
        if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(KeychainError::InvalidAddress(format!(
                "'{}' contains whitespace or control characters",
                trimmed.escape_debug()
            )));
        }

        Ok(Self(normalize(trimmed)))
    }

    /// Build a `0x`-prefixed address from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Decode the hex body of a `0x` address, if it has one
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        hex_body(&self.0).and_then(|body| hex::decode(body).ok())
    }

    /// The normalized string form, used as the keychain account name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_body(s: &str) -> Option<&str> {
    let body = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(body)
    } else {
        None
    }
}

fn normalize(s: &str) -> String {
    match hex_body(s) {
        Some(body) => format!("0x{}", body.to_ascii_lowercase()),
        None => s.to_string(),
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = KeychainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}
