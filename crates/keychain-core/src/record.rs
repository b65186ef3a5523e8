//! The opaque blob kept in the secure store for each address

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::address::Address;
use crate::crypto::SecretString;
use crate::error::{KeychainError, Result};

/// Nickname reported when an entry has none
pub const DEFAULT_NICKNAME: &str = "XClaim";

/// Build the display label stored with a record: `"<nickname> (<address>)"`
pub fn format_label(nickname: &str, address: &Address) -> String {
    format!("{} ({})", nickname.trim(), address)
}

/// Extract the nickname from a keychain label.
///
/// A trailing `" (<address>)"` suffix is stripped. Labels written by other
/// tools without the suffix are returned as-is (trimmed). Blank results are
/// `None`.
pub fn parse_nickname(label: &str) -> Option<String> {
    let label = label.trim_end();

    let nickname = label
        .strip_suffix(')')
        .and_then(|inner| inner.rsplit_once(" ("))
        .map(|(head, _)| head)
        .unwrap_or(label)
        .trim();

    if nickname.is_empty() {
        None
    } else {
        Some(nickname.to_string())
    }
}

/// Serialized record: label + secret value
#[derive(Serialize, Deserialize)]
pub(crate) struct KeychainRecord {
    pub label: String,
    value: String,
    pub updated_at: DateTime<Utc>,
}

impl KeychainRecord {
    pub fn new(address: &Address, nickname: &str, value: &str) -> Result<Self> {
        if nickname.trim().is_empty() {
            return Err(KeychainError::InvalidNickname(
                "nickname must not be blank".to_string(),
            ));
        }

        Ok(Self {
            label: format_label(nickname, address),
            value: value.to_string(),
            updated_at: Utc::now(),
        })
    }

    pub fn nickname(&self) -> Option<String> {
        parse_nickname(&self.label)
    }

    pub fn relabel(&mut self, address: &Address, nickname: &str) -> Result<()> {
        if nickname.trim().is_empty() {
            return Err(KeychainError::InvalidNickname(
                "nickname must not be blank".to_string(),
            ));
        }
        self.label = format_label(nickname, address);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn into_secret(mut self) -> SecretString {
        SecretString::new(std::mem::take(&mut self.value))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(address: &Address, data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| KeychainError::CorruptRecord(format!("{}: {}", address, e)))
    }
}

impl Drop for KeychainRecord {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

impl std::fmt::Debug for KeychainRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainRecord")
            .field("label", &self.label)
            .field("value", &"[REDACTED]")
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Listing view of a stored entry (no secret)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeychainEntry {
    pub address: Address,
    pub nickname: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    #[test]
    fn test_label_format() {
        assert_eq!(format_label("Savings", &addr("0xABC")), "Savings (0xabc)");
        assert_eq!(format_label("  Savings ", &addr("0xABC")), "Savings (0xabc)");
    }

    #[test]
    fn test_parse_nickname_strips_address_suffix() {
        assert_eq!(parse_nickname("Savings (0xabc)"), Some("Savings".to_string()));
        assert_eq!(
            parse_nickname("Cold (backup) (0xabc)"),
            Some("Cold (backup)".to_string())
        );
    }

    #[test]
    fn test_parse_nickname_plain_label() {
        assert_eq!(parse_nickname("Checking"), Some("Checking".to_string()));
        assert_eq!(parse_nickname("  Checking  "), Some("Checking".to_string()));
    }

    #[test]
    fn test_parse_nickname_blank() {
        assert_eq!(parse_nickname(""), None);
        assert_eq!(parse_nickname("   "), None);
        assert_eq!(parse_nickname(" (0xabc)"), None);
    }

    #[test]
    fn test_record_rejects_blank_nickname() {
        let err = KeychainRecord::new(&addr("0xabc"), "  ", "v").unwrap_err();
        assert!(matches!(err, KeychainError::InvalidNickname(_)));
    }

    #[test]
    fn test_record_bytes() {
        let a = addr("0xABC");
        let record = KeychainRecord::new(&a, "Savings", "secret123").unwrap();
        let bytes = record.to_bytes().unwrap();

        let back = KeychainRecord::from_bytes(&a, &bytes).unwrap();
        assert_eq!(back.nickname(), Some("Savings".to_string()));
        assert_eq!(back.into_secret().expose(), "secret123");
    }

    #[test]
    fn test_corrupt_record() {
        let err = KeychainRecord::from_bytes(&addr("0xabc"), b"not json").unwrap_err();
        assert!(matches!(err, KeychainError::CorruptRecord(_)));
        assert!(err.to_string().contains("0xabc"));
    }

    #[test]
    fn test_debug_redacts_value() {
        let record = KeychainRecord::new(&addr("0xabc"), "Savings", "secret123").unwrap();
        let debug = format!("{:?}", record);
        assert!(debug.contains("Savings"));
        assert!(!debug.contains("secret123"));
    }
}
