//! Commitment material: the published vote hash and the secret salt behind it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::TypeError;

/// A 32-byte SHA-256 vote commitment.
///
/// Serialized as 64 lowercase hex characters, the form stored in the commit
/// file and submitted to the ledger as `bytes32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoteHash([u8; 32]);

impl VoteHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for VoteHash {
    type Err = TypeError;

    /// Parse 64 hex characters, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 64 {
            return Err(TypeError::InvalidHash(format!(
                "expected 64 hex characters, got {}",
                digits.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| TypeError::InvalidHash(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for VoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VoteHash({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for VoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for VoteHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VoteHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A 32-byte ledger transaction hash, displayed `0x`-prefixed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| TypeError::InvalidHash(format!("transaction hash {s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash(0x{})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The random salt that blinds a vote commitment.
///
/// Held as hex text, exactly as stored, because the commitment is computed
/// over the text form. The salt is secret until the reveal phase, so `Debug` redacts it and
/// there is no `Display` impl; use [`Salt::expose`] where the raw
/// value is required.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Salt(String);

impl Salt {
    /// Minimum salt entropy in bytes.
    pub const MIN_BYTES: usize = 16;

    /// Build a salt from raw random bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() < Self::MIN_BYTES {
            return Err(TypeError::InvalidSalt(format!(
                "need at least {} bytes, got {}",
                Self::MIN_BYTES,
                bytes.len()
            )));
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Parse a hex salt as stored in the secrets file.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() < Self::MIN_BYTES * 2 {
            return Err(TypeError::InvalidSalt(format!(
                "need at least {} hex characters, got {}",
                Self::MIN_BYTES * 2,
                s.len()
            )));
        }
        if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidSalt("not a hex string".into()));
        }
        Ok(Self(s.to_string()))
    }

    /// The hex text of the salt.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_hash_parses_with_and_without_prefix() {
        let hex = "ab".repeat(32);
        let a: VoteHash = hex.parse().unwrap();
        let b: VoteHash = format!("0x{hex}").parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), hex);
    }

    #[test]
    fn vote_hash_rejects_wrong_length() {
        assert!("abcd".parse::<VoteHash>().is_err());
        assert!("zz".repeat(32).parse::<VoteHash>().is_err());
    }

    #[test]
    fn vote_hash_serializes_as_hex_string() {
        let hash = VoteHash::new([0x11; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "11".repeat(32)));
    }

    #[test]
    fn tx_hash_displays_with_prefix() {
        let tx = TxHash::new([0xab; 32]);
        let text = tx.to_string();
        assert!(text.starts_with("0xabab"));
        assert_eq!(text.parse::<TxHash>().unwrap(), tx);
    }

    #[test]
    fn salt_requires_sixteen_bytes() {
        assert!(Salt::from_bytes(&[7u8; 15]).is_err());
        let salt = Salt::from_bytes(&[7u8; 16]).unwrap();
        assert_eq!(salt.expose().len(), 32);
    }

    #[test]
    fn salt_debug_is_redacted() {
        let salt = Salt::from_hex(&"ab".repeat(16)).unwrap();
        assert!(!format!("{salt:?}").contains("abab"));
    }

    #[test]
    fn salt_text_is_kept_verbatim() {
        let stored = format!("AB{}", "cd".repeat(15));
        let salt = Salt::from_hex(&stored).unwrap();
        assert_eq!(salt.expose(), stored);
        assert_ne!(salt, Salt::from_hex(&stored.to_ascii_lowercase()).unwrap());
    }

    #[test]
    fn salt_rejects_non_hex() {
        assert!(Salt::from_hex(&"zz".repeat(16)).is_err());
        assert!(Salt::from_hex(&"a".repeat(33)).is_err());
    }
}
