//! Opaque 32-byte identifier using Blake3.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role alias: identifies a transaction.
pub type TxId = Id;

/// Role alias: identifies a transition.
pub type TransitionId = Id;

/// Role alias: identifies an input consumed by a transition.
pub type InputId = Id;

/// A 32-byte opaque identifier.
///
/// Total-ordered by byte comparison and safe to use as a map key. Ids built
/// with [`Id::from_bytes`] are Blake3 digests and therefore deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id([u8; 32]);

impl Id {
    /// Size of an id in bytes.
    pub const BYTES: usize = 32;

    /// Zero id (all bytes are 0x00).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create an id by hashing arbitrary bytes with Blake3.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let hash = blake3::hash(bytes);
        Self(*hash.as_bytes())
    }

    /// Create an id from raw id bytes (without hashing).
    pub const fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse an id from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        if hex.len() != 64 {
            return Err(HexError::InvalidLength {
                expected: 64,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Convert the id to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as a slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Id({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic() {
        let data = b"transfer:alice->bob";
        let id1 = Id::from_bytes(data);
        let id2 = Id::from_bytes(data);
        assert_eq!(id1, id2);
    }

    #[test]
    fn test_distinct_inputs_distinct_ids() {
        let id1 = Id::from_bytes(b"alpha");
        let id2 = Id::from_bytes(b"beta");
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = Id::from_bytes(b"roundtrip");
        let hex = original.to_hex();
        assert_eq!(hex.len(), 64);

        let parsed = Id::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert_eq!(
            Id::from_hex("abcd"),
            Err(HexError::InvalidLength {
                expected: 64,
                actual: 4
            })
        );
        assert_eq!(Id::from_hex(&"zz".repeat(32)), Err(HexError::InvalidHex));
    }

    #[test]
    fn test_ordered_by_bytes() {
        let low = Id::from_raw([0u8; 32]);
        let high = Id::from_raw([0xFFu8; 32]);
        assert!(low < high);
        assert_eq!(low, Id::ZERO);
    }

    #[test]
    fn test_random_raw_ids() {
        let id1 = Id::from_raw(rand::random());
        let id2 = Id::from_raw(rand::random());
        assert_ne!(id1, id2);
    }
}
