//! 256-bit hash value type

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a digest in bytes (SHA-256)
pub const HASH_SIZE: usize = 32;

/// A 256-bit digest, compared as a big-endian unsigned integer.
///
/// Lexicographic ordering over the bytes is exactly numeric ordering for
/// equal-length big-endian values, so the derived `Ord` is the 256-bit
/// comparison the target check needs.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash32(pub [u8; HASH_SIZE]);

impl Hash32 {
    /// The all-zero digest, used for the genesis prev-hash
    pub const ZERO: Hash32 = Hash32([0u8; HASH_SIZE]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from a hex string
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex)
            .map_err(|e| Error::validation(format!("invalid hash hex: {}", e)))?;
        if bytes.len() != HASH_SIZE {
            return Err(Error::validation(format!(
                "expected {} hash bytes, got {}",
                HASH_SIZE,
                bytes.len()
            )));
        }
        let mut array = [0u8; HASH_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    /// Get the digest bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Render as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether every byte is zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.to_hex())
    }
}

impl Serialize for Hash32 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
