//! Target type for mining difficulty

use crate::core::hash::{Hash32, HASH_SIZE};
use crate::error::{Error, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point scale used when dividing the maximum target by a fractional
/// difficulty value
const DIFFICULTY_SCALE: u64 = 1_000_000_000;

/// A 256-bit mining target (difficulty threshold), big-endian numeric.
///
/// A block hash satisfies the target iff `hash <= target` as unsigned
/// 256-bit integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target(pub [u8; HASH_SIZE]);

impl Target {
    /// Highest possible target (lowest possible difficulty): 2^256 - 1
    pub const MAX: Target = Target([0xFF; HASH_SIZE]);

    /// Create a new Target from bytes (big-endian)
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a Target from a hex string
    pub fn from_hex(hex: &str) -> Result<Self> {
        let bytes = hex::decode(hex)
            .map_err(|e| Error::validation(format!("invalid target hex: {}", e)))?;
        if bytes.len() != HASH_SIZE {
            return Err(Error::validation(format!(
                "expected {} target bytes, got {}",
                HASH_SIZE,
                bytes.len()
            )));
        }
        let mut array = [0u8; HASH_SIZE];
        array.copy_from_slice(&bytes);
        Ok(Self(array))
    }

    /// Get the target as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check whether a hash meets this target (`hash <= target`,
    /// big-endian unsigned comparison)
    pub fn meets(&self, hash: &Hash32) -> bool {
        hash.as_bytes() <= &self.0
    }

    /// Derive a target from a difficulty value.
    ///
    /// `target = floor(MAX / difficulty)`, capped at `MAX`. Difficulty must
    /// be at least 1; fractional difficulties are honored to nanosecond-scale
    /// fixed-point precision.
    pub fn from_difficulty(difficulty: f64) -> Result<Self> {
        if !difficulty.is_finite() || difficulty < 1.0 {
            return Err(Error::validation(format!(
                "minimum difficulty is 1, cannot set target from {}",
                difficulty
            )));
        }

        let max = BigUint::from_bytes_be(&Self::MAX.0);
        let numerator = &max * BigUint::from(DIFFICULTY_SCALE);
        let denominator = BigUint::from((difficulty * DIFFICULTY_SCALE as f64).round() as u128);
        let quotient = numerator / denominator;

        if quotient >= max {
            return Ok(Self::MAX);
        }

        let raw = quotient.to_bytes_be();
        let mut bytes = [0u8; HASH_SIZE];
        bytes[HASH_SIZE - raw.len()..].copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}
