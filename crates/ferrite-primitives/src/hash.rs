//! Fixed 256-bit hash values.
//!
//! A [`Hash256`] stores its bytes little-endian in memory, so ordering
//! comparisons treat the value as a 256-bit little-endian integer (the
//! convention PoW target comparisons require). The string form is the
//! conventional big-endian hex, which is why displayed block hashes show
//! their leading zeros first.

use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Error parsing a hash from its big-endian hex string form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashParseError {
    /// The string is not exactly 64 hex characters.
    #[error("hash hex string has length {0}, expected 64")]
    BadLength(usize),
    /// The string contains a non-hex character.
    #[error("hash hex string contains invalid characters")]
    BadHex,
}

/// A 256-bit hash value, little-endian in memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256([u8; 32]);

impl Hash256 {
    /// The all-zero hash. Also the "null" sentinel.
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    /// The hash with integer value one.
    pub const ONE: Hash256 = {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        Hash256(bytes)
    };

    /// Construct from raw little-endian bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash256(bytes)
    }

    /// Raw little-endian bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consume into raw little-endian bytes.
    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Whether this is the all-zero (null) hash.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Parse from the big-endian hex string form.
    pub fn from_hex(s: &str) -> Result<Self, HashParseError> {
        if s.len() != 64 {
            return Err(HashParseError::BadLength(s.len()));
        }
        let mut bytes: [u8; 32] = hex::decode(s)
            .map_err(|_| HashParseError::BadHex)?
            .try_into()
            .map_err(|_| HashParseError::BadHex)?;
        bytes.reverse();
        Ok(Hash256(bytes))
    }
}

impl Ord for Hash256 {
    fn cmp(&self, other: &Self) -> Ordering {
        // Most significant byte lives at the highest index.
        for i in (0..32).rev() {
            match self.0[i].cmp(&other.0[i]) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Hash256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Double-SHA-256 of arbitrary bytes, the pre-fork PoW hash and the
/// block/transaction identifier hash.
pub fn sha256d(data: &[u8]) -> Hash256 {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    Hash256(second.into())
}
