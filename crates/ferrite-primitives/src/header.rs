//! Block header wire format.
//!
//! The header is a fixed 80-byte little-endian record. Every byte of the
//! encoding is an input to proof-of-work hashing, so serialization must be
//! bit-exact and deterministic.

use crate::hash::{sha256d, Hash256};
use std::fmt;
use thiserror::Error;

/// The packed 32-bit difficulty target carried in a block header
/// ("nBits"). Interpretation lives in the consensus crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompactTarget(u32);

impl CompactTarget {
    /// Wrap a raw consensus-encoded value.
    pub const fn from_consensus(bits: u32) -> Self {
        CompactTarget(bits)
    }

    /// The raw consensus-encoded value.
    pub const fn to_consensus(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Error decoding a block header from bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderDecodeError {
    /// The input is not exactly [`BlockHeader::SIZE`] bytes.
    #[error("block header has {0} bytes, expected {expected}", expected = BlockHeader::SIZE)]
    BadLength(usize),
}

/// An 80-byte block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block format version.
    pub version: u32,
    /// Hash of the previous block.
    pub prev_hash: Hash256,
    /// Merkle root over the block's transactions.
    pub merkle_root: Hash256,
    /// Block timestamp (seconds since the epoch).
    pub time: u32,
    /// Packed difficulty target.
    pub bits: CompactTarget,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl BlockHeader {
    /// Serialized size in bytes.
    pub const SIZE: usize = 80;

    /// Serialize to the 80-byte wire format:
    /// `version ‖ prev_hash ‖ merkle_root ‖ time ‖ bits ‖ nonce`,
    /// all fields little-endian.
    pub fn serialize(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(self.prev_hash.as_bytes());
        out[36..68].copy_from_slice(self.merkle_root.as_bytes());
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_consensus().to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Decode from the 80-byte wire format.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, HeaderDecodeError> {
        if bytes.len() != Self::SIZE {
            return Err(HeaderDecodeError::BadLength(bytes.len()));
        }
        let le_u32 = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[range]);
            u32::from_le_bytes(buf)
        };
        let hash = |range: std::ops::Range<usize>| {
            let mut buf = [0u8; 32];
            buf.copy_from_slice(&bytes[range]);
            Hash256::from_bytes(buf)
        };
        Ok(BlockHeader {
            version: le_u32(0..4),
            prev_hash: hash(4..36),
            merkle_root: hash(36..68),
            time: le_u32(68..72),
            bits: CompactTarget::from_consensus(le_u32(72..76)),
            nonce: le_u32(76..80),
        })
    }

    /// The block hash: double-SHA-256 over the serialized header.
    pub fn hash(&self) -> Hash256 {
        sha256d(&self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 0x12345678,
            prev_hash: Hash256::ZERO,
            merkle_root: Hash256::ZERO,
            time: 0xAABBCCDD,
            bits: CompactTarget::from_consensus(0x1E00FFFF),
            nonce: 0x11223344,
        }
    }

    #[test]
    fn test_serialization_layout() {
        let bytes = sample_header().serialize();
        assert_eq!(bytes.len(), 80);
        // Little-endian version in the first four bytes.
        assert_eq!(&bytes[0..4], &[0x78, 0x56, 0x34, 0x12]);
        // Little-endian nonce in the last four.
        assert_eq!(&bytes[76..80], &[0x44, 0x33, 0x22, 0x11]);
        // Timestamp and bits sit between the merkle root and the nonce.
        assert_eq!(&bytes[68..72], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&bytes[72..76], &[0xFF, 0xFF, 0x00, 0x1E]);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let header = BlockHeader {
            version: 2,
            prev_hash: Hash256::from_hex(
                "00000000000000000001a2b3c4d5e6f7a8b9cadbecfd0e1f2a3b4c5d6e7f8091",
            )
            .unwrap(),
            merkle_root: Hash256::ONE,
            time: 1_700_000_000,
            bits: CompactTarget::from_consensus(0x1D00FFFF),
            nonce: 42,
        };
        let decoded = BlockHeader::deserialize(&header.serialize()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_deserialize_rejects_wrong_length() {
        assert_eq!(
            BlockHeader::deserialize(&[0u8; 79]),
            Err(HeaderDecodeError::BadLength(79))
        );
        assert_eq!(
            BlockHeader::deserialize(&[0u8; 81]),
            Err(HeaderDecodeError::BadLength(81))
        );
    }

    #[test]
    fn test_hash_is_deterministic_and_byte_sensitive() {
        let header = sample_header();
        assert_eq!(header.hash(), header.hash());

        let mut tweaked = header;
        tweaked.nonce += 1;
        assert_ne!(header.hash(), tweaked.hash());

        let mut tweaked = header;
        tweaked.time ^= 1;
        assert_ne!(header.hash(), tweaked.hash());
    }
}
