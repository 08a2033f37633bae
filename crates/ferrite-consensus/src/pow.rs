//! Proof-of-work target checks.
//!
//! The algorithm-independent half of verification: unpack the header's
//! compact target, reject malformed or out-of-limit encodings, and
//! compare the 256-bit work hash against it. Producing that hash is the
//! job of [`crate::ConsensusServices`], which dispatches on the algorithm
//! schedule.

use crate::compact::{decode_compact, hash_to_biguint};
use crate::error::PowError;
use ferrite_primitives::{CompactTarget, Hash256};

/// Source of historical block hashes, used to derive FerroHash keys.
///
/// Implemented by the caller's chain view. `block_hash_at` returns `None`
/// for heights the view does not have, which verification surfaces as
/// [`PowError::MissingKeyBlock`].
pub trait KeyBlockSource {
    /// The hash of the block at `height` on the active chain.
    fn block_hash_at(&self, height: i32) -> Option<Hash256>;
}

/// Check a work hash against a header's packed target.
///
/// Fails with [`PowError::BadTarget`] when the encoding is zero,
/// negative, overflowing, or names a target above `limit`; fails with
/// [`PowError::HighHash`] when the hash does not meet the target.
pub fn check_header_target(
    hash: &Hash256,
    bits: CompactTarget,
    limit: &Hash256,
) -> Result<(), PowError> {
    let decoded = decode_compact(bits);
    if !decoded.is_valid() || decoded.target > hash_to_biguint(limit) {
        return Err(PowError::BadTarget);
    }
    if hash_to_biguint(hash) > decoded.target {
        return Err(PowError::HighHash);
    }
    Ok(())
}
