//! Compact target ("nBits") encoding.
//!
//! The 256-bit difficulty target travels in block headers as a packed
//! 32-bit value: one exponent byte and a 23-bit mantissa, with bit
//! 0x00800000 acting as a sign flag inherited from the original
//! arbitrary-precision encoding. Consensus code must preserve that
//! quirk: a "negative" or overflowing encoding is a malformed header,
//! not a representable target.

use ferrite_primitives::{CompactTarget, Hash256};
use num_bigint::BigUint;
use num_traits::Zero;

/// A compact target unpacked into arithmetic form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTarget {
    /// The 256-bit target value.
    pub target: BigUint,
    /// The encoding carried the sign bit with a nonzero mantissa.
    pub negative: bool,
    /// The encoding denotes a value above 2^256 - 1.
    pub overflow: bool,
}

impl DecodedTarget {
    /// A target usable for PoW comparison: positive, nonzero, in range.
    pub fn is_valid(&self) -> bool {
        !self.negative && !self.overflow && !self.target.is_zero()
    }
}

/// Unpack a compact target.
pub fn decode_compact(bits: CompactTarget) -> DecodedTarget {
    let bits = bits.to_consensus();
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x007f_ffff;

    let target = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3))
    };

    DecodedTarget {
        target,
        negative: mantissa != 0 && (bits & 0x0080_0000) != 0,
        overflow: mantissa != 0
            && (exponent > 34
                || (mantissa > 0xff && exponent > 33)
                || (mantissa > 0xffff && exponent > 32)),
    }
}

/// Pack a target into compact form. Inverse of [`decode_compact`] up to
/// the mantissa's 23-bit precision.
pub fn encode_compact(target: &BigUint) -> CompactTarget {
    if target.is_zero() {
        return CompactTarget::from_consensus(0);
    }

    let mut size = ((target.bits() + 7) / 8) as usize;
    let mut compact: u32 = if size <= 3 {
        low_u32(target) << (8 * (3 - size))
    } else {
        low_u32(&(target >> (8 * (size - 3))))
    };

    // Keep the sign bit clear by shifting the mantissa down a byte.
    if compact & 0x0080_0000 != 0 {
        compact >>= 8;
        size += 1;
    }

    CompactTarget::from_consensus(compact | ((size as u32) << 24))
}

/// The 256-bit integer value of a hash (little-endian bytes).
pub fn hash_to_biguint(hash: &Hash256) -> BigUint {
    BigUint::from_bytes_le(hash.as_bytes())
}

fn low_u32(value: &BigUint) -> u32 {
    value.iter_u32_digits().next().unwrap_or(0)
}
