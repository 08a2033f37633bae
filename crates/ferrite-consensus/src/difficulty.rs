//! Difficulty retargeting.
//!
//! Every `difficulty_adjustment_interval()` blocks the target is rescaled
//! by the ratio of the observed interval duration to `target_timespan`,
//! with the observed duration clamped to a factor of four in either
//! direction. The clamp is a hard consensus invariant: without it a
//! timestamp-manipulating miner could crater difficulty in one step.
//!
//! The retarget ceiling is the *active* limit for the upcoming height, so
//! a fork that switches algorithms also switches which limit caps the
//! result.

use crate::chain_params::ConsensusParams;
use crate::compact::{decode_compact, encode_compact, hash_to_biguint};
use ferrite_primitives::CompactTarget;
use num_bigint::BigUint;
use tracing::debug;

/// Header data needed for difficulty calculation.
#[derive(Debug, Clone, Copy)]
pub struct RetargetHeader {
    /// Block height.
    pub height: i32,
    /// Block timestamp.
    pub time: u32,
    /// Packed difficulty target the block committed to.
    pub bits: CompactTarget,
}

/// Compute the required target for the block following `last`.
///
/// `new_block_time` is the candidate block's timestamp, consulted only by
/// the test-network minimum-difficulty rule. `first_block_time` is the
/// timestamp of the block opening the current retarget interval,
/// consulted only at interval boundaries.
pub fn next_work_required(
    last: &RetargetHeader,
    new_block_time: u32,
    first_block_time: u32,
    params: &ConsensusParams,
) -> CompactTarget {
    let pow_limit = hash_to_biguint(params.active_pow_limit(last.height + 1));

    if params.no_retargeting {
        return last.bits;
    }

    let interval = params.difficulty_adjustment_interval();
    if i64::from(last.height + 1) % interval != 0 {
        if params.allow_min_difficulty_blocks {
            // Test networks: a block arriving more than two spacings
            // after its parent may use the minimum difficulty.
            let gap_limit = i64::from(last.time) + 2 * params.target_spacing;
            if i64::from(new_block_time) > gap_limit {
                return encode_compact(&pow_limit);
            }
        }
        return last.bits;
    }

    calculate_next_work(last, first_block_time, params)
}

/// The retarget computation at an interval boundary.
pub fn calculate_next_work(
    last: &RetargetHeader,
    first_block_time: u32,
    params: &ConsensusParams,
) -> CompactTarget {
    let pow_limit = hash_to_biguint(params.active_pow_limit(last.height + 1));

    // Clamp the observed timespan to a factor of four per step.
    let mut actual_timespan = i64::from(last.time) - i64::from(first_block_time);
    actual_timespan = actual_timespan.clamp(params.target_timespan / 4, params.target_timespan * 4);

    let decoded = decode_compact(last.bits);
    let old_target = if decoded.is_valid() && decoded.target <= pow_limit {
        decoded.target
    } else {
        // A malformed or out-of-range previous target degrades to the
        // limit instead of propagating garbage.
        pow_limit.clone()
    };

    let mut new_target = &old_target * BigUint::from(actual_timespan as u64)
        / BigUint::from(params.target_timespan as u64);
    if new_target > pow_limit {
        new_target = pow_limit;
    }

    let bits = encode_compact(&new_target);
    debug!(
        height = last.height + 1,
        actual_timespan,
        target_timespan = params.target_timespan,
        new_bits = %bits,
        "retargeted difficulty"
    );
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn retarget_params() -> ConsensusParams {
        // Mainnet schedule but with limits permissive enough that the
        // upper clamp only triggers when a test wants it to.
        ConsensusParams::mainnet()
    }

    fn last_at_boundary(params: &ConsensusParams, bits: u32, time: u32) -> RetargetHeader {
        let interval = params.difficulty_adjustment_interval() as i32;
        RetargetHeader {
            height: interval - 1,
            time,
            bits: CompactTarget::from_consensus(bits),
        }
    }

    fn target_of(bits: CompactTarget) -> BigUint {
        decode_compact(bits).target
    }

    #[test]
    fn test_no_change_off_boundary() {
        let params = retarget_params();
        let last = RetargetHeader {
            height: 100, // 101 is not a multiple of 2016
            time: 1_000_000,
            bits: CompactTarget::from_consensus(0x1c05a3f4),
        };
        let bits = next_work_required(&last, 1_000_600, 0, &params);
        assert_eq!(bits.to_consensus(), 0x1c05a3f4);
    }

    #[test]
    fn test_no_retargeting_is_identity_even_at_boundary() {
        let mut params = retarget_params();
        params.no_retargeting = true;
        let last = last_at_boundary(&params, 0x1c05a3f4, 2_000_000);
        // Timespan would otherwise quadruple the target.
        let bits = next_work_required(&last, 2_000_600, 0, &params);
        assert_eq!(bits.to_consensus(), 0x1c05a3f4);
    }

    #[test]
    fn test_exact_timespan_keeps_target() {
        let params = retarget_params();
        let first_time = 1_000_000u32;
        let last = last_at_boundary(
            &params,
            0x1c05a3f4,
            first_time + params.target_timespan as u32,
        );
        let bits = calculate_next_work(&last, first_time, &params);
        assert_eq!(bits.to_consensus(), 0x1c05a3f4);
    }

    #[test]
    fn test_fast_blocks_raise_difficulty_with_clamp() {
        let params = retarget_params();
        let first_time = 1_000_000u32;
        // Blocks arrived 8x too fast; the clamp limits the step to 4x.
        let last = last_at_boundary(
            &params,
            0x1c05a3f4,
            first_time + (params.target_timespan / 8) as u32,
        );
        let bits = calculate_next_work(&last, first_time, &params);

        let old = target_of(last.bits);
        let new = target_of(bits);
        assert!(new < old, "target must shrink when blocks are fast");
        assert_eq!(new, &old / 4u32, "clamp must hold the step to 4x");
    }

    #[test]
    fn test_slow_blocks_lower_difficulty_with_clamp() {
        let params = retarget_params();
        let first_time = 1_000_000u32;
        // Blocks arrived 8x too slow; the step is clamped to 4x and then
        // capped by the active limit.
        let last = last_at_boundary(
            &params,
            0x1c05a3f4,
            first_time + (params.target_timespan * 8) as u32,
        );
        let bits = calculate_next_work(&last, first_time, &params);

        let old = target_of(last.bits);
        let new = target_of(bits);
        let limit = hash_to_biguint(params.active_pow_limit(last.height + 1));
        assert!(new > old, "target must grow when blocks are slow");
        assert!(new <= &old * 4u32);
        assert!(new <= limit);
    }

    #[test]
    fn test_new_target_never_exceeds_active_limit() {
        let params = retarget_params();
        let limit_bits = encode_compact(&hash_to_biguint(&params.sha256d_limit));
        let first_time = 1_000_000u32;
        // Already at the limit and blocks were slow: stay at the limit.
        let last = last_at_boundary(
            &params,
            limit_bits.to_consensus(),
            first_time + (params.target_timespan * 4) as u32,
        );
        let bits = calculate_next_work(&last, first_time, &params);
        assert_eq!(bits.to_consensus(), limit_bits.to_consensus());
    }

    #[test]
    fn test_clamp_bounds_hold_across_timespans() {
        let params = retarget_params();
        let first_time = 1_000_000u32;
        let old_bits = 0x1b0404cbu32;
        let old = target_of(CompactTarget::from_consensus(old_bits));

        for factor_num in [1i64, 2, 3, 5, 8, 16, 100] {
            for &invert in &[false, true] {
                let timespan = if invert {
                    params.target_timespan / factor_num
                } else {
                    params.target_timespan * factor_num
                };
                let last = last_at_boundary(&params, old_bits, first_time + timespan as u32);
                let new = target_of(calculate_next_work(&last, first_time, &params));

                // The 23-bit compact mantissa truncates downward, so the
                // lower bound is checked with one part in 2^16 of slack.
                assert!(
                    new.clone() * 4u32 * 65536u32 >= &old * 65535u32,
                    "lower clamp violated"
                );
                assert!(new <= &old * 4u32, "upper clamp violated");
            }
        }
    }

    #[test]
    fn test_min_difficulty_rule_on_test_networks() {
        let mut params = retarget_params();
        params.allow_min_difficulty_blocks = true;
        let last = RetargetHeader {
            height: 100,
            time: 1_000_000,
            bits: CompactTarget::from_consensus(0x1c05a3f4),
        };
        let limit_bits = encode_compact(&hash_to_biguint(params.active_pow_limit(101)));

        // Gap longer than two spacings: minimum difficulty allowed.
        let slow = next_work_required(&last, 1_000_000 + 1201, 0, &params);
        assert_eq!(slow.to_consensus(), limit_bits.to_consensus());

        // Gap of exactly two spacings: normal rule applies.
        let normal = next_work_required(&last, 1_000_000 + 1200, 0, &params);
        assert_eq!(normal.to_consensus(), 0x1c05a3f4);
    }

    #[test]
    fn test_malformed_previous_bits_degrade_to_limit() {
        let params = retarget_params();
        let first_time = 1_000_000u32;
        // Sign bit set: not a usable previous target.
        let last = last_at_boundary(
            &params,
            0x01fedcba,
            first_time + params.target_timespan as u32,
        );
        let bits = calculate_next_work(&last, first_time, &params);
        let limit = hash_to_biguint(params.active_pow_limit(last.height + 1));
        assert!(!target_of(bits).is_zero());
        assert!(target_of(bits) <= limit);
    }

    #[test]
    fn test_retarget_uses_upcoming_heights_limit() {
        // The interval straddling the FerroHash fork must cap against the
        // FerroHash limit, not the SHA256d one.
        let mut params = retarget_params();
        params.ferrohash_fork_height = params.difficulty_adjustment_interval() as i32;
        let ferrohash_limit = hash_to_biguint(&params.ferrohash_limit);
        let limit_bits = encode_compact(&ferrohash_limit);

        // The previous target already sits at the FerroHash limit, which
        // is far above the SHA256d limit; slow blocks must cap against
        // the new algorithm's limit, not reject or shrink it.
        let first_time = 1_000_000u32;
        let last = last_at_boundary(
            &params,
            limit_bits.to_consensus(),
            first_time + (params.target_timespan * 4) as u32,
        );
        assert_eq!(last.height + 1, params.ferrohash_fork_height);
        assert!(ferrohash_limit > hash_to_biguint(&params.sha256d_limit));

        let bits = calculate_next_work(&last, first_time, &params);
        assert_eq!(target_of(bits), ferrohash_limit);
    }
}
