//! Argon2id emergency fallback hasher.
//!
//! This is the dormant fallback proof-of-work for Ferrite, activated by
//! hard fork only if FerroHash is compromised. Argon2id won the Password
//! Hashing Competition, is memory-hard, side-channel resistant, and far
//! simpler than a full virtual-machine PoW, which keeps the emergency
//! code path small.
//!
//! The parameters are consensus-critical: memory cost, time cost,
//! parallelism, and the 32-byte output length all feed the digest.
//! Evaluation is serialized by an internal mutex; the fallback posture
//! assumes a single hasher, not a pool.

use argon2::{Algorithm, Argon2, Params, Version};
use ferrite_primitives::{BlockHeader, Hash256};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

/// Output length: 256-bit hashes for PoW comparison.
const HASH_LENGTH: usize = 32;

/// Input size cap. Block headers are 80 bytes; anything near this limit
/// is abuse, not consensus data.
pub const ARGON2_MAX_INPUT_SIZE: usize = 4 * 1024 * 1024;

/// Errors from the Argon2 fallback hasher.
#[derive(Error, Debug)]
pub enum Argon2Error {
    /// Construction rejected a parameter. Configuration problem, not a
    /// consensus condition.
    #[error("invalid argon2 parameter {parameter}: {reason}")]
    InvalidParams {
        parameter: &'static str,
        reason: String,
    },
    /// The input exceeds [`ARGON2_MAX_INPUT_SIZE`].
    #[error("argon2 input of {size} bytes exceeds the {max} byte cap")]
    InputTooLarge { size: usize, max: usize },
    /// The underlying implementation failed. Callers may retry.
    #[error("argon2 hashing failed: {0}")]
    Hash(argon2::Error),
}

/// Thread-safe Argon2id hasher with consensus-tuned parameters.
pub struct Argon2Context {
    hasher: Argon2<'static>,
    lock: Mutex<()>,
    memory_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Argon2Context {
    /// Construct a hasher, validating the consensus parameters.
    pub fn new(memory_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self, Argon2Error> {
        if memory_kib < 8 {
            return Err(Argon2Error::InvalidParams {
                parameter: "memory_kib",
                reason: format!("{memory_kib} is below the minimum of 8 KiB"),
            });
        }
        if time_cost < 1 {
            return Err(Argon2Error::InvalidParams {
                parameter: "time_cost",
                reason: "must be at least 1".to_string(),
            });
        }
        if parallelism < 1 {
            return Err(Argon2Error::InvalidParams {
                parameter: "parallelism",
                reason: "must be at least 1".to_string(),
            });
        }

        let params = Params::new(memory_kib, time_cost, parallelism, Some(HASH_LENGTH))
            .map_err(|e| Argon2Error::InvalidParams {
                parameter: "params",
                reason: e.to_string(),
            })?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        info!(
            memory_kib,
            time_cost, parallelism, "initialized argon2id fallback hasher"
        );

        Ok(Argon2Context {
            hasher,
            lock: Mutex::new(()),
            memory_kib,
            time_cost,
            parallelism,
        })
    }

    /// Hash `data` under `salt`.
    ///
    /// The salt must be unique per block so work cannot be precomputed;
    /// [`Self::hash_block`] uses the previous block hash for exactly that
    /// reason.
    pub fn hash(&self, data: &[u8], salt: &Hash256) -> Result<Hash256, Argon2Error> {
        if data.len() > ARGON2_MAX_INPUT_SIZE {
            return Err(Argon2Error::InputTooLarge {
                size: data.len(),
                max: ARGON2_MAX_INPUT_SIZE,
            });
        }

        let _serialized = self.lock.lock();
        let mut output = [0u8; HASH_LENGTH];
        self.hasher
            .hash_password_into(data, salt.as_bytes(), &mut output)
            .map_err(Argon2Error::Hash)?;
        Ok(Hash256::from_bytes(output))
    }

    /// PoW hash of a block header, salted with its previous block hash.
    pub fn hash_block(&self, header: &BlockHeader) -> Result<Hash256, Argon2Error> {
        self.hash(&header.serialize(), &header.prev_hash)
    }

    /// Memory cost in KiB.
    pub fn memory_kib(&self) -> u32 {
        self.memory_kib
    }

    /// Iteration count.
    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    /// Parallelism factor.
    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }
}
