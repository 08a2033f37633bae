//! Shared consensus services.
//!
//! [`ConsensusServices`] is the handle validation, mining, and RPC code
//! thread through proof-of-work checks. It owns the FerroHash context
//! pool and the lazily-built Argon2 fallback context, so their lifecycle
//! is explicit: construct the services once at startup, share a
//! reference, and everything is dropped after the last user.

use crate::chain_params::{ConsensusParams, PowAlgorithm};
use crate::coins::CoinsView;
use crate::error::{PowError, TxValidationError};
use crate::pow::{check_header_target, KeyBlockSource};
use crate::tx_check;
use ferrite_crypto::{
    AcquisitionPriority, Argon2Context, FerrohashContextPool, PoolConfigError, PoolStats,
};
use ferrite_primitives::{Amount, BlockHeader, Hash256, Transaction};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

/// Consensus services: parameters plus the hashers they configure.
pub struct ConsensusServices {
    params: ConsensusParams,
    pool: FerrohashContextPool,
    /// Built on first use; the emergency stays dormant on healthy chains.
    argon2: OnceCell<Argon2Context>,
}

impl ConsensusServices {
    /// Services with the default pool size.
    pub fn new(params: ConsensusParams) -> Self {
        ConsensusServices {
            params,
            pool: FerrohashContextPool::new(),
            argon2: OnceCell::new(),
        }
    }

    /// Services with a custom FerroHash pool cap. The cap is fixed once
    /// the first acquisition happens.
    pub fn with_max_contexts(
        params: ConsensusParams,
        max_contexts: usize,
    ) -> Result<Self, PoolConfigError> {
        let services = Self::new(params);
        services.pool.set_max_contexts(max_contexts)?;
        Ok(services)
    }

    /// The consensus parameters these services were built with.
    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// The proof-of-work algorithm for `height`.
    pub fn pow_algorithm(&self, height: i32) -> PowAlgorithm {
        self.params.pow_algorithm(height)
    }

    /// Snapshot of the FerroHash pool counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Compute the proof-of-work hash of `header` at `height`.
    ///
    /// Dispatches on the algorithm schedule. FerroHash callers supply the
    /// chain view used to look up the key block; mining should pass
    /// [`AcquisitionPriority::High`] so it cannot starve validation.
    pub fn pow_hash(
        &self,
        header: &BlockHeader,
        height: i32,
        keys: &dyn KeyBlockSource,
        priority: AcquisitionPriority,
    ) -> Result<Hash256, PowError> {
        match self.params.pow_algorithm(height) {
            PowAlgorithm::Sha256d => Ok(header.hash()),
            PowAlgorithm::Ferrohash => {
                let key_height = self.params.ferrohash_key_height(height);
                let key = keys
                    .block_hash_at(key_height)
                    .ok_or(PowError::MissingKeyBlock { height: key_height })?;
                let guard = self
                    .pool
                    .acquire(&key, priority)
                    .ok_or(PowError::PoolTimeout { priority })?;
                Ok(guard.hash(&header.serialize()))
            }
            PowAlgorithm::Argon2id => Ok(self.argon2()?.hash_block(header)?),
        }
    }

    /// Verify `header`'s proof of work for `height`.
    ///
    /// Acquires FerroHash contexts at consensus-critical priority: a
    /// validation caller never observes a pool timeout.
    pub fn verify_pow(
        &self,
        header: &BlockHeader,
        height: i32,
        keys: &dyn KeyBlockSource,
    ) -> Result<(), PowError> {
        let hash = self.pow_hash(header, height, keys, AcquisitionPriority::ConsensusCritical)?;
        check_header_target(&hash, header.bits, self.params.active_pow_limit(height))
    }

    /// Boolean form of [`Self::verify_pow`], logging the failure.
    pub fn check_pow(&self, header: &BlockHeader, height: i32, keys: &dyn KeyBlockSource) -> bool {
        match self.verify_pow(header, height, keys) {
            Ok(()) => true,
            Err(error) => {
                debug!(
                    height,
                    algorithm = %self.params.pow_algorithm(height),
                    reject_reason = error.reject_reason().unwrap_or("internal"),
                    %error,
                    "proof of work rejected"
                );
                false
            }
        }
    }

    /// Validate `tx`'s inputs against `view` at `spend_height`; returns
    /// the fee.
    pub fn check_tx_inputs(
        &self,
        tx: &Transaction,
        view: &dyn CoinsView,
        spend_height: i32,
    ) -> Result<Amount, TxValidationError> {
        tx_check::check_tx_inputs(tx, view, spend_height)
    }

    fn argon2(&self) -> Result<&Argon2Context, PowError> {
        let context = self.argon2.get_or_try_init(|| {
            warn!(
                memory_kib = self.params.argon2_memory_kib,
                time_cost = self.params.argon2_time_cost,
                parallelism = self.params.argon2_parallelism,
                "emergency fallback hasher active"
            );
            Argon2Context::new(
                self.params.argon2_memory_kib,
                self.params.argon2_time_cost,
                self.params.argon2_parallelism,
            )
        })?;
        Ok(context)
    }
}
