//! Error types for consensus validation.

use ferrite_crypto::{AcquisitionPriority, Argon2Error};
use ferrite_primitives::{Amount, OutPoint};
use thiserror::Error;

/// Broad classification of a transaction validation failure, used by
/// callers to decide between orphan handling, peer penalties, and
/// permanent rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxValidationResult {
    /// An input's prevout is absent from the view. Typically retriable
    /// once the parent arrives.
    MissingInputs,
    /// Coinbase maturity violated. Permanently invalid at this height.
    PrematureSpend,
    /// Arithmetic or range violation. Permanently invalid.
    Consensus,
}

/// Transaction input validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxValidationError {
    /// An input's prevout is missing from the UTXO view or already spent.
    #[error("input {outpoint} missing or already spent")]
    MissingInputs { outpoint: OutPoint },

    /// A coinbase output was spent before reaching maturity.
    #[error("coinbase spent at depth {depth}, maturity is {required}")]
    PrematureSpend { depth: i32, required: i32 },

    /// An input value or the accumulated input sum left the monetary range.
    #[error("input values out of range")]
    InputValuesOutOfRange,

    /// The summed output values left the monetary range.
    #[error("output values out of range")]
    OutputValuesOutOfRange,

    /// Outputs claim more than the inputs provide.
    #[error("input value {value_in} below output value {value_out}")]
    InBelowOut { value_in: Amount, value_out: Amount },

    /// The computed fee left the monetary range.
    #[error("fee out of range")]
    FeeOutOfRange,
}

impl TxValidationError {
    /// The broad failure classification.
    pub fn result(&self) -> TxValidationResult {
        match self {
            TxValidationError::MissingInputs { .. } => TxValidationResult::MissingInputs,
            TxValidationError::PrematureSpend { .. } => TxValidationResult::PrematureSpend,
            TxValidationError::InputValuesOutOfRange
            | TxValidationError::OutputValuesOutOfRange
            | TxValidationError::InBelowOut { .. }
            | TxValidationError::FeeOutOfRange => TxValidationResult::Consensus,
        }
    }

    /// The reject reason string carried in reject messages and logs.
    pub fn reject_reason(&self) -> &'static str {
        match self {
            TxValidationError::MissingInputs { .. } => "bad-txns-inputs-missingorspent",
            TxValidationError::PrematureSpend { .. } => "bad-txns-premature-spend-of-coinbase",
            TxValidationError::InputValuesOutOfRange => "bad-txns-inputvalues-outofrange",
            TxValidationError::OutputValuesOutOfRange => "bad-txns-txouttotal-toolarge",
            TxValidationError::InBelowOut { .. } => "bad-txns-in-belowout",
            TxValidationError::FeeOutOfRange => "bad-txns-fee-outofrange",
        }
    }
}

/// Proof-of-work verification errors.
#[derive(Error, Debug)]
pub enum PowError {
    /// The header's packed target is zero, negative, overflowing, or
    /// above the active limit for its height.
    #[error("header target is malformed or above the active limit")]
    BadTarget,

    /// The proof-of-work hash does not meet the header's target.
    #[error("proof of work hash above target")]
    HighHash,

    /// The key block hash needed for FerroHash is not available from the
    /// caller's chain view.
    #[error("key block hash unavailable for height {height}")]
    MissingKeyBlock { height: i32 },

    /// A non-critical pool acquisition timed out. Only mining and RPC
    /// callers can observe this; validation acquires at consensus-critical
    /// priority and never times out.
    #[error("ferrohash context pool acquisition timed out at {priority:?} priority")]
    PoolTimeout { priority: AcquisitionPriority },

    /// The Argon2 fallback hasher failed or was misconfigured.
    #[error(transparent)]
    Fallback(#[from] Argon2Error),
}

impl PowError {
    /// The reject reason string, where one applies to a block.
    pub fn reject_reason(&self) -> Option<&'static str> {
        match self {
            PowError::BadTarget => Some("bad-diffbits"),
            PowError::HighHash => Some("high-hash"),
            _ => None,
        }
    }
}
