//! # ferrite-consensus
//!
//! Consensus rules for the Ferrite blockchain.
//!
//! This crate provides:
//! - The proof-of-work schedule: SHA256d at and before the fork,
//!   FerroHash after it, and the dormant Argon2id emergency fallback
//! - Compact-target ("nBits") encoding and difficulty retargeting
//! - Proof-of-work verification across all three algorithms
//! - Transaction input validation against a UTXO view
//!
//! ## Algorithm schedule
//!
//! Which algorithm applies is purely a function of height and
//! [`ConsensusParams`]: an activated Argon2id emergency preempts
//! FerroHash, FerroHash preempts SHA256d at the fork height, and genesis
//! is always SHA256d. Nothing outside [`ConsensusParams`] inspects
//! heights to pick an algorithm.
//!
//! ## Services
//!
//! [`ConsensusServices`] owns the FerroHash context pool and the lazily
//! initialized Argon2 context, and is the handle callers thread through
//! validation. Construct it once at startup and share it.

pub mod chain_params;
pub mod coins;
pub mod compact;
pub mod difficulty;
mod error;
pub mod pow;
mod services;
pub mod tx_check;

pub use chain_params::{
    ConsensusParams, ConsensusParamsConfig, ConsensusParamsError, PowAlgorithm,
};
pub use coins::{Coin, CoinsView, MemoryCoinsView};
pub use compact::{decode_compact, encode_compact, hash_to_biguint, DecodedTarget};
pub use difficulty::{calculate_next_work, next_work_required, RetargetHeader};
pub use error::{PowError, TxValidationError, TxValidationResult};
pub use pow::{check_header_target, KeyBlockSource};
pub use services::ConsensusServices;
pub use tx_check::{check_tx_inputs, COINBASE_MATURITY};
