//! # ferrite-crypto
//!
//! Proof-of-work hashers for the Ferrite blockchain.
//!
//! This crate provides:
//! - FerroHash, the key-rotated memory-hard primary algorithm, as a
//!   per-key evaluation context ([`FerrohashContext`])
//! - A bounded, priority-aware pool of those contexts
//!   ([`FerrohashContextPool`]) that amortizes expensive key
//!   initialization across threads
//! - The dormant Argon2id emergency fallback hasher ([`Argon2Context`])
//!
//! Which algorithm applies at a given chain height is decided by the
//! consensus crate; nothing in here inspects heights.

pub mod argon2id;
pub mod ferrohash;
pub mod pool;

pub use argon2id::{Argon2Context, Argon2Error, ARGON2_MAX_INPUT_SIZE};
pub use ferrohash::FerrohashContext;
pub use pool::{
    AcquisitionPriority, ContextGuard, FerrohashContextPool, PoolConfigError, PoolStats,
    DEFAULT_MAX_CONTEXTS,
};
