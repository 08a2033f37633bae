//! # ferrite-primitives
//!
//! Primitive types shared by every Ferrite crate:
//! - [`Hash256`]: fixed 256-bit hash values with integer ordering
//! - [`BlockHeader`]: the 80-byte wire-format block header
//! - [`CompactTarget`]: the packed 32-bit difficulty target ("nBits")
//! - [`Transaction`] and friends: the minimal transaction shape consumed
//!   by consensus input checks
//! - Monetary amounts and the [`MAX_MONEY`] supply cap

pub mod amount;
pub mod hash;
pub mod header;
pub mod transaction;

pub use amount::{money_range, Amount, AmountError, COIN, MAX_MONEY};
pub use hash::{sha256d, Hash256, HashParseError};
pub use header::{BlockHeader, CompactTarget, HeaderDecodeError};
pub use transaction::{OutPoint, Transaction, TxIn, TxOut};
