//! Unspent transaction outputs and the view the consensus core reads
//! them through.
//!
//! The core never owns UTXO storage. It consumes a [`CoinsView`]:
//! lookups by outpoint and spends, nothing else. Node layers back this
//! with a database cache; tests use the in-memory implementation.

use ferrite_primitives::{Amount, OutPoint};
use std::collections::HashMap;

/// An unspent transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    /// Amount carried by the output.
    pub value: Amount,
    /// Locking script of the output.
    pub script_pubkey: Vec<u8>,
    /// Height of the block that created the output.
    pub height: i32,
    /// Whether the output came from a coinbase transaction.
    pub is_coinbase: bool,
}

impl Coin {
    /// A coin worth `value`, created at `height`.
    pub fn new(value: Amount, script_pubkey: Vec<u8>, height: i32, is_coinbase: bool) -> Self {
        Coin {
            value,
            script_pubkey,
            height,
            is_coinbase,
        }
    }
}

/// A view over unspent outputs.
pub trait CoinsView {
    /// Fetch the coin at `outpoint`, if it exists and is unspent.
    fn get_coin(&self, outpoint: &OutPoint) -> Option<Coin>;

    /// Whether an unspent coin exists at `outpoint`.
    fn have_coin(&self, outpoint: &OutPoint) -> bool {
        self.get_coin(outpoint).is_some()
    }

    /// Remove and return the coin at `outpoint`.
    fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin>;
}

/// A plain in-memory coins view.
#[derive(Debug, Default)]
pub struct MemoryCoinsView {
    coins: HashMap<OutPoint, Coin>,
}

impl MemoryCoinsView {
    /// An empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coin, replacing any previous coin at the outpoint.
    pub fn add_coin(&mut self, outpoint: OutPoint, coin: Coin) {
        self.coins.insert(outpoint, coin);
    }

    /// Number of unspent coins in the view.
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// Whether the view holds no coins.
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

impl CoinsView for MemoryCoinsView {
    fn get_coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.get(outpoint).cloned()
    }

    fn spend_coin(&mut self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.remove(outpoint)
    }
}
