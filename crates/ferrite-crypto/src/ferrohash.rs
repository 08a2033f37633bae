//! FerroHash evaluation contexts.
//!
//! FerroHash is Ferrite's memory-hard proof-of-work. Each context owns a
//! 256 KiB dataset expanded deterministically from a key block hash:
//!
//! 1. The dataset is filled by chained Blake2b-512 invocations over the
//!    key, so items cannot be computed independently of their
//!    predecessors.
//! 2. Evaluating a hash runs a fixed number of Blake2b-256 mixing rounds,
//!    each folding a data-dependent dataset item into the running state.
//!
//! Building the dataset costs thousands of compression calls; evaluating
//! a hash costs dozens. That asymmetry is the whole point: re-keying is
//! expensive, hashing under an installed key is cheap, and the context
//! pool exploits it by reusing contexts whose key still matches.
//!
//! Contexts are not internally synchronized. The pool hands each one to
//! at most a single guard at a time.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Blake2b512, Digest};
use ferrite_primitives::Hash256;

type Blake2b256 = Blake2b<U32>;

/// Dataset size per context.
const DATASET_BYTES: usize = 256 * 1024;

/// Size of one dataset item (one Blake2b-512 output).
const ITEM_BYTES: usize = 64;

/// Number of items in the dataset.
const DATASET_ITEMS: usize = DATASET_BYTES / ITEM_BYTES;

/// Mixing rounds per hash evaluation.
const MIX_ROUNDS: u32 = 64;

/// A FerroHash evaluation environment scoped to one key.
pub struct FerrohashContext {
    key: Hash256,
    dataset: Vec<u8>,
}

impl FerrohashContext {
    /// Build a context for `key`. This fills the full dataset and is the
    /// expensive operation the pool exists to amortize.
    pub fn new(key: Hash256) -> Self {
        let mut ctx = FerrohashContext {
            key,
            dataset: vec![0u8; DATASET_BYTES],
        };
        ctx.build_dataset();
        ctx
    }

    /// The key this context is currently initialized for.
    pub fn key(&self) -> &Hash256 {
        &self.key
    }

    /// Reinitialize for a new key. A no-op when the key is unchanged.
    pub fn rekey(&mut self, key: Hash256) {
        if key == self.key {
            return;
        }
        self.key = key;
        self.build_dataset();
    }

    fn build_dataset(&mut self) {
        let mut prev = [0u8; ITEM_BYTES];
        for i in 0..DATASET_ITEMS {
            let mut hasher = Blake2b512::new();
            hasher.update(self.key.as_bytes());
            hasher.update((i as u32).to_le_bytes());
            hasher.update(prev);
            let item: [u8; ITEM_BYTES] = hasher.finalize().into();
            self.dataset[i * ITEM_BYTES..(i + 1) * ITEM_BYTES].copy_from_slice(&item);
            prev = item;
        }
    }

    /// Hash `data` under the installed key.
    pub fn hash(&self, data: &[u8]) -> Hash256 {
        let mut hasher = Blake2b256::new();
        hasher.update(self.key.as_bytes());
        hasher.update(data);
        let mut state: [u8; 32] = hasher.finalize().into();

        for round in 0..MIX_ROUNDS {
            let index = u32::from_le_bytes([state[0], state[1], state[2], state[3]]) as usize
                % DATASET_ITEMS;
            let item = &self.dataset[index * ITEM_BYTES..(index + 1) * ITEM_BYTES];

            let mut hasher = Blake2b256::new();
            hasher.update(state);
            hasher.update(item);
            hasher.update(round.to_le_bytes());
            state = hasher.finalize().into();
        }

        Hash256::from_bytes(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let ctx = FerrohashContext::new(Hash256::ONE);
        let a = ctx.hash(b"block header bytes");
        let b = ctx.hash(b"block header bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_depends_on_input() {
        let ctx = FerrohashContext::new(Hash256::ONE);
        assert_ne!(ctx.hash(b"header a"), ctx.hash(b"header b"));
    }

    #[test]
    fn test_hash_depends_on_key() {
        let ctx1 = FerrohashContext::new(Hash256::ZERO);
        let ctx2 = FerrohashContext::new(Hash256::ONE);
        assert_ne!(ctx1.hash(b"same input"), ctx2.hash(b"same input"));
    }

    #[test]
    fn test_rekey_matches_fresh_context() {
        let mut recycled = FerrohashContext::new(Hash256::ZERO);
        recycled.rekey(Hash256::ONE);

        let fresh = FerrohashContext::new(Hash256::ONE);
        assert_eq!(recycled.key(), fresh.key());
        assert_eq!(recycled.hash(b"payload"), fresh.hash(b"payload"));
    }

    #[test]
    fn test_rekey_same_key_is_noop() {
        let mut ctx = FerrohashContext::new(Hash256::ONE);
        let before = ctx.hash(b"payload");
        ctx.rekey(Hash256::ONE);
        assert_eq!(ctx.hash(b"payload"), before);
    }

    #[test]
    fn test_dataset_dimensions() {
        let ctx = FerrohashContext::new(Hash256::ONE);
        assert_eq!(ctx.dataset.len(), 256 * 1024);
        assert_eq!(DATASET_ITEMS * ITEM_BYTES, DATASET_BYTES);
    }
}
