//! Minimal transaction types.
//!
//! Only the shape consumed by consensus validation is modelled here:
//! inputs reference previous outputs, outputs carry a value and a locking
//! script. Script execution itself is outside the consensus core.

use crate::amount::{money_range, Amount, AmountError};
use crate::hash::Hash256;

/// A reference to a specific output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutPoint {
    /// Hash of the transaction holding the output.
    pub txid: Hash256,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    /// Construct a reference to `txid`'s `vout`-th output.
    pub const fn new(txid: Hash256, vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    /// The null outpoint used by coinbase inputs.
    pub const NULL: OutPoint = OutPoint {
        txid: Hash256::ZERO,
        vout: u32::MAX,
    };

    /// Whether this is the coinbase null reference.
    pub fn is_null(&self) -> bool {
        self.txid.is_null() && self.vout == u32::MAX
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A transaction input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    /// The output being spent.
    pub prevout: OutPoint,
}

impl TxIn {
    /// Input spending `prevout`.
    pub const fn new(prevout: OutPoint) -> Self {
        TxIn { prevout }
    }
}

/// A transaction output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    /// Amount carried by the output.
    pub value: Amount,
    /// Locking script.
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    /// Output paying `value` to `script_pubkey`.
    pub fn new(value: Amount, script_pubkey: Vec<u8>) -> Self {
        TxOut {
            value,
            script_pubkey,
        }
    }
}

/// A transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Inputs consumed.
    pub inputs: Vec<TxIn>,
    /// Outputs created.
    pub outputs: Vec<TxOut>,
    /// Earliest time or height the transaction may be mined.
    pub lock_time: u32,
}

impl Transaction {
    /// Whether this is a coinbase transaction: a single input spending
    /// the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prevout.is_null()
    }

    /// Sum of all output values, checked against the monetary range.
    pub fn value_out(&self) -> Result<Amount, AmountError> {
        let mut total: Amount = 0;
        for out in &self.outputs {
            if !money_range(out.value) {
                return Err(AmountError);
            }
            total = total.checked_add(out.value).ok_or(AmountError)?;
            if !money_range(total) {
                return Err(AmountError);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{COIN, MAX_MONEY};

    fn output(value: Amount) -> TxOut {
        TxOut::new(value, vec![0x51])
    }

    #[test]
    fn test_null_outpoint() {
        assert!(OutPoint::NULL.is_null());
        assert!(!OutPoint::new(Hash256::ONE, 0).is_null());
        assert!(!OutPoint::new(Hash256::ZERO, 0).is_null());
    }

    #[test]
    fn test_is_coinbase() {
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TxIn::new(OutPoint::NULL)],
            outputs: vec![output(50 * COIN)],
            lock_time: 0,
        };
        assert!(coinbase.is_coinbase());

        let spend = Transaction {
            version: 1,
            inputs: vec![TxIn::new(OutPoint::new(Hash256::ONE, 0))],
            outputs: vec![output(50 * COIN)],
            lock_time: 0,
        };
        assert!(!spend.is_coinbase());
    }

    #[test]
    fn test_value_out_sums() {
        let tx = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![output(COIN), output(2 * COIN), output(3 * COIN)],
            lock_time: 0,
        };
        assert_eq!(tx.value_out(), Ok(6 * COIN));
    }

    #[test]
    fn test_value_out_rejects_out_of_range() {
        let negative = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![output(-1)],
            lock_time: 0,
        };
        assert_eq!(negative.value_out(), Err(AmountError));

        let overflowing = Transaction {
            version: 1,
            inputs: vec![],
            outputs: vec![output(MAX_MONEY), output(1)],
            lock_time: 0,
        };
        assert_eq!(overflowing.value_out(), Err(AmountError));
    }
}
