//! Transaction input consensus checks.
//!
//! Ties together the three input rules that cannot be checked without a
//! UTXO view: every input must exist and be unspent, coinbase outputs
//! must have matured, and money must be conserved within the monetary
//! range at every accumulation step. Script validity is a separate,
//! later stage.

use crate::coins::CoinsView;
use crate::error::TxValidationError;
use ferrite_primitives::{money_range, Amount, Transaction};
use tracing::trace;

/// Confirmations a coinbase output needs before it can be spent.
pub const COINBASE_MATURITY: i32 = 100;

/// Validate `tx`'s inputs against `view` at `spend_height` and return
/// the transaction fee.
///
/// The transaction is assumed structurally valid (non-empty inputs and
/// outputs, individually ranged output values); those checks happen
/// upstream without a UTXO view. A depth of exactly
/// [`COINBASE_MATURITY`] is spendable; one less is not.
pub fn check_tx_inputs(
    tx: &Transaction,
    view: &dyn CoinsView,
    spend_height: i32,
) -> Result<Amount, TxValidationError> {
    let mut value_in: Amount = 0;

    for input in &tx.inputs {
        let coin = view
            .get_coin(&input.prevout)
            .ok_or(TxValidationError::MissingInputs {
                outpoint: input.prevout,
            })?;

        if coin.is_coinbase && spend_height - coin.height < COINBASE_MATURITY {
            return Err(TxValidationError::PrematureSpend {
                depth: spend_height - coin.height,
                required: COINBASE_MATURITY,
            });
        }

        // Both the coin and the running sum must stay inside the
        // monetary range; checking only the final sum would let two
        // bogus coins cancel out.
        value_in = value_in
            .checked_add(coin.value)
            .ok_or(TxValidationError::InputValuesOutOfRange)?;
        if !money_range(coin.value) || !money_range(value_in) {
            return Err(TxValidationError::InputValuesOutOfRange);
        }
    }

    let value_out = tx
        .value_out()
        .map_err(|_| TxValidationError::OutputValuesOutOfRange)?;
    if value_in < value_out {
        return Err(TxValidationError::InBelowOut {
            value_in,
            value_out,
        });
    }

    let fee = value_in - value_out;
    if !money_range(fee) {
        return Err(TxValidationError::FeeOutOfRange);
    }

    trace!(value_in, value_out, fee, spend_height, "transaction inputs valid");
    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::{Coin, MemoryCoinsView};
    use crate::error::TxValidationResult;
    use ferrite_primitives::{Hash256, OutPoint, TxIn, TxOut, COIN, MAX_MONEY};

    fn outpoint(vout: u32) -> OutPoint {
        OutPoint::new(Hash256::ONE, vout)
    }

    fn add_coin(view: &mut MemoryCoinsView, op: OutPoint, value: Amount, height: i32, coinbase: bool) {
        view.add_coin(op, Coin::new(value, vec![0x51], height, coinbase));
    }

    fn spend(inputs: Vec<OutPoint>, outputs: Vec<Amount>) -> Transaction {
        Transaction {
            version: 1,
            inputs: inputs.into_iter().map(TxIn::new).collect(),
            outputs: outputs
                .into_iter()
                .map(|value| TxOut::new(value, vec![0x51]))
                .collect(),
            lock_time: 0,
        }
    }

    // =========================================================================
    // COINBASE MATURITY
    // =========================================================================

    #[test]
    fn test_coinbase_spendable_exactly_at_maturity() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 50 * COIN, 100, true);

        let tx = spend(vec![outpoint(0)], vec![50 * COIN]);
        let fee = check_tx_inputs(&tx, &view, 100 + COINBASE_MATURITY).unwrap();
        assert_eq!(fee, 0);
    }

    #[test]
    fn test_coinbase_one_block_short_of_maturity() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 50 * COIN, 100, true);

        let tx = spend(vec![outpoint(0)], vec![50 * COIN]);
        let err = check_tx_inputs(&tx, &view, 100 + COINBASE_MATURITY - 1).unwrap_err();
        assert_eq!(err.result(), TxValidationResult::PrematureSpend);
        assert!(err.reject_reason().contains("premature"));
        assert_eq!(
            err,
            TxValidationError::PrematureSpend {
                depth: 99,
                required: 100
            }
        );
    }

    #[test]
    fn test_coinbase_well_past_maturity() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 50 * COIN, 100, true);

        let tx = spend(vec![outpoint(0)], vec![50 * COIN]);
        assert!(check_tx_inputs(&tx, &view, 100 + COINBASE_MATURITY + 10_000).is_ok());
    }

    #[test]
    fn test_non_coinbase_has_no_maturity_requirement() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 50 * COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![50 * COIN]);
        assert!(check_tx_inputs(&tx, &view, 101).is_ok());
        // Even in the same block.
        assert!(check_tx_inputs(&tx, &view, 100).is_ok());
    }

    // =========================================================================
    // MISSING INPUTS
    // =========================================================================

    #[test]
    fn test_missing_input() {
        let view = MemoryCoinsView::new();
        let tx = spend(vec![outpoint(0)], vec![COIN]);

        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(err.result(), TxValidationResult::MissingInputs);
        assert_eq!(err.reject_reason(), "bad-txns-inputs-missingorspent");
    }

    #[test]
    fn test_one_missing_among_present_inputs() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), COIN, 100, false);

        let tx = spend(vec![outpoint(0), outpoint(1)], vec![COIN]);
        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(
            err,
            TxValidationError::MissingInputs {
                outpoint: outpoint(1)
            }
        );
    }

    // =========================================================================
    // VALUE RANGES
    // =========================================================================

    #[test]
    fn test_single_input_at_max_money() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), MAX_MONEY, 100, false);

        let tx = spend(vec![outpoint(0)], vec![MAX_MONEY]);
        assert_eq!(check_tx_inputs(&tx, &view, 200), Ok(0));
    }

    #[test]
    fn test_two_inputs_summing_to_max_money() {
        let mut view = MemoryCoinsView::new();
        let half = MAX_MONEY / 2;
        add_coin(&mut view, outpoint(0), half, 100, false);
        add_coin(&mut view, outpoint(1), half, 100, false);

        let tx = spend(vec![outpoint(0), outpoint(1)], vec![MAX_MONEY]);
        assert_eq!(check_tx_inputs(&tx, &view, 200), Ok(0));
    }

    #[test]
    fn test_input_sum_above_max_money_rejected() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), MAX_MONEY, 100, false);
        add_coin(&mut view, outpoint(1), 1, 100, false);

        let tx = spend(vec![outpoint(0), outpoint(1)], vec![COIN]);
        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(err, TxValidationError::InputValuesOutOfRange);
        assert_eq!(err.result(), TxValidationResult::Consensus);
    }

    #[test]
    fn test_negative_coin_value_rejected() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), -1, 100, false);

        let tx = spend(vec![outpoint(0)], vec![]);
        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(err, TxValidationError::InputValuesOutOfRange);
    }

    #[test]
    fn test_output_total_out_of_range_rejected() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![MAX_MONEY, MAX_MONEY]);
        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(err, TxValidationError::OutputValuesOutOfRange);
        assert_eq!(err.reject_reason(), "bad-txns-txouttotal-toolarge");
    }

    // =========================================================================
    // FEES
    // =========================================================================

    #[test]
    fn test_positive_fee() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 10 * COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![9 * COIN]);
        assert_eq!(check_tx_inputs(&tx, &view, 200), Ok(COIN));
    }

    #[test]
    fn test_zero_fee() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 10 * COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![10 * COIN]);
        assert_eq!(check_tx_inputs(&tx, &view, 200), Ok(0));
    }

    #[test]
    fn test_fee_splits_across_outputs() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 10 * COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![4 * COIN, 5 * COIN]);
        assert_eq!(check_tx_inputs(&tx, &view, 200), Ok(COIN));
    }

    #[test]
    fn test_outputs_exceeding_inputs_rejected() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 10 * COIN, 100, false);

        let tx = spend(vec![outpoint(0)], vec![11 * COIN]);
        let err = check_tx_inputs(&tx, &view, 200).unwrap_err();
        assert_eq!(err.result(), TxValidationResult::Consensus);
        assert!(err.reject_reason().contains("belowout"));
        assert_eq!(
            err,
            TxValidationError::InBelowOut {
                value_in: 10 * COIN,
                value_out: 11 * COIN
            }
        );
    }

    // =========================================================================
    // SPEND HEIGHT BOUNDARIES
    // =========================================================================

    #[test]
    fn test_non_coinbase_from_genesis_spendable_immediately() {
        let mut view = MemoryCoinsView::new();
        add_coin(&mut view, outpoint(0), 10 * COIN, 0, false);

        let tx = spend(vec![outpoint(0)], vec![10 * COIN]);
        assert!(check_tx_inputs(&tx, &view, 1).is_ok());
    }
}
