//! Condition preparation and resolution handlers.

use crate::domain::{ids, Address, Bytes32, Condition, Provenance, MAX_OUTCOME_SLOTS};

use super::{Ledger, LedgerError};

/// Record a newly prepared condition. Conditions are created exactly once;
/// a second preparation of the same (oracle, question, slot count) triple
/// is malformed input.
pub fn handle_condition_preparation(
    ledger: &mut Ledger,
    oracle: &Address,
    question_id: &Bytes32,
    outcome_slot_count: u32,
    provenance: &Provenance,
) -> Result<(), LedgerError> {
    if !(2..=MAX_OUTCOME_SLOTS).contains(&outcome_slot_count) {
        return Err(LedgerError::InvalidOutcomeSlotCount(outcome_slot_count));
    }
    let id = ids::condition_id(oracle, question_id, outcome_slot_count);
    if ledger.condition(&id).is_some() {
        return Err(LedgerError::ConditionAlreadyPrepared(id));
    }

    ledger.insert_condition(Condition {
        id,
        oracle: *oracle,
        question_id: *question_id,
        outcome_slot_count,
        resolved: false,
        payout_numerators: Vec::new(),
        payout_denominator: 0,
        creator: provenance.tx_from,
        create_tx_hash: provenance.tx_hash,
        create_block: provenance.block_number,
        create_timestamp: provenance.timestamp,
        resolve_tx_hash: None,
        resolve_block: None,
        resolve_timestamp: None,
    });
    Ok(())
}

/// Record an oracle's payout report. A condition resolves exactly once; the
/// payout vector must match the slot count and sum to a positive
/// denominator.
pub fn handle_condition_resolution(
    ledger: &mut Ledger,
    oracle: &Address,
    question_id: &Bytes32,
    outcome_slot_count: u32,
    payout_numerators: &[u128],
    provenance: &Provenance,
) -> Result<(), LedgerError> {
    let id = ids::condition_id(oracle, question_id, outcome_slot_count);
    let condition = ledger.expect_condition(&id)?;
    if condition.resolved {
        return Err(LedgerError::ConditionAlreadyResolved(id));
    }
    if payout_numerators.len() != condition.outcome_slot_count as usize {
        return Err(LedgerError::PayoutLengthMismatch {
            condition: id,
            expected: condition.outcome_slot_count,
            got: payout_numerators.len(),
        });
    }
    let mut denominator: u128 = 0;
    for numerator in payout_numerators {
        denominator = denominator
            .checked_add(*numerator)
            .ok_or(LedgerError::AmountOverflow)?;
    }
    if denominator == 0 {
        return Err(LedgerError::ZeroPayoutVector(id));
    }

    let condition = ledger
        .condition_mut(&id)
        .ok_or(LedgerError::UnknownCondition(id))?;
    condition.resolved = true;
    condition.payout_numerators = payout_numerators.to_vec();
    condition.payout_denominator = denominator;
    condition.resolve_tx_hash = Some(provenance.tx_hash);
    condition.resolve_block = Some(provenance.block_number);
    condition.resolve_timestamp = Some(provenance.timestamp);
    Ok(())
}
