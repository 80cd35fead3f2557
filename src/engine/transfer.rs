//! ERC1155 transfer handlers.
//!
//! Transfers move a balance between holders of an existing position;
//! `active_value` never changes. A zero address on either end is the
//! transfer leg of a mint or burn, which split/merge/redeem already
//! account for, so it is skipped.
//!
//! A batch applies its elements in order and keeps going past a failing
//! element: the elements already applied stand, and the failures are
//! collected into one aggregate error.

use crate::domain::{ids, Address, Amount, PositionId};

use super::{checked_add, Ledger, LedgerError};

fn apply_transfer(
    ledger: &mut Ledger,
    from: &Address,
    to: &Address,
    position_id: &PositionId,
    value: Amount,
    timestamp: i64,
) -> Result<(), LedgerError> {
    if from.is_zero() || to.is_zero() {
        return Ok(());
    }
    if value.is_negative() {
        return Err(LedgerError::InvalidAmount(value));
    }

    let position = ledger
        .position(position_id)
        .ok_or(LedgerError::MissingPosition(*position_id))?;
    let position_conditions = position.conditions.clone();

    let sender_upid = ids::user_position_id(from, position_id);
    let sender = ledger
        .user_position(&sender_upid)
        .ok_or(LedgerError::MissingUserPosition(sender_upid))?;
    if sender.balance < value {
        return Err(LedgerError::InsufficientBalance {
            user_position: sender_upid,
            have: sender.balance,
            need: value,
        });
    }
    let receiver_upid = ids::user_position_id(to, position_id);
    if let Some(receiver) = ledger.user_position(&receiver_upid) {
        checked_add(receiver.balance, value)?;
    }

    ledger.touch_user(from, timestamp);
    let receiver_user = ledger.touch_user(to, timestamp);
    for condition_id in &position_conditions {
        receiver_user.participated_conditions.insert(*condition_id);
    }

    ledger.expect_user_position_mut(&sender_upid)?.balance -= value;
    ledger
        .or_create_user_position(receiver_upid, to, *position_id)
        .balance += value;
    Ok(())
}

pub fn handle_transfer_single(
    ledger: &mut Ledger,
    from: &Address,
    to: &Address,
    position_id: &PositionId,
    value: Amount,
    timestamp: i64,
) -> Result<(), LedgerError> {
    apply_transfer(ledger, from, to, position_id, value, timestamp)
}

/// Apply each (position id, value) element in order. Elements that fail do
/// not roll back the ones already applied; every failure is reported with
/// its element index.
pub fn handle_transfer_batch(
    ledger: &mut Ledger,
    from: &Address,
    to: &Address,
    position_ids: &[PositionId],
    values: &[Amount],
    timestamp: i64,
) -> Result<(), LedgerError> {
    if position_ids.len() != values.len() {
        return Err(LedgerError::BatchLengthMismatch {
            ids: position_ids.len(),
            values: values.len(),
        });
    }
    let mut failures = Vec::new();
    for (index, (position_id, value)) in position_ids.iter().zip(values).enumerate() {
        if let Err(err) = apply_transfer(ledger, from, to, position_id, *value, timestamp) {
            failures.push((index, err));
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::TransferBatchFailed(failures))
    }
}
