//! Position split handler.
//!
//! A split consumes balance at one level of the decomposition tree and
//! mints equal balances in the child positions named by the partition.
//! Where the consumed balance lives depends on the classification:
//!
//! - complete, from root: collateral is locked (`Collateral.split_amount`);
//!   no position is debited.
//! - complete, nested: the position at the parent collection is debited.
//! - partial: the position one level deeper, at (condition, union of the
//!   partition), is debited; the complement of the partition within the
//!   condition stays implicit in that parent position.
//!
//! The debited position and the stakeholder's balance in it must already
//! exist; their absence means the event stream diverged from the chain and
//! is fatal.

use crate::domain::{ids, Address, Amount, Collection, CollectionId, ConditionId, IndexSet, Position};

use super::{checked_add, lattice, validate_partition, Ledger, LedgerError};

#[allow(clippy::too_many_arguments)]
pub fn handle_split(
    ledger: &mut Ledger,
    stakeholder: &Address,
    collateral_token: &Address,
    parent_collection_id: &CollectionId,
    condition_id: &ConditionId,
    partition: &[IndexSet],
    amount: Amount,
    timestamp: i64,
) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(amount));
    }
    let condition = ledger.expect_condition(condition_id)?;
    let outcome_slot_count = condition.outcome_slot_count;
    let union = validate_partition(partition, outcome_slot_count)?;
    let complete = union.is_full(outcome_slot_count);
    let from_root = parent_collection_id.is_zero();

    // Resolve the defining list the children extend and the position the
    // split draws down, before touching anything.
    let (source_conditions, source_sets, debit_position_id) = if complete && from_root {
        (Vec::new(), Vec::new(), None)
    } else if complete {
        let parent = ledger
            .collection(parent_collection_id)
            .ok_or(LedgerError::MissingCollection(*parent_collection_id))?;
        (
            parent.conditions.clone(),
            parent.index_sets.clone(),
            Some(ids::position_id(collateral_token, parent_collection_id)),
        )
    } else {
        // The balance being split lives one level deeper, in the collection
        // at (condition, union). Its list minus this condition is the list
        // the children extend.
        let union_collection_id = ids::collection_id(parent_collection_id, condition_id, union);
        let union_collection = ledger
            .collection(&union_collection_id)
            .ok_or(LedgerError::MissingCollection(union_collection_id))?;
        let (conditions, sets) = lattice::defining_list_without(union_collection, condition_id)?;
        (
            conditions,
            sets,
            Some(ids::position_id(collateral_token, &union_collection_id)),
        )
    };

    if source_conditions.contains(condition_id) {
        return Err(LedgerError::ConditionAlreadyInCollection(*condition_id));
    }

    // Debit-side prechecks.
    if let Some(debit_id) = &debit_position_id {
        let position = ledger
            .position(debit_id)
            .ok_or(LedgerError::MissingPosition(*debit_id))?;
        if position.active_value < amount {
            return Err(LedgerError::InsufficientActiveValue {
                position: *debit_id,
                have: position.active_value,
                need: amount,
            });
        }
        let upid = ids::user_position_id(stakeholder, debit_id);
        let user_position = ledger
            .user_position(&upid)
            .ok_or(LedgerError::MissingUserPosition(upid))?;
        if user_position.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                user_position: upid,
                have: user_position.balance,
                need: amount,
            });
        }
    }

    // Credit-side overflow prechecks, so a late failure cannot leave the
    // event half-applied.
    if complete && from_root {
        let current = ledger
            .collateral(collateral_token)
            .map(|c| c.split_amount)
            .unwrap_or(Amount::ZERO);
        checked_add(current, amount)?;
    }
    for index_set in partition {
        let child_collection_id =
            ids::collection_id(parent_collection_id, condition_id, *index_set);
        let child_position_id = ids::position_id(collateral_token, &child_collection_id);
        if let Some(position) = ledger.position(&child_position_id) {
            checked_add(position.active_value, amount)?;
            checked_add(position.lifetime_value, amount)?;
        }
        let upid = ids::user_position_id(stakeholder, &child_position_id);
        if let Some(user_position) = ledger.user_position(&upid) {
            checked_add(user_position.balance, amount)?;
        }
    }

    // All checks passed; mutate.
    let user = ledger.touch_user(stakeholder, timestamp);
    user.participated_conditions.insert(*condition_id);

    if complete && from_root {
        ledger.or_create_collateral(collateral_token).split_amount += amount;
    }

    for index_set in partition {
        let child_collection_id =
            ids::collection_id(parent_collection_id, condition_id, *index_set);
        let (child_conditions, child_sets) = match ledger.collection(&child_collection_id) {
            Some(collection) => (collection.conditions.clone(), collection.index_sets.clone()),
            None => {
                let (conditions, sets) = lattice::child_defining_list(
                    &source_conditions,
                    &source_sets,
                    *condition_id,
                    *index_set,
                )?;
                ledger.insert_collection(Collection {
                    id: child_collection_id,
                    conditions: conditions.clone(),
                    index_sets: sets.clone(),
                });
                (conditions, sets)
            }
        };

        let child_position_id = ids::position_id(collateral_token, &child_collection_id);
        let position = ledger.or_create_position(child_position_id, || Position {
            id: child_position_id,
            collateral_token: *collateral_token,
            collection_id: child_collection_id,
            conditions: child_conditions,
            index_sets: child_sets,
            active_value: Amount::ZERO,
            lifetime_value: Amount::ZERO,
        });
        position.active_value += amount;
        position.lifetime_value += amount;

        let upid = ids::user_position_id(stakeholder, &child_position_id);
        ledger
            .or_create_user_position(upid, stakeholder, child_position_id)
            .balance += amount;
    }

    if let Some(debit_id) = debit_position_id {
        ledger.expect_position_mut(&debit_id)?.active_value -= amount;
        let upid = ids::user_position_id(stakeholder, &debit_id);
        ledger.expect_user_position_mut(&upid)?.balance -= amount;
    }
    Ok(())
}
