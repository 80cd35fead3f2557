//! Positions merge handler.
//!
//! The exact inverse of a split: equal balances are burned from every child
//! position named by the partition, and the combined balance flows one
//! level toward the root. A complete merge from the root releases
//! collateral (`Collateral.redeemed_amount`).
//!
//! Unlike split, the credit side may not exist yet: the first time two
//! sibling positions are recombined, the aggregate collection has never
//! been observed. Merging synthesizes it, deriving the defining list from
//! one of the children. The debit side (the children) must exist — a merge
//! of balances we never saw minted is a divergence and fatal.

use crate::domain::{ids, Address, Amount, Collection, CollectionId, ConditionId, IndexSet, Position};

use super::{checked_add, lattice, validate_partition, Ledger, LedgerError};

#[allow(clippy::too_many_arguments)]
pub fn handle_merge(
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

    // Debit-side prechecks: every child position and the stakeholder's
    // balance in it must exist and cover the amount.
    let mut children = Vec::with_capacity(partition.len());
    for index_set in partition {
        let child_collection_id =
            ids::collection_id(parent_collection_id, condition_id, *index_set);
        let child_position_id = ids::position_id(collateral_token, &child_collection_id);
        let position = ledger
            .position(&child_position_id)
            .ok_or(LedgerError::MissingPosition(child_position_id))?;
        if position.active_value < amount {
            return Err(LedgerError::InsufficientActiveValue {
                position: child_position_id,
                have: position.active_value,
                need: amount,
            });
        }
        let upid = ids::user_position_id(stakeholder, &child_position_id);
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
        children.push((child_collection_id, child_position_id));
    }

    // Credit-side target, resolved before mutation. `None` means the merge
    // releases collateral.
    let credit = if complete && from_root {
        None
    } else {
        let target_collection_id = if complete {
            *parent_collection_id
        } else {
            ids::collection_id(parent_collection_id, condition_id, union)
        };
        let lists = match ledger.collection(&target_collection_id) {
            Some(collection) => (collection.conditions.clone(), collection.index_sets.clone()),
            None => {
                // First observation of this aggregate: derive its defining
                // list from the first child.
                let child = ledger
                    .collection(&children[0].0)
                    .ok_or(LedgerError::MissingCollection(children[0].0))?;
                let (base_conditions, base_sets) =
                    lattice::defining_list_without(child, condition_id)?;
                if complete {
                    (base_conditions, base_sets)
                } else {
                    lattice::child_defining_list(&base_conditions, &base_sets, *condition_id, union)?
                }
            }
        };
        Some((target_collection_id, lists))
    };

    // Credit-side overflow prechecks.
    match &credit {
        None => {
            let current = ledger
                .collateral(collateral_token)
                .map(|c| c.redeemed_amount)
                .unwrap_or(Amount::ZERO);
            checked_add(current, amount)?;
        }
        Some((target_collection_id, _)) => {
            let target_position_id = ids::position_id(collateral_token, target_collection_id);
            if let Some(position) = ledger.position(&target_position_id) {
                checked_add(position.active_value, amount)?;
            }
            let upid = ids::user_position_id(stakeholder, &target_position_id);
            if let Some(user_position) = ledger.user_position(&upid) {
                checked_add(user_position.balance, amount)?;
            }
        }
    }

    // All checks passed; mutate.
    let user = ledger.touch_user(stakeholder, timestamp);
    user.participated_conditions.insert(*condition_id);

    for (_, child_position_id) in &children {
        ledger.expect_position_mut(child_position_id)?.active_value -= amount;
        let upid = ids::user_position_id(stakeholder, child_position_id);
        ledger.expect_user_position_mut(&upid)?.balance -= amount;
    }

    match credit {
        None => {
            ledger.or_create_collateral(collateral_token).redeemed_amount += amount;
        }
        Some((target_collection_id, (conditions, index_sets))) => {
            if ledger.collection(&target_collection_id).is_none() {
                ledger.insert_collection(Collection {
                    id: target_collection_id,
                    conditions: conditions.clone(),
                    index_sets: index_sets.clone(),
                });
            }
            let target_position_id = ids::position_id(collateral_token, &target_collection_id);
            let position = ledger.or_create_position(target_position_id, || Position {
                id: target_position_id,
                collateral_token: *collateral_token,
                collection_id: target_collection_id,
                conditions,
                index_sets,
                active_value: Amount::ZERO,
                lifetime_value: Amount::ZERO,
            });
            // Merging moves value; it never mints, so lifetime_value stays.
            position.active_value += amount;

            let upid = ids::user_position_id(stakeholder, &target_position_id);
            ledger
                .or_create_user_position(upid, stakeholder, target_position_id)
                .balance += amount;
        }
    }
    Ok(())
}
