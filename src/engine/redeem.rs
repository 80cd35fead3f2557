//! Payout redemption handler.
//!
//! Once a condition resolves, holders of positions constrained by it trade
//! those balances for their payout share. Per index set, the redeemer's
//! entire balance is zeroed, the position's active value drops by the same
//! amount, and the payout `balance * numerator / denominator` accrues.
//! The aggregate flows to collateral (`redeemed_amount`) when redeeming at
//! the root, otherwise into the position at the parent collection.
//!
//! Index sets the redeemer holds no balance in contribute nothing and are
//! skipped without fabricating zero-value rows; losing outcomes still get
//! their balances zeroed.

use crate::domain::{ids, Address, Amount, Collection, CollectionId, ConditionId, IndexSet, Position};

use super::{checked_add, lattice, Ledger, LedgerError};

#[allow(clippy::too_many_arguments)]
pub fn handle_redeem(
    ledger: &mut Ledger,
    redeemer: &Address,
    collateral_token: &Address,
    parent_collection_id: &CollectionId,
    condition_id: &ConditionId,
    index_sets: &[IndexSet],
    timestamp: i64,
) -> Result<(), LedgerError> {
    let condition = ledger.expect_condition(condition_id)?;
    if !condition.resolved {
        return Err(LedgerError::ConditionNotResolved(*condition_id));
    }
    let outcome_slot_count = condition.outcome_slot_count;
    let denominator = condition.payout_denominator;

    let mut numerators = Vec::with_capacity(index_sets.len());
    for index_set in index_sets {
        if index_set.is_zero() {
            return Err(LedgerError::EmptyIndexSet);
        }
        if !index_set.fits(outcome_slot_count) {
            return Err(LedgerError::IndexSetOutOfRange {
                index_set: *index_set,
                outcome_slot_count,
            });
        }
        let numerator = condition
            .payout_numerator_for(*index_set)
            .ok_or(LedgerError::AmountOverflow)?;
        numerators.push(numerator);
    }

    // Gather phase: compute what gets zeroed and the total payout without
    // mutating anything.
    let mut zeroings: Vec<(crate::domain::PositionId, crate::domain::UserPositionId, Amount)> =
        Vec::new();
    let mut total_payout = Amount::ZERO;
    for (index_set, numerator) in index_sets.iter().zip(&numerators) {
        let collection_id = ids::collection_id(parent_collection_id, condition_id, *index_set);
        let position_id = ids::position_id(collateral_token, &collection_id);
        let Some(position) = ledger.position(&position_id) else {
            continue;
        };
        let upid = ids::user_position_id(redeemer, &position_id);
        let Some(user_position) = ledger.user_position(&upid) else {
            continue;
        };
        let balance = user_position.balance;
        if balance.is_zero() {
            continue;
        }
        if position.active_value < balance {
            return Err(LedgerError::InsufficientActiveValue {
                position: position_id,
                have: position.active_value,
                need: balance,
            });
        }
        let payout = balance
            .payout_share(*numerator, denominator)
            .ok_or(LedgerError::AmountOverflow)?;
        total_payout = checked_add(total_payout, payout)?;
        zeroings.push((position_id, upid, balance));
    }

    let from_root = parent_collection_id.is_zero();

    // Credit-side target, resolved before mutation. Like merge, the parent
    // collection may be previously unobserved; derive its list from any
    // existing child.
    let credit_lists = if from_root || total_payout.is_zero() {
        None
    } else {
        let lists = match ledger.collection(parent_collection_id) {
            Some(collection) => (collection.conditions.clone(), collection.index_sets.clone()),
            None => {
                let child = index_sets
                    .iter()
                    .find_map(|s| {
                        ledger.collection(&ids::collection_id(
                            parent_collection_id,
                            condition_id,
                            *s,
                        ))
                    })
                    .ok_or(LedgerError::MissingCollection(*parent_collection_id))?;
                lattice::defining_list_without(child, condition_id)?
            }
        };
        Some(lists)
    };

    // Credit-side overflow prechecks.
    if total_payout.is_positive() {
        if from_root {
            let current = ledger
                .collateral(collateral_token)
                .map(|c| c.redeemed_amount)
                .unwrap_or(Amount::ZERO);
            checked_add(current, total_payout)?;
        } else {
            let parent_position_id = ids::position_id(collateral_token, parent_collection_id);
            if let Some(position) = ledger.position(&parent_position_id) {
                checked_add(position.active_value, total_payout)?;
            }
            let upid = ids::user_position_id(redeemer, &parent_position_id);
            if let Some(user_position) = ledger.user_position(&upid) {
                checked_add(user_position.balance, total_payout)?;
            }
        }
    }

    // All checks passed; mutate.
    let user = ledger.touch_user(redeemer, timestamp);
    user.participated_conditions.insert(*condition_id);

    for (position_id, upid, balance) in zeroings {
        ledger.expect_position_mut(&position_id)?.active_value -= balance;
        ledger.expect_user_position_mut(&upid)?.balance = Amount::ZERO;
    }

    if total_payout.is_zero() {
        return Ok(());
    }
    if from_root {
        ledger.or_create_collateral(collateral_token).redeemed_amount += total_payout;
    } else if let Some((conditions, index_sets)) = credit_lists {
        if ledger.collection(parent_collection_id).is_none() {
            ledger.insert_collection(Collection {
                id: *parent_collection_id,
                conditions: conditions.clone(),
                index_sets: index_sets.clone(),
            });
        }
        let parent_position_id = ids::position_id(collateral_token, parent_collection_id);
        let parent_collection_id = *parent_collection_id;
        let position = ledger.or_create_position(parent_position_id, || Position {
            id: parent_position_id,
            collateral_token: *collateral_token,
            collection_id: parent_collection_id,
            conditions,
            index_sets,
            active_value: Amount::ZERO,
            lifetime_value: Amount::ZERO,
        });
        position.active_value += total_payout;

        let upid = ids::user_position_id(redeemer, &parent_position_id);
        ledger
            .or_create_user_position(upid, redeemer, parent_position_id)
            .balance += total_payout;
    }
    Ok(())
}
