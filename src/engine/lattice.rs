//! Operations on a collection's defining lists.
//!
//! A collection is defined by parallel lists of condition ids and index
//! sets, in derivation order. Growth appends one (condition, index set)
//! pair; collapse removes one condition's contribution. Both directions
//! keep the no-repeated-condition invariant and fail loudly instead of
//! silently conflating the two paths.

use crate::domain::{Collection, ConditionId, IndexSet};

use super::LedgerError;

/// Defining lists of the collection obtained by appending one more pair.
pub fn child_defining_list(
    conditions: &[ConditionId],
    index_sets: &[IndexSet],
    condition_id: ConditionId,
    index_set: IndexSet,
) -> Result<(Vec<ConditionId>, Vec<IndexSet>), LedgerError> {
    if conditions.contains(&condition_id) {
        return Err(LedgerError::ConditionAlreadyInCollection(condition_id));
    }
    let mut new_conditions = conditions.to_vec();
    let mut new_sets = index_sets.to_vec();
    new_conditions.push(condition_id);
    new_sets.push(index_set);
    Ok((new_conditions, new_sets))
}

/// Defining lists of `collection` with one condition's entry removed.
pub fn defining_list_without(
    collection: &Collection,
    condition_id: &ConditionId,
) -> Result<(Vec<ConditionId>, Vec<IndexSet>), LedgerError> {
    let at = collection
        .conditions
        .iter()
        .position(|c| c == condition_id)
        .ok_or(LedgerError::ConditionNotInCollection(*condition_id))?;
    let mut conditions = collection.conditions.clone();
    let mut index_sets = collection.index_sets.clone();
    conditions.remove(at);
    index_sets.remove(at);
    Ok((conditions, index_sets))
}
