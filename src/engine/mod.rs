//! Pure, synchronous state-transition engine for the conditional-token
//! ledger.
//!
//! Each handler is a function of `(&mut Ledger, event fields)` applied
//! atomically: every fallible check runs before the first mutation, so a
//! rejected event leaves the ledger exactly as it was. No handler calls
//! another handler. No I/O happens here.

use thiserror::Error;

use crate::domain::{
    Amount, CollectionId, ConditionId, EventKey, IndexSet, PositionId, UserPositionId,
};

pub mod conditions;
pub mod lattice;
pub mod ledger;
pub mod merge;
pub mod processor;
pub mod redeem;
pub mod split;
pub mod transfer;

pub use conditions::{handle_condition_preparation, handle_condition_resolution};
pub use ledger::{DirtySets, Ledger};
pub use merge::handle_merge;
pub use processor::EventProcessor;
pub use redeem::handle_redeem;
pub use split::handle_split;
pub use transfer::{handle_transfer_batch, handle_transfer_single};

/// A rejected state transition. The event stream processor treats every
/// variant as fatal for the failing event: state is left untouched and the
/// operator has to intervene, because continuing would diverge the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // -- malformed input -----------------------------------------------------
    #[error("unknown condition {0}")]
    UnknownCondition(ConditionId),
    #[error("condition {0} prepared twice")]
    ConditionAlreadyPrepared(ConditionId),
    #[error("outcome slot count {0} out of range")]
    InvalidOutcomeSlotCount(u32),
    #[error("condition {0} resolved twice")]
    ConditionAlreadyResolved(ConditionId),
    #[error("condition {0} is not resolved")]
    ConditionNotResolved(ConditionId),
    #[error("payout vector length {got} does not match {expected} outcome slots of {condition}")]
    PayoutLengthMismatch {
        condition: ConditionId,
        expected: u32,
        got: usize,
    },
    #[error("all-zero payout vector for condition {0}")]
    ZeroPayoutVector(ConditionId),
    #[error("partition must have at least two members, got {0}")]
    PartitionTooSmall(usize),
    #[error("empty index set")]
    EmptyIndexSet,
    #[error("index set {index_set} exceeds {outcome_slot_count} outcome slots")]
    IndexSetOutOfRange {
        index_set: IndexSet,
        outcome_slot_count: u32,
    },
    #[error("index set {0} overlaps another partition member")]
    OverlappingIndexSets(IndexSet),
    #[error("invalid amount {0}")]
    InvalidAmount(Amount),
    #[error("batch has {ids} position ids but {values} values")]
    BatchLengthMismatch { ids: usize, values: usize },
    #[error("condition {0} already constrains this collection")]
    ConditionAlreadyInCollection(ConditionId),
    #[error("condition {0} does not constrain this collection")]
    ConditionNotInCollection(ConditionId),

    // -- missing expected entity ---------------------------------------------
    #[error("expected collection {0} to exist")]
    MissingCollection(CollectionId),
    #[error("expected position {0} to exist")]
    MissingPosition(PositionId),
    #[error("expected user position {0} to exist")]
    MissingUserPosition(UserPositionId),

    // -- arithmetic ----------------------------------------------------------
    #[error("position {position} active value {have} cannot cover {need}")]
    InsufficientActiveValue {
        position: PositionId,
        have: Amount,
        need: Amount,
    },
    #[error("user position {user_position} balance {have} cannot cover {need}")]
    InsufficientBalance {
        user_position: UserPositionId,
        have: Amount,
        need: Amount,
    },
    #[error("amount arithmetic overflow")]
    AmountOverflow,

    // -- delivery ------------------------------------------------------------
    #[error("event {got:?} not after last applied {last:?}")]
    OutOfOrderEvent { last: EventKey, got: EventKey },

    // -- batch aggregate -----------------------------------------------------
    #[error("transfer batch had {} failing element(s)", .0.len())]
    TransferBatchFailed(Vec<(usize, LedgerError)>),
}

/// Checked credit arithmetic shared by the handlers.
pub(crate) fn checked_add(value: Amount, amount: Amount) -> Result<Amount, LedgerError> {
    value.checked_add(amount).ok_or(LedgerError::AmountOverflow)
}

/// Validate a split/merge partition against a condition's slot count and
/// return its union.
///
/// A valid partition has at least two members, every member nonzero and
/// within `[0, outcome_slot_count)`, and members pairwise disjoint.
pub(crate) fn validate_partition(
    partition: &[IndexSet],
    outcome_slot_count: u32,
) -> Result<IndexSet, LedgerError> {
    if partition.len() < 2 {
        return Err(LedgerError::PartitionTooSmall(partition.len()));
    }
    let mut seen = IndexSet::zero();
    for index_set in partition {
        if index_set.is_zero() {
            return Err(LedgerError::EmptyIndexSet);
        }
        if !index_set.fits(outcome_slot_count) {
            return Err(LedgerError::IndexSetOutOfRange {
                index_set: *index_set,
                outcome_slot_count,
            });
        }
        if seen.intersects(index_set) {
            return Err(LedgerError::OverlappingIndexSets(*index_set));
        }
        seen = seen | *index_set;
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_partition_returns_union() {
        let partition = [IndexSet::from_bits(0b110), IndexSet::from_bits(0b001)];
        assert_eq!(
            validate_partition(&partition, 3),
            Ok(IndexSet::from_bits(0b111))
        );
    }

    #[test]
    fn test_validate_partition_rejects_singleton() {
        let partition = [IndexSet::from_bits(0b1)];
        assert_eq!(
            validate_partition(&partition, 2),
            Err(LedgerError::PartitionTooSmall(1))
        );
    }

    #[test]
    fn test_validate_partition_rejects_empty_member() {
        let partition = [IndexSet::from_bits(0b10), IndexSet::zero()];
        assert_eq!(
            validate_partition(&partition, 2),
            Err(LedgerError::EmptyIndexSet)
        );
    }

    #[test]
    fn test_validate_partition_rejects_out_of_range() {
        let partition = [IndexSet::from_bits(0b100), IndexSet::from_bits(0b001)];
        assert!(matches!(
            validate_partition(&partition, 2),
            Err(LedgerError::IndexSetOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_partition_rejects_overlap() {
        let partition = [IndexSet::from_bits(0b011), IndexSet::from_bits(0b110)];
        assert_eq!(
            validate_partition(&partition, 3),
            Err(LedgerError::OverlappingIndexSets(IndexSet::from_bits(0b110)))
        );
    }

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(
            checked_add(Amount::MAX, Amount::new(1)),
            Err(LedgerError::AmountOverflow)
        );
        assert_eq!(
            checked_add(Amount::new(1), Amount::new(2)),
            Ok(Amount::new(3))
        );
    }
}
