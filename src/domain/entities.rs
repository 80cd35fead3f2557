//! The six ledger entity kinds.
//!
//! Entities reference each other by identifier only; the store owns every
//! instance. Monetary values use a signed 128-bit `Amount` so that a
//! defective negative state is representable, but the engine rejects any
//! transition that would actually produce one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::amount::Amount;
use super::indexset::IndexSet;
use super::primitives::{Address, Bytes32, CollectionId, ConditionId, PositionId, UserPositionId};

/// A question with a fixed number of mutually exclusive outcome slots,
/// resolved exactly once by its oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: ConditionId,
    pub oracle: Address,
    pub question_id: Bytes32,
    pub outcome_slot_count: u32,
    pub resolved: bool,
    /// One numerator per outcome slot; empty until resolution.
    pub payout_numerators: Vec<u128>,
    /// Sum of the numerators; zero until resolution.
    pub payout_denominator: u128,
    pub creator: Address,
    pub create_tx_hash: Bytes32,
    pub create_block: u64,
    pub create_timestamp: i64,
    pub resolve_tx_hash: Option<Bytes32>,
    pub resolve_block: Option<u64>,
    pub resolve_timestamp: Option<i64>,
}

impl Condition {
    /// Payout numerator for an index set: the sum over its set bits.
    ///
    /// Returns `None` if the condition is unresolved or the sum overflows.
    pub fn payout_numerator_for(&self, index_set: IndexSet) -> Option<u128> {
        if !self.resolved {
            return None;
        }
        let mut total: u128 = 0;
        for bit in index_set.bits() {
            total = total.checked_add(*self.payout_numerators.get(bit as usize)?)?;
        }
        Some(total)
    }
}

/// A content-addressed composite of (condition, index set) constraints.
///
/// The defining lists record the derivation path in insertion order; they
/// are never sorted. The root collection is the all-zero id with empty
/// lists. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub conditions: Vec<ConditionId>,
    pub index_sets: Vec<IndexSet>,
}

/// A collection paired with a collateral token: the unit holders own.
///
/// `conditions`/`index_sets` denormalize the owning collection's defining
/// lists for query convenience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub collateral_token: Address,
    pub collection_id: CollectionId,
    pub conditions: Vec<ConditionId>,
    pub index_sets: Vec<IndexSet>,
    /// Total minted and not yet recombined or redeemed, across all holders.
    pub active_value: Amount,
    /// Total ever minted into this position. Only increases, only on split.
    pub lifetime_value: Amount,
}

/// An account that has touched the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub address: Address,
    pub first_participation: i64,
    pub last_active: i64,
    pub participated_conditions: BTreeSet<ConditionId>,
}

impl User {
    pub fn new(address: Address, timestamp: i64) -> Self {
        User {
            address,
            first_participation: timestamp,
            last_active: timestamp,
            participated_conditions: BTreeSet::new(),
        }
    }
}

/// One user's balance in one position. Created lazily on first
/// credit or debit; zero-balance rows are retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    pub id: UserPositionId,
    pub user: Address,
    pub position_id: PositionId,
    pub balance: Amount,
}

/// Cumulative collateral counters for one token. Never decremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collateral {
    pub address: Address,
    /// Collateral ever locked via root-level complete splits.
    pub split_amount: Amount,
    /// Collateral ever released via root-level complete merges or payouts.
    pub redeemed_amount: Amount,
}

impl Collateral {
    pub fn new(address: Address) -> Self {
        Collateral {
            address,
            split_amount: Amount::ZERO,
            redeemed_amount: Amount::ZERO,
        }
    }
}
