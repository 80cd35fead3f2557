//! Typed protocol events and their deterministic ordering key.
//!
//! Events arrive finalized and must be applied in strictly increasing
//! (block, transaction index, log index) order. The ordering key makes the
//! check explicit instead of trusting the feed.

use serde::{Deserialize, Serialize};

use super::amount::Amount;
use super::indexset::IndexSet;
use super::primitives::{Address, Bytes32, CollectionId, ConditionId, PositionId};

/// On-chain provenance attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub tx_hash: Bytes32,
    /// Sender of the enclosing transaction.
    pub tx_from: Address,
    pub block_number: u64,
    pub tx_index: u32,
    pub log_index: u32,
    pub timestamp: i64,
    /// Emitting contract.
    pub emitter: Address,
}

/// Strict total order over finalized events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
    pub block_number: u64,
    pub tx_index: u32,
    pub log_index: u32,
}

impl EventKey {
    pub fn new(block_number: u64, tx_index: u32, log_index: u32) -> Self {
        EventKey {
            block_number,
            tx_index,
            log_index,
        }
    }
}

/// A finalized protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    ConditionPreparation {
        oracle: Address,
        question_id: Bytes32,
        outcome_slot_count: u32,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    ConditionResolution {
        oracle: Address,
        question_id: Bytes32,
        outcome_slot_count: u32,
        payout_numerators: Vec<u128>,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    PositionSplit {
        stakeholder: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        partition: Vec<IndexSet>,
        amount: Amount,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    PositionsMerge {
        stakeholder: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        partition: Vec<IndexSet>,
        amount: Amount,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    PayoutRedemption {
        redeemer: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        index_sets: Vec<IndexSet>,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    TransferSingle {
        operator: Address,
        from: Address,
        to: Address,
        position_id: PositionId,
        value: Amount,
        provenance: Provenance,
    },
    #[serde(rename_all = "camelCase")]
    TransferBatch {
        operator: Address,
        from: Address,
        to: Address,
        position_ids: Vec<PositionId>,
        values: Vec<Amount>,
        provenance: Provenance,
    },
}

impl Event {
    pub fn provenance(&self) -> &Provenance {
        match self {
            Event::ConditionPreparation { provenance, .. }
            | Event::ConditionResolution { provenance, .. }
            | Event::PositionSplit { provenance, .. }
            | Event::PositionsMerge { provenance, .. }
            | Event::PayoutRedemption { provenance, .. }
            | Event::TransferSingle { provenance, .. }
            | Event::TransferBatch { provenance, .. } => provenance,
        }
    }

    pub fn key(&self) -> EventKey {
        let p = self.provenance();
        EventKey::new(p.block_number, p.tx_index, p.log_index)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::ConditionPreparation { .. } => "ConditionPreparation",
            Event::ConditionResolution { .. } => "ConditionResolution",
            Event::PositionSplit { .. } => "PositionSplit",
            Event::PositionsMerge { .. } => "PositionsMerge",
            Event::PayoutRedemption { .. } => "PayoutRedemption",
            Event::TransferSingle { .. } => "TransferSingle",
            Event::TransferBatch { .. } => "TransferBatch",
        }
    }
}
