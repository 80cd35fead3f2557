//! Ordered event dispatch.
//!
//! One processor per event stream. Events must arrive in strictly
//! increasing (block, transaction index, log index) order; anything else
//! means the delivery boundary broke its exactly-once guarantee, and the
//! event is rejected before any handler runs. The cursor only advances on
//! success, so a failed event can be retried after operator intervention.

use tracing::debug;

use crate::domain::{Event, EventKey};

use super::{
    handle_condition_preparation, handle_condition_resolution, handle_merge, handle_redeem,
    handle_split, handle_transfer_batch, handle_transfer_single, Ledger, LedgerError,
};

#[derive(Debug, Default)]
pub struct EventProcessor {
    last_key: Option<EventKey>,
}

impl EventProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted cursor.
    pub fn with_checkpoint(last_key: Option<EventKey>) -> Self {
        EventProcessor { last_key }
    }

    /// The key of the last successfully applied event.
    pub fn last_key(&self) -> Option<EventKey> {
        self.last_key
    }

    /// Apply one finalized event to the ledger.
    pub fn apply(&mut self, ledger: &mut Ledger, event: &Event) -> Result<(), LedgerError> {
        let key = event.key();
        if let Some(last) = self.last_key {
            if key <= last {
                return Err(LedgerError::OutOfOrderEvent { last, got: key });
            }
        }
        let timestamp = event.provenance().timestamp;
        debug!(
            kind = event.kind(),
            block = key.block_number,
            log_index = key.log_index,
            "applying event"
        );

        match event {
            Event::ConditionPreparation {
                oracle,
                question_id,
                outcome_slot_count,
                provenance,
            } => handle_condition_preparation(
                ledger,
                oracle,
                question_id,
                *outcome_slot_count,
                provenance,
            )?,
            Event::ConditionResolution {
                oracle,
                question_id,
                outcome_slot_count,
                payout_numerators,
                provenance,
            } => handle_condition_resolution(
                ledger,
                oracle,
                question_id,
                *outcome_slot_count,
                payout_numerators,
                provenance,
            )?,
            Event::PositionSplit {
                stakeholder,
                collateral_token,
                parent_collection_id,
                condition_id,
                partition,
                amount,
                ..
            } => handle_split(
                ledger,
                stakeholder,
                collateral_token,
                parent_collection_id,
                condition_id,
                partition,
                *amount,
                timestamp,
            )?,
            Event::PositionsMerge {
                stakeholder,
                collateral_token,
                parent_collection_id,
                condition_id,
                partition,
                amount,
                ..
            } => handle_merge(
                ledger,
                stakeholder,
                collateral_token,
                parent_collection_id,
                condition_id,
                partition,
                *amount,
                timestamp,
            )?,
            Event::PayoutRedemption {
                redeemer,
                collateral_token,
                parent_collection_id,
                condition_id,
                index_sets,
                ..
            } => handle_redeem(
                ledger,
                redeemer,
                collateral_token,
                parent_collection_id,
                condition_id,
                index_sets,
                timestamp,
            )?,
            Event::TransferSingle {
                from,
                to,
                position_id,
                value,
                ..
            } => handle_transfer_single(ledger, from, to, position_id, *value, timestamp)?,
            Event::TransferBatch {
                from,
                to,
                position_ids,
                values,
                ..
            } => handle_transfer_batch(ledger, from, to, position_ids, values, timestamp)?,
        }

        self.last_key = Some(key);
        Ok(())
    }
}
