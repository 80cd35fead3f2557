//! Domain types for the conditional-token ledger.
//!
//! This module provides:
//! - Fixed-width byte primitives and typed identifiers
//! - The outcome index-set bitset algebra
//! - Content-addressed identifier derivation
//! - Typed protocol events with a deterministic ordering key
//! - The six ledger entity kinds

pub mod amount;
pub mod entities;
pub mod event;
pub mod ids;
pub mod indexset;
pub mod primitives;

pub use amount::Amount;
pub use entities::{Collateral, Collection, Condition, Position, User, UserPosition};
pub use event::{Event, EventKey, Provenance};
pub use ids::{collection_id, condition_id, position_id, user_position_id};
pub use indexset::{union_of, IndexSet, MAX_OUTCOME_SLOTS};
pub use primitives::{
    Address, Bytes32, CollectionId, ConditionId, HexParseError, PositionId, UserPositionId,
};
