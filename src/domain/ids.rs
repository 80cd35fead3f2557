//! Deterministic identifier derivation.
//!
//! Conditions, collections, and positions are content-addressed: the same
//! inputs always produce the same identifier, which makes replaying a
//! finalized event stream idempotent at the identifier level. All digests
//! use a single fixed 256-bit hash, kept behind `hash256` so the primitive
//! stays swappable and testable on its own.
//!
//! Collection ids combine by XOR: the id of a collection is the XOR of one
//! digest per (condition, index set) pair it contains. XOR is commutative
//! and associative, so deriving a collection one condition at a time
//! converges to the same id regardless of the path taken, and the all-zero
//! root is the identity element. XOR is also self-inverse, which is what
//! lets a complete split or merge collapse a position one level toward the
//! root by re-applying the same pair digest.

use sha2::{Digest, Sha256};

use super::indexset::IndexSet;
use super::primitives::{Address, Bytes32, CollectionId, ConditionId, PositionId, UserPositionId};

/// The one fixed hash primitive behind every derived identifier.
fn hash256(parts: &[&[u8]]) -> Bytes32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    Bytes32(hasher.finalize().into())
}

/// Identity of a condition: digest of (oracle, question id, outcome slot
/// count).
pub fn condition_id(oracle: &Address, question_id: &Bytes32, outcome_slot_count: u32) -> ConditionId {
    ConditionId(hash256(&[
        oracle.as_bytes(),
        question_id.as_bytes(),
        &outcome_slot_count.to_be_bytes(),
    ]))
}

/// Digest contributed by a single (condition, index set) pair.
fn collection_pair_digest(condition_id: &ConditionId, index_set: IndexSet) -> Bytes32 {
    hash256(&[condition_id.as_bytes(), &index_set.to_be_bytes()])
}

/// Identity of the collection obtained by constraining `parent` with one
/// more (condition, index set) pair. With the root (all-zero) parent this
/// degenerates to the single-pair collection id.
pub fn collection_id(
    parent: &CollectionId,
    condition_id: &ConditionId,
    index_set: IndexSet,
) -> CollectionId {
    CollectionId(parent.0 ^ collection_pair_digest(condition_id, index_set))
}

/// Identity of a position: digest of (collateral token, collection id).
pub fn position_id(collateral_token: &Address, collection: &CollectionId) -> PositionId {
    PositionId(hash256(&[collateral_token.as_bytes(), collection.as_bytes()]))
}

/// Composite key for a user's holding of a position. A literal
/// concatenation, never hashed: downstream consumers rely on being able to
/// slice the user and position back out.
pub fn user_position_id(user: &Address, position: &PositionId) -> UserPositionId {
    let mut out = [0u8; 52];
    out[..20].copy_from_slice(user.as_bytes());
    out[20..].copy_from_slice(position.as_bytes());
    UserPositionId(out)
}
