//! The in-memory ledger store.
//!
//! Owns every entity and is passed `&mut` into each handler; there is no
//! module-level state, so independent event streams (test fixtures,
//! multi-tenant indexing) never share a ledger. Mutating accessors record
//! the touched key in a per-kind dirty set, which the persistence layer
//! drains after each applied batch.

use std::collections::{HashMap, HashSet};

use crate::domain::{
    Address, Amount, Collateral, Collection, CollectionId, Condition, ConditionId, Position,
    PositionId, User, UserPosition, UserPositionId,
};

use super::LedgerError;

/// Keys touched since the last [`Ledger::take_dirty`].
#[derive(Debug, Default, Clone)]
pub struct DirtySets {
    pub conditions: HashSet<ConditionId>,
    pub collections: HashSet<CollectionId>,
    pub positions: HashSet<PositionId>,
    pub users: HashSet<Address>,
    pub user_positions: HashSet<UserPositionId>,
    pub collaterals: HashSet<Address>,
}

impl DirtySets {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.collections.is_empty()
            && self.positions.is_empty()
            && self.users.is_empty()
            && self.user_positions.is_empty()
            && self.collaterals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
            + self.collections.len()
            + self.positions.len()
            + self.users.len()
            + self.user_positions.len()
            + self.collaterals.len()
    }
}

/// The full derived ledger state.
#[derive(Debug, Default)]
pub struct Ledger {
    conditions: HashMap<ConditionId, Condition>,
    collections: HashMap<CollectionId, Collection>,
    positions: HashMap<PositionId, Position>,
    users: HashMap<Address, User>,
    user_positions: HashMap<UserPositionId, UserPosition>,
    collaterals: HashMap<Address, Collateral>,
    dirty: DirtySets,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // -- conditions ----------------------------------------------------------

    pub fn condition(&self, id: &ConditionId) -> Option<&Condition> {
        self.conditions.get(id)
    }

    pub fn expect_condition(&self, id: &ConditionId) -> Result<&Condition, LedgerError> {
        self.conditions
            .get(id)
            .ok_or(LedgerError::UnknownCondition(*id))
    }

    pub fn condition_mut(&mut self, id: &ConditionId) -> Option<&mut Condition> {
        let condition = self.conditions.get_mut(id)?;
        self.dirty.conditions.insert(*id);
        Some(condition)
    }

    pub fn insert_condition(&mut self, condition: Condition) {
        self.dirty.conditions.insert(condition.id);
        self.conditions.insert(condition.id, condition);
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values()
    }

    // -- collections ---------------------------------------------------------

    pub fn collection(&self, id: &CollectionId) -> Option<&Collection> {
        self.collections.get(id)
    }

    pub fn insert_collection(&mut self, collection: Collection) {
        self.dirty.collections.insert(collection.id);
        self.collections.insert(collection.id, collection);
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    // -- positions -----------------------------------------------------------

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn expect_position_mut(&mut self, id: &PositionId) -> Result<&mut Position, LedgerError> {
        let position = self
            .positions
            .get_mut(id)
            .ok_or(LedgerError::MissingPosition(*id))?;
        self.dirty.positions.insert(*id);
        Ok(position)
    }

    pub fn or_create_position(
        &mut self,
        id: PositionId,
        make: impl FnOnce() -> Position,
    ) -> &mut Position {
        self.dirty.positions.insert(id);
        self.positions.entry(id).or_insert_with(make)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    // -- users ---------------------------------------------------------------

    pub fn user(&self, address: &Address) -> Option<&User> {
        self.users.get(address)
    }

    /// Load-or-create a user and advance their activity timestamp.
    pub fn touch_user(&mut self, address: &Address, timestamp: i64) -> &mut User {
        self.dirty.users.insert(*address);
        let user = self
            .users
            .entry(*address)
            .or_insert_with(|| User::new(*address, timestamp));
        if timestamp > user.last_active {
            user.last_active = timestamp;
        }
        user
    }

    pub fn insert_user(&mut self, user: User) {
        self.dirty.users.insert(user.address);
        self.users.insert(user.address, user);
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    // -- user positions ------------------------------------------------------

    pub fn user_position(&self, id: &UserPositionId) -> Option<&UserPosition> {
        self.user_positions.get(id)
    }

    pub fn expect_user_position_mut(
        &mut self,
        id: &UserPositionId,
    ) -> Result<&mut UserPosition, LedgerError> {
        let user_position = self
            .user_positions
            .get_mut(id)
            .ok_or(LedgerError::MissingUserPosition(*id))?;
        self.dirty.user_positions.insert(*id);
        Ok(user_position)
    }

    pub fn or_create_user_position(
        &mut self,
        id: UserPositionId,
        user: &Address,
        position_id: PositionId,
    ) -> &mut UserPosition {
        self.dirty.user_positions.insert(id);
        self.user_positions.entry(id).or_insert_with(|| UserPosition {
            id,
            user: *user,
            position_id,
            balance: Amount::ZERO,
        })
    }

    pub fn insert_user_position(&mut self, user_position: UserPosition) {
        self.dirty.user_positions.insert(user_position.id);
        self.user_positions.insert(user_position.id, user_position);
    }

    pub fn user_positions(&self) -> impl Iterator<Item = &UserPosition> {
        self.user_positions.values()
    }

    // -- collaterals ---------------------------------------------------------

    pub fn collateral(&self, address: &Address) -> Option<&Collateral> {
        self.collaterals.get(address)
    }

    pub fn or_create_collateral(&mut self, address: &Address) -> &mut Collateral {
        self.dirty.collaterals.insert(*address);
        self.collaterals
            .entry(*address)
            .or_insert_with(|| Collateral::new(*address))
    }

    pub fn insert_collateral(&mut self, collateral: Collateral) {
        self.dirty.collaterals.insert(collateral.address);
        self.collaterals.insert(collateral.address, collateral);
    }

    pub fn collaterals(&self) -> impl Iterator<Item = &Collateral> {
        self.collaterals.values()
    }

    // -- persistence ---------------------------------------------------------

    /// Drain the set of keys touched since the last call.
    pub fn take_dirty(&mut self) -> DirtySets {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bytes32;

    fn addr(byte: u8) -> Address {
        Address([byte; 20])
    }

    #[test]
    fn test_touch_user_creates_then_advances() {
        let mut ledger = Ledger::new();
        let user = ledger.touch_user(&addr(1), 100);
        assert_eq!(user.first_participation, 100);

        let user = ledger.touch_user(&addr(1), 200);
        assert_eq!(user.first_participation, 100);
        assert_eq!(user.last_active, 200);

        // An earlier timestamp never rewinds activity.
        let user = ledger.touch_user(&addr(1), 150);
        assert_eq!(user.last_active, 200);
    }

    #[test]
    fn test_expect_missing_position_fails() {
        let mut ledger = Ledger::new();
        let id = PositionId(Bytes32([7; 32]));
        assert_eq!(
            ledger.expect_position_mut(&id).unwrap_err(),
            LedgerError::MissingPosition(id)
        );
    }

    #[test]
    fn test_or_create_user_position_starts_at_zero() {
        let mut ledger = Ledger::new();
        let position_id = PositionId(Bytes32([7; 32]));
        let id = crate::domain::user_position_id(&addr(1), &position_id);
        let up = ledger.or_create_user_position(id, &addr(1), position_id);
        assert_eq!(up.balance, Amount::ZERO);
        up.balance = Amount::new(10);

        let up = ledger.or_create_user_position(id, &addr(1), position_id);
        assert_eq!(up.balance, Amount::new(10));
    }

    #[test]
    fn test_dirty_tracking_drains() {
        let mut ledger = Ledger::new();
        ledger.touch_user(&addr(1), 100);
        ledger.or_create_collateral(&addr(2));

        let dirty = ledger.take_dirty();
        assert_eq!(dirty.users.len(), 1);
        assert_eq!(dirty.collaterals.len(), 1);
        assert!(ledger.take_dirty().is_empty());
    }
}
