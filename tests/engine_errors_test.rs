//! Rejection paths: malformed input, missing expected entities, and
//! underflow must leave the ledger untouched.

use condexer::domain::{
    ids, Address, Amount, Bytes32, CollectionId, ConditionId, IndexSet, Provenance,
};
use condexer::engine::{
    handle_condition_preparation, handle_split, handle_transfer_single, Ledger, LedgerError,
};

fn addr(byte: u8) -> Address {
    Address([byte; 20])
}

fn amt(value: i128) -> Amount {
    Amount::new(value)
}

fn set(bits: u64) -> IndexSet {
    IndexSet::from_bits(bits)
}

fn provenance() -> Provenance {
    Provenance {
        tx_hash: Bytes32([0xee; 32]),
        tx_from: addr(0xaa),
        block_number: 1,
        tx_index: 0,
        log_index: 0,
        timestamp: 1_700_000_000,
        emitter: addr(0xcc),
    }
}

const ALICE: u8 = 0x11;
const BOB: u8 = 0x22;
const COLLATERAL: u8 = 0x99;

fn prepare(ledger: &mut Ledger, oracle: u8, question: u8, slots: u32) -> ConditionId {
    let oracle = addr(oracle);
    let question = Bytes32([question; 32]);
    handle_condition_preparation(ledger, &oracle, &question, slots, &provenance()).unwrap();
    ids::condition_id(&oracle, &question, slots)
}

fn split_root(
    ledger: &mut Ledger,
    condition: &ConditionId,
    partition: &[IndexSet],
    amount: i128,
) -> Result<(), LedgerError> {
    handle_split(
        ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &CollectionId::zero(),
        condition,
        partition,
        amt(amount),
        1_700_000_000,
    )
}

#[test]
fn test_split_unknown_condition_rejected() {
    let mut ledger = Ledger::new();
    let missing = ConditionId(Bytes32([9; 32]));
    let err = split_root(&mut ledger, &missing, &[set(0b01), set(0b10)], 10).unwrap_err();
    assert_eq!(err, LedgerError::UnknownCondition(missing));
    assert_eq!(ledger.users().count(), 0);
}

#[test]
fn test_split_rejects_malformed_partitions() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 3);

    let err = split_root(&mut ledger, &condition, &[set(0b111)], 10).unwrap_err();
    assert_eq!(err, LedgerError::PartitionTooSmall(1));

    let err = split_root(&mut ledger, &condition, &[set(0b011), set(0b110)], 10).unwrap_err();
    assert!(matches!(err, LedgerError::OverlappingIndexSets(_)));

    let err = split_root(&mut ledger, &condition, &[set(0b001), set(0b1000)], 10).unwrap_err();
    assert!(matches!(err, LedgerError::IndexSetOutOfRange { .. }));

    let err = split_root(&mut ledger, &condition, &[set(0b001), set(0)], 10).unwrap_err();
    assert_eq!(err, LedgerError::EmptyIndexSet);

    let err = split_root(&mut ledger, &condition, &[set(0b001), set(0b010)], 0).unwrap_err();
    assert_eq!(err, LedgerError::InvalidAmount(Amount::ZERO));

    // Nothing was created along the way.
    assert_eq!(ledger.positions().count(), 0);
    assert_eq!(ledger.collections().count(), 0);
    assert_eq!(ledger.users().count(), 0);
}

#[test]
fn test_partial_split_without_union_position_rejected() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 3);

    // No prior complete split: the union collection 0b011 was never minted.
    let err = split_root(&mut ledger, &condition, &[set(0b001), set(0b010)], 10).unwrap_err();
    let union_collection = ids::collection_id(&CollectionId::zero(), &condition, set(0b011));
    assert_eq!(err, LedgerError::MissingCollection(union_collection));
}

#[test]
fn test_nested_split_without_parent_collection_rejected() {
    let mut ledger = Ledger::new();
    let c1 = prepare(&mut ledger, 1, 1, 2);
    let c2 = prepare(&mut ledger, 2, 2, 2);

    // The parent collection {(c1, 0b01)} was never created.
    let parent = ids::collection_id(&CollectionId::zero(), &c1, set(0b01));
    let err = handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &parent,
        &c2,
        &[set(0b01), set(0b10)],
        amt(10),
        1_700_000_000,
    )
    .unwrap_err();
    assert_eq!(err, LedgerError::MissingCollection(parent));
}

#[test]
fn test_split_underflow_rejected_without_mutation() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 3);
    split_root(&mut ledger, &condition, &[set(0b110), set(0b001)], 50).unwrap();

    // The union position holds 50; drawing 60 must fail atomically.
    let err = split_root(&mut ledger, &condition, &[set(0b010), set(0b100)], 60).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientActiveValue { .. }));

    let col_110 = ids::collection_id(&CollectionId::zero(), &condition, set(0b110));
    let position_110 = ids::position_id(&addr(COLLATERAL), &col_110);
    assert_eq!(
        ledger.position(&position_110).unwrap().active_value,
        amt(50)
    );
    // The child positions of the failed split were never created.
    let col_010 = ids::collection_id(&CollectionId::zero(), &condition, set(0b010));
    assert!(ledger
        .position(&ids::position_id(&addr(COLLATERAL), &col_010))
        .is_none());
}

#[test]
fn test_split_checks_stakeholder_balance_not_just_active_value() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 3);
    split_root(&mut ledger, &condition, &[set(0b110), set(0b001)], 50).unwrap();

    // Alice gives most of the union slice away; the position still holds 50
    // in total but her share is only 20.
    let col_110 = ids::collection_id(&CollectionId::zero(), &condition, set(0b110));
    let position_110 = ids::position_id(&addr(COLLATERAL), &col_110);
    handle_transfer_single(
        &mut ledger,
        &addr(ALICE),
        &addr(BOB),
        &position_110,
        amt(30),
        1_700_000_100,
    )
    .unwrap();

    let err = split_root(&mut ledger, &condition, &[set(0b010), set(0b100)], 25).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(
        ledger.position(&position_110).unwrap().active_value,
        amt(50)
    );
}
