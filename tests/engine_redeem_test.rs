use condexer::domain::{
    ids, Address, Amount, Bytes32, CollectionId, ConditionId, IndexSet, Provenance,
};
use condexer::engine::{
    handle_condition_preparation, handle_condition_resolution, handle_redeem, handle_split,
    handle_transfer_single, Ledger, LedgerError,
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

fn resolve(ledger: &mut Ledger, oracle: u8, question: u8, payouts: &[u128]) {
    handle_condition_resolution(
        ledger,
        &addr(oracle),
        &Bytes32([question; 32]),
        payouts.len() as u32,
        payouts,
        &provenance(),
    )
    .unwrap();
}

fn balance_of(ledger: &Ledger, user: u8, collection: &CollectionId) -> Amount {
    let position_id = ids::position_id(&addr(COLLATERAL), collection);
    let upid = ids::user_position_id(&addr(user), &position_id);
    ledger
        .user_position(&upid)
        .map(|up| up.balance)
        .unwrap_or(Amount::ZERO)
}

fn active_of(ledger: &Ledger, collection: &CollectionId) -> Amount {
    let position_id = ids::position_id(&addr(COLLATERAL), collection);
    ledger
        .position(&position_id)
        .map(|p| p.active_value)
        .unwrap_or(Amount::ZERO)
}

#[test]
fn test_root_redeem_pays_winner_and_zeroes_loser() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 3);
    let root = CollectionId::zero();

    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b110), set(0b001)],
        amt(50),
        1_700_000_000,
    )
    .unwrap();

    resolve(&mut ledger, 1, 1, &[0, 1, 1]);

    handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b110), set(0b001)],
        1_700_000_100,
    )
    .unwrap();

    let col_110 = ids::collection_id(&root, &condition, set(0b110));
    let col_001 = ids::collection_id(&root, &condition, set(0b001));

    // 0b110 spans the two winning slots: payout 50 * (1+1) / 2 = 50.
    // 0b001 lost: zeroed with no payout.
    assert_eq!(balance_of(&ledger, ALICE, &col_110), Amount::ZERO);
    assert_eq!(balance_of(&ledger, ALICE, &col_001), Amount::ZERO);
    assert_eq!(active_of(&ledger, &col_110), Amount::ZERO);
    assert_eq!(active_of(&ledger, &col_001), Amount::ZERO);
    assert_eq!(
        ledger.collateral(&addr(COLLATERAL)).unwrap().redeemed_amount,
        amt(50)
    );
}

#[test]
fn test_redeem_divides_exactly_with_truncation() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();

    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01), set(0b10)],
        amt(100),
        1_700_000_000,
    )
    .unwrap();

    // A 2:1 payout split across the two slots.
    resolve(&mut ledger, 1, 1, &[2, 1]);

    handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01), set(0b10)],
        1_700_000_100,
    )
    .unwrap();

    // 100*2/3 + 100*1/3 = 66 + 33, each truncated separately.
    assert_eq!(
        ledger.collateral(&addr(COLLATERAL)).unwrap().redeemed_amount,
        amt(99)
    );
}

#[test]
fn test_nested_redeem_credits_parent_position() {
    let mut ledger = Ledger::new();
    let c1 = prepare(&mut ledger, 1, 1, 2);
    let c2 = prepare(&mut ledger, 2, 2, 2);
    let root = CollectionId::zero();

    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &c1,
        &[set(0b01), set(0b10)],
        amt(100),
        1_700_000_000,
    )
    .unwrap();

    let parent = ids::collection_id(&root, &c1, set(0b01));
    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &parent,
        &c2,
        &[set(0b01), set(0b10)],
        amt(40),
        1_700_000_100,
    )
    .unwrap();
    assert_eq!(active_of(&ledger, &parent), amt(60));

    resolve(&mut ledger, 2, 2, &[1, 0]);

    handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &parent,
        &c2,
        &[set(0b01), set(0b10)],
        1_700_000_200,
    )
    .unwrap();

    // The winning nested slice pays back into the parent position.
    assert_eq!(active_of(&ledger, &parent), amt(100));
    assert_eq!(balance_of(&ledger, ALICE, &parent), amt(100));
    let nested_win = ids::collection_id(&parent, &c2, set(0b01));
    let nested_lose = ids::collection_id(&parent, &c2, set(0b10));
    assert_eq!(active_of(&ledger, &nested_win), Amount::ZERO);
    assert_eq!(active_of(&ledger, &nested_lose), Amount::ZERO);
    // Nested redemption does not touch collateral counters.
    assert_eq!(
        ledger.collateral(&addr(COLLATERAL)).unwrap().redeemed_amount,
        Amount::ZERO
    );
}

#[test]
fn test_redeem_before_resolution_rejected() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();

    let err = handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01)],
        1_700_000_000,
    )
    .unwrap_err();
    assert_eq!(err, LedgerError::ConditionNotResolved(condition));
}

#[test]
fn test_redeem_with_no_holdings_is_noop() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();
    resolve(&mut ledger, 1, 1, &[1, 0]);

    // Bob never held anything under this condition.
    handle_redeem(
        &mut ledger,
        &addr(BOB),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01), set(0b10)],
        1_700_000_000,
    )
    .unwrap();

    assert!(ledger.collateral(&addr(COLLATERAL)).is_none());
    // The redeemer is still recorded as a participant.
    assert!(ledger
        .user(&addr(BOB))
        .unwrap()
        .participated_conditions
        .contains(&condition));
}

#[test]
fn test_redeem_twice_second_is_noop() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();

    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01), set(0b10)],
        amt(30),
        1_700_000_000,
    )
    .unwrap();
    resolve(&mut ledger, 1, 1, &[1, 1]);

    for _ in 0..2 {
        handle_redeem(
            &mut ledger,
            &addr(ALICE),
            &addr(COLLATERAL),
            &root,
            &condition,
            &[set(0b01), set(0b10)],
            1_700_000_100,
        )
        .unwrap();
    }

    assert_eq!(
        ledger.collateral(&addr(COLLATERAL)).unwrap().redeemed_amount,
        amt(30)
    );
}

#[test]
fn test_redeem_only_affects_redeemer_balances() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();

    handle_split(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01), set(0b10)],
        amt(30),
        1_700_000_000,
    )
    .unwrap();

    // Alice hands a third of the winning slice to Bob before resolution.
    let col_01 = ids::collection_id(&root, &condition, set(0b01));
    let position_01 = ids::position_id(&addr(COLLATERAL), &col_01);
    handle_transfer_single(
        &mut ledger,
        &addr(ALICE),
        &addr(BOB),
        &position_01,
        amt(10),
        1_700_000_050,
    )
    .unwrap();

    resolve(&mut ledger, 1, 1, &[1, 0]);
    handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b01)],
        1_700_000_100,
    )
    .unwrap();

    assert_eq!(balance_of(&ledger, ALICE, &col_01), Amount::ZERO);
    assert_eq!(balance_of(&ledger, BOB, &col_01), amt(10));
    assert_eq!(active_of(&ledger, &col_01), amt(10));
    assert_eq!(
        ledger.collateral(&addr(COLLATERAL)).unwrap().redeemed_amount,
        amt(20)
    );
}

#[test]
fn test_redeem_rejects_out_of_range_index_set() {
    let mut ledger = Ledger::new();
    let condition = prepare(&mut ledger, 1, 1, 2);
    let root = CollectionId::zero();
    resolve(&mut ledger, 1, 1, &[1, 0]);

    let err = handle_redeem(
        &mut ledger,
        &addr(ALICE),
        &addr(COLLATERAL),
        &root,
        &condition,
        &[set(0b100)],
        1_700_000_000,
    )
    .unwrap_err();
    assert!(matches!(err, LedgerError::IndexSetOutOfRange { .. }));
}
