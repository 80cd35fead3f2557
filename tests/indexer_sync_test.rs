//! End-to-end: mock feed → indexer → repository, including restart from a
//! persisted checkpoint and halting on a rejected event.

use std::sync::Arc;

use condexer::datasource::MockEventSource;
use condexer::db::{init_db, Repository};
use condexer::domain::{
    ids, Address, Amount, Bytes32, CollectionId, Event, EventKey, IndexSet, Provenance,
};
use condexer::orchestration::{IndexError, Indexer};
use tempfile::TempDir;

fn addr(byte: u8) -> Address {
    Address([byte; 20])
}

fn provenance(block: u64) -> Provenance {
    Provenance {
        tx_hash: Bytes32([block as u8; 32]),
        tx_from: addr(0xaa),
        block_number: block,
        tx_index: 0,
        log_index: 0,
        timestamp: 1_700_000_000 + block as i64,
        emitter: addr(0xcc),
    }
}

const ALICE: u8 = 0x11;
const BOB: u8 = 0x22;
const COLLATERAL: u8 = 0x99;

fn oracle() -> Address {
    addr(1)
}

fn question() -> Bytes32 {
    Bytes32([1; 32])
}

fn sample_events() -> Vec<Event> {
    let condition = ids::condition_id(&oracle(), &question(), 2);
    let root = CollectionId::zero();
    let position_01 = ids::position_id(
        &addr(COLLATERAL),
        &ids::collection_id(&root, &condition, IndexSet::from_bits(0b01)),
    );
    vec![
        Event::ConditionPreparation {
            oracle: oracle(),
            question_id: question(),
            outcome_slot_count: 2,
            provenance: provenance(1),
        },
        Event::PositionSplit {
            stakeholder: addr(ALICE),
            collateral_token: addr(COLLATERAL),
            parent_collection_id: root,
            condition_id: condition,
            partition: vec![IndexSet::from_bits(0b01), IndexSet::from_bits(0b10)],
            amount: Amount::new(50),
            provenance: provenance(2),
        },
        Event::TransferSingle {
            operator: addr(ALICE),
            from: addr(ALICE),
            to: addr(BOB),
            position_id: position_01,
            value: Amount::new(20),
            provenance: provenance(3),
        },
    ]
}

async fn open_repo(temp_dir: &TempDir) -> Arc<Repository> {
    let db_path = temp_dir
        .path()
        .join("indexer.db")
        .to_string_lossy()
        .to_string();
    Arc::new(Repository::new(init_db(&db_path).await.unwrap()))
}

#[tokio::test]
async fn test_sync_applies_and_persists_batches() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir).await;
    let source = Arc::new(MockEventSource::new(sample_events()));
    let indexer = Indexer::from_repository(source, repo.clone()).await.unwrap();

    // Two batches of two: 2 events, then 1, then drained.
    assert_eq!(indexer.sync_once(2).await.unwrap(), 2);
    assert_eq!(indexer.sync_once(2).await.unwrap(), 1);
    assert_eq!(indexer.sync_once(2).await.unwrap(), 0);

    assert_eq!(
        repo.get_checkpoint().await.unwrap(),
        Some(EventKey::new(3, 0, 0))
    );

    let condition = ids::condition_id(&oracle(), &question(), 2);
    let root = CollectionId::zero();
    let position_01 = ids::position_id(
        &addr(COLLATERAL),
        &ids::collection_id(&root, &condition, IndexSet::from_bits(0b01)),
    );

    let position = repo.get_position(&position_01).await.unwrap().unwrap();
    assert_eq!(position.active_value, Amount::new(50));

    let alice_up = repo
        .get_user_position(&ids::user_position_id(&addr(ALICE), &position_01))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice_up.balance, Amount::new(30));

    let bob_positions = repo.query_user_positions(&addr(BOB)).await.unwrap();
    assert_eq!(bob_positions.len(), 1);
    assert_eq!(bob_positions[0].balance, Amount::new(20));

    let collateral = repo.get_collateral(&addr(COLLATERAL)).await.unwrap().unwrap();
    assert_eq!(collateral.split_amount, Amount::new(50));
}

#[tokio::test]
async fn test_restart_resumes_from_checkpoint() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir).await;

    {
        let source = Arc::new(MockEventSource::new(sample_events()[..2].to_vec()));
        let indexer = Indexer::from_repository(source, repo.clone()).await.unwrap();
        assert_eq!(indexer.sync_once(10).await.unwrap(), 2);
    }

    // A new indexer over the same database picks up after block 2 and only
    // applies the transfer.
    let source = Arc::new(MockEventSource::new(sample_events()));
    let indexer = Indexer::from_repository(source, repo.clone()).await.unwrap();
    assert_eq!(indexer.sync_once(10).await.unwrap(), 1);
    assert_eq!(
        repo.get_checkpoint().await.unwrap(),
        Some(EventKey::new(3, 0, 0))
    );

    let condition = ids::condition_id(&oracle(), &question(), 2);
    let position_01 = ids::position_id(
        &addr(COLLATERAL),
        &ids::collection_id(&CollectionId::zero(), &condition, IndexSet::from_bits(0b01)),
    );
    let alice_up = repo
        .get_user_position(&ids::user_position_id(&addr(ALICE), &position_01))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice_up.balance, Amount::new(30));
}

#[tokio::test]
async fn test_rejected_event_halts_with_prefix_persisted() {
    let temp_dir = TempDir::new().unwrap();
    let repo = open_repo(&temp_dir).await;

    let mut events = sample_events();
    // A split against a condition nobody prepared.
    events.push(Event::PositionSplit {
        stakeholder: addr(ALICE),
        collateral_token: addr(COLLATERAL),
        parent_collection_id: CollectionId::zero(),
        condition_id: condexer::domain::ConditionId(Bytes32([0x66; 32])),
        partition: vec![IndexSet::from_bits(0b01), IndexSet::from_bits(0b10)],
        amount: Amount::new(5),
        provenance: provenance(4),
    });

    let source = Arc::new(MockEventSource::new(events));
    let indexer = Indexer::from_repository(source, repo.clone()).await.unwrap();

    let err = indexer.sync_once(10).await.unwrap_err();
    assert!(matches!(err, IndexError::Ledger(_)));

    // The good prefix landed; the checkpoint stops before the bad event.
    assert_eq!(
        repo.get_checkpoint().await.unwrap(),
        Some(EventKey::new(3, 0, 0))
    );
    let collateral = repo.get_collateral(&addr(COLLATERAL)).await.unwrap().unwrap();
    assert_eq!(collateral.split_amount, Amount::new(50));
}
