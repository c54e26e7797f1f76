#![cfg(feature = "storage-rocksdb")]

use ajopool::application::ledger_writer::LedgerWriter;
use ajopool::application::processor::CycleProcessor;
use ajopool::config::EngineConfig;
use ajopool::domain::group::{Frequency, Group, GroupStatus, PayoutPolicy};
use ajopool::domain::member::Member;
use ajopool::domain::money::Balance;
use ajopool::domain::ports::{
    CycleStore, GroupStore, LedgerStore, MemberStore, WalletStore,
};
use ajopool::infrastructure::lock::InMemoryLockManager;
use ajopool::infrastructure::notify::LogNotifier;
use ajopool::infrastructure::rocksdb::RocksDbStore;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;
use tempfile::tempdir;

fn processor_over(store: &RocksDbStore) -> CycleProcessor {
    let writer = LedgerWriter::new(
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store.clone()),
    );
    CycleProcessor::new(
        Box::new(store.clone()),
        Box::new(store.clone()),
        Box::new(store.clone()),
        writer,
        Box::new(InMemoryLockManager::new()),
        Box::new(LogNotifier::new()),
        EngineConfig::default(),
    )
}

fn group() -> Group {
    Group {
        id: 1,
        owner_id: 100,
        name: "persistent ajo".to_string(),
        goal: None,
        saved: Balance::new(dec!(150)),
        frequency: Frequency::Monthly,
        status: GroupStatus::Active,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        created_at: None,
        payout_policy: PayoutPolicy::Rotational,
        max_members: None,
        contribution_per_member: Some(dec!(50)),
    }
}

fn joined(group_id: u64, user_id: u64, at: &str) -> Member {
    let mut m = Member::new(group_id, user_id);
    m.joined_at = Some(at.parse().unwrap());
    m
}

#[tokio::test]
async fn test_payout_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let now: DateTime<Utc> = "2025-02-20T12:00:00Z".parse().unwrap();

    {
        let store = RocksDbStore::open(dir.path()).unwrap();
        GroupStore::put(&store, group()).await.unwrap();
        MemberStore::put(&store, joined(1, 10, "2025-01-01T00:00:00Z")).await.unwrap();
        MemberStore::put(&store, joined(1, 20, "2025-01-02T00:00:00Z")).await.unwrap();

        let outcome = processor_over(&store).run(1, now).await.unwrap();
        assert!(outcome.is_committed());
    }

    // fresh handle onto the same files
    let store = RocksDbStore::open(dir.path()).unwrap();

    let cycles = store.list_for(1).await.unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].recipient, 10);
    assert_eq!(cycles[0].amount, dec!(150.00));

    let wallet = WalletStore::get(&store, 10).await.unwrap().unwrap();
    assert_eq!(wallet.available, Balance::new(dec!(150.00)));

    let group = GroupStore::get(&store, 1).await.unwrap().unwrap();
    assert_eq!(group.saved, Balance::ZERO);

    let entries = store.list_for_group(1).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_success());
}

#[tokio::test]
async fn test_replayed_run_against_reopened_store_is_noop() {
    let dir = tempdir().unwrap();
    let now: DateTime<Utc> = "2025-02-20T12:00:00Z".parse().unwrap();

    {
        let store = RocksDbStore::open(dir.path()).unwrap();
        GroupStore::put(&store, group()).await.unwrap();
        MemberStore::put(&store, joined(1, 10, "2025-01-01T00:00:00Z")).await.unwrap();
        processor_over(&store).run(1, now).await.unwrap();
    }

    let store = RocksDbStore::open(dir.path()).unwrap();
    let outcome = processor_over(&store).run(1, now).await.unwrap();
    assert!(!outcome.is_committed());

    assert_eq!(store.count_for(1).await.unwrap(), 1);
    assert_eq!(
        WalletStore::get(&store, 10).await.unwrap().unwrap().available,
        Balance::new(dec!(150.00))
    );
}
