use ajopool::application::ledger_writer::LedgerWriter;
use ajopool::application::processor::CycleProcessor;
use ajopool::application::scheduler::CycleScheduler;
use ajopool::config::EngineConfig;
use ajopool::domain::group::{Frequency, Group, GroupStatus, PayoutPolicy};
use ajopool::domain::member::Member;
use ajopool::domain::money::Balance;
use ajopool::infrastructure::in_memory::{
    InMemoryCycleStore, InMemoryGroupStore, InMemoryLedgerStore, InMemoryMemberStore,
    InMemoryWalletStore,
};
use ajopool::infrastructure::lock::InMemoryLockManager;
use ajopool::infrastructure::notify::RecordingNotifier;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Shared in-memory stores plus factories for the processor and scheduler
/// wired onto them. Cloning a store hands out another handle onto the same
/// state, so assertions can read what the engine wrote.
pub struct Harness {
    pub groups: InMemoryGroupStore,
    pub members: InMemoryMemberStore,
    pub cycles: InMemoryCycleStore,
    pub ledger: InMemoryLedgerStore,
    pub wallets: InMemoryWalletStore,
    pub locks: InMemoryLockManager,
    pub notifier: RecordingNotifier,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            groups: InMemoryGroupStore::new(),
            members: InMemoryMemberStore::new(),
            cycles: InMemoryCycleStore::new(),
            ledger: InMemoryLedgerStore::new(),
            wallets: InMemoryWalletStore::new(),
            locks: InMemoryLockManager::new(),
            notifier: RecordingNotifier::new(),
        }
    }

    pub fn processor(&self) -> CycleProcessor {
        self.processor_with(EngineConfig::default())
    }

    pub fn processor_with(&self, config: EngineConfig) -> CycleProcessor {
        let writer = LedgerWriter::new(
            Box::new(self.ledger.clone()),
            Box::new(self.wallets.clone()),
            Box::new(self.members.clone()),
        );
        CycleProcessor::new(
            Box::new(self.groups.clone()),
            Box::new(self.members.clone()),
            Box::new(self.cycles.clone()),
            writer,
            Box::new(self.locks.clone()),
            Box::new(self.notifier.clone()),
            config,
        )
    }

    pub fn scheduler(&self) -> CycleScheduler {
        CycleScheduler::new(
            Box::new(self.groups.clone()),
            Box::new(self.cycles.clone()),
            self.processor(),
            EngineConfig::default(),
        )
    }
}

pub fn monthly_group(id: u64, saved: Decimal) -> Group {
    Group {
        id,
        owner_id: 100,
        name: format!("ajo {id}"),
        goal: None,
        saved: Balance::new(saved),
        frequency: Frequency::Monthly,
        status: GroupStatus::Active,
        start_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        created_at: None,
        payout_policy: PayoutPolicy::Rotational,
        max_members: None,
        contribution_per_member: Some(Decimal::from(50)),
    }
}

pub fn member(group_id: u64, user_id: u64, joined: &str) -> Member {
    let mut m = Member::new(group_id, user_id);
    m.joined_at = Some(at(joined));
    m
}

pub fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}
