//! Thread-safe in-memory store adapters.
//!
//! Each store shares its state behind `Arc<RwLock<_>>`, so cloning a store
//! yields another handle onto the same data. Used by tests and the
//! scenario-driven CLI; the RocksDB adapter covers persistence.

use crate::domain::cycle::Cycle;
use crate::domain::group::Group;
use crate::domain::ledger::LedgerEntry;
use crate::domain::member::Member;
use crate::domain::money::{Amount, Balance};
use crate::domain::ports::{
    CycleStore, GroupStore, InsertOutcome, LedgerStore, MemberStore, WalletStore,
};
use crate::domain::wallet::Wallet;
use crate::domain::{GroupId, UserId};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default, Clone)]
pub struct InMemoryGroupStore {
    groups: Arc<RwLock<HashMap<GroupId, Group>>>,
}

impl InMemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for InMemoryGroupStore {
    async fn get(&self, id: GroupId) -> Result<Option<Group>> {
        let groups = self.groups.read().await;
        Ok(groups.get(&id).cloned())
    }

    async fn put(&self, group: Group) -> Result<()> {
        let mut groups = self.groups.write().await;
        groups.insert(group.id, group);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<Group>> {
        let groups = self.groups.read().await;
        let mut active: Vec<Group> = groups.values().filter(|g| g.is_active()).cloned().collect();
        active.sort_by_key(|g| g.id);
        Ok(active)
    }
}

/// Memberships kept as an ordered list per group so insertion order is
/// preserved for rotational tie-breaks.
#[derive(Default, Clone)]
pub struct InMemoryMemberStore {
    members: Arc<RwLock<HashMap<GroupId, Vec<Member>>>>,
}

impl InMemoryMemberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemberStore for InMemoryMemberStore {
    async fn members_of(&self, group_id: GroupId) -> Result<Vec<Member>> {
        let members = self.members.read().await;
        Ok(members.get(&group_id).cloned().unwrap_or_default())
    }

    async fn put(&self, member: Member) -> Result<()> {
        let mut members = self.members.write().await;
        let rows = members.entry(member.group_id).or_default();
        match rows.iter_mut().find(|m| m.user_id == member.user_id) {
            Some(existing) => *existing = member,
            None => rows.push(member),
        }
        Ok(())
    }

    async fn assess_fee(
        &self,
        group_id: GroupId,
        user_id: UserId,
        period_end: DateTime<Utc>,
        fee: Decimal,
    ) -> Result<bool> {
        // check and update both happen under the write guard
        let mut members = self.members.write().await;
        let member = members
            .get_mut(&group_id)
            .and_then(|rows| rows.iter_mut().find(|m| m.user_id == user_id))
            .ok_or_else(|| {
                EngineError::ValidationError(format!(
                    "user {user_id} is not a member of group {group_id}"
                ))
            })?;

        if member.fee_assessed_on(period_end) {
            return Ok(false);
        }

        member.outstanding_debit += fee;
        member.cycles_missed += 1;
        member.fee_assessed_at = Some(period_end);
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCycleStore {
    cycles: Arc<RwLock<HashMap<GroupId, Vec<Cycle>>>>,
}

impl InMemoryCycleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CycleStore for InMemoryCycleStore {
    async fn count_for(&self, group_id: GroupId) -> Result<usize> {
        let cycles = self.cycles.read().await;
        Ok(cycles.get(&group_id).map_or(0, Vec::len))
    }

    async fn append(&self, cycle: Cycle) -> Result<()> {
        let mut cycles = self.cycles.write().await;
        cycles.entry(cycle.group_id).or_default().push(cycle);
        Ok(())
    }

    async fn list_for(&self, group_id: GroupId) -> Result<Vec<Cycle>> {
        let cycles = self.cycles.read().await;
        Ok(cycles.get(&group_id).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    by_key: HashMap<String, usize>,
}

#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state.by_key.get(key).map(|&i| state.entries[i].clone()))
    }

    async fn insert_if_absent(&self, entry: LedgerEntry) -> Result<InsertOutcome> {
        let mut state = self.state.write().await;
        if let Some(key) = &entry.idempotency_key {
            if let Some(&i) = state.by_key.get(key) {
                return Ok(InsertOutcome::Existing(state.entries[i].clone()));
            }
            let idx = state.entries.len();
            state.by_key.insert(key.clone(), idx);
        }
        state.entries.push(entry);
        Ok(InsertOutcome::Inserted)
    }

    async fn update(&self, entry: LedgerEntry) -> Result<()> {
        let mut state = self.state.write().await;
        match state.entries.iter_mut().find(|e| e.uuid == entry.uuid) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(EngineError::StorageError(format!(
                "ledger entry {} not found",
                entry.uuid
            ))),
        }
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<RwLock<HashMap<UserId, Wallet>>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Wallet>> {
        let wallets = self.wallets.read().await;
        Ok(wallets.get(&user_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        let wallets = self.wallets.read().await;
        let mut all: Vec<Wallet> = wallets.values().cloned().collect();
        all.sort_by_key(|w| w.user_id);
        Ok(all)
    }

    async fn apply_delta(&self, user_id: UserId, delta: Decimal) -> Result<Balance> {
        let mut wallets = self.wallets.write().await;
        let wallet = wallets.entry(user_id).or_insert_with(|| Wallet::new(user_id));
        if delta >= Decimal::ZERO {
            wallet.credit(delta);
        } else {
            wallet.debit(Amount::try_from(-delta)?)?;
        }
        Ok(wallet.available)
    }
}
