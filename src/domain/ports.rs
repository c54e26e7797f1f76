use crate::domain::cycle::Cycle;
use crate::domain::group::Group;
use crate::domain::ledger::LedgerEntry;
use crate::domain::member::Member;
use crate::domain::money::Balance;
use crate::domain::wallet::Wallet;
use crate::domain::{GroupId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

pub type GroupStoreBox = Box<dyn GroupStore>;
pub type MemberStoreBox = Box<dyn MemberStore>;
pub type CycleStoreBox = Box<dyn CycleStore>;
pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type WalletStoreBox = Box<dyn WalletStore>;
pub type LockManagerBox = Box<dyn LockManager>;
pub type NotifierBox = Box<dyn Notifier>;

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get(&self, id: GroupId) -> Result<Option<Group>>;
    async fn put(&self, group: Group) -> Result<()>;
    async fn list_active(&self) -> Result<Vec<Group>>;
}

#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn members_of(&self, group_id: GroupId) -> Result<Vec<Member>>;
    async fn put(&self, member: Member) -> Result<()>;

    /// Assesses a defaulter fee as one atomic read-modify-write: if
    /// `fee_assessed_at` already stamps the period identified by
    /// `period_end`'s date, nothing changes and `false` comes back;
    /// otherwise `outstanding_debit` grows by `fee`, `cycles_missed` by one,
    /// and the stamp is set. Implementations must make the check-and-update
    /// race-free.
    async fn assess_fee(
        &self,
        group_id: GroupId,
        user_id: UserId,
        period_end: DateTime<Utc>,
        fee: Decimal,
    ) -> Result<bool>;
}

#[async_trait]
pub trait CycleStore: Send + Sync {
    async fn count_for(&self, group_id: GroupId) -> Result<usize>;
    async fn append(&self, cycle: Cycle) -> Result<()>;
    async fn list_for(&self, group_id: GroupId) -> Result<Vec<Cycle>>;
}

/// Outcome of an insert guarded by an idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same idempotency key already exists; the stored row
    /// comes back untouched.
    Existing(LedgerEntry),
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>>;
    async fn insert_if_absent(&self, entry: LedgerEntry) -> Result<InsertOutcome>;

    /// Replaces the stored row with the same uuid; fails if no such row
    /// exists.
    async fn update(&self, entry: LedgerEntry) -> Result<()>;
    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<LedgerEntry>>;
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, user_id: UserId) -> Result<Option<Wallet>>;
    async fn all(&self) -> Result<Vec<Wallet>>;

    /// Applies a signed delta (credit positive, debit negative) to the
    /// user's available balance, creating the wallet on first touch. A
    /// delta that would drive the balance negative fails with
    /// `InsufficientFunds` and changes nothing.
    async fn apply_delta(&self, user_id: UserId, delta: Decimal) -> Result<Balance>;
}

/// TTL-bounded mutual exclusion per group. Expiry is the only recovery if
/// a holder crashes; a zombie holder finishing after expiry is fenced by
/// ledger idempotency keys, not by the lock.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn try_acquire(&self, group_id: GroupId, ttl: Duration) -> Result<bool>;
    async fn release(&self, group_id: GroupId) -> Result<()>;
}

/// Fire-and-forget hooks invoked after successful fund movement. Delivery
/// is somebody else's problem; failures are logged, never propagated.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn payout_sent(
        &self,
        group_id: GroupId,
        user_id: UserId,
        cycle_number: u32,
        amount: Decimal,
    ) -> Result<()>;

    async fn fee_assessed(&self, group_id: GroupId, user_id: UserId, fee: Decimal) -> Result<()>;
}
