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
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family for group records.
pub const CF_GROUPS: &str = "groups";
/// Column family for membership rows, keyed `{group}:{user}`.
pub const CF_MEMBERS: &str = "members";
/// Column family for cycle records, keyed `{group}:{cycle}`.
pub const CF_CYCLES: &str = "cycles";
/// Column family for ledger entries, keyed by entry uuid.
pub const CF_LEDGER: &str = "ledger";
/// Column family mapping idempotency keys to ledger entry uuids.
pub const CF_LEDGER_KEYS: &str = "ledger_keys";
/// Column family for wallet balances.
pub const CF_WALLETS: &str = "wallets";

/// A persistent store backed by RocksDB, one column family per record type.
///
/// RocksDB has no multi-key transactions in the configuration used here, so
/// every conditional read-modify-write (idempotent ledger insert, fee
/// assessment, wallet delta) is serialized through an internal mutex. That
/// gives the same check-and-update atomicity the port contracts require.
///
/// `Clone` shares the underlying `Arc<DB>` and the mutex.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_guard: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a database at `path` with all column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [
            CF_GROUPS,
            CF_MEMBERS,
            CF_CYCLES,
            CF_LEDGER,
            CF_LEDGER_KEYS,
            CF_WALLETS,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_guard: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| EngineError::StorageError(format!("column family {name} not found")))
    }

    fn put_json<T: Serialize>(&self, cf: &ColumnFamily, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get_json<T: DeserializeOwned>(&self, cf: &ColumnFamily, key: &[u8]) -> Result<Option<T>> {
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All values in `cf` whose key starts with `prefix`, in key order.
    fn scan_prefix<T: DeserializeOwned>(&self, cf: &ColumnFamily, prefix: &[u8]) -> Result<Vec<T>> {
        let mut out = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }
}

/// Fixed-width keys so lexicographic order matches numeric order.
fn member_key(group_id: GroupId, user_id: UserId) -> Vec<u8> {
    format!("{group_id:020}:{user_id:020}").into_bytes()
}

fn member_prefix(group_id: GroupId) -> Vec<u8> {
    format!("{group_id:020}:").into_bytes()
}

fn cycle_key(group_id: GroupId, cycle_number: u32) -> Vec<u8> {
    format!("{group_id:020}:{cycle_number:010}").into_bytes()
}

#[async_trait]
impl GroupStore for RocksDbStore {
    async fn get(&self, id: GroupId) -> Result<Option<Group>> {
        self.get_json(self.cf(CF_GROUPS)?, &id.to_be_bytes())
    }

    async fn put(&self, group: Group) -> Result<()> {
        self.put_json(self.cf(CF_GROUPS)?, &group.id.to_be_bytes(), &group)
    }

    async fn list_active(&self) -> Result<Vec<Group>> {
        let cf = self.cf(CF_GROUPS)?;
        let mut active = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let group: Group = serde_json::from_slice(&value)?;
            if group.is_active() {
                active.push(group);
            }
        }
        // big-endian keys keep the iteration ordered by id already
        Ok(active)
    }
}

#[async_trait]
impl MemberStore for RocksDbStore {
    async fn members_of(&self, group_id: GroupId) -> Result<Vec<Member>> {
        self.scan_prefix(self.cf(CF_MEMBERS)?, &member_prefix(group_id))
    }

    async fn put(&self, member: Member) -> Result<()> {
        let key = member_key(member.group_id, member.user_id);
        self.put_json(self.cf(CF_MEMBERS)?, &key, &member)
    }

    async fn assess_fee(
        &self,
        group_id: GroupId,
        user_id: UserId,
        period_end: DateTime<Utc>,
        fee: Decimal,
    ) -> Result<bool> {
        let _guard = self.write_guard.lock().await;

        let cf = self.cf(CF_MEMBERS)?;
        let key = member_key(group_id, user_id);
        let mut member: Member = self.get_json(cf, &key)?.ok_or_else(|| {
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
        self.put_json(cf, &key, &member)?;
        Ok(true)
    }
}

#[async_trait]
impl CycleStore for RocksDbStore {
    async fn count_for(&self, group_id: GroupId) -> Result<usize> {
        Ok(self.list_for(group_id).await?.len())
    }

    async fn append(&self, cycle: Cycle) -> Result<()> {
        let key = cycle_key(cycle.group_id, cycle.cycle_number);
        self.put_json(self.cf(CF_CYCLES)?, &key, &cycle)
    }

    async fn list_for(&self, group_id: GroupId) -> Result<Vec<Cycle>> {
        self.scan_prefix(self.cf(CF_CYCLES)?, &member_prefix(group_id))
    }
}

#[async_trait]
impl LedgerStore for RocksDbStore {
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let keys_cf = self.cf(CF_LEDGER_KEYS)?;
        let Some(uuid) = self.db.get_cf(keys_cf, key.as_bytes())? else {
            return Ok(None);
        };
        self.get_json(self.cf(CF_LEDGER)?, &uuid)
    }

    async fn insert_if_absent(&self, entry: LedgerEntry) -> Result<InsertOutcome> {
        let _guard = self.write_guard.lock().await;

        let ledger_cf = self.cf(CF_LEDGER)?;
        let keys_cf = self.cf(CF_LEDGER_KEYS)?;

        if let Some(key) = &entry.idempotency_key {
            if let Some(uuid) = self.db.get_cf(keys_cf, key.as_bytes())? {
                let existing: LedgerEntry = self.get_json(ledger_cf, &uuid)?.ok_or_else(|| {
                    EngineError::StorageError(format!("dangling ledger key index for {key}"))
                })?;
                return Ok(InsertOutcome::Existing(existing));
            }
            self.db
                .put_cf(keys_cf, key.as_bytes(), entry.uuid.as_bytes())?;
        }
        self.put_json(ledger_cf, entry.uuid.as_bytes(), &entry)?;
        Ok(InsertOutcome::Inserted)
    }

    async fn update(&self, entry: LedgerEntry) -> Result<()> {
        let cf = self.cf(CF_LEDGER)?;
        if self.db.get_cf(cf, entry.uuid.as_bytes())?.is_none() {
            return Err(EngineError::StorageError(format!(
                "ledger entry {} not found",
                entry.uuid
            )));
        }
        self.put_json(cf, entry.uuid.as_bytes(), &entry)
    }

    async fn list_for_group(&self, group_id: GroupId) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let entry: LedgerEntry = serde_json::from_slice(&value)?;
            if entry.group_id == Some(group_id) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<LedgerEntry>> {
        let cf = self.cf(CF_LEDGER)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let entry: LedgerEntry = serde_json::from_slice(&value)?;
            if entry.user_id == user_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl WalletStore for RocksDbStore {
    async fn get(&self, user_id: UserId) -> Result<Option<Wallet>> {
        self.get_json(self.cf(CF_WALLETS)?, &user_id.to_be_bytes())
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        let cf = self.cf(CF_WALLETS)?;
        let mut wallets = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            wallets.push(serde_json::from_slice(&value)?);
        }
        Ok(wallets)
    }

    async fn apply_delta(&self, user_id: UserId, delta: Decimal) -> Result<Balance> {
        let _guard = self.write_guard.lock().await;

        let cf = self.cf(CF_WALLETS)?;
        let key = user_id.to_be_bytes();
        let mut wallet: Wallet = self.get_json(cf, &key)?.unwrap_or_else(|| Wallet::new(user_id));
        if delta >= Decimal::ZERO {
            wallet.credit(delta);
        } else {
            wallet.debit(Amount::try_from(-delta)?)?;
        }
        self.put_json(cf, &key, &wallet)?;
        Ok(wallet.available)
    }
}
