use crate::domain::ledger::{Direction, LedgerEntry};
use crate::domain::ports::{InsertOutcome, LedgerStoreBox, MemberStoreBox, WalletStoreBox};
use crate::domain::{GroupId, UserId};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Idempotent writer for monetary records.
///
/// Every write follows the same discipline: look the idempotency key up
/// first, and only when no row exists insert the entry and move the wallet
/// balance in the same unit. A replay gets the stored row back untouched,
/// with no second balance movement.
pub struct LedgerWriter {
    ledger: LedgerStoreBox,
    wallets: WalletStoreBox,
    members: MemberStoreBox,
}

impl LedgerWriter {
    pub fn new(ledger: LedgerStoreBox, wallets: WalletStoreBox, members: MemberStoreBox) -> Self {
        Self {
            ledger,
            wallets,
            members,
        }
    }

    /// Records `entry` and applies its signed net amount to the user's
    /// wallet. Returns the stored entry and whether this call applied it
    /// (`false` means a successful entry with the same key already existed).
    ///
    /// A debit that would overdraw the wallet fails before anything is
    /// written, so no partial state survives.
    ///
    /// A credit goes in as pending first, then the balance moves, then the
    /// row is marked successful. A crash between the insert and the balance
    /// move leaves a pending row behind, and a replay of the same key
    /// settles it instead of dropping the credit.
    pub async fn record(
        &self,
        mut entry: LedgerEntry,
        now: DateTime<Utc>,
    ) -> Result<(LedgerEntry, bool)> {
        if let Some(key) = entry.idempotency_key.clone() {
            if let Some(existing) = self.ledger.find_by_idempotency_key(&key).await? {
                if existing.is_success() {
                    tracing::info!(key, "ledger entry already exists, skipping");
                    return Ok((existing, false));
                }
                tracing::info!(key, "settling a stalled ledger entry");
                return self.settle(existing, now).await;
            }
        }

        match entry.direction {
            Direction::Debit => {
                entry.mark_success(now)?;
                // debit first: an overdraft must leave no entry behind
                self.wallets.apply_delta(entry.user_id, entry.signed_net()).await?;
                match self.ledger.insert_if_absent(entry.clone()).await? {
                    InsertOutcome::Inserted => Ok((entry, true)),
                    InsertOutcome::Existing(existing) => {
                        // lost a key race after our lookup; undo the debit
                        self.wallets
                            .apply_delta(entry.user_id, -entry.signed_net())
                            .await?;
                        Ok((existing, false))
                    }
                }
            }
            Direction::Credit => match self.ledger.insert_if_absent(entry.clone()).await? {
                InsertOutcome::Inserted => self.settle(entry, now).await,
                InsertOutcome::Existing(existing) if existing.is_success() => Ok((existing, false)),
                InsertOutcome::Existing(existing) => self.settle(existing, now).await,
            },
        }
    }

    /// Second half of a credit: move the balance and mark the stored row
    /// successful. The row must already be in the store.
    async fn settle(
        &self,
        mut entry: LedgerEntry,
        now: DateTime<Utc>,
    ) -> Result<(LedgerEntry, bool)> {
        self.wallets.apply_delta(entry.user_id, entry.signed_net()).await?;
        entry.mark_success(now)?;
        self.ledger.update(entry.clone()).await?;
        Ok((entry, true))
    }

    /// Wallet mutation interface: credit `amount` to the user.
    pub async fn credit(&self, entry: LedgerEntry, now: DateTime<Utc>) -> Result<(LedgerEntry, bool)> {
        if entry.direction != Direction::Credit {
            return Err(EngineError::ValidationError(
                "credit entry must have credit direction".to_string(),
            ));
        }
        self.record(entry, now).await
    }

    /// Wallet mutation interface: debit `amount` from the user, failing
    /// with `InsufficientFunds` when the wallet cannot cover it.
    pub async fn debit(&self, entry: LedgerEntry, now: DateTime<Utc>) -> Result<(LedgerEntry, bool)> {
        if entry.direction != Direction::Debit {
            return Err(EngineError::ValidationError(
                "debit entry must have debit direction".to_string(),
            ));
        }
        self.record(entry, now).await
    }

    /// Assesses a defaulter fee at most once per member per period. Returns
    /// whether the fee was applied by this call.
    pub async fn assess_fee(
        &self,
        group_id: GroupId,
        user_id: UserId,
        period_end: DateTime<Utc>,
        fee: Decimal,
    ) -> Result<bool> {
        if fee <= Decimal::ZERO {
            return Ok(false);
        }
        let applied = self
            .members
            .assess_fee(group_id, user_id, period_end, fee)
            .await?;
        if applied {
            tracing::info!(group_id, user_id, %fee, period = %period_end.date_naive(), "assessed defaulter fee");
        }
        Ok(applied)
    }
}
