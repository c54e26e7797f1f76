use crate::domain::{GroupId, UserId};
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Charge,
    Payout,
    Refund,
    Topup,
    Transfer,
}

/// Direction relative to the user's wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// Entry lifecycle. Transitions only move forward; a failed entry is
/// retried by creating a new attempt, never by winding the status back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Cancelled,
}

impl EntryStatus {
    fn rank(self) -> u8 {
        match self {
            EntryStatus::Pending => 0,
            EntryStatus::Processing => 1,
            EntryStatus::Success | EntryStatus::Failed | EntryStatus::Cancelled => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 2
    }

    pub fn can_advance_to(self, next: EntryStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Processing => "processing",
            EntryStatus::Success => "success",
            EntryStatus::Failed => "failed",
            EntryStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A monetary record. At most one entry exists per idempotency key; the
/// ledger writer looks keys up before every insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub uuid: Uuid,
    pub reference: String,
    pub idempotency_key: Option<String>,
    pub user_id: UserId,
    pub group_id: Option<GroupId>,
    pub amount: Decimal,
    pub fee: Decimal,
    /// Always `amount - fee`.
    pub net_amount: Decimal,
    pub currency: String,
    pub r#type: EntryType,
    pub direction: Direction,
    pub status: EntryStatus,
    pub attempts: u32,
    pub meta: HashMap<String, String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LedgerEntry {
    pub fn new(
        user_id: UserId,
        amount: Decimal,
        fee: Decimal,
        currency: &str,
        r#type: EntryType,
        direction: Direction,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            reference: String::new(),
            idempotency_key: None,
            user_id,
            group_id: None,
            amount,
            fee,
            net_amount: amount - fee,
            currency: currency.to_string(),
            r#type,
            direction,
            status: EntryStatus::Pending,
            attempts: 0,
            meta: HashMap::new(),
            scheduled_at: None,
            processed_at: None,
            expires_at: None,
        }
    }

    /// A cycle payout credit, keyed so a replayed run cannot credit twice.
    pub fn payout(
        group_id: GroupId,
        user_id: UserId,
        cycle_number: u32,
        amount: Decimal,
        currency: &str,
    ) -> Self {
        let mut entry = Self::new(user_id, amount, Decimal::ZERO, currency, EntryType::Payout, Direction::Credit);
        entry.group_id = Some(group_id);
        entry.reference = format!("payout:group:{group_id}:user:{user_id}:cycle:{cycle_number}");
        entry.idempotency_key = Some(payout_idempotency_key(group_id, user_id, cycle_number));
        entry.meta.insert("note".to_string(), "payout".to_string());
        entry
    }

    /// The signed wallet delta this entry carries once successful.
    pub fn signed_net(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.net_amount,
            Direction::Debit => -self.net_amount,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EntryStatus::Success
    }

    pub fn mark_processing(&mut self) -> Result<(), EngineError> {
        self.advance(EntryStatus::Processing)?;
        self.attempts += 1;
        Ok(())
    }

    pub fn mark_success(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.advance(EntryStatus::Success)?;
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.advance(EntryStatus::Failed)?;
        self.processed_at = Some(now);
        Ok(())
    }

    fn advance(&mut self, next: EntryStatus) -> Result<(), EngineError> {
        if !self.status.can_advance_to(next) {
            return Err(EngineError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Canonical payout key; one successful credit per (group, user, cycle).
pub fn payout_idempotency_key(group_id: GroupId, user_id: UserId, cycle_number: u32) -> String {
    format!("payout_group_{group_id}_user_{user_id}_cycle_{cycle_number}")
}
