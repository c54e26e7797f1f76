use crate::domain::period::Period;
use crate::domain::{GroupId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    #[default]
    Member,
}

/// A user's membership row in a group.
///
/// `fee_assessed_at` is the idempotency stamp for defaulter fees: once it
/// lands inside a given period it must never be stamped again for that
/// period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: Option<DateTime<Utc>>,
    /// Running contribution for the current period.
    pub contributed: Decimal,
    /// Lifetime contributions.
    pub total_contributed: Decimal,
    pub last_payment_at: Option<DateTime<Utc>>,
    /// Accumulated unpaid defaulter fees.
    pub outstanding_debit: Decimal,
    pub cycles_missed: u32,
    pub fee_assessed_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(group_id: GroupId, user_id: UserId) -> Self {
        Self {
            group_id,
            user_id,
            role: MemberRole::Member,
            joined_at: None,
            contributed: Decimal::ZERO,
            total_contributed: Decimal::ZERO,
            last_payment_at: None,
            outstanding_debit: Decimal::ZERO,
            cycles_missed: 0,
            fee_assessed_at: None,
        }
    }

    /// Whether the member has a successful payment inside the period.
    pub fn paid_within(&self, period: &Period) -> bool {
        match self.last_payment_at {
            Some(at) => period.contains(at),
            None => false,
        }
    }

    /// Whether a defaulter fee was already assessed for the period ending
    /// at `period_end`. The stamp is compared by end date, the canonical
    /// period identifier.
    pub fn fee_assessed_on(&self, period_end: DateTime<Utc>) -> bool {
        match self.fee_assessed_at {
            Some(at) => at.date_naive() == period_end.date_naive(),
            None => false,
        }
    }
}
