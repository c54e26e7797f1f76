use crate::domain::{GroupId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One disbursement event for a group. Append-only: created once per
/// recipient per processing run, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub group_id: GroupId,
    /// Monotonic per group: existing cycle count + 1 at creation time.
    pub cycle_number: u32,
    pub recipient: UserId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub amount: Decimal,
}
