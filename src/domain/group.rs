use crate::domain::money::{Balance, round_money};
use crate::domain::{GroupId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contribution cadence of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    Daily,
    Weekly,
    #[serde(alias = "bi_weekly", alias = "biweekly")]
    BiWeekly,
    #[default]
    Monthly,
}

impl Frequency {
    /// Resolves a raw frequency string, falling back to monthly for anything
    /// unrecognized. The fallback is logged so bad data stays visible.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.parse() {
            Ok(frequency) => frequency,
            Err(_) => {
                tracing::warn!(frequency = raw, "unknown frequency, falling back to monthly");
                Frequency::Monthly
            }
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "bi-weekly" | "biweekly" => Ok(Frequency::BiWeekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::BiWeekly => "bi-weekly",
            Frequency::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    #[default]
    Active,
    Paused,
    Closed,
}

/// How cycle recipients are picked. Unknown policy strings (including the
/// never-shipped bidding mode) resolve to rotational at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoutPolicy {
    #[default]
    Rotational,
    #[serde(alias = "shuffle")]
    Random,
}

impl PayoutPolicy {
    pub fn parse_lossy(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "rotational" => PayoutPolicy::Rotational,
            "random" | "shuffle" => PayoutPolicy::Random,
            other => {
                tracing::warn!(policy = other, "unknown payout policy, falling back to rotational");
                PayoutPolicy::Rotational
            }
        }
    }
}

/// A thrift group: the pool, its cadence, and its payout policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    /// Target pool per full rotation, if the owner set one.
    pub goal: Option<Decimal>,
    /// Current pool balance. Reset to zero after a successful allocation.
    pub saved: Balance,
    pub frequency: Frequency,
    pub status: GroupStatus,
    /// Explicit anchor for period arithmetic; `created_at` when absent.
    pub start_date: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub payout_policy: PayoutPolicy,
    pub max_members: Option<u32>,
    pub contribution_per_member: Option<Decimal>,
}

impl Group {
    /// Resolves the anchor date all period boundaries are computed from:
    /// explicit start date, then creation time, then `now`. The final
    /// fallback means the record carries no usable dates at all, which the
    /// caller logs as an anomaly.
    pub fn anchor(&self, now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
        if let Some(date) = self.start_date {
            return (start_of_day(date), false);
        }
        if let Some(created) = self.created_at {
            return (start_of_day(created.date_naive()), false);
        }
        (start_of_day(now.date_naive()), true)
    }

    /// Canonical per-member contribution used for fee math: the configured
    /// amount, else goal split across members, else the pool split across
    /// members; always 2dp.
    pub fn contribution_per_member(&self, member_count: usize) -> Decimal {
        let count = Decimal::from(member_count.max(1) as u64);
        if let Some(configured) = self.contribution_per_member {
            return configured;
        }
        if let Some(goal) = self.goal {
            return round_money(goal / count);
        }
        round_money(self.saved.value() / count)
    }

    pub fn is_active(&self) -> bool {
        self.status == GroupStatus::Active
    }

    /// Closes the group once every member has been paid out at least once.
    /// Returns whether the status changed.
    pub fn close_if_complete(&mut self, member_count: usize, completed_cycles: usize) -> bool {
        if member_count > 0 && completed_cycles >= member_count {
            self.status = GroupStatus::Closed;
            return true;
        }
        false
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}
