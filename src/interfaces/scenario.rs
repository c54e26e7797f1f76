//! JSON scenario files: groups, memberships, and wallet seeds for the CLI
//! and integration tests.
//!
//! Frequency and payout policy arrive as raw strings and resolve lossily:
//! unknown frequency falls back to monthly, unknown policy to rotational,
//! both logged.

use crate::domain::group::{Frequency, Group, GroupStatus, PayoutPolicy};
use crate::domain::member::Member;
use crate::domain::money::Balance;
use crate::domain::ports::{GroupStore, MemberStore, WalletStore};
use crate::domain::{GroupId, UserId};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub groups: Vec<GroupSeed>,
    #[serde(default)]
    pub wallets: Vec<WalletSeed>,
}

#[derive(Debug, Deserialize)]
pub struct GroupSeed {
    pub id: GroupId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub goal: Option<Decimal>,
    #[serde(default)]
    pub saved: Decimal,
    /// Raw cadence string, resolved lossily.
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default)]
    pub status: GroupStatus,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Raw policy string, resolved lossily.
    #[serde(default = "default_policy")]
    pub payout_policy: String,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default)]
    pub contribution_per_member: Option<Decimal>,
    #[serde(default)]
    pub members: Vec<MemberSeed>,
}

#[derive(Debug, Deserialize)]
pub struct MemberSeed {
    pub user_id: UserId,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_payment_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct WalletSeed {
    pub user_id: UserId,
    pub available: Decimal,
}

fn default_frequency() -> String {
    "monthly".to_string()
}

fn default_policy() -> String {
    "rotational".to_string()
}

impl Scenario {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Loads every seed into the given stores.
    pub async fn seed(
        &self,
        groups: &dyn GroupStore,
        members: &dyn MemberStore,
        wallets: &dyn WalletStore,
    ) -> Result<()> {
        for seed in &self.groups {
            groups.put(seed.to_group()).await?;
            for member_seed in &seed.members {
                members.put(member_seed.to_member(seed.id)).await?;
            }
        }
        for wallet in &self.wallets {
            wallets.apply_delta(wallet.user_id, wallet.available).await?;
        }
        Ok(())
    }
}

impl GroupSeed {
    fn to_group(&self) -> Group {
        Group {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name.clone(),
            goal: self.goal,
            saved: Balance::new(self.saved),
            frequency: Frequency::parse_lossy(&self.frequency),
            status: self.status,
            start_date: self.start_date,
            created_at: self.created_at,
            payout_policy: PayoutPolicy::parse_lossy(&self.payout_policy),
            max_members: self.max_members,
            contribution_per_member: self.contribution_per_member,
        }
    }
}

impl MemberSeed {
    fn to_member(&self, group_id: GroupId) -> Member {
        let mut member = Member::new(group_id, self.user_id);
        member.joined_at = self.joined_at;
        member.last_payment_at = self.last_payment_at;
        member
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{
        InMemoryGroupStore, InMemoryMemberStore, InMemoryWalletStore,
    };
    use rust_decimal_macros::dec;

    const SCENARIO: &str = r#"{
        "groups": [
            {
                "id": 1,
                "owner_id": 10,
                "name": "traders ajo",
                "saved": 300,
                "frequency": "bi_weekly",
                "start_date": "2025-01-15",
                "contribution_per_member": 50,
                "members": [
                    {"user_id": 10, "joined_at": "2025-01-01T00:00:00Z"},
                    {"user_id": 20}
                ]
            }
        ],
        "wallets": [{"user_id": 10, "available": 25}]
    }"#;

    #[tokio::test]
    async fn test_scenario_seeds_stores() {
        let scenario = Scenario::from_reader(SCENARIO.as_bytes()).unwrap();
        let groups = InMemoryGroupStore::new();
        let members = InMemoryMemberStore::new();
        let wallets = InMemoryWalletStore::new();

        scenario.seed(&groups, &members, &wallets).await.unwrap();

        let group = groups.get(1).await.unwrap().unwrap();
        assert_eq!(group.frequency, Frequency::BiWeekly);
        assert_eq!(group.status, GroupStatus::Active);
        assert_eq!(group.saved, Balance::new(dec!(300)));

        assert_eq!(members.members_of(1).await.unwrap().len(), 2);
        assert_eq!(
            wallets.get(10).await.unwrap().unwrap().available,
            Balance::new(dec!(25))
        );
    }

    #[tokio::test]
    async fn test_unknown_frequency_and_policy_resolve_lossily() {
        let raw = r#"{
            "groups": [{
                "id": 2, "owner_id": 1, "name": "odd",
                "saved": 0, "frequency": "fortnightly", "payout_policy": "bidding"
            }]
        }"#;
        let scenario = Scenario::from_reader(raw.as_bytes()).unwrap();
        let groups = InMemoryGroupStore::new();
        scenario
            .seed(&groups, &InMemoryMemberStore::new(), &InMemoryWalletStore::new())
            .await
            .unwrap();

        let group = groups.get(2).await.unwrap().unwrap();
        assert_eq!(group.frequency, Frequency::Monthly);
        assert_eq!(group.payout_policy, PayoutPolicy::Rotational);
    }

    #[test]
    fn test_malformed_scenario_is_an_error() {
        let err = Scenario::from_reader("{not json".as_bytes()).unwrap_err();
        assert!(matches!(err, crate::error::EngineError::JsonError(_)));
    }
}
