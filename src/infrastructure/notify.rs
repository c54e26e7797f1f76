use crate::domain::ports::Notifier;
use crate::domain::{GroupId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// Notifier that only writes to the log. Real delivery lives outside the
/// engine.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn payout_sent(
        &self,
        group_id: GroupId,
        user_id: UserId,
        cycle_number: u32,
        amount: Decimal,
    ) -> Result<()> {
        tracing::info!(group_id, user_id, cycle_number, %amount, "payout notification");
        Ok(())
    }

    async fn fee_assessed(&self, group_id: GroupId, user_id: UserId, fee: Decimal) -> Result<()> {
        tracing::info!(group_id, user_id, %fee, "fee notification");
        Ok(())
    }
}

/// Captures notifications for assertions in tests.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub payouts: Arc<Mutex<Vec<(GroupId, UserId, u32, Decimal)>>>,
    pub fees: Arc<Mutex<Vec<(GroupId, UserId, Decimal)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn payout_sent(
        &self,
        group_id: GroupId,
        user_id: UserId,
        cycle_number: u32,
        amount: Decimal,
    ) -> Result<()> {
        self.payouts
            .lock()
            .expect("notifier log poisoned")
            .push((group_id, user_id, cycle_number, amount));
        Ok(())
    }

    async fn fee_assessed(&self, group_id: GroupId, user_id: UserId, fee: Decimal) -> Result<()> {
        self.fees
            .lock()
            .expect("notifier log poisoned")
            .push((group_id, user_id, fee));
        Ok(())
    }
}
