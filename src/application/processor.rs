use crate::application::ledger_writer::LedgerWriter;
use crate::config::EngineConfig;
use crate::domain::cycle::Cycle;
use crate::domain::ledger::LedgerEntry;
use crate::domain::money::{Balance, round_money};
use crate::domain::period::{self, Period};
use crate::domain::ports::{
    CycleStoreBox, GroupStoreBox, LockManagerBox, MemberStoreBox, NotifierBox,
};
use crate::domain::selector;
use crate::domain::{GroupId, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Why a run ended without touching any state. None of these are errors;
/// they terminate the run cleanly and must never surface as job failures
/// that burn retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another run holds the group lock.
    LockHeld,
    GroupNotFound,
    GroupInactive,
    /// The period calculator refused the anchor (elapsed beyond the cap).
    PeriodUndefined,
    /// Nothing saved, nothing to distribute.
    EmptyPool,
    /// Every member was already paid this period.
    NoRecipients,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub group_id: GroupId,
    pub period: Period,
    pub recipients: Vec<UserId>,
    pub cycle_numbers: Vec<u32>,
    pub distributed: Decimal,
    pub fees_assessed: u32,
    pub group_closed: bool,
}

/// What one processing run did.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Skipped(SkipReason),
    Committed(RunSummary),
}

impl RunOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RunOutcome::Committed(_))
    }
}

/// Orchestrates one group's payout cycle: lock, load, period math, the
/// defaulter fee pass, recipient selection, allocation, and pool reset.
///
/// Exactly-once fund movement rests on two legs: the TTL lock keeps
/// concurrent runs for a group out, and idempotency keys make every
/// mutating step replay-safe — which also fences a zombie worker that
/// outlives its lock TTL.
///
/// Fees assessed in a run accrue as forward-looking debt on the member row
/// only; they never reduce the pool allocated in that same run.
pub struct CycleProcessor {
    groups: GroupStoreBox,
    members: MemberStoreBox,
    cycles: CycleStoreBox,
    ledger: LedgerWriter,
    locks: LockManagerBox,
    notifier: NotifierBox,
    config: EngineConfig,
}

impl CycleProcessor {
    pub fn new(
        groups: GroupStoreBox,
        members: MemberStoreBox,
        cycles: CycleStoreBox,
        ledger: LedgerWriter,
        locks: LockManagerBox,
        notifier: NotifierBox,
        config: EngineConfig,
    ) -> Self {
        Self {
            groups,
            members,
            cycles,
            ledger,
            locks,
            notifier,
            config,
        }
    }

    /// Runs one processing attempt for the group as of `now`. `now` is an
    /// explicit argument so tests and replays are deterministic.
    pub async fn run(&self, group_id: GroupId, now: DateTime<Utc>) -> Result<RunOutcome> {
        if !self.locks.try_acquire(group_id, self.config.lock_ttl).await? {
            tracing::info!(group_id, "lock not acquired, another run is in progress");
            return Ok(RunOutcome::Skipped(SkipReason::LockHeld));
        }

        let outcome = self.process_locked(group_id, now).await;

        // release in all paths; a failed release only costs us the TTL
        if let Err(release_err) = self.locks.release(group_id).await {
            tracing::warn!(group_id, error = %release_err, "failed to release group lock");
        }

        outcome
    }

    async fn process_locked(&self, group_id: GroupId, now: DateTime<Utc>) -> Result<RunOutcome> {
        let Some(mut group) = self.groups.get(group_id).await? else {
            tracing::warn!(group_id, "group not found");
            return Ok(RunOutcome::Skipped(SkipReason::GroupNotFound));
        };
        if !group.is_active() {
            tracing::info!(group_id, status = ?group.status, "group is not active, skipping");
            return Ok(RunOutcome::Skipped(SkipReason::GroupInactive));
        }

        let members = self.members.members_of(group_id).await?;

        let (anchor, anomalous) = group.anchor(now);
        if anomalous {
            tracing::warn!(group_id, "group has no usable anchor date, treating now as anchor");
        }
        let Some(period) =
            period::current_period(anchor, group.frequency, now, self.config.elapsed_cap)
        else {
            tracing::error!(group_id, %anchor, "period undefined, anchor looks corrupted");
            return Ok(RunOutcome::Skipped(SkipReason::PeriodUndefined));
        };

        let total_saved = group.saved.value();
        if total_saved <= Decimal::ZERO {
            tracing::info!(group_id, "pool is empty, nothing to distribute");
            return Ok(RunOutcome::Skipped(SkipReason::EmptyPool));
        }

        let contribution = group.contribution_per_member(members.len());
        let fee = round_money(contribution * self.config.default_fee_rate / dec!(100));

        // defaulter pass: members who paid this period are never assessed
        let mut fees_assessed = 0u32;
        for member in &members {
            if member.paid_within(&period) {
                continue;
            }
            if self
                .ledger
                .assess_fee(group_id, member.user_id, period.end, fee)
                .await?
            {
                fees_assessed += 1;
                if let Err(notify_err) = self
                    .notifier
                    .fee_assessed(group_id, member.user_id, fee)
                    .await
                {
                    tracing::warn!(group_id, user_id = member.user_id, error = %notify_err, "fee notification failed");
                }
            }
        }

        let pool = selector::eligible(&members, &period);
        let recipients = selector::select(
            &pool,
            group.payout_policy,
            self.config.recipients_per_cycle,
            &mut rand::thread_rng(),
        );
        if recipients.is_empty() {
            tracing::info!(group_id, "no eligible recipients this period");
            return Ok(RunOutcome::Skipped(SkipReason::NoRecipients));
        }

        // split the pool; each share rounds half away from zero to 2 dp,
        // and the first recipient absorbs the remainder so the amounts sum
        // exactly to the pool
        let count = Decimal::from(recipients.len() as u64);
        let per_recipient = round_money(total_saved / count);
        let remainder = total_saved - per_recipient * count;

        let recorded = self.cycles.list_for(group_id).await?;
        let mut next_cycle = recorded.len() as u32;
        let mut cycle_numbers = Vec::with_capacity(recipients.len());

        for (position, &user_id) in recipients.iter().enumerate() {
            let amount = if position == 0 {
                per_recipient + remainder
            } else {
                per_recipient
            };
            // a retried run reuses the row a prior attempt recorded for
            // this recipient and period instead of appending a second one
            let cycle_number = match recorded
                .iter()
                .find(|c| c.recipient == user_id && c.period_start == period.start)
            {
                Some(prior) => prior.cycle_number,
                None => {
                    next_cycle += 1;
                    self.cycles
                        .append(Cycle {
                            group_id,
                            cycle_number: next_cycle,
                            recipient: user_id,
                            period_start: period.start,
                            period_end: period.end,
                            amount,
                        })
                        .await?;
                    next_cycle
                }
            };
            cycle_numbers.push(cycle_number);

            let entry =
                LedgerEntry::payout(group_id, user_id, cycle_number, amount, &self.config.currency);
            let (_, applied) = self.ledger.record(entry, now).await?;
            if applied {
                tracing::info!(group_id, user_id, cycle_number, %amount, "allocated payout");
                if let Err(notify_err) = self
                    .notifier
                    .payout_sent(group_id, user_id, cycle_number, amount)
                    .await
                {
                    tracing::warn!(group_id, user_id, error = %notify_err, "payout notification failed");
                }
            }
        }

        // zero the pool only after every allocation landed
        group.saved = Balance::ZERO;
        let completed = self.cycles.count_for(group_id).await?;
        let group_closed = group.close_if_complete(members.len(), completed);
        self.groups.put(group).await?;

        tracing::info!(
            group_id,
            distributed = %total_saved,
            recipients = recipients.len(),
            fees_assessed,
            "processed payout cycle"
        );

        Ok(RunOutcome::Committed(RunSummary {
            group_id,
            period,
            recipients,
            cycle_numbers,
            distributed: total_saved,
            fees_assessed,
            group_closed,
        }))
    }
}
