use crate::application::processor::{CycleProcessor, RunOutcome};
use crate::config::EngineConfig;
use crate::domain::GroupId;
use crate::domain::period;
use crate::domain::ports::{CycleStoreBox, GroupStoreBox};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// Result of one scheduler sweep over the active groups.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub due: usize,
    pub outcomes: Vec<(GroupId, RunOutcome)>,
    /// Groups whose run errored out even after retries. The sweep keeps
    /// going; one broken group never blocks the rest.
    pub failures: Vec<GroupId>,
}

/// Walks all active groups and runs the processor for each group that has
/// not yet paid out its current period. Due-ness is a cheap read-only
/// check and only best-effort; the processor re-derives everything under
/// the lock, so a stale answer here costs one skipped run, never a double
/// payout.
pub struct CycleScheduler {
    groups: GroupStoreBox,
    cycles: CycleStoreBox,
    processor: CycleProcessor,
    config: EngineConfig,
}

impl CycleScheduler {
    pub fn new(
        groups: GroupStoreBox,
        cycles: CycleStoreBox,
        processor: CycleProcessor,
        config: EngineConfig,
    ) -> Self {
        Self {
            groups,
            cycles,
            processor,
            config,
        }
    }

    /// One sweep as of `now`.
    pub async fn scan_due(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        let groups = self.groups.list_active().await?;
        let mut report = ScanReport::default();
        report.scanned = groups.len();

        for group in groups {
            let (anchor, _) = group.anchor(now);
            let Some(current) =
                period::current_period(anchor, group.frequency, now, self.config.elapsed_cap)
            else {
                tracing::warn!(group_id = group.id, "skipping group with undefined period");
                continue;
            };
            // due means the current period has no payout cycle yet
            let paid_this_period = self
                .cycles
                .list_for(group.id)
                .await?
                .iter()
                .any(|cycle| cycle.period_start == current.start);
            if paid_this_period {
                continue;
            }
            report.due += 1;

            match self.run_with_retries(group.id, now).await {
                Ok(outcome) => report.outcomes.push((group.id, outcome)),
                Err(err) => {
                    tracing::error!(group_id = group.id, error = %err, "group run failed");
                    report.failures.push(group.id);
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            due = report.due,
            failed = report.failures.len(),
            "completed scheduler sweep"
        );
        Ok(report)
    }

    /// Retries transient storage failures up to `max_attempts`. Every retry
    /// replays through the same idempotency keys, so a half-applied attempt
    /// resumes instead of double-paying.
    async fn run_with_retries(&self, group_id: GroupId, now: DateTime<Utc>) -> Result<RunOutcome> {
        let mut attempt = 1;
        loop {
            match self.processor.run(group_id, now).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.is_retryable() && attempt < self.config.max_attempts => {
                    tracing::warn!(group_id, attempt, error = %err, "retrying group run");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
