//! Calendar arithmetic for payout cycles.
//!
//! Pure functions only: every boundary is derived from the anchor by
//! repeated interval addition, so the cadence never drifts with month
//! length or partial periods.

use crate::domain::group::Frequency;
use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

/// A half-open calendar window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// `anchor + n` intervals. Monthly addition clamps month-ends
/// (Jan 31 + 1 month = Feb 28).
pub fn add_intervals(anchor: DateTime<Utc>, frequency: Frequency, n: u32) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Daily => anchor.checked_add_signed(Duration::days(n as i64)),
        Frequency::Weekly => anchor.checked_add_signed(Duration::weeks(n as i64)),
        Frequency::BiWeekly => anchor.checked_add_signed(Duration::weeks(2 * n as i64)),
        Frequency::Monthly => anchor.checked_add_months(Months::new(n)),
    }
}

/// Whole intervals elapsed between `anchor` and `now` (`now >= anchor`).
/// Monthly counts month boundaries rather than days, so a 28-day February
/// does not skew the cadence.
fn elapsed_intervals(anchor: DateTime<Utc>, frequency: Frequency, now: DateTime<Utc>) -> u32 {
    debug_assert!(now >= anchor);
    match frequency {
        Frequency::Daily => (now - anchor).num_days().max(0) as u32,
        Frequency::Weekly => ((now - anchor).num_days().max(0) / 7) as u32,
        Frequency::BiWeekly => ((now - anchor).num_days().max(0) / 14) as u32,
        Frequency::Monthly => {
            let months = (now.year() - anchor.year()) * 12 + now.month() as i32
                - anchor.month() as i32;
            let mut months = months.max(0) as u32;
            // crossing the month boundary is not the same as completing the
            // interval; step back if the boundary lands after `now`
            while months > 0 {
                match add_intervals(anchor, frequency, months) {
                    Some(boundary) if boundary > now => months -= 1,
                    _ => break,
                }
            }
            months
        }
    }
}

/// The period containing `now`, or `None` when the anchor is implausibly
/// far in the past (elapsed beyond `cap` signals corrupted data, and a
/// garbage far-future date would be worse than no answer).
pub fn current_period(
    anchor: DateTime<Utc>,
    frequency: Frequency,
    now: DateTime<Utc>,
    cap: u32,
) -> Option<Period> {
    if now < anchor {
        return Some(Period {
            start: anchor,
            end: add_intervals(anchor, frequency, 1)?,
        });
    }

    let elapsed = elapsed_intervals(anchor, frequency, now);
    if elapsed > cap {
        return None;
    }

    Some(Period {
        start: add_intervals(anchor, frequency, elapsed)?,
        end: add_intervals(anchor, frequency, elapsed + 1)?,
    })
}

/// The next payout timestamp strictly after `now`: the end of the current
/// period, or the first period boundary when `now` precedes the anchor.
pub fn next_payout_at(
    anchor: DateTime<Utc>,
    frequency: Frequency,
    now: DateTime<Utc>,
    cap: u32,
) -> Option<DateTime<Utc>> {
    current_period(anchor, frequency, now, cap).map(|period| period.end)
}
