//! Recipient selection policies for a cycle run.

use crate::domain::UserId;
use crate::domain::group::PayoutPolicy;
use crate::domain::member::Member;
use crate::domain::period::Period;
use rand::Rng;
use rand::seq::SliceRandom;

/// Members still queued for payout this period: anyone without a successful
/// payment inside the window. Payout rotation is deliberately independent
/// of who has contributed; unpaid members keep their place in the queue.
pub fn eligible<'a>(members: &'a [Member], period: &Period) -> Vec<&'a Member> {
    members
        .iter()
        .filter(|member| !member.paid_within(period))
        .collect()
}

/// Picks up to `count` recipients from the eligible pool. An empty pool
/// yields an empty selection; the caller treats that as "nothing to pay
/// out", not an error.
pub fn select<R: Rng>(
    eligible: &[&Member],
    policy: PayoutPolicy,
    count: usize,
    rng: &mut R,
) -> Vec<UserId> {
    if eligible.is_empty() || count == 0 {
        return Vec::new();
    }

    match policy {
        PayoutPolicy::Rotational => select_rotational(eligible, count),
        PayoutPolicy::Random => select_random(eligible, count, rng),
    }
}

/// Ascending join order; a missing join date sorts last. The sort is
/// stable, so insertion order breaks ties.
fn select_rotational(eligible: &[&Member], count: usize) -> Vec<UserId> {
    let mut ordered: Vec<&Member> = eligible.to_vec();
    ordered.sort_by_key(|member| match member.joined_at {
        Some(at) => (0, at),
        None => (1, chrono::DateTime::<chrono::Utc>::MAX_UTC),
    });
    ordered.iter().take(count).map(|member| member.user_id).collect()
}

/// Uniform shuffle; fairness is the requirement, not unpredictability.
fn select_random<R: Rng>(eligible: &[&Member], count: usize, rng: &mut R) -> Vec<UserId> {
    let mut pool: Vec<UserId> = eligible.iter().map(|member| member.user_id).collect();
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}
