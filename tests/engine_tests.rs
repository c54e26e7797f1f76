mod common;

use ajopool::application::processor::RunOutcome;
use ajopool::config::EngineConfig;
use ajopool::domain::money::Balance;
use ajopool::domain::ports::{
    CycleStore, GroupStore, LedgerStore, MemberStore, WalletStore,
};
use common::{Harness, at, member, monthly_group};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Marks a member as having contributed at `when`, the way the payment
/// flow would between cycle runs.
async fn record_contribution(h: &Harness, group_id: u64, user_id: u64, when: &str) {
    let mut rows = h.members.members_of(group_id).await.unwrap();
    let row = rows.iter_mut().find(|m| m.user_id == user_id).unwrap();
    row.last_payment_at = Some(at(when));
    h.members.put(row.clone()).await.unwrap();
}

async fn refill_pool(h: &Harness, group_id: u64, amount: Decimal) {
    let mut group = h.groups.get(group_id).await.unwrap().unwrap();
    group.saved = Balance::new(amount);
    h.groups.put(group).await.unwrap();
}

#[tokio::test]
async fn test_rotation_pays_each_member_once_then_closes() {
    let h = Harness::new();
    h.groups.put(monthly_group(1, dec!(150))).await.unwrap();
    // join order decides rotation: 1, then 3, then 2
    h.members.put(member(1, 1, "2025-01-01T00:00:00Z")).await.unwrap();
    h.members.put(member(1, 2, "2025-01-03T00:00:00Z")).await.unwrap();
    h.members.put(member(1, 3, "2025-01-02T00:00:00Z")).await.unwrap();
    let scheduler = h.scheduler();

    // period [Feb 15, Mar 15)
    let report = scheduler.scan_due(at("2025-02-20T12:00:00Z")).await.unwrap();
    assert_eq!(report.due, 1);

    // contributors keep paying between cycles; the pool refills
    refill_pool(&h, 1, dec!(150)).await;
    record_contribution(&h, 1, 1, "2025-03-16T00:00:00Z").await;
    scheduler.scan_due(at("2025-03-20T12:00:00Z")).await.unwrap();

    refill_pool(&h, 1, dec!(150)).await;
    record_contribution(&h, 1, 1, "2025-04-16T00:00:00Z").await;
    record_contribution(&h, 1, 3, "2025-04-16T00:00:00Z").await;
    scheduler.scan_due(at("2025-04-20T12:00:00Z")).await.unwrap();

    let cycles = h.cycles.list_for(1).await.unwrap();
    let recipients: Vec<u64> = cycles.iter().map(|c| c.recipient).collect();
    assert_eq!(recipients, vec![1, 3, 2]);
    assert_eq!(
        cycles.iter().map(|c| c.cycle_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    // every member paid once means the group is done
    let group = h.groups.get(1).await.unwrap().unwrap();
    assert!(!group.is_active());
    assert_eq!(group.saved, Balance::ZERO);

    for user_id in [1, 2, 3] {
        let wallet = h.wallets.get(user_id).await.unwrap().unwrap();
        assert_eq!(wallet.available, Balance::new(dec!(150.00)));
    }
}

#[tokio::test]
async fn test_wallets_always_match_the_ledger() {
    let h = Harness::new();
    h.groups.put(monthly_group(1, dec!(100.00))).await.unwrap();
    for (user_id, joined) in [(1, "2025-01-01T00:00:00Z"), (2, "2025-01-02T00:00:00Z"), (3, "2025-01-03T00:00:00Z")] {
        h.members.put(member(1, user_id, joined)).await.unwrap();
    }
    let mut config = EngineConfig::default();
    config.recipients_per_cycle = 3;
    let processor = h.processor_with(config);

    let outcome = processor.run(1, at("2025-02-20T12:00:00Z")).await.unwrap();
    assert!(outcome.is_committed());

    // pool conservation: no pennies created or lost by the split
    let mut distributed = Decimal::ZERO;
    for user_id in [1, 2, 3] {
        let wallet = h.wallets.get(user_id).await.unwrap().unwrap();
        let ledger_sum: Decimal = h
            .ledger
            .list_for_user(user_id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.signed_net())
            .sum();
        assert_eq!(wallet.available.value(), ledger_sum);
        distributed += ledger_sum;
    }
    assert_eq!(distributed, dec!(100.00));
}

#[tokio::test]
async fn test_concurrent_runs_pay_exactly_once() {
    let h = Harness::new();
    h.groups.put(monthly_group(1, dec!(150))).await.unwrap();
    h.members.put(member(1, 1, "2025-01-01T00:00:00Z")).await.unwrap();
    let processor = h.processor();
    let now = at("2025-02-20T12:00:00Z");

    let (first, second) = tokio::join!(processor.run(1, now), processor.run(1, now));
    let outcomes = [first.unwrap(), second.unwrap()];
    let committed = outcomes.iter().filter(|o| o.is_committed()).count();
    assert_eq!(committed, 1);

    assert_eq!(h.cycles.count_for(1).await.unwrap(), 1);
    assert_eq!(h.ledger.list_for_group(1).await.unwrap().len(), 1);
    assert_eq!(
        h.wallets.get(1).await.unwrap().unwrap().available,
        Balance::new(dec!(150.00))
    );
}

#[tokio::test]
async fn test_persistent_defaulter_accrues_fees_each_period() {
    let h = Harness::new();
    h.groups.put(monthly_group(1, dec!(150))).await.unwrap();
    h.members.put(member(1, 1, "2025-01-01T00:00:00Z")).await.unwrap();
    h.members.put(member(1, 2, "2025-01-05T00:00:00Z")).await.unwrap();
    let processor = h.processor();

    // fee is 10% of the 50 contribution
    processor.run(1, at("2025-02-20T12:00:00Z")).await.unwrap();
    refill_pool(&h, 1, dec!(150)).await;
    record_contribution(&h, 1, 1, "2025-03-16T00:00:00Z").await;
    let outcome = processor.run(1, at("2025-03-20T12:00:00Z")).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Committed(_)));

    let members = h.members.members_of(1).await.unwrap();
    let defaulter = members.iter().find(|m| m.user_id == 2).unwrap();
    assert_eq!(defaulter.outstanding_debit, dec!(10.00));
    assert_eq!(defaulter.cycles_missed, 2);

    // the contributor was only assessed for the first period
    let contributor = members.iter().find(|m| m.user_id == 1).unwrap();
    assert_eq!(contributor.outstanding_debit, dec!(5.00));
    assert_eq!(contributor.cycles_missed, 1);
}

#[tokio::test]
async fn test_notifications_fire_per_payout_and_fee() {
    let h = Harness::new();
    h.groups.put(monthly_group(1, dec!(150))).await.unwrap();
    h.members.put(member(1, 1, "2025-01-01T00:00:00Z")).await.unwrap();
    h.members.put(member(1, 2, "2025-01-02T00:00:00Z")).await.unwrap();
    let processor = h.processor();

    processor.run(1, at("2025-02-20T12:00:00Z")).await.unwrap();

    let payouts = h.notifier.payouts.lock().unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0], (1, 1, 1, dec!(150.00)));

    let fees = h.notifier.fees.lock().unwrap();
    assert_eq!(fees.len(), 2);
}
