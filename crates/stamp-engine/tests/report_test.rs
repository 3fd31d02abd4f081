//! 报表服务测试（内存仓储）

mod common;

use chrono::{Days, Utc};

use common::{Harness, amount, days_ago};
use stamp_engine::models::{MembershipStatus, RewardType};
use stamp_engine::service::AwardStampRequest;

#[tokio::test]
async fn test_summary_counts_members_and_redemptions() {
    let h = Harness::new();
    let first = h.activate().await.membership.id;
    let second = h.activate().await.membership.id;
    h.activate().await;

    h.store
        .update_membership(second, |m| {
            m.start_date = days_ago(100);
            m.end_date = days_ago(10);
        })
        .await
        .unwrap();
    h.query.history(second).await.unwrap();

    h.redemption
        .redeem(first, RewardType::FreeDrink)
        .await
        .unwrap()
        .unwrap();

    let today = Utc::now().date_naive();
    let report = h.reports.summary(Some(today), Some(today)).await.unwrap();
    assert_eq!(report.active_members, 2);
    assert_eq!(report.expired_members, 1);
    assert_eq!(report.free_drink_used, 1);
    assert_eq!(report.voucher_used, 0);

    // 区间外没有数据
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
    let empty = h.reports.summary(Some(tomorrow), None).await.unwrap();
    assert_eq!(empty.active_members, 0);
    assert_eq!(empty.free_drink_used, 0);
}

#[tokio::test]
async fn test_reward_usage_report() {
    let h = Harness::new();
    let id = h.activate().await.membership.id;
    h.activate().await;
    h.award_times(id, 9).await;

    h.redemption
        .redeem(id, RewardType::Voucher50k)
        .await
        .unwrap()
        .unwrap();

    let report = h.reports.rewards(None, None).await.unwrap();
    assert_eq!(report.free_drink_used, 0);
    assert_eq!(report.free_drink_unused, 2);
    assert_eq!(report.voucher_used, 1);
    assert_eq!(report.voucher_unused, 0);
}

#[tokio::test]
async fn test_transaction_report_skips_activation_stamps() {
    let h = Harness::new();
    let id = h.activate().await.membership.id;

    for value in [50_000, 75_000, 120_000] {
        h.award
            .award_stamp(AwardStampRequest::new(id, amount(value)))
            .await
            .unwrap()
            .unwrap();
    }
    // 未达门槛的交易不计入
    h.award
        .award_stamp(AwardStampRequest::new(id, amount(10_000)))
        .await
        .unwrap();

    let report = h.reports.transactions(None, None).await.unwrap();
    assert_eq!(report.transaction_count, 3);
    assert_eq!(report.total_amount, amount(245_000));
    assert_eq!(report.daily.len(), 1);
    assert_eq!(report.daily[0].date, Utc::now().date_naive());
}

#[tokio::test]
async fn test_blocked_members_not_counted() {
    let h = Harness::new();
    let id = h.activate().await.membership.id;
    h.membership
        .set_status(id, MembershipStatus::Blocked)
        .await
        .unwrap();

    let report = h.reports.summary(None, None).await.unwrap();
    assert_eq!(report.active_members, 0);
    assert_eq!(report.expired_members, 0);
}
