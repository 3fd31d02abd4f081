//! 开卡服务测试

mod common;

use chrono::Days;
use uuid::Uuid;

use common::{Harness, activation_request, random_phone};
use stamp_engine::error::LoyaltyError;
use stamp_engine::models::{
    MembershipStatus, NewCustomer, ProgramSettings, RewardType, local_today,
};
use stamp_engine::repository::{FailPoint, LoyaltyStore, LoyaltyTx, MemoryStats};
use stamp_engine::service::ActivateCardRequest;

#[tokio::test]
async fn test_activate_creates_membership_with_first_stamp() {
    let h = Harness::new();
    let card = h.issue_card().await;
    let phone = random_phone();

    let detail = h
        .membership
        .activate_card(activation_request(&card.card_number, &phone))
        .await
        .unwrap();

    let today = local_today();
    assert_eq!(detail.membership.card_number, card.card_number);
    assert_eq!(detail.membership.status, MembershipStatus::Active);
    assert_eq!(detail.membership.start_date, today);
    assert_eq!(
        detail.membership.end_date,
        today.checked_add_days(Days::new(90)).unwrap()
    );
    assert!(detail.is_active);
    assert_eq!(detail.customer.phone, phone);

    let bound = detail.card.as_ref().unwrap();
    assert!(bound.is_assigned);
    assert_eq!(bound.membership_id, Some(detail.membership.id));

    assert_eq!(detail.cycles.len(), 1);
    let cycle = &detail.cycles[0];
    assert_eq!(cycle.cycle.cycle_number, 1);
    assert!(!cycle.cycle.is_closed);
    assert_eq!(cycle.stamp_count, 1);
    assert_eq!(cycle.stamps[0].number, 1);
    assert_eq!(cycle.stamps[0].reward_type, RewardType::FreeDrink);
    assert_eq!(cycle.stamps[0].transaction_amount, None);
    assert_eq!(cycle.stamps[0].pos_receipt_number, None);
}

#[tokio::test]
async fn test_activate_by_public_id() {
    let h = Harness::new();
    let card = h.issue_card().await;

    let detail = h
        .membership
        .activate_card(ActivateCardRequest {
            card_number: None,
            public_id: Some(card.public_id),
            ..activation_request("", &random_phone())
        })
        .await
        .unwrap();

    assert_eq!(detail.membership.card_number, card.card_number);
}

#[tokio::test]
async fn test_activate_falls_back_to_public_id() {
    let h = Harness::new();
    let card = h.issue_card().await;

    let detail = h
        .membership
        .activate_card(ActivateCardRequest {
            public_id: Some(card.public_id),
            ..activation_request("CARD-UNKNOWN", &random_phone())
        })
        .await
        .unwrap();

    assert_eq!(detail.card.unwrap().id, card.id);
}

#[tokio::test]
async fn test_activate_unknown_card() {
    let h = Harness::new();

    let err = h
        .membership
        .activate_card(ActivateCardRequest {
            public_id: Some(Uuid::new_v4()),
            ..activation_request("CARD-MISSING", &random_phone())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LoyaltyError::CardNotFound(ref n) if n == "CARD-MISSING"));
    assert_eq!(h.store.stats().await, MemoryStats::default());
}

#[tokio::test]
async fn test_activate_assigned_card_rejected() {
    let h = Harness::new();
    let detail = h.activate().await;
    let before = h.store.stats().await;

    let err = h
        .membership
        .activate_card(activation_request(
            &detail.membership.card_number,
            &random_phone(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, LoyaltyError::CardAlreadyAssigned(_)));
    assert_eq!(h.store.stats().await, before);
}

#[tokio::test]
async fn test_activate_missing_fields() {
    let h = Harness::new();
    let card = h.issue_card().await;

    let cases = [
        (
            ActivateCardRequest {
                card_number: Some("  ".to_string()),
                ..activation_request("", &random_phone())
            },
            "card_number",
        ),
        (
            ActivateCardRequest {
                name: " ".to_string(),
                ..activation_request(&card.card_number, &random_phone())
            },
            "name",
        ),
        (activation_request(&card.card_number, ""), "phone"),
    ];

    for (request, field) in cases {
        let err = h.membership.activate_card(request).await.unwrap_err();
        assert!(
            matches!(err, LoyaltyError::MissingRequiredField(f) if f == field),
            "字段 {} 应为必填",
            field
        );
    }
}

#[tokio::test]
async fn test_existing_customer_is_reused_and_backfilled() {
    let h = Harness::new();
    let phone = random_phone();

    let first_card = h.issue_card().await;
    let first = h
        .membership
        .activate_card(ActivateCardRequest {
            email: None,
            ..activation_request(&first_card.card_number, &phone)
        })
        .await
        .unwrap();
    assert_eq!(first.customer.email, None);

    let second_card = h.issue_card().await;
    let second = h
        .membership
        .activate_card(ActivateCardRequest {
            name: "Another Name".to_string(),
            email: Some("member@example.com".to_string()),
            ..activation_request(&second_card.card_number, &phone)
        })
        .await
        .unwrap();

    assert_eq!(second.customer.id, first.customer.id);
    assert_eq!(second.customer.name, first.customer.name);
    assert_eq!(second.customer.email.as_deref(), Some("member@example.com"));
    assert_ne!(second.membership.id, first.membership.id);
    assert_eq!(h.store.stats().await.customers, 1);
}

#[tokio::test]
async fn test_activation_is_atomic() {
    let h = Harness::new();
    let card = h.issue_card().await;

    for point in [
        FailPoint::InsertMembership,
        FailPoint::BindCard,
        FailPoint::InsertCycle,
        FailPoint::InsertStamp,
    ] {
        h.store.fail_next(point);
        let err = h
            .membership
            .activate_card(activation_request(&card.card_number, &random_phone()))
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::Internal(_)), "{:?}", point);

        assert_eq!(
            h.store.stats().await,
            MemoryStats {
                cards: 1,
                ..Default::default()
            },
            "{:?} 失败后不应留下任何记录",
            point
        );
    }

    // 故障解除后同一张卡可以正常开卡
    let detail = h
        .membership
        .activate_card(activation_request(&card.card_number, &random_phone()))
        .await
        .unwrap();
    assert_eq!(detail.cycles[0].stamp_count, 1);
}

#[tokio::test]
async fn test_duration_and_first_reward_follow_settings() {
    let h = Harness::with_settings(ProgramSettings {
        membership_duration_months: 12,
        reward_stamp_1_type: RewardType::Voucher50k,
        ..Default::default()
    });

    let detail = h.activate().await;

    assert_eq!(
        detail.membership.end_date,
        local_today().checked_add_days(Days::new(360)).unwrap()
    );
    assert_eq!(
        detail.cycles[0].stamps[0].reward_type,
        RewardType::Voucher50k
    );
}

#[tokio::test]
async fn test_insert_customer_with_taken_phone_returns_none() {
    let h = Harness::new();
    let phone = random_phone();
    let new = NewCustomer {
        name: "Linh".to_string(),
        phone: phone.clone(),
        email: None,
    };

    let mut tx = h.store.begin().await.unwrap();
    let created = tx.insert_customer(&new).await.unwrap();
    assert!(created.is_some());
    assert!(tx.insert_customer(&new).await.unwrap().is_none());
    tx.commit().await.unwrap();

    // 开卡复用已存在的顾客
    let card = h.issue_card().await;
    let detail = h
        .membership
        .activate_card(activation_request(&card.card_number, &phone))
        .await
        .unwrap();
    assert_eq!(Some(detail.customer.id), created.map(|c| c.id));
    assert_eq!(h.store.stats().await.customers, 1);
}
