//! Ledger-level tests against the query layer.

mod common;
use common::*;

use collegesecracy::db::queries::PaymentMeta;

fn meta(payment_id: &str) -> PaymentMeta {
    PaymentMeta {
        payment_id: payment_id.to_string(),
        method: Some("upi".to_string()),
        ..Default::default()
    }
}

#[test]
fn settle_is_first_writer_wins() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Tool, 500);
    create_test_purchase(&conn, &user.id, &plan, "order_1");

    assert!(queries::try_settle_purchase(&conn, "order_1", &meta("pay_1")).unwrap());
    // Second settle attempt (the race loser) is a no-op.
    assert!(!queries::try_settle_purchase(&conn, "order_1", &meta("pay_2")).unwrap());

    let purchase = queries::get_purchase_by_order_id(&conn, "order_1")
        .unwrap()
        .unwrap();
    assert_eq!(purchase.payment_id.as_deref(), Some("pay_1"));
    assert!(purchase.settled_at.is_some());
}

#[test]
fn settle_unknown_order_is_noop() {
    let conn = setup_test_db();
    assert!(!queries::try_settle_purchase(&conn, "order_ghost", &meta("pay_1")).unwrap());
}

#[test]
fn failed_only_applies_to_open_purchases() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Tool, 500);
    create_test_purchase(&conn, &user.id, &plan, "order_1");

    assert!(queries::try_settle_purchase(&conn, "order_1", &meta("pay_1")).unwrap());
    assert!(!queries::mark_purchase_failed(&conn, "order_1", "pay_1").unwrap());

    let purchase = queries::get_purchase_by_order_id(&conn, "order_1")
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Paid);
}

#[test]
fn refund_only_applies_to_paid_purchases() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Tool, 500);
    create_test_purchase(&conn, &user.id, &plan, "order_1");

    // Not yet paid: no refund possible.
    assert!(!queries::mark_purchase_refunded(&conn, "pay_1").unwrap());

    queries::try_settle_purchase(&conn, "order_1", &meta("pay_1")).unwrap();
    assert!(queries::mark_purchase_refunded(&conn, "pay_1").unwrap());
    // Refund is terminal.
    assert!(!queries::mark_purchase_refunded(&conn, "pay_1").unwrap());
}

#[test]
fn only_one_open_purchase_per_user_and_plan() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Tool, 500);
    create_test_purchase(&conn, &user.id, &plan, "order_1");

    let duplicate = queries::create_purchase(
        &conn,
        &CreatePurchase {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            order_id: "order_2".to_string(),
            amount: plan.price,
            currency: "INR".to_string(),
            validity: 0,
            coupon_used: None,
        },
    );
    // Surfaced as a constraint violation so the handler can map it to the
    // reuse path instead of a 500.
    assert!(duplicate.unwrap_err().is_constraint_violation());

    // A settled purchase releases the slot for a new checkout.
    queries::try_settle_purchase(&conn, "order_1", &meta("pay_1")).unwrap();
    let second = queries::create_purchase(
        &conn,
        &CreatePurchase {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            order_id: "order_2".to_string(),
            amount: plan.price,
            currency: "INR".to_string(),
            validity: 0,
            coupon_used: None,
        },
    );
    assert!(second.is_ok());
}

#[test]
fn entitlement_regrant_extends_validity() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Counselling, 500);

    queries::grant_entitlement(
        &conn,
        &GrantEntitlement {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            kind: PlanType::Counselling,
            payment_id: Some("pay_1".to_string()),
            valid_until: 1_000,
        },
    )
    .unwrap();

    queries::grant_entitlement(
        &conn,
        &GrantEntitlement {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            kind: PlanType::Counselling,
            payment_id: Some("pay_2".to_string()),
            valid_until: 2_000,
        },
    )
    .unwrap();

    let entitlements = queries::list_entitlements_for_user(&conn, &user.id).unwrap();
    assert_eq!(entitlements.len(), 1);
    assert_eq!(entitlements[0].valid_until, 2_000);
    assert_eq!(entitlements[0].payment_id.as_deref(), Some("pay_2"));
}

#[test]
fn expired_entitlement_is_not_active() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Counselling, 500);

    queries::grant_entitlement(
        &conn,
        &GrantEntitlement {
            user_id: user.id.clone(),
            plan_id: plan.id.clone(),
            kind: PlanType::Counselling,
            payment_id: None,
            valid_until: 1_000,
        },
    )
    .unwrap();

    assert!(!queries::has_active_entitlement(&conn, &user.id, &plan.id).unwrap());
}

#[test]
fn coupon_redemptions_are_counted() {
    let conn = setup_test_db();
    let coupon = create_test_coupon(&conn, "SAVE20", 20);
    assert_eq!(coupon.redemption_count, 0);

    queries::increment_coupon_redemptions(&conn, "SAVE20").unwrap();
    queries::increment_coupon_redemptions(&conn, "SAVE20").unwrap();

    let coupon = queries::get_coupon_by_code(&conn, "save20").unwrap().unwrap();
    assert_eq!(coupon.redemption_count, 2);
}

#[test]
fn api_token_lookup_uses_hash() {
    let conn = setup_test_db();
    let (user, token) = create_test_user(&conn, "a@example.com");

    let found = queries::get_user_by_token(&conn, &token).unwrap().unwrap();
    assert_eq!(found.id, user.id);
    assert!(queries::get_user_by_token(&conn, "cs_wrong").unwrap().is_none());

    // The plaintext token never touches the database.
    let stored: String = conn
        .query_row("SELECT token_hash FROM users WHERE id = ?1", [&user.id], |r| r.get(0))
        .unwrap();
    assert_ne!(stored, token);
}

#[test]
fn notifications_are_listed_and_markable() {
    let conn = setup_test_db();
    let (user, _) = create_test_user(&conn, "a@example.com");

    for message in ["first", "second"] {
        queries::create_notification(
            &conn,
            &CreateNotification {
                user_id: user.id.clone(),
                kind: NotificationKind::PaymentProcessed,
                message: message.to_string(),
                metadata: None,
            },
        )
        .unwrap();
    }

    let list = queries::list_notifications_for_user(&conn, &user.id).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(queries::count_unread_notifications(&conn, &user.id).unwrap(), 2);

    assert!(queries::mark_notification_read(&conn, &list[0].id, &user.id).unwrap());
    assert_eq!(queries::count_unread_notifications(&conn, &user.id).unwrap(), 1);

    // Can't mark another user's notification.
    assert!(!queries::mark_notification_read(&conn, &list[1].id, "someone-else").unwrap());
}
