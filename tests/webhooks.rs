//! Tests for POST /api/v1/payments/webhook.

use axum::{body::Body, http::Request, http::StatusCode};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::*;

async fn post_webhook(
    app: &axum::Router,
    body: &serde_json::Value,
    signature: Option<&str>,
) -> axum::http::Response<Body> {
    let raw = serde_json::to_string(body).unwrap();
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/v1/payments/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("x-razorpay-signature", signature);
    }
    app.clone()
        .oneshot(builder.body(Body::from(raw)).unwrap())
        .await
        .unwrap()
}

fn signed(body: &serde_json::Value) -> String {
    sign_webhook(serde_json::to_string(body).unwrap().as_bytes(), TEST_WEBHOOK_SECRET)
}

fn seed_checkout(state: &AppState) -> (String, String) {
    let conn = state.db.get().unwrap();
    let (user, _token) = create_test_user(&conn, "a@example.com");
    let plan = create_test_plan(&conn, PlanType::Counselling, 500);
    let purchase = create_test_purchase(&conn, &user.id, &plan, "order_test_1");
    (user.id, purchase.order_id)
}

fn captured_event(order_id: &str, payment_id: &str) -> serde_json::Value {
    json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "status": "captured",
                    "method": "card",
                    "bank": "HDFC",
                    "email": "student@example.com"
                }
            }
        }
    })
}

#[tokio::test]
async fn missing_signature_is_rejected() {
    let (state, _gateway) = create_test_app_state(false);
    let app = payments_app(state);

    let response = post_webhook(&app, &captured_event("order_1", "pay_1"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let (state, _gateway) = create_test_app_state(false);
    let (_, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let event = captured_event(&order_id, "pay_1");
    let response = post_webhook(&app, &event, Some("0000")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was settled.
    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_order_id(&conn, &order_id)
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Created);
}

#[tokio::test]
async fn unknown_event_is_acknowledged_without_mutation() {
    let (state, _gateway) = create_test_app_state(false);
    let (user_id, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let event = json!({"event": "subscription.activated", "payload": {}});
    let response = post_webhook(&app, &event, Some(&signed(&event))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_order_id(&conn, &order_id)
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Created);
    assert!(queries::list_notifications_for_user(&conn, &user_id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn captured_event_settles_purchase() {
    let (state, _gateway) = create_test_app_state(false);
    let (user_id, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let event = captured_event(&order_id, "pay_1");
    let response = post_webhook(&app, &event, Some(&signed(&event))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_order_id(&conn, &order_id)
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Paid);
    assert_eq!(purchase.payment_id.as_deref(), Some("pay_1"));
    assert_eq!(purchase.bank.as_deref(), Some("HDFC"));

    let entitlements = queries::list_entitlements_for_user(&conn, &user_id).unwrap();
    assert_eq!(entitlements.len(), 1);
}

#[tokio::test]
async fn duplicate_captured_event_is_idempotent() {
    let (state, _gateway) = create_test_app_state(false);
    let (user_id, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let event = captured_event(&order_id, "pay_1");
    let sig = signed(&event);
    assert_eq!(post_webhook(&app, &event, Some(&sig)).await.status(), StatusCode::OK);
    assert_eq!(post_webhook(&app, &event, Some(&sig)).await.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let entitlements = queries::list_entitlements_for_user(&conn, &user_id).unwrap();
    assert_eq!(entitlements.len(), 1);
    let notifications = queries::list_notifications_for_user(&conn, &user_id).unwrap();
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn orphan_order_is_acknowledged_with_200() {
    let (state, _gateway) = create_test_app_state(false);
    let app = payments_app(state);

    let event = captured_event("order_ghost", "pay_1");
    let response = post_webhook(&app, &event, Some(&signed(&event))).await;
    // 200 so the gateway stops retrying an event we can never match.
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn failed_event_marks_purchase_failed() {
    let (state, _gateway) = create_test_app_state(false);
    let (user_id, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let event = json!({
        "event": "payment.failed",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_1",
                    "order_id": order_id,
                    "status": "failed",
                    "error_description": "Card declined"
                }
            }
        }
    });
    let response = post_webhook(&app, &event, Some(&signed(&event))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_order_id(&conn, &order_id)
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Failed);

    let notifications = queries::list_notifications_for_user(&conn, &user_id).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::PaymentFailed);

    // No entitlement for a failed payment.
    assert!(queries::list_entitlements_for_user(&conn, &user_id)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_event_after_capture_does_not_demote() {
    let (state, _gateway) = create_test_app_state(false);
    let (_, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let captured = captured_event(&order_id, "pay_1");
    post_webhook(&app, &captured, Some(&signed(&captured))).await;

    let failed = json!({
        "event": "payment.failed",
        "payload": {"payment": {"entity": {"id": "pay_2", "order_id": order_id, "status": "failed"}}}
    });
    let response = post_webhook(&app, &failed, Some(&signed(&failed))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_order_id(&conn, &order_id)
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Paid);
}

#[tokio::test]
async fn refund_event_records_refund_but_keeps_entitlement() {
    let (state, _gateway) = create_test_app_state(false);
    let (user_id, order_id) = seed_checkout(&state);
    let app = payments_app(state.clone());

    let captured = captured_event(&order_id, "pay_1");
    post_webhook(&app, &captured, Some(&signed(&captured))).await;

    let refund = json!({
        "event": "refund.processed",
        "payload": {
            "refund": {
                "entity": {"id": "rfnd_1", "payment_id": "pay_1", "amount": 50000}
            }
        }
    });
    let response = post_webhook(&app, &refund, Some(&signed(&refund))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let purchase = queries::get_purchase_by_payment_id(&conn, "pay_1")
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Refunded);

    // Access stays; refund disputes are resolved manually.
    let entitlements = queries::list_entitlements_for_user(&conn, &user_id).unwrap();
    assert_eq!(entitlements.len(), 1);
    assert!(entitlements[0].active);

    let notifications = queries::list_notifications_for_user(&conn, &user_id).unwrap();
    assert!(notifications
        .iter()
        .any(|n| n.kind == NotificationKind::PaymentRefunded));
}

#[tokio::test]
async fn refund_for_unsettled_payment_is_noop() {
    let (state, _gateway) = create_test_app_state(false);
    let app = payments_app(state);

    let refund = json!({
        "event": "refund.processed",
        "payload": {"refund": {"entity": {"id": "rfnd_1", "payment_id": "pay_ghost"}}}
    });
    let response = post_webhook(&app, &refund, Some(&signed(&refund))).await;
    assert_eq!(response.status(), StatusCode::OK);
}
