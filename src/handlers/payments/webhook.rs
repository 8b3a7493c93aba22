//! Razorpay webhook endpoint.
//!
//! Webhooks are the authoritative reconciliation path: they arrive even when
//! the user closes the tab before the checkout callback fires. Lookup misses
//! return 200 so the gateway does not retry events we can never match;
//! malformed requests return 400.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::db::queries::PaymentMeta;
use crate::db::AppState;
use crate::gateway::{
    verify_webhook_signature, EntityWrapper, RazorpayWebhookEvent, WebhookPayload,
    WebhookPaymentEntity,
};

use super::reconcile::{self, ReconcileOutcome};

/// Result type for webhook operations.
pub type WebhookResult = (StatusCode, &'static str);

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        return (StatusCode::BAD_REQUEST, "Missing signature");
    };

    if !verify_webhook_signature(&body, signature, &state.webhook_secret) {
        tracing::warn!("Webhook signature verification failed");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let event: RazorpayWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to parse webhook payload: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid payload");
        }
    };

    tracing::debug!(event = %event.event, "Received Razorpay webhook");

    match event.event.as_str() {
        "payment.captured" => handle_payment_captured(&state, event.payload.payment),
        "payment.failed" => handle_payment_failed(&state, event.payload.payment),
        "payment.refunded" | "refund.processed" => handle_refund(&state, event.payload),
        _ => (StatusCode::OK, "Event ignored"),
    }
}

fn handle_payment_captured(
    state: &AppState,
    payment: Option<EntityWrapper<WebhookPaymentEntity>>,
) -> WebhookResult {
    let Some(payment) = payment.map(|w| w.entity) else {
        return (StatusCode::BAD_REQUEST, "Missing payment entity");
    };
    let Some(ref order_id) = payment.order_id else {
        tracing::warn!(payment_id = %payment.id, "Captured payment has no order id");
        return (StatusCode::OK, "No order on payment");
    };

    let meta = PaymentMeta {
        payment_id: payment.id.clone(),
        method: payment.method.clone(),
        bank: payment.bank.clone(),
        wallet: payment.wallet.clone(),
        email: payment.email.clone(),
        contact: payment.contact.clone(),
    };

    match reconcile::process_payment_captured(state, order_id, &meta) {
        Ok(ReconcileOutcome::Applied(purchase)) => {
            reconcile::dispatch_receipt(state, purchase);
            (StatusCode::OK, "Payment processed")
        }
        Ok(ReconcileOutcome::AlreadyProcessed) => (StatusCode::OK, "Already processed"),
        Ok(ReconcileOutcome::OrderNotFound) => {
            tracing::warn!(order_id = %order_id, "Webhook for unknown order");
            (StatusCode::OK, "Order not found")
        }
        Err(e) => {
            tracing::error!("Failed to process captured payment: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

fn handle_payment_failed(
    state: &AppState,
    payment: Option<EntityWrapper<WebhookPaymentEntity>>,
) -> WebhookResult {
    let Some(payment) = payment.map(|w| w.entity) else {
        return (StatusCode::BAD_REQUEST, "Missing payment entity");
    };
    let Some(ref order_id) = payment.order_id else {
        tracing::warn!(payment_id = %payment.id, "Failed payment has no order id");
        return (StatusCode::OK, "No order on payment");
    };

    if let Some(ref reason) = payment.error_description {
        tracing::info!(order_id = %order_id, reason = %reason, "Payment failed");
    }

    match reconcile::process_payment_failed(state, order_id, &payment.id) {
        Ok(true) => (StatusCode::OK, "Payment marked failed"),
        Ok(false) => (StatusCode::OK, "No open purchase for order"),
        Err(e) => {
            tracing::error!("Failed to process payment failure: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

fn handle_refund(state: &AppState, payload: WebhookPayload) -> WebhookResult {
    // refund.processed carries a refund entity; payment.refunded carries the
    // payment itself. Either way the payment id is the lookup key.
    let payment_id = payload
        .refund
        .map(|w| w.entity.payment_id)
        .or_else(|| payload.payment.map(|w| w.entity.id));

    let Some(payment_id) = payment_id else {
        return (StatusCode::BAD_REQUEST, "Missing refund entity");
    };

    match reconcile::process_refund(state, &payment_id) {
        Ok(true) => (StatusCode::OK, "Refund recorded"),
        Ok(false) => {
            tracing::warn!(payment_id = %payment_id, "Refund for unknown or unsettled payment");
            (StatusCode::OK, "No paid purchase for payment")
        }
        Err(e) => {
            tracing::error!("Failed to process refund: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
