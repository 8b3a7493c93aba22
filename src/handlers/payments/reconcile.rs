//! Shared settlement logic for the verify and webhook paths.
//!
//! Both paths funnel into `process_payment_captured`, where a conditional
//! UPDATE inside a transaction decides the winner of any race. Only the
//! winning caller grants the entitlement and fires side effects.

use crate::db::queries::{self, PaymentMeta};
use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::gateway::GatewayPayment;
use crate::invoice::InvoiceData;
use crate::models::{CreateNotification, GrantEntitlement, NotificationKind, Plan, Purchase, User};

#[derive(Debug)]
pub enum ReconcileOutcome {
    /// This caller settled the purchase and performed the side effects.
    Applied(Purchase),
    /// The purchase was already settled by an earlier caller.
    AlreadyProcessed,
    /// No ledger row exists for this order id.
    OrderNotFound,
}

/// Map a gateway payment onto the metadata stamped into the ledger.
pub fn payment_meta(payment: &GatewayPayment) -> PaymentMeta {
    PaymentMeta {
        payment_id: payment.id.clone(),
        method: payment.method.clone(),
        bank: payment.bank.clone(),
        wallet: payment.wallet.clone(),
        email: payment.email.clone(),
        contact: payment.contact.clone(),
    }
}

/// Settle a captured payment: flip the ledger row to paid, grant the
/// entitlement, and record the notification, all in one transaction.
pub fn process_payment_captured(
    state: &AppState,
    order_id: &str,
    meta: &PaymentMeta,
) -> Result<ReconcileOutcome> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    if !queries::try_settle_purchase(&tx, order_id, meta)? {
        // Lost the race or unknown order; either way nothing to commit.
        return Ok(match queries::get_purchase_by_order_id(&tx, order_id)? {
            Some(_) => ReconcileOutcome::AlreadyProcessed,
            None => ReconcileOutcome::OrderNotFound,
        });
    }

    let purchase = queries::get_purchase_by_order_id(&tx, order_id)?
        .ok_or_else(|| AppError::Internal(format!("Settled purchase vanished: {}", order_id)))?;
    let plan = queries::get_plan_by_id(&tx, &purchase.plan_id)?
        .ok_or_else(|| AppError::Internal(format!("Plan vanished: {}", purchase.plan_id)))?;

    // Upsert refreshes an expired grant; a still-active one is left alone.
    if !queries::has_active_entitlement(&tx, &purchase.user_id, &purchase.plan_id)? {
        queries::grant_entitlement(
            &tx,
            &GrantEntitlement {
                user_id: purchase.user_id.clone(),
                plan_id: purchase.plan_id.clone(),
                kind: plan.plan_type,
                payment_id: purchase.payment_id.clone(),
                valid_until: purchase.validity,
            },
        )?;
    }

    queries::create_notification(
        &tx,
        &CreateNotification {
            user_id: purchase.user_id.clone(),
            kind: NotificationKind::PaymentProcessed,
            message: format!("Payment of ₹{} received for {}", purchase.amount, plan.title),
            metadata: Some(serde_json::json!({
                "orderId": purchase.order_id,
                "paymentId": purchase.payment_id,
            })),
        },
    )?;

    tx.commit()?;

    tracing::info!(
        order_id = %purchase.order_id,
        user_id = %purchase.user_id,
        plan_id = %purchase.plan_id,
        "Payment settled and entitlement granted"
    );

    Ok(ReconcileOutcome::Applied(purchase))
}

/// Mark a payment failed. Paid rows are never demoted, so a late failure
/// event is a no-op. Returns whether the row changed.
pub fn process_payment_failed(state: &AppState, order_id: &str, payment_id: &str) -> Result<bool> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    if !queries::mark_purchase_failed(&tx, order_id, payment_id)? {
        return Ok(false);
    }

    let purchase = queries::get_purchase_by_order_id(&tx, order_id)?
        .ok_or_else(|| AppError::Internal(format!("Failed purchase vanished: {}", order_id)))?;

    queries::create_notification(
        &tx,
        &CreateNotification {
            user_id: purchase.user_id.clone(),
            kind: NotificationKind::PaymentFailed,
            message: "Your payment could not be processed. No amount was charged.".to_string(),
            metadata: Some(serde_json::json!({
                "orderId": purchase.order_id,
                "paymentId": payment_id,
            })),
        },
    )?;

    tx.commit()?;
    Ok(true)
}

/// Record a refund against a settled payment. The entitlement is kept; refund
/// disputes are resolved manually by the ops team.
pub fn process_refund(state: &AppState, payment_id: &str) -> Result<bool> {
    let mut conn = state.db.get()?;
    let tx = conn.transaction()?;

    if !queries::mark_purchase_refunded(&tx, payment_id)? {
        return Ok(false);
    }

    let purchase = queries::get_purchase_by_payment_id(&tx, payment_id)?
        .ok_or_else(|| AppError::Internal(format!("Refunded purchase vanished: {}", payment_id)))?;

    queries::create_notification(
        &tx,
        &CreateNotification {
            user_id: purchase.user_id.clone(),
            kind: NotificationKind::PaymentRefunded,
            message: format!("Your payment of ₹{} has been refunded.", purchase.amount),
            metadata: Some(serde_json::json!({
                "orderId": purchase.order_id,
                "paymentId": payment_id,
            })),
        },
    )?;

    tx.commit()?;
    Ok(true)
}

/// Fire-and-forget receipt email. Failures are logged, never surfaced to the
/// payment flow.
pub fn dispatch_receipt(state: &AppState, purchase: Purchase) {
    let state = state.clone();
    tokio::spawn(async move {
        let loaded: Result<(Option<User>, Option<Plan>)> = (|| {
            let conn = state.db.get()?;
            let user = queries::get_user_by_id(&conn, &purchase.user_id)?;
            let plan = queries::get_plan_by_id(&conn, &purchase.plan_id)?;
            Ok((user, plan))
        })();

        let Ok((Some(user), Some(plan))) = loaded else {
            tracing::warn!(
                order_id = %purchase.order_id,
                "Could not load receipt data, skipping email"
            );
            return;
        };

        let invoice = InvoiceData {
            user: &user,
            plan: &plan,
            purchase: &purchase,
            base_url: &state.base_url,
        };
        if let Err(e) = state.mailer.send_receipt(&invoice).await {
            tracing::error!(
                order_id = %purchase.order_id,
                "Failed to send receipt email: {}",
                e
            );
        }
    });
}
