use std::collections::HashMap;

use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::gateway::DevGateway;
use crate::middleware::AuthUser;
use crate::models::CreatePurchase;
use crate::util::{rupees_to_paise, validity_for_plan};

use super::reconcile::{self, ReconcileOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub plan_id: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: String,
    pub currency: String,
    /// Amount to charge, in paise (what the checkout widget expects).
    pub amount: i64,
    pub plan_name: String,
    pub purchase_id: String,
    pub dev_mode: bool,
}

/// Start a checkout: validate the plan and coupon, create a gateway order,
/// and record the pending purchase. In dev mode the purchase settles
/// immediately against a synthetic capture.
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>> {
    if !user.active {
        return Err(AppError::Forbidden(msg::ACCOUNT_DEACTIVATED.into()));
    }

    let now = Utc::now().timestamp();

    // Validation phase: no rows are written until the gateway order exists.
    let (plan, amount, coupon_used, reuse) = {
        let conn = state.db.get()?;

        let plan = queries::get_plan_by_id(&conn, &req.plan_id)?.or_not_found(msg::PLAN_NOT_FOUND)?;
        if plan.is_expired(now) {
            return Err(AppError::BadRequest(msg::PLAN_EXPIRED.into()));
        }

        if queries::find_paid_purchase(&conn, &user.id, &plan.id)?.is_some()
            || queries::has_active_entitlement(&conn, &user.id, &plan.id)?
        {
            return Err(AppError::Conflict(msg::ALREADY_PURCHASED.into()));
        }

        // An abandoned checkout keeps its gateway order; hand the same order
        // back instead of minting a duplicate.
        let reuse = queries::find_open_purchase(&conn, &user.id, &plan.id)?;

        let mut amount = plan.price;
        let mut coupon_used = None;
        if reuse.is_none() {
            if let Some(ref code) = req.coupon_code {
                let coupon = queries::get_coupon_by_code(&conn, code)?
                    .ok_or_else(|| AppError::BadRequest(msg::INVALID_COUPON.into()))?;
                coupon.validate_for(plan.plan_type, now)?;
                amount -= coupon.discount_for(plan.price);
                coupon_used = Some(coupon.code);
            }
        }

        (plan, amount, coupon_used, reuse)
    };

    if let Some(open) = reuse {
        tracing::debug!(order_id = %open.order_id, "Reusing open purchase");
        // Dev mode settles whatever is open, including checkouts abandoned
        // before the mode switch.
        if state.dev_mode {
            settle_dev_purchase(&state, &open.order_id)?;
        }
        return Ok(Json(CreateOrderResponse {
            success: true,
            order_id: open.order_id,
            currency: open.currency,
            amount: rupees_to_paise(open.amount),
            plan_name: plan.title,
            purchase_id: open.id,
            dev_mode: state.dev_mode,
        }));
    }

    let validity = validity_for_plan(&plan, now);

    // Breadcrumbs echoed back by the gateway, enough to reconstruct the
    // purchase context from the Razorpay dashboard alone.
    let mut notes = HashMap::new();
    notes.insert("user_id".to_string(), user.id.clone());
    notes.insert("plan_id".to_string(), plan.id.clone());
    notes.insert("plan_type".to_string(), plan.plan_type.as_str().to_string());
    notes.insert("validity".to_string(), validity.to_string());
    if let Some(ref code) = coupon_used {
        notes.insert("coupon".to_string(), code.clone());
    }

    let receipt = format!("rcpt_{}", uuid::Uuid::new_v4().simple());
    let order = state
        .gateway
        .create_order(rupees_to_paise(amount), "INR", &receipt, &notes)
        .await?;

    let purchase = {
        let conn = state.db.get()?;
        match queries::create_purchase(
            &conn,
            &CreatePurchase {
                user_id: user.id.clone(),
                plan_id: plan.id.clone(),
                order_id: order.id.clone(),
                amount,
                currency: order.currency.clone(),
                validity,
                coupon_used,
            },
        ) {
            Ok(purchase) => {
                if let Some(ref code) = purchase.coupon_used {
                    queries::increment_coupon_redemptions(&conn, code)?;
                }
                purchase
            }
            // A rival checkout inserted its open row between our validation
            // read and this INSERT; hand the rival's order back instead of
            // surfacing the unique-index error.
            Err(e) if e.is_constraint_violation() => {
                let Some(open) = queries::find_open_purchase(&conn, &user.id, &plan.id)? else {
                    // The rival already settled while we were at the gateway.
                    return Err(AppError::Conflict(msg::ALREADY_PURCHASED.into()));
                };
                tracing::warn!(order_id = %open.order_id, "Lost checkout race, reusing rival order");
                return Ok(Json(CreateOrderResponse {
                    success: true,
                    order_id: open.order_id,
                    currency: open.currency,
                    amount: rupees_to_paise(open.amount),
                    plan_name: plan.title,
                    purchase_id: open.id,
                    dev_mode: state.dev_mode,
                }));
            }
            Err(e) => return Err(e),
        }
    };

    if state.dev_mode {
        settle_dev_purchase(&state, &order.id)?;
    }

    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.id,
        currency: order.currency,
        amount: rupees_to_paise(amount),
        plan_name: plan.title,
        purchase_id: purchase.id,
        dev_mode: state.dev_mode,
    }))
}

/// Dev-mode capture: synthesize a captured payment for the order and run it
/// through the shared reconciliation path.
fn settle_dev_purchase(state: &AppState, order_id: &str) -> Result<()> {
    let payment = DevGateway::synthetic_payment(order_id);
    let meta = reconcile::payment_meta(&payment);
    if let ReconcileOutcome::Applied(settled) =
        reconcile::process_payment_captured(state, order_id, &meta)?
    {
        reconcile::dispatch_receipt(state, settled);
    }
    tracing::info!(order_id = %order_id, "Dev mode: purchase settled immediately");
    Ok(())
}
