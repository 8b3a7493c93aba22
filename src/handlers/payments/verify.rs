use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::gateway::verify_payment_signature;
use crate::middleware::AuthUser;

use super::reconcile::{self, ReconcileOutcome};

/// Checkout callback body, field names as Razorpay's widget posts them.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Client-side confirmation path. The signature proves the payment came from
/// the gateway; the payment is still re-fetched so settlement relies on
/// gateway state, not on what the client posted.
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>> {
    if state.dev_mode {
        // Dev orders settle at creation time; nothing to verify.
        return Ok(Json(VerifyPaymentResponse {
            success: true,
            message: "Payment verified (dev mode)",
        }));
    }

    if !verify_payment_signature(
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
        &state.key_secret,
    ) {
        return Err(AppError::BadRequest(msg::INVALID_SIGNATURE.into()));
    }

    let payment = state.gateway.fetch_payment(&req.razorpay_payment_id).await?;

    if payment.order_id.as_deref() != Some(req.razorpay_order_id.as_str()) {
        tracing::warn!(
            payment_id = %payment.id,
            "Payment does not belong to the claimed order"
        );
        return Err(AppError::BadRequest(msg::INVALID_SIGNATURE.into()));
    }

    if !payment.is_captured() {
        return Err(AppError::BadRequest(msg::PAYMENT_NOT_CAPTURED.into()));
    }

    let meta = reconcile::payment_meta(&payment);
    match reconcile::process_payment_captured(&state, &req.razorpay_order_id, &meta)? {
        ReconcileOutcome::Applied(purchase) => {
            reconcile::dispatch_receipt(&state, purchase);
            Ok(Json(VerifyPaymentResponse {
                success: true,
                message: "Payment verified",
            }))
        }
        // The webhook beat us to it; verification still succeeded.
        ReconcileOutcome::AlreadyProcessed => Ok(Json(VerifyPaymentResponse {
            success: true,
            message: "Payment already processed",
        })),
        ReconcileOutcome::OrderNotFound => Err(AppError::NotFound(msg::ORDER_NOT_FOUND.into())),
    }
}
