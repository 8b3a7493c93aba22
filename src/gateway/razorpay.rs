//! Razorpay REST client and signature verification.
//!
//! Two distinct HMAC-SHA256 schemes are in play:
//! - checkout callback: hex HMAC over `"{order_id}|{payment_id}"` keyed with
//!   the API key secret;
//! - webhooks: hex HMAC over the raw request body keyed with the separate
//!   webhook secret, delivered in `x-razorpay-signature`.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

use super::{GatewayOrder, GatewayPayment, PaymentGateway};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    order_id: Option<String>,
    status: String,
    method: Option<String>,
    bank: Option<String>,
    wallet: Option<String>,
    email: Option<String>,
    contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(key_id: String, key_secret: String) -> Self {
        Self {
            client: Client::new(),
            key_id,
            key_secret,
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
        notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder> {
        let response = self
            .client
            .post(format!("{}/orders", API_BASE))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({
                "amount": amount,
                "currency": currency,
                "receipt": receipt,
                "notes": notes,
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Razorpay order creation failed: {}",
                error_text
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let response = self
            .client
            .get(format!("{}/payments/{}", API_BASE, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Razorpay API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Razorpay payment lookup failed: {}",
                error_text
            )));
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(GatewayPayment {
            id: payment.id,
            order_id: payment.order_id,
            status: payment.status,
            method: payment.method,
            bank: payment.bank,
            wallet: payment.wallet,
            email: payment.email,
            contact: payment.contact,
        })
    }
}

fn hmac_hex(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    // Length check is not constant time but lengths are not secret here.
    a.len() == b.len() && a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verify the checkout callback signature over `"{order_id}|{payment_id}"`.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> bool {
    let expected = hmac_hex(format!("{}|{}", order_id, payment_id).as_bytes(), key_secret);
    constant_time_eq(&expected, signature)
}

/// Verify a webhook signature over the raw request body.
pub fn verify_webhook_signature(payload: &[u8], signature: &str, webhook_secret: &str) -> bool {
    let expected = hmac_hex(payload, webhook_secret);
    constant_time_eq(&expected, signature)
}

// ============ Webhook wire format ============

#[derive(Debug, Deserialize)]
pub struct RazorpayWebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<EntityWrapper<WebhookPaymentEntity>>,
    pub refund: Option<EntityWrapper<WebhookRefundEntity>>,
}

#[derive(Debug, Deserialize)]
pub struct EntityWrapper<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: String,
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRefundEntity {
    pub id: String,
    pub payment_id: String,
    #[serde(default)]
    pub amount: i64,
}
