//! Payment gateway abstraction.
//!
//! Handlers talk to a `PaymentGateway` trait object so the live Razorpay
//! client and the dev-mode gateway are interchangeable at startup. Dev mode
//! never touches the network: it fabricates order and payment ids locally.

mod razorpay;

pub use razorpay::{
    verify_payment_signature, verify_webhook_signature, EntityWrapper, RazorpayClient,
    RazorpayWebhookEvent, WebhookPayload, WebhookPaymentEntity, WebhookRefundEntity,
};

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// A gateway order as returned by order creation. Amounts are in paise.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

/// A payment as reported by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub status: String,
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

impl GatewayPayment {
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order for `amount` paise. `notes` are opaque key/value
    /// metadata echoed back by the gateway.
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
        notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder>;

    /// Fetch a payment by gateway id.
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

/// Offline gateway for local development. Orders get synthetic ids and every
/// payment lookup reports a captured payment against that order.
pub struct DevGateway;

impl DevGateway {
    /// Fabricate a captured payment for an order, used when dev mode settles
    /// a purchase at order-creation time.
    pub fn synthetic_payment(order_id: &str) -> GatewayPayment {
        GatewayPayment {
            id: format!("pay_dev_{}", Uuid::new_v4().simple()),
            order_id: Some(order_id.to_string()),
            status: "captured".to_string(),
            method: Some("dev".to_string()),
            bank: None,
            wallet: None,
            email: None,
            contact: None,
        }
    }
}

#[async_trait]
impl PaymentGateway for DevGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        _receipt: &str,
        _notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder> {
        Ok(GatewayOrder {
            id: format!("order_dev_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        Ok(GatewayPayment {
            id: payment_id.to_string(),
            order_id: None,
            status: "captured".to_string(),
            method: Some("dev".to_string()),
            bank: None,
            wallet: None,
            email: None,
            contact: None,
        })
    }
}
