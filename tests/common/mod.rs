//! Test utilities and fixtures for CollegeSecracy integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use hmac::{Hmac, Mac};
use rusqlite::Connection;
use sha2::Sha256;

pub use collegesecracy::db::{create_memory_pool, init_db, queries, AppState};
pub use collegesecracy::error::Result;
pub use collegesecracy::gateway::{DevGateway, GatewayOrder, GatewayPayment, PaymentGateway};
pub use collegesecracy::mailer::EmailService;
pub use collegesecracy::models::*;

pub const TEST_KEY_SECRET: &str = "test_key_secret";
pub const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// In-memory gateway double. Counts order creations and serves payments the
/// test registered beforehand.
pub struct FakeGateway {
    pub orders_created: AtomicUsize,
    payments: Mutex<HashMap<String, GatewayPayment>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            orders_created: AtomicUsize::new(0),
            payments: Mutex::new(HashMap::new()),
        }
    }

    pub fn order_count(&self) -> usize {
        self.orders_created.load(Ordering::SeqCst)
    }

    /// Register a captured payment so `fetch_payment` can serve it.
    pub fn register_captured_payment(&self, payment_id: &str, order_id: &str) {
        self.payments.lock().unwrap().insert(
            payment_id.to_string(),
            GatewayPayment {
                id: payment_id.to_string(),
                order_id: Some(order_id.to_string()),
                status: "captured".to_string(),
                method: Some("upi".to_string()),
                bank: None,
                wallet: None,
                email: Some("student@example.com".to_string()),
                contact: Some("+911234567890".to_string()),
            },
        );
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        _receipt: &str,
        _notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder> {
        let n = self.orders_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{}", n),
            amount,
            currency: currency.to_string(),
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| {
                collegesecracy::error::AppError::Internal(format!(
                    "Unknown test payment: {}",
                    payment_id
                ))
            })
    }
}

/// Build an AppState over a single-connection in-memory pool.
pub fn create_test_app_state(dev_mode: bool) -> (AppState, Arc<FakeGateway>) {
    // One connection: every handle sees the same in-memory database.
    let pool = create_memory_pool().unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let gateway = Arc::new(FakeGateway::new());
    // Dev mode gets the same gateway the binary wires up, so synthetic order
    // ids and instant settlement behave exactly as in production dev mode.
    let active_gateway: Arc<dyn PaymentGateway> = if dev_mode {
        Arc::new(DevGateway)
    } else {
        gateway.clone()
    };
    let state = AppState {
        db: pool,
        base_url: "http://localhost:4000".to_string(),
        dev_mode,
        key_secret: TEST_KEY_SECRET.to_string(),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
        gateway: active_gateway,
        mailer: Arc::new(EmailService::new(None, "billing@test.local".to_string(), true)),
    };
    (state, gateway)
}

/// Router covering the full payment surface.
pub fn payments_app(state: AppState) -> Router {
    collegesecracy::handlers::router().with_state(state)
}

/// Create a test user, returning the row and the plaintext API token.
pub fn create_test_user(conn: &Connection, email: &str) -> (User, String) {
    queries::create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: format!("Test Student {}", email),
            contact: None,
        },
    )
    .expect("Failed to create test user")
}

pub fn create_test_plan(conn: &Connection, plan_type: PlanType, price: i64) -> Plan {
    let (expiry_date, link) = match plan_type {
        PlanType::Counselling => (Some(chrono::Utc::now().timestamp() + 90 * 86400), None),
        PlanType::Tool => (None, Some("/tools/college-predictor".to_string())),
    };
    queries::create_plan(
        conn,
        &CreatePlan {
            title: format!("Test {} Plan", plan_type),
            price,
            plan_type,
            expiry_date,
            link,
        },
    )
    .expect("Failed to create test plan")
}

pub fn create_test_coupon(conn: &Connection, code: &str, percent_off: i64) -> Coupon {
    queries::create_coupon(
        conn,
        &CreateCoupon {
            code: code.to_string(),
            percent_off,
            applies_to: CouponScope::Any,
            expires_at: None,
            max_redemptions: None,
        },
    )
    .expect("Failed to create test coupon")
}

pub fn create_test_purchase(conn: &Connection, user_id: &str, plan: &Plan, order_id: &str) -> Purchase {
    queries::create_purchase(
        conn,
        &CreatePurchase {
            user_id: user_id.to_string(),
            plan_id: plan.id.clone(),
            order_id: order_id.to_string(),
            amount: plan.price,
            currency: "INR".to_string(),
            validity: collegesecracy::util::validity_for_plan(plan, chrono::Utc::now().timestamp()),
            coupon_used: None,
        },
    )
    .expect("Failed to create test purchase")
}

/// POST a JSON body, optionally with a bearer token.
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> axum::http::Response<axum::body::Body> {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    app.clone()
        .oneshot(
            builder
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: axum::http::Response<axum::body::Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Hex HMAC-SHA256 over a webhook body, as the gateway would sign it.
pub fn sign_webhook(body: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checkout callback signature over `"{order_id}|{payment_id}"`.
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> String {
    sign_webhook(format!("{}|{}", order_id, payment_id).as_bytes(), secret)
}
