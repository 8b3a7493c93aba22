use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::util::hash_secret;

use super::from_row::{
    query_all, query_one, COUPON_COLS, ENTITLEMENT_COLS, NOTIFICATION_COLS, PLAN_COLS,
    PURCHASE_COLS, USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

/// Create a user and return it together with the plaintext API token.
/// Only the token hash is persisted.
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<(User, String)> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();
    let token = crate::util::generate_api_token();

    conn.execute(
        "INSERT INTO users (id, email, name, contact, token_hash, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        params![&id, &email, &input.name, &input.contact, hash_secret(&token), now],
    )?;

    Ok((
        User {
            id,
            email,
            name: input.name.clone(),
            contact: input.contact.clone(),
            active: true,
            created_at: now,
        },
        token,
    ))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_token(conn: &Connection, token: &str) -> Result<Option<User>> {
    let hash = hash_secret(token);
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE token_hash = ?1", USER_COLS),
        &[&hash],
    )
}

pub fn set_user_active(conn: &Connection, id: &str, active: bool) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET active = ?1 WHERE id = ?2",
        params![active as i32, id],
    )?;
    Ok(affected > 0)
}

// ============ Plans ============

pub fn create_plan(conn: &Connection, input: &CreatePlan) -> Result<Plan> {
    input.validate()?;
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO plans (id, title, price, plan_type, expiry_date, link, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.title,
            input.price,
            input.plan_type.as_str(),
            input.expiry_date,
            &input.link,
            now
        ],
    )?;

    Ok(Plan {
        id,
        title: input.title.clone(),
        price: input.price,
        plan_type: input.plan_type,
        expiry_date: input.expiry_date,
        link: input.link.clone(),
        created_at: now,
    })
}

pub fn get_plan_by_id(conn: &Connection, id: &str) -> Result<Option<Plan>> {
    query_one(
        conn,
        &format!("SELECT {} FROM plans WHERE id = ?1", PLAN_COLS),
        &[&id],
    )
}

pub fn list_plans(conn: &Connection) -> Result<Vec<Plan>> {
    query_all(
        conn,
        &format!("SELECT {} FROM plans ORDER BY created_at DESC", PLAN_COLS),
        &[],
    )
}

// ============ Coupons ============

pub fn create_coupon(conn: &Connection, input: &CreateCoupon) -> Result<Coupon> {
    let id = gen_id();
    let now = now();
    let code = input.code.trim().to_uppercase();

    conn.execute(
        "INSERT INTO coupons (id, code, percent_off, applies_to, expires_at, max_redemptions,
                              redemption_count, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 1, ?7)",
        params![
            &id,
            &code,
            input.percent_off,
            input.applies_to.as_str(),
            input.expires_at,
            input.max_redemptions,
            now
        ],
    )?;

    Ok(Coupon {
        id,
        code,
        percent_off: input.percent_off,
        applies_to: input.applies_to,
        expires_at: input.expires_at,
        max_redemptions: input.max_redemptions,
        redemption_count: 0,
        active: true,
        created_at: now,
    })
}

pub fn get_coupon_by_code(conn: &Connection, code: &str) -> Result<Option<Coupon>> {
    let code = code.trim().to_uppercase();
    query_one(
        conn,
        &format!("SELECT {} FROM coupons WHERE code = ?1", COUPON_COLS),
        &[&code],
    )
}

pub fn increment_coupon_redemptions(conn: &Connection, code: &str) -> Result<()> {
    conn.execute(
        "UPDATE coupons SET redemption_count = redemption_count + 1 WHERE code = ?1",
        params![code],
    )?;
    Ok(())
}

// ============ Purchases ============

pub fn create_purchase(conn: &Connection, input: &CreatePurchase) -> Result<Purchase> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO purchases (id, user_id, plan_id, order_id, amount, currency, status,
                                validity, coupon_used, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'created', ?7, ?8, ?9)",
        params![
            &id,
            &input.user_id,
            &input.plan_id,
            &input.order_id,
            input.amount,
            &input.currency,
            input.validity,
            &input.coupon_used,
            now
        ],
    )?;

    Ok(Purchase {
        id,
        user_id: input.user_id.clone(),
        plan_id: input.plan_id.clone(),
        order_id: input.order_id.clone(),
        payment_id: None,
        amount: input.amount,
        currency: input.currency.clone(),
        status: PurchaseStatus::Created,
        validity: input.validity,
        coupon_used: input.coupon_used.clone(),
        payment_method: None,
        bank: None,
        wallet: None,
        email: None,
        contact: None,
        created_at: now,
        settled_at: None,
    })
}

pub fn get_purchase_by_order_id(conn: &Connection, order_id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!("SELECT {} FROM purchases WHERE order_id = ?1", PURCHASE_COLS),
        &[&order_id],
    )
}

pub fn get_purchase_by_payment_id(conn: &Connection, payment_id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM purchases WHERE payment_id = ?1",
            PURCHASE_COLS
        ),
        &[&payment_id],
    )
}

/// Find an unsettled checkout for this user and plan, to reuse its gateway
/// order instead of creating a duplicate.
pub fn find_open_purchase(conn: &Connection, user_id: &str, plan_id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM purchases
             WHERE user_id = ?1 AND plan_id = ?2 AND status = 'created'",
            PURCHASE_COLS
        ),
        &[&user_id, &plan_id],
    )
}

pub fn find_paid_purchase(conn: &Connection, user_id: &str, plan_id: &str) -> Result<Option<Purchase>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM purchases
             WHERE user_id = ?1 AND plan_id = ?2 AND status = 'paid'",
            PURCHASE_COLS
        ),
        &[&user_id, &plan_id],
    )
}

/// Gateway metadata captured on settlement.
#[derive(Debug, Clone, Default)]
pub struct PaymentMeta {
    pub payment_id: String,
    pub method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
}

/// Atomically settle a purchase as paid. The conditional UPDATE is the
/// idempotency guard: when verify and the webhook race, exactly one caller
/// sees `true` and performs the side effects.
pub fn try_settle_purchase(conn: &Connection, order_id: &str, meta: &PaymentMeta) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE purchases
         SET status = 'paid', payment_id = ?1, payment_method = ?2, bank = ?3,
             wallet = ?4, email = ?5, contact = ?6, settled_at = ?7
         WHERE order_id = ?8 AND status IN ('created', 'attempted')",
        params![
            &meta.payment_id,
            &meta.method,
            &meta.bank,
            &meta.wallet,
            &meta.email,
            &meta.contact,
            now(),
            order_id
        ],
    )?;
    Ok(affected > 0)
}

/// Mark a purchase failed. Paid rows are never demoted; a failure event
/// arriving after capture is a no-op.
pub fn mark_purchase_failed(conn: &Connection, order_id: &str, payment_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE purchases
         SET status = 'failed', payment_id = ?1, settled_at = ?2
         WHERE order_id = ?3 AND status IN ('created', 'attempted')",
        params![payment_id, now(), order_id],
    )?;
    Ok(affected > 0)
}

/// Mark a purchase refunded. Only reachable from `paid`.
pub fn mark_purchase_refunded(conn: &Connection, payment_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE purchases SET status = 'refunded' WHERE payment_id = ?1 AND status = 'paid'",
        params![payment_id],
    )?;
    Ok(affected > 0)
}

// ============ Entitlements ============

pub fn has_active_entitlement(conn: &Connection, user_id: &str, plan_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entitlements
         WHERE user_id = ?1 AND plan_id = ?2 AND active = 1 AND valid_until > ?3",
        params![user_id, plan_id, now()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn grant_entitlement(conn: &Connection, input: &GrantEntitlement) -> Result<Entitlement> {
    let id = gen_id();
    let now = now();

    // ON CONFLICT refresh: a re-purchase of the same plan extends the grant
    // rather than failing the unique constraint.
    conn.execute(
        "INSERT INTO entitlements (id, user_id, plan_id, kind, payment_id, purchased_at,
                                   valid_until, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
         ON CONFLICT(user_id, plan_id) DO UPDATE SET
             payment_id = excluded.payment_id,
             purchased_at = excluded.purchased_at,
             valid_until = excluded.valid_until,
             active = 1",
        params![
            &id,
            &input.user_id,
            &input.plan_id,
            input.kind.as_str(),
            &input.payment_id,
            now,
            input.valid_until
        ],
    )?;

    Ok(Entitlement {
        id,
        user_id: input.user_id.clone(),
        plan_id: input.plan_id.clone(),
        kind: input.kind,
        payment_id: input.payment_id.clone(),
        purchased_at: now,
        valid_until: input.valid_until,
        active: true,
    })
}

pub fn list_entitlements_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Entitlement>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM entitlements WHERE user_id = ?1 ORDER BY purchased_at DESC",
            ENTITLEMENT_COLS
        ),
        &[&user_id],
    )
}

// ============ Notifications ============

pub fn create_notification(conn: &Connection, input: &CreateNotification) -> Result<Notification> {
    let id = gen_id();
    let now = now();
    let metadata = input
        .metadata
        .as_ref()
        .map(|m| serde_json::to_string(m))
        .transpose()?;

    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, message, metadata, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![&id, &input.user_id, input.kind.as_str(), &input.message, &metadata, now],
    )?;

    Ok(Notification {
        id,
        user_id: input.user_id.clone(),
        kind: input.kind,
        message: input.message.clone(),
        metadata: input.metadata.clone(),
        is_read: false,
        created_at: now,
    })
}

pub fn list_notifications_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Notification>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM notifications WHERE user_id = ?1 ORDER BY created_at DESC",
            NOTIFICATION_COLS
        ),
        &[&user_id],
    )
}

pub fn count_unread_notifications(conn: &Connection, user_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_notification_read(conn: &Connection, id: &str, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(affected > 0)
}
