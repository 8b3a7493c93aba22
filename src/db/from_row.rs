//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on bad data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, contact, active, created_at";

pub const PLAN_COLS: &str = "id, title, price, plan_type, expiry_date, link, created_at";

pub const COUPON_COLS: &str = "id, code, percent_off, applies_to, expires_at, max_redemptions, redemption_count, active, created_at";

pub const PURCHASE_COLS: &str = "id, user_id, plan_id, order_id, payment_id, amount, currency, status, validity, coupon_used, payment_method, bank, wallet, email, contact, created_at, settled_at";

pub const ENTITLEMENT_COLS: &str =
    "id, user_id, plan_id, kind, payment_id, purchased_at, valid_until, active";

pub const NOTIFICATION_COLS: &str = "id, user_id, kind, message, metadata, is_read, created_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            contact: row.get(3)?,
            active: row.get::<_, i32>(4)? != 0,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Plan {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Plan {
            id: row.get(0)?,
            title: row.get(1)?,
            price: row.get(2)?,
            plan_type: parse_enum(row, 3, "plan_type")?,
            expiry_date: row.get(4)?,
            link: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for Coupon {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Coupon {
            id: row.get(0)?,
            code: row.get(1)?,
            percent_off: row.get(2)?,
            applies_to: parse_enum(row, 3, "applies_to")?,
            expires_at: row.get(4)?,
            max_redemptions: row.get(5)?,
            redemption_count: row.get(6)?,
            active: row.get::<_, i32>(7)? != 0,
            created_at: row.get(8)?,
        })
    }
}

impl FromRow for Purchase {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Purchase {
            id: row.get(0)?,
            user_id: row.get(1)?,
            plan_id: row.get(2)?,
            order_id: row.get(3)?,
            payment_id: row.get(4)?,
            amount: row.get(5)?,
            currency: row.get(6)?,
            status: parse_enum(row, 7, "status")?,
            validity: row.get(8)?,
            coupon_used: row.get(9)?,
            payment_method: row.get(10)?,
            bank: row.get(11)?,
            wallet: row.get(12)?,
            email: row.get(13)?,
            contact: row.get(14)?,
            created_at: row.get(15)?,
            settled_at: row.get(16)?,
        })
    }
}

impl FromRow for Entitlement {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Entitlement {
            id: row.get(0)?,
            user_id: row.get(1)?,
            plan_id: row.get(2)?,
            kind: parse_enum(row, 3, "kind")?,
            payment_id: row.get(4)?,
            purchased_at: row.get(5)?,
            valid_until: row.get(6)?,
            active: row.get::<_, i32>(7)? != 0,
        })
    }
}

impl FromRow for Notification {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let metadata: Option<String> = row.get(4)?;
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: parse_enum(row, 2, "kind")?,
            message: row.get(3)?,
            metadata: metadata.and_then(|s| serde_json::from_str(&s).ok()),
            is_read: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
        })
    }
}
