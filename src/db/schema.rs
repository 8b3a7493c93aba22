use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;

        -- Students/mentees. API tokens are stored hashed; a deactivated
        -- account keeps its rows but cannot start new purchases.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            contact TEXT,
            token_hash TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_token ON users(token_hash);

        -- Purchasable offerings: counselling packages and tool access.
        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            price INTEGER NOT NULL,
            plan_type TEXT NOT NULL CHECK (plan_type IN ('counselling', 'tool')),
            expiry_date INTEGER,
            link TEXT,
            created_at INTEGER NOT NULL
        );

        -- Percentage discount codes.
        CREATE TABLE IF NOT EXISTS coupons (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            percent_off INTEGER NOT NULL CHECK (percent_off BETWEEN 1 AND 100),
            applies_to TEXT NOT NULL CHECK (applies_to IN ('counselling', 'tool', 'any')),
            expires_at INTEGER,
            max_redemptions INTEGER,
            redemption_count INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL
        );

        -- Payment ledger: one row per checkout attempt. amount is in whole
        -- rupees after discount. order_id is the gateway order and is the
        -- reconciliation key for both verify and webhook paths.
        CREATE TABLE IF NOT EXISTS purchases (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            plan_id TEXT NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
            order_id TEXT NOT NULL UNIQUE,
            payment_id TEXT,
            amount INTEGER NOT NULL,
            currency TEXT NOT NULL DEFAULT 'INR',
            status TEXT NOT NULL DEFAULT 'created'
                CHECK (status IN ('created', 'attempted', 'paid', 'failed', 'refunded')),
            validity INTEGER NOT NULL,
            coupon_used TEXT,
            payment_method TEXT,
            bank TEXT,
            wallet TEXT,
            email TEXT,
            contact TEXT,
            created_at INTEGER NOT NULL,
            settled_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_purchases_user ON purchases(user_id);
        CREATE INDEX IF NOT EXISTS idx_purchases_payment ON purchases(payment_id);
        -- At most one open checkout per (user, plan); settled rows don't count.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_purchases_open
            ON purchases(user_id, plan_id) WHERE status = 'created';

        -- Access grants produced by reconciliation; at most one per (user, plan).
        CREATE TABLE IF NOT EXISTS entitlements (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            plan_id TEXT NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('counselling', 'tool')),
            payment_id TEXT,
            purchased_at INTEGER NOT NULL,
            valid_until INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            UNIQUE(user_id, plan_id)
        );
        CREATE INDEX IF NOT EXISTS idx_entitlements_user ON entitlements(user_id);

        -- In-app notification inbox / audit trail.
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            metadata TEXT,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user_time
            ON notifications(user_id, created_at DESC);
        "#,
    )?;
    Ok(())
}
