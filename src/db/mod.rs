mod from_row;
mod schema;

pub mod queries;

pub use from_row::{query_all, query_one, FromRow};
pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::gateway::PaymentGateway;
use crate::mailer::EmailService;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Base URL for links embedded in emails.
    pub base_url: String,
    /// Dev mode short-circuits the gateway: orders settle immediately and
    /// verify succeeds unconditionally.
    pub dev_mode: bool,
    /// Razorpay key secret, for payment signature verification.
    pub key_secret: String,
    /// Separate secret for webhook signature verification.
    pub webhook_secret: String,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<EmailService>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

/// In-memory pool for tests. A single connection keeps every handle on the
/// same database.
pub fn create_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory();
    Pool::builder().max_size(1).build(manager)
}
