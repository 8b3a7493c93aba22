//! Shared helpers: validity computation, amount conversion, token hashing.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::models::{Plan, PlanType};

const SECONDS_PER_DAY: i64 = 86400;

/// 2099-12-31T00:00:00Z. Tool purchases never expire in practice; this
/// sentinel keeps the validity column non-null and comparisons simple.
pub const TOOL_VALIDITY_SENTINEL: i64 = 4_102_358_400;

/// Fallback validity window for counselling plans without an explicit expiry.
pub const COUNSELLING_FALLBACK_DAYS: i64 = 30;

/// Compute the entitlement validity for a plan purchase.
///
/// Tools are effectively lifetime purchases (far-future sentinel).
/// Counselling plans run until the plan's own expiry date, or `base_time`
/// plus 30 days when the plan has none.
pub fn validity_for_plan(plan: &Plan, base_time: i64) -> i64 {
    match plan.plan_type {
        PlanType::Tool => TOOL_VALIDITY_SENTINEL,
        PlanType::Counselling => plan
            .expiry_date
            .unwrap_or(base_time + COUNSELLING_FALLBACK_DAYS * SECONDS_PER_DAY),
    }
}

/// Razorpay amounts are denominated in paise; plan prices in whole rupees.
pub fn rupees_to_paise(rupees: i64) -> i64 {
    rupees * 100
}

/// Hash a secret for database lookups (API tokens). SHA-256 with an
/// application salt, lowercase hex.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"collegesecracy-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new API token: `cs_` prefix plus 40 alphanumeric characters.
pub fn generate_api_token() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect();
    format!("cs_{}", token)
}
