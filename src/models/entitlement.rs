use serde::{Deserialize, Serialize};

use crate::models::PlanType;

/// An access grant created by payment reconciliation, at most once per
/// (user, plan). The entitlement table is the authoritative "what can this
/// user access" source consulted by the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    pub kind: PlanType,
    pub payment_id: Option<String>,
    pub purchased_at: i64,
    /// Unix timestamp; far-future sentinel for tools.
    pub valid_until: i64,
    pub active: bool,
}

impl Entitlement {
    pub fn is_valid(&self, now: i64) -> bool {
        self.active && self.valid_until > now
    }
}

#[derive(Debug, Clone)]
pub struct GrantEntitlement {
    pub user_id: String,
    pub plan_id: String,
    pub kind: PlanType,
    pub payment_id: Option<String>,
    pub valid_until: i64,
}
