use serde::{Deserialize, Serialize};

/// One row per checkout attempt, not per successful payment: a `created`
/// purchase may never settle. `paid` is terminal for capture; `refunded`
/// is only reachable from `paid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    pub plan_id: String,
    /// Gateway-assigned order id; unique across the ledger.
    pub order_id: String,
    /// Gateway payment id, populated only on settlement.
    pub payment_id: Option<String>,
    /// Amount in whole rupees after any coupon discount.
    pub amount: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    /// Entitlement expiry computed at order time (sentinel for tools).
    pub validity: i64,
    pub coupon_used: Option<String>,

    // Gateway metadata, stamped on settlement.
    pub payment_method: Option<String>,
    pub bank: Option<String>,
    pub wallet: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,

    pub created_at: i64,
    pub settled_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Created,
    Attempted,
    Paid,
    Failed,
    Refunded,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Attempted => "attempted",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "attempted" => Ok(Self::Attempted),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data required to persist a new ledger row after the gateway order exists.
#[derive(Debug, Clone)]
pub struct CreatePurchase {
    pub user_id: String,
    pub plan_id: String,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub validity: i64,
    pub coupon_used: Option<String>,
}
