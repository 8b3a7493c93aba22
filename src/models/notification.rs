use serde::{Deserialize, Serialize};

/// Audit/inbox record written as a side effect of the flows that produce it.
/// Never mutated afterwards except the `is_read` toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub message: String,
    /// Free-form JSON metadata (order id, payment id, amounts...).
    pub metadata: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FeedbackSubmitted,
    FeedbackUpdated,
    PaymentProcessed,
    PaymentFailed,
    PaymentRefunded,
    UserRegistered,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeedbackSubmitted => "feedback_submitted",
            Self::FeedbackUpdated => "feedback_updated",
            Self::PaymentProcessed => "payment_processed",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRefunded => "payment_refunded",
            Self::UserRegistered => "user_registered",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "feedback_submitted" => Ok(Self::FeedbackSubmitted),
            "feedback_updated" => Ok(Self::FeedbackUpdated),
            "payment_processed" => Ok(Self::PaymentProcessed),
            "payment_failed" => Ok(Self::PaymentFailed),
            "payment_refunded" => Ok(Self::PaymentRefunded),
            "user_registered" => Ok(Self::UserRegistered),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
}
