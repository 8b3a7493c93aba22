use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// A purchasable catalog entry: a counseling package or a premium tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub title: String,
    /// Price in whole rupees. Converted to paise at order time.
    pub price: i64,
    pub plan_type: PlanType,
    /// Unix timestamp after which the plan can no longer be purchased.
    /// Required for counselling plans; tools have no expiry.
    pub expiry_date: Option<i64>,
    /// Destination URL for tool plans (required for tools).
    pub link: Option<String>,
    pub created_at: i64,
}

impl Plan {
    /// A counselling plan past its expiry date cannot be purchased.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Counselling,
    Tool,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counselling => "counselling",
            Self::Tool => "tool",
        }
    }
}

impl std::str::FromStr for PlanType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "counselling" => Ok(Self::Counselling),
            "tool" => Ok(Self::Tool),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePlan {
    pub title: String,
    pub price: i64,
    pub plan_type: PlanType,
    #[serde(default)]
    pub expiry_date: Option<i64>,
    #[serde(default)]
    pub link: Option<String>,
}

impl CreatePlan {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest(msg::TITLE_EMPTY.into()));
        }
        match self.plan_type {
            PlanType::Counselling if self.expiry_date.is_none() => {
                Err(AppError::BadRequest(msg::COUNSELLING_EXPIRY_REQUIRED.into()))
            }
            PlanType::Tool if self.link.is_none() => {
                Err(AppError::BadRequest(msg::TOOL_LINK_REQUIRED.into()))
            }
            _ => Ok(()),
        }
    }
}
