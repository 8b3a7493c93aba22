use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::models::PlanType;

/// A percentage discount code, optionally restricted to one plan type and
/// capped by redemption count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    /// Whole-percent discount (1-100).
    pub percent_off: i64,
    pub applies_to: CouponScope,
    pub expires_at: Option<i64>,
    pub max_redemptions: Option<i64>,
    pub redemption_count: i64,
    pub active: bool,
    pub created_at: i64,
}

impl Coupon {
    /// Validate this coupon against a plan type at purchase time.
    pub fn validate_for(&self, plan_type: PlanType, now: i64) -> Result<()> {
        if !self.active {
            return Err(AppError::BadRequest(msg::COUPON_INACTIVE.into()));
        }
        if matches!(self.expires_at, Some(expiry) if expiry < now) {
            return Err(AppError::BadRequest(msg::COUPON_EXPIRED.into()));
        }
        if !self.applies_to.covers(plan_type) {
            return Err(AppError::BadRequest(msg::COUPON_NOT_APPLICABLE.into()));
        }
        if matches!(self.max_redemptions, Some(cap) if self.redemption_count >= cap) {
            return Err(AppError::BadRequest(msg::COUPON_EXHAUSTED.into()));
        }
        Ok(())
    }

    /// Rupee discount for a given rupee price (integer math, floor).
    pub fn discount_for(&self, price: i64) -> i64 {
        price * self.percent_off / 100
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    Counselling,
    Tool,
    Any,
}

impl CouponScope {
    pub fn covers(&self, plan_type: PlanType) -> bool {
        match self {
            Self::Any => true,
            Self::Counselling => plan_type == PlanType::Counselling,
            Self::Tool => plan_type == PlanType::Tool,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counselling => "counselling",
            Self::Tool => "tool",
            Self::Any => "any",
        }
    }
}

impl std::str::FromStr for CouponScope {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "counselling" => Ok(Self::Counselling),
            "tool" => Ok(Self::Tool),
            "any" => Ok(Self::Any),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCoupon {
    pub code: String,
    pub percent_off: i64,
    pub applies_to: CouponScope,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub max_redemptions: Option<i64>,
}
