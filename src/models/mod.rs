mod coupon;
mod entitlement;
mod notification;
mod plan;
mod purchase;
mod user;

pub use coupon::*;
pub use entitlement::*;
pub use notification::*;
pub use plan::*;
pub use purchase::*;
pub use user::*;
