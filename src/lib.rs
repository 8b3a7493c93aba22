//! CollegeSecracy payments - order orchestration and entitlement backend
//!
//! This library provides the payment flow for the CollegeSecracy counseling
//! platform: the plan catalog, the purchase ledger, Razorpay order creation,
//! dual verify/webhook reconciliation, and entitlement grants.

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod gateway;
pub mod handlers;
pub mod invoice;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod util;
