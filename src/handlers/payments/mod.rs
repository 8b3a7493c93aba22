mod order;
mod reconcile;
mod verify;
mod webhook;

pub use order::*;
pub use reconcile::*;
pub use verify::*;
pub use webhook::*;

use axum::{routing::post, Router};

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify_payment))
        .route("/webhook", post(razorpay_webhook))
}
