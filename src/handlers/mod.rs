pub mod payments;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::Result;
use crate::models::Plan;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public plan catalog, consulted by the checkout page before auth.
async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_plans(&conn)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/plans", get(list_plans))
        .nest("/api/v1/payments", payments::router())
}
