use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};

use crate::db::{queries, AppState};
use crate::error::AppError;
use crate::models::User;

/// Extract the bearer token from an Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authenticated user extractor. Resolves the bearer API token against the
/// users table; any failure maps to 401 without detail.
#[derive(Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let conn = state.db.get()?;
        let user = queries::get_user_by_token(&conn, token)?.ok_or(AppError::Unauthorized)?;
        Ok(AuthUser(user))
    }
}
