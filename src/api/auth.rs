//! Bearer-token guard for the admin routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if tokens_match(token, &state.config().admin_token) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(uri = %req.uri(), "admin token rejected");
            Err(ApiError::Unauthorized)
        }
        None => {
            tracing::debug!(uri = %req.uri(), "admin token missing");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
