//! Admin authentication.
//!
//! Every `/admin` route requires the raw control API secret in the
//! `Authorization` header.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

use crate::AppState;

pub const AUTH_FAILED: &str = "Authorization failed";

pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !secret_matches(provided, &state.control_api_secret) {
        tracing::warn!(path = %request.uri().path(), "Admin authorization failed");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "message": AUTH_FAILED })),
        )
            .into_response();
    }
    next.run(request).await
}

/// Compares in constant time for equal lengths.
fn secret_matches(provided: &str, expected: &str) -> bool {
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());
    if expected.is_empty() {
        return false;
    }
    if provided.len() != expected.len() {
        // Burn a comparison so a length mismatch costs the same.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}
