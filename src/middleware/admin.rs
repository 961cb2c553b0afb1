use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use headers::authorization::Bearer;
use headers::{Authorization, HeaderMapExt};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::ZakiState;

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the admin key.
/// Accepts either:
/// - Header: `x-admin-key: ...`
/// - Header: `Authorization: Bearer ...`
///
/// An empty configured key disables the admin surface (404).
pub fn ensure_admin(headers: &HeaderMap, expected: &str) -> Result<(), Response> {
    if expected.is_empty() {
        return Err(StatusCode::NOT_FOUND.into_response());
    }

    if let Some(hv) = headers.get("x-admin-key").and_then(|v| v.to_str().ok())
        && key_matches(hv, expected)
    {
        return Ok(());
    }

    if let Some(bearer) = headers.typed_get::<Authorization<Bearer>>()
        && key_matches(bearer.token(), expected)
    {
        return Ok(());
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": "UNAUTHORIZED", "message": "invalid or missing admin key"}})),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireAdminKey;

impl FromRequestParts<ZakiState> for RequireAdminKey {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ZakiState,
    ) -> Result<Self, Self::Rejection> {
        ensure_admin(&parts.headers, &state.admin_key)?;
        Ok(Self)
    }
}
