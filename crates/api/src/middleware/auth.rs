//! Admin authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app::AppState;

/// Header carrying the admin key.
pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Marker stored in request extensions once the admin key was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAccess;

/// Middleware for admin-only routes.
///
/// Rejects the request unless `X-Admin-Key` matches
/// `security.admin_api_key`. An empty configured key locks the admin
/// surface entirely.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.security.admin_api_key.as_str();
    if expected.is_empty() {
        return forbidden_response("Admin access is not configured");
    }

    let provided = match req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        Some(key) => key,
        None => return unauthorized_response("Invalid or missing admin key"),
    };

    if !keys_match(provided, expected) {
        tracing::warn!("Rejected admin request with invalid key");
        return unauthorized_response("Invalid or missing admin key");
    }

    req.extensions_mut().insert(AdminAccess);
    next.run(req).await
}

/// Compares keys without short-circuiting on the first differing byte.
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("secret-key", "secret-key"));
        assert!(!keys_match("secret-kez", "secret-key"));
        assert!(!keys_match("secret", "secret-key"));
        assert!(!keys_match("", "secret-key"));
    }

    #[test]
    fn test_unauthorized_response() {
        let response = unauthorized_response("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_response() {
        let response = forbidden_response("nope");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
