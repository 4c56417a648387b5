//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::web::{
    identity::{IdentityGate, SESSION_COOKIE},
    state::{AppState, SignedIn},
};

/// Reads the auth session id from the `Cookie` header.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|id| !id.is_empty())
}

/// Middleware that resolves the auth session cookie to a signed-in principal.
///
/// If valid, inserts a `SignedIn` into request extensions for handlers to use.
/// If missing or expired, returns 401 Unauthorized. Without identity configuration
/// nobody can sign in, so the setup instructions are returned with 503.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth = match &state.identity {
        IdentityGate::Ready(auth) => auth,
        IdentityGate::Unconfigured(instructions) => {
            warn!("Rejecting request to {}: identity provider is not configured.", req.uri());
            return (StatusCode::SERVICE_UNAVAILABLE, Json(instructions.clone())).into_response();
        }
    };

    // 1. Extract session id from the cookie
    let Some(session_id) = session_cookie(req.headers()).map(str::to_string) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // 2. Resolve it to a principal
    let Some(principal) = auth.current_principal(&session_id) else {
        debug!("Auth session is unknown or expired.");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // 3. Insert the principal into request extensions and continue to the handler
    req.extensions_mut().insert(SignedIn {
        session_id,
        principal,
    });
    next.run(req).await
}
