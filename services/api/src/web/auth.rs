//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for signing in with the identity provider and signing out.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use donatello_quiz_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::web::{
    identity::{AuthService, IdentityGate, SetupInstructions, SESSION_COOKIE},
    middleware::session_cookie,
    protocol::PrincipalView,
    state::AppState,
};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignInRequest {
    /// ID token obtained from the provider's popup sign-in.
    pub id_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub principal: PrincipalView,
}

/// Returns the auth service, or the setup instructions as a 503 response.
fn auth_service(state: &AppState) -> Result<&Arc<AuthService>, Response> {
    match &state.identity {
        IdentityGate::Ready(auth) => Ok(auth),
        IdentityGate::Unconfigured(instructions) => {
            Err((StatusCode::SERVICE_UNAVAILABLE, Json(instructions.clone())).into_response())
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/session - Sign in with a provider ID token
#[utoipa::path(
    post,
    path = "/auth/session",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "The identity provider rejected the credential"),
        (status = 503, description = "Identity provider not configured", body = SetupInstructions),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignInRequest>,
) -> Result<Response, Response> {
    let auth = auth_service(&state)?;

    // 1. Verify the credential and open an auth session
    let session = auth.sign_in(&req.id_token).await.map_err(|e| match e {
        PortError::Unauthorized => {
            (StatusCode::UNAUTHORIZED, "Sign-in was not accepted".to_string()).into_response()
        }
        other => {
            error!("Failed to sign in: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign in".to_string()).into_response()
        }
    })?;

    // 2. Create session cookie
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        auth.ttl().num_seconds()
    );

    // 3. Return response with cookie
    let response = AuthResponse {
        principal: PrincipalView::from(&session.principal),
    };
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)).into_response())
}

/// GET /auth/me - The signed-in principal
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Signed out"),
        (status = 503, description = "Identity provider not configured", body = SetupInstructions)
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let auth = auth_service(&state)?;
    let principal = session_cookie(&headers)
        .and_then(|id| auth.current_principal(id))
        .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())?;

    Ok(Json(AuthResponse {
        principal: PrincipalView::from(&principal),
    })
    .into_response())
}

/// POST /auth/logout - Sign out and invalidate the auth session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session"),
        (status = 503, description = "Identity provider not configured", body = SetupInstructions)
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let auth = auth_service(&state)?;

    // 1. Extract session id from the cookie
    let session_id = session_cookie(&headers)
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "No session found".to_string()).into_response())?;

    // 2. End the auth session; open quiz connections are told through the watcher
    if !auth.sign_out(session_id) {
        return Err((StatusCode::UNAUTHORIZED, "No session found".to_string()).into_response());
    }

    // 3. Clear cookie
    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]).into_response())
}
