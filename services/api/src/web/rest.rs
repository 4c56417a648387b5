//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the informational REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    auth::{AuthResponse, SignInRequest},
    identity::{IdentityGate, SetupInstructions},
    protocol::{topic_views, PrincipalView, TopicView},
    state::AppState,
};
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        config_status_handler,
        topics_handler,
        crate::web::auth::sign_in_handler,
        crate::web::auth::me_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(ConfigStatus, SetupInstructions, TopicView, SignInRequest, AuthResponse, PrincipalView)
    ),
    tags(
        (name = "Donatello Quiz API", description = "API endpoints for the Donatello quiz game.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

/// Whether players can sign in, and what to do about it if not.
#[derive(Serialize, ToSchema)]
pub struct ConfigStatus {
    pub identity_configured: bool,
    pub setup: Option<SetupInstructions>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Report the identity-provider configuration state.
///
/// Clients render the setup instructions instead of the sign-in screen when
/// `identity_configured` is false.
#[utoipa::path(
    get,
    path = "/config/status",
    responses(
        (status = 200, description = "Configuration state", body = ConfigStatus)
    )
)]
pub async fn config_status_handler(State(app_state): State<Arc<AppState>>) -> Json<ConfigStatus> {
    let status = match &app_state.identity {
        IdentityGate::Ready(_) => ConfigStatus {
            identity_configured: true,
            setup: None,
        },
        IdentityGate::Unconfigured(instructions) => ConfigStatus {
            identity_configured: false,
            setup: Some(instructions.clone()),
        },
    };
    Json(status)
}

/// List the topics a quiz can be generated for.
#[utoipa::path(
    get,
    path = "/quiz/topics",
    responses(
        (status = 200, description = "Available topics", body = [TopicView])
    )
)]
pub async fn topics_handler() -> Json<Vec<TopicView>> {
    Json(topic_views())
}
