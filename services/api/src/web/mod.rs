pub mod auth;
pub mod identity;
pub mod middleware;
pub mod protocol;
pub mod quiz_task;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

// Re-export the handlers the binary and tests build routers from.
pub use auth::{logout_handler, me_handler, sign_in_handler};
pub use middleware::require_auth;
pub use rest::{config_status_handler, topics_handler};
pub use ws_handler::ws_handler;

use state::AppState;

/// Builds the API router: public routes, auth routes, and the protected WebSocket.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/config/status", get(config_status_handler))
        .route("/quiz/topics", get(topics_handler))
        .route("/auth/session", post(sign_in_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let router = Router::new().merge(public_routes).merge(protected_routes);

    let router = match app_state.config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => router.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]),
        ),
        Err(e) => {
            warn!(
                "ALLOWED_ORIGIN '{}' is not a valid header value ({}); CORS disabled.",
                app_state.config.allowed_origin, e
            );
            router
        }
    };

    router.with_state(app_state)
}
