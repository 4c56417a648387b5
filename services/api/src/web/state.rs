//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::{config::Config, web::identity::IdentityGate};
use donatello_quiz_core::{domain::Principal, ports::QuizContentProvider};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub quiz_provider: Arc<dyn QuizContentProvider>,
    pub identity: IdentityGate,
}

//=========================================================================================
// Per-Request Identity
//=========================================================================================

/// Inserted into request extensions by `require_auth`.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub session_id: String,
    pub principal: Principal,
}
