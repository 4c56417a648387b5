//! crates/donatello_quiz_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the quiz's external collaborators.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete AI service or identity provider.

use async_trait::async_trait;

use crate::domain::{Principal, QuizQuestion, QuizRequest};
use crate::validation::ContentError;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, APIs).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Provider returned invalid content: {0}")]
    InvalidContent(#[from] ContentError),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait QuizContentProvider: Send + Sync {
    /// Generates an ordered list of questions for the requested topic.
    async fn request_quiz(&self, request: &QuizRequest) -> PortResult<Vec<QuizQuestion>>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a credential issued by the provider's sign-in flow.
    async fn verify_credential(&self, credential: &str) -> PortResult<Principal>;
}
