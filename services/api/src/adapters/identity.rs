//! services/api/src/adapters/identity.rs
//!
//! This module contains the adapter for the Firebase identity provider.
//! It implements the `IdentityProvider` port from the `core` crate.
//!
//! The browser performs the popup sign-in and hands the resulting ID token to the
//! server, which looks it up through the Identity Toolkit REST API.

use async_trait::async_trait;
use donatello_quiz_core::{
    domain::Principal,
    ports::{IdentityProvider, PortError, PortResult},
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::FirebaseConfig;

const LOOKUP_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts:lookup";

//=========================================================================================
// Identity Toolkit Payloads
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
}

/// Turns a lookup response body into the principal it describes.
fn principal_from_lookup(body: &str) -> PortResult<Principal> {
    let response: LookupResponse = serde_json::from_str(body)
        .map_err(|e| PortError::Unexpected(format!("Malformed identity lookup response: {}", e)))?;

    let user = response
        .users
        .into_iter()
        .next()
        .ok_or(PortError::Unauthorized)?;
    if user.disabled {
        return Err(PortError::Unauthorized);
    }

    Ok(Principal {
        uid: user.local_id,
        email: user.email,
        display_name: user.display_name,
    })
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `IdentityProvider` against Firebase Authentication.
#[derive(Clone)]
pub struct FirebaseIdentityAdapter {
    http: reqwest::Client,
    api_key: String,
    project_id: String,
}

impl FirebaseIdentityAdapter {
    /// Creates a new `FirebaseIdentityAdapter`.
    pub fn new(http: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityAdapter {
    async fn verify_credential(&self, credential: &str) -> PortResult<Principal> {
        if credential.trim().is_empty() {
            return Err(PortError::Unauthorized);
        }

        let response = self
            .http
            .post(LOOKUP_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest {
                id_token: credential,
            })
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match status {
            s if s.is_success() => principal_from_lookup(&body),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                warn!(
                    "Identity provider rejected a credential for project {}: {}",
                    self.project_id, body
                );
                Err(PortError::Unauthorized)
            }
            s => Err(PortError::Unexpected(format!(
                "Identity provider answered {}: {}",
                s, body
            ))),
        }
    }
}
