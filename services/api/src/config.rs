//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// Identity-provider variables, in the order they are reported when missing.
pub const IDENTITY_VARS: [&str; 3] = ["FIREBASE_API_KEY", "FIREBASE_AUTH_DOMAIN", "FIREBASE_PROJECT_ID"];

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials of the identity provider project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
}

/// Whether sign-in can work at all. Missing credentials are a state, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentitySettings {
    Configured(FirebaseConfig),
    Unconfigured {
        missing: Vec<String>,
        /// Some, but not all, of the variables were present.
        partial: bool,
    },
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub quiz_model: String,
    pub auth_session_days: i64,
    pub identity: IdentitySettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Load Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            var("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Load Quiz Content Settings ---
        let openai_api_key = var("OPENAI_API_KEY");
        let quiz_model = var("QUIZ_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Load Identity Settings ---
        let auth_session_days = match var("AUTH_SESSION_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "AUTH_SESSION_DAYS".to_string(),
                        format!("'{}' is not a positive number of days", raw),
                    )
                })?,
            None => 30,
        };

        let identity = identity_settings(&var);

        Ok(Self {
            bind_address,
            log_level,
            allowed_origin,
            openai_api_key,
            quiz_model,
            auth_session_days,
            identity,
        })
    }
}

fn identity_settings(var: &dyn Fn(&str) -> Option<String>) -> IdentitySettings {
    let values: Vec<Option<String>> = IDENTITY_VARS.iter().map(|key| var(key)).collect();
    let missing: Vec<String> = IDENTITY_VARS
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key.to_string())
        .collect();

    match values.as_slice() {
        [Some(api_key), Some(auth_domain), Some(project_id)] => {
            IdentitySettings::Configured(FirebaseConfig {
                api_key: api_key.clone(),
                auth_domain: auth_domain.clone(),
                project_id: project_id.clone(),
            })
        }
        _ => IdentitySettings::Unconfigured {
            partial: missing.len() < IDENTITY_VARS.len(),
            missing,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.quiz_model, "gpt-4o-mini");
        assert_eq!(config.auth_session_days, 30);
        assert_eq!(config.openai_api_key, None);
        assert_eq!(
            config.identity,
            IdentitySettings::Unconfigured {
                missing: IDENTITY_VARS.iter().map(|s| s.to_string()).collect(),
                partial: false,
            }
        );
    }

    #[test]
    fn identity_is_configured_when_all_vars_present() {
        let config = config_from(&[
            ("FIREBASE_API_KEY", "key"),
            ("FIREBASE_AUTH_DOMAIN", "quiz.firebaseapp.com"),
            ("FIREBASE_PROJECT_ID", "quiz"),
        ])
        .unwrap();
        assert_eq!(
            config.identity,
            IdentitySettings::Configured(FirebaseConfig {
                api_key: "key".to_string(),
                auth_domain: "quiz.firebaseapp.com".to_string(),
                project_id: "quiz".to_string(),
            })
        );
    }

    #[test]
    fn partial_identity_config_lists_missing_vars() {
        let config = config_from(&[("FIREBASE_API_KEY", "key"), ("FIREBASE_PROJECT_ID", " ")]).unwrap();
        assert_eq!(
            config.identity,
            IdentitySettings::Unconfigured {
                missing: vec![
                    "FIREBASE_AUTH_DOMAIN".to_string(),
                    "FIREBASE_PROJECT_ID".to_string()
                ],
                partial: true,
            }
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(matches!(
            config_from(&[("BIND_ADDRESS", "nowhere")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "BIND_ADDRESS"
        ));
        assert!(matches!(
            config_from(&[("RUST_LOG", "loud")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "RUST_LOG"
        ));
        assert!(matches!(
            config_from(&[("AUTH_SESSION_DAYS", "0")]),
            Err(ConfigError::InvalidValue(var, _)) if var == "AUTH_SESSION_DAYS"
        ));
    }
}
