//! services/api/src/web/identity.rs
//!
//! The auth service: who is signed in on which browser.
//!
//! `AuthService` is created once at startup and injected through `AppState`. It keeps
//! an in-memory registry of auth sessions keyed by the cookie value, and exposes the
//! principal of each one as an observable `watch` value so open quiz connections notice
//! a sign-out. Quiz sessions never see this type; only the web layer does.

use chrono::{Duration, Utc};
use donatello_quiz_core::{
    domain::{AuthSession, Principal},
    ports::{IdentityProvider, PortResult},
};
use serde::Serialize;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{IdentitySettings, IDENTITY_VARS};

pub const SESSION_COOKIE: &str = "quiz_session";

struct AuthEntry {
    session: AuthSession,
    principal: watch::Sender<Option<Principal>>,
}

pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, AuthEntry>>,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies the credential with the identity provider and opens an auth session.
    pub async fn sign_in(&self, credential: &str) -> PortResult<AuthSession> {
        let principal = self.provider.verify_credential(credential).await.map_err(|e| {
            error!("Identity provider rejected sign-in: {}", e);
            e
        })?;

        let session = AuthSession {
            id: Uuid::new_v4().to_string(),
            principal: principal.clone(),
            expires_at: Utc::now() + self.ttl,
        };
        let (tx, _) = watch::channel(Some(principal));

        self.write().insert(
            session.id.clone(),
            AuthEntry {
                session: session.clone(),
                principal: tx,
            },
        );
        info!("Principal {} signed in.", session.principal.uid);
        Ok(session)
    }

    /// Ends an auth session. Returns `false` when there was nothing to end.
    pub fn sign_out(&self, session_id: &str) -> bool {
        match self.write().remove(session_id) {
            Some(entry) => {
                info!("Principal {} signed out.", entry.session.principal.uid);
                entry.principal.send_replace(None);
                true
            }
            None => false,
        }
    }

    /// The principal behind a session id, if it is still valid.
    pub fn current_principal(&self, session_id: &str) -> Option<Principal> {
        {
            let sessions = self.read();
            let entry = sessions.get(session_id)?;
            if entry.session.expires_at > Utc::now() {
                return Some(entry.session.principal.clone());
            }
        }
        // Expired: evict it and notify anyone still watching.
        self.sign_out(session_id);
        None
    }

    /// Observes the principal of a session; the value turns `None` on sign-out.
    pub fn subscribe(&self, session_id: &str) -> Option<watch::Receiver<Option<Principal>>> {
        self.read()
            .get(session_id)
            .map(|entry| entry.principal.subscribe())
    }

    /// Signs out every expired session, notifying its watchers. Returns how many were evicted.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .read()
            .iter()
            .filter(|(_, entry)| entry.session.expires_at <= now)
            .map(|(id, _)| id.clone())
            .collect();
        expired.iter().filter(|id| self.sign_out(id)).count()
    }

    /// Sweeps expired sessions every `every` until the service is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = service.upgrade() else {
                    break;
                };
                let evicted = service.sweep_expired();
                if evicted > 0 {
                    debug!("Evicted {} expired auth sessions.", evicted);
                }
            }
        })
    }

    // Lock poisoning is ignored.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, AuthEntry>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, AuthEntry>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}

//=========================================================================================
// Identity Gate
//=========================================================================================

/// What the client shows instead of the sign-in screen when identity is not set up.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct SetupInstructions {
    pub title: String,
    pub description: String,
    pub missing_vars: Vec<String>,
    /// Some variables were found, so the problem is more likely a wrong value.
    pub partial: bool,
    pub env_template: String,
}

impl SetupInstructions {
    pub fn new(missing_vars: Vec<String>, partial: bool) -> Self {
        let description = if partial {
            "A configuração do provedor de identidade está incompleta. Verifique as credenciais no arquivo .env e reinicie o servidor."
        } else {
            "As credenciais do provedor de identidade não foram adicionadas ao ambiente. Adicione-as ao arquivo .env e reinicie o servidor."
        };
        let env_template = IDENTITY_VARS
            .iter()
            .map(|var| format!("{}=", var))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            title: "Configuração de autenticação incompleta".to_string(),
            description: description.to_string(),
            missing_vars,
            partial,
            env_template,
        }
    }
}

/// Either a working auth service or the instructions for making one work.
#[derive(Clone)]
pub enum IdentityGate {
    Ready(Arc<AuthService>),
    Unconfigured(SetupInstructions),
}

impl IdentityGate {
    /// Builds the gate from configuration. `make_provider` is only called when the
    /// identity provider is configured.
    pub fn from_settings<F>(settings: &IdentitySettings, ttl: Duration, make_provider: F) -> Self
    where
        F: FnOnce(&crate::config::FirebaseConfig) -> Arc<dyn IdentityProvider>,
    {
        match settings {
            IdentitySettings::Configured(firebase) => {
                IdentityGate::Ready(Arc::new(AuthService::new(make_provider(firebase), ttl)))
            }
            IdentitySettings::Unconfigured { missing, partial } => {
                IdentityGate::Unconfigured(SetupInstructions::new(missing.clone(), *partial))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use donatello_quiz_core::ports::PortError;

    struct AcceptAll;

    #[async_trait]
    impl IdentityProvider for AcceptAll {
        async fn verify_credential(&self, credential: &str) -> PortResult<Principal> {
            if credential == "bad" {
                return Err(PortError::Unauthorized);
            }
            Ok(Principal {
                uid: credential.to_string(),
                email: None,
                display_name: None,
            })
        }
    }

    fn service(ttl: Duration) -> AuthService {
        AuthService::new(Arc::new(AcceptAll), ttl)
    }

    #[tokio::test]
    async fn sign_in_then_out() {
        let auth = service(Duration::days(1));
        let session = auth.sign_in("uid-1").await.unwrap();
        assert_eq!(
            auth.current_principal(&session.id).map(|p| p.uid),
            Some("uid-1".to_string())
        );

        let mut watcher = auth.subscribe(&session.id).unwrap();
        assert!(auth.sign_out(&session.id));
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().is_none());

        assert!(auth.current_principal(&session.id).is_none());
        assert!(!auth.sign_out(&session.id));
    }

    #[tokio::test]
    async fn rejected_credential_creates_no_session() {
        let auth = service(Duration::days(1));
        assert!(matches!(auth.sign_in("bad").await, Err(PortError::Unauthorized)));
        assert!(auth.read().is_empty());
    }

    #[tokio::test]
    async fn expired_sessions_read_as_signed_out() {
        let auth = service(Duration::seconds(-1));
        let session = auth.sign_in("uid-2").await.unwrap();
        assert!(auth.current_principal(&session.id).is_none());
        assert!(auth.subscribe(&session.id).is_none());
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_sessions() {
        let expired = service(Duration::seconds(-1));
        for n in 0..5 {
            expired.sign_in(&format!("uid-{}", n)).await.unwrap();
        }
        assert_eq!(expired.read().len(), 5);
        assert_eq!(expired.sweep_expired(), 5);
        assert!(expired.read().is_empty());

        let fresh = service(Duration::days(1));
        fresh.sign_in("uid-fresh").await.unwrap();
        assert_eq!(fresh.sweep_expired(), 0);
        assert_eq!(fresh.read().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_signs_out_watchers_of_expired_sessions() {
        let auth = Arc::new(service(Duration::seconds(-1)));
        let session = auth.sign_in("uid-3").await.unwrap();
        let mut watcher = auth.subscribe(&session.id).unwrap();
        assert!(watcher.borrow().is_some());

        let sweeper = auth.spawn_sweeper(std::time::Duration::from_secs(30));
        watcher.changed().await.unwrap();
        assert!(watcher.borrow().is_none());
        assert!(auth.read().is_empty());

        drop(auth);
        sweeper.await.unwrap();
    }

    #[test]
    fn unconfigured_settings_produce_instructions() {
        let settings = IdentitySettings::Unconfigured {
            missing: vec!["FIREBASE_API_KEY".to_string()],
            partial: true,
        };
        let gate = IdentityGate::from_settings(&settings, Duration::days(1), |_| {
            panic!("no provider without configuration")
        });
        match gate {
            IdentityGate::Unconfigured(instructions) => {
                assert!(instructions.partial);
                assert_eq!(instructions.missing_vars, vec!["FIREBASE_API_KEY".to_string()]);
                assert!(instructions.env_template.contains("FIREBASE_PROJECT_ID="));
            }
            IdentityGate::Ready(_) => panic!("expected setup instructions"),
        }
    }
}
