//! Test doubles shared by the api integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use donatello_quiz_core::{
    domain::{Principal, QuizQuestion, QuizRequest},
    ports::{IdentityProvider, PortError, PortResult, QuizContentProvider},
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

/// Answers quiz requests from a queue of canned replies, after an optional delay.
pub struct ScriptedQuizProvider {
    replies: Mutex<VecDeque<PortResult<Vec<QuizQuestion>>>>,
    requests: Mutex<Vec<QuizRequest>>,
    delay: Duration,
}

impl ScriptedQuizProvider {
    pub fn new(replies: Vec<PortResult<Vec<QuizQuestion>>>) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    pub fn with_delay(replies: Vec<PortResult<Vec<QuizQuestion>>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn requests(&self) -> Vec<QuizRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuizContentProvider for ScriptedQuizProvider {
    async fn request_quiz(&self, request: &QuizRequest) -> PortResult<Vec<QuizQuestion>> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unexpected("no scripted reply left".to_string())))
    }
}

/// `count` questions whose correct option always starts with "certa".
pub fn questions(count: usize) -> Vec<QuizQuestion> {
    (1..=count)
        .map(|n| {
            QuizQuestion::new(
                format!("Pergunta {}?", n),
                [
                    format!("certa {}", n),
                    format!("errada {}a", n),
                    format!("errada {}b", n),
                    format!("errada {}c", n),
                ],
                format!("certa {}", n),
            )
        })
        .collect()
}

pub const VALID_TOKEN: &str = "valid-token";

/// Accepts only `VALID_TOKEN`.
pub struct StaticIdentity;

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn verify_credential(&self, credential: &str) -> PortResult<Principal> {
        if credential != VALID_TOKEN {
            return Err(PortError::Unauthorized);
        }
        Ok(Principal {
            uid: "uid-donatello".to_string(),
            email: Some("donato@firenze.it".to_string()),
            display_name: Some("Donato di Niccolò".to_string()),
        })
    }
}
