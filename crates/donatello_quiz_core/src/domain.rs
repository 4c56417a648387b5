//! crates/donatello_quiz_core/src/domain.rs
//!
//! Defines the pure, core data structures for the quiz.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// A single multiple-choice question, immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl QuizQuestion {
    pub fn new(
        question: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            options: options.into_iter().map(Into::into).collect(),
            answer: answer.into(),
        }
    }

    pub fn is_correct(&self, candidate: &str) -> bool {
        self.answer == candidate
    }
}

/// A question as a content provider handed it over, before validation.
#[derive(Debug, Clone, Default)]
pub struct QuizDraft {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// What the session asks the content provider for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizRequest {
    /// `None` means no topic filter.
    pub topic: Option<String>,
    pub num_questions: usize,
}

impl QuizRequest {
    pub fn new(topic: Option<&str>, num_questions: usize) -> Self {
        Self {
            topic: topic.map(str::to_string),
            num_questions,
        }
    }
}

//=========================================================================================
// Topics
//=========================================================================================

/// The fixed set of quiz topics a player can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topic {
    #[default]
    General,
    Sculptures,
    Life,
    Period,
}

impl Topic {
    pub const ALL: [Topic; 4] = [Topic::General, Topic::Sculptures, Topic::Life, Topic::Period];

    /// The identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Sculptures => "sculptures",
            Topic::Life => "life",
            Topic::Period => "period",
        }
    }

    /// The label shown to players.
    pub fn label(&self) -> &'static str {
        match self {
            Topic::General => "Geral",
            Topic::Sculptures => "Esculturas",
            Topic::Life => "Vida e Carreira",
            Topic::Period => "Período Histórico",
        }
    }

    /// The topic filter passed to the content provider. `General` means no filter.
    pub fn filter(&self) -> Option<&'static str> {
        match self {
            Topic::General => None,
            Topic::Sculptures => Some("esculturas"),
            Topic::Life => Some("vida"),
            Topic::Period => Some("periodo"),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown quiz topic: {0}")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "general" | "geral" => Ok(Topic::General),
            "sculptures" | "esculturas" => Ok(Topic::Sculptures),
            "life" | "vida" => Ok(Topic::Life),
            "period" | "periodo" | "período" => Ok(Topic::Period),
            _ => Err(UnknownTopic(s.to_string())),
        }
    }
}

//=========================================================================================
// Identity
//=========================================================================================

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

// Represents a browser sign-in (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub principal: Principal,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Results
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    /// 80% or more.
    Master,
    /// More than half.
    OnTrack,
    KeepStudying,
}

/// The final score of a finished session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
    pub tier: FeedbackTier,
}

impl ScoreSummary {
    pub fn new(score: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            score as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let tier = if percentage >= 80.0 {
            FeedbackTier::Master
        } else if percentage > 50.0 {
            FeedbackTier::OnTrack
        } else {
            FeedbackTier::KeepStudying
        };
        Self {
            score,
            total,
            percentage,
            tier,
        }
    }
}
