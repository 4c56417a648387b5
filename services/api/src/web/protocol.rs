//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the quiz game.

use donatello_quiz_core::{
    domain::{FeedbackTier, Principal, Topic},
    session::{AnswerStatus, QuizPhase, QuizSession, QUESTION_TIME_SECS},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Requests a new quiz. A missing topic means the general quiz.
    StartQuiz {
        #[serde(default)]
        topic: Option<String>,
    },

    /// Marks an option as the player's choice for the current question.
    SelectOption { option: String },

    /// Submits the selected option.
    SubmitAnswer,

    /// Leaves the results screen for a new topic selection.
    PlayAgain,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the connection belongs to a signed-in player.
    SessionReady { principal: PrincipalView },

    /// The full view of the quiz session, sent after every change.
    State { view: QuizView },

    /// A toast-style notification.
    Notice {
        variant: NoticeVariant,
        title: String,
        description: String,
    },

    /// Reports a problem with a client message.
    Error { message: String },

    /// The player signed out elsewhere; the connection is about to close.
    SignedOut,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

impl ServerMessage {
    pub fn quiz_generation_failed() -> Self {
        ServerMessage::Notice {
            variant: NoticeVariant::Destructive,
            title: "Erro ao gerar o quiz".to_string(),
            description: "Não foi possível buscar as perguntas. Tente novamente.".to_string(),
        }
    }
}

//=========================================================================================
// Views
//=========================================================================================

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct PrincipalView {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl From<&Principal> for PrincipalView {
    fn from(principal: &Principal) -> Self {
        Self {
            uid: principal.uid.clone(),
            email: principal.email.clone(),
            display_name: principal.display_name.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct TopicView {
    pub id: String,
    pub label: String,
}

impl From<Topic> for TopicView {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.as_str().to_string(),
            label: topic.label().to_string(),
        }
    }
}

pub fn topic_views() -> Vec<TopicView> {
    Topic::ALL.into_iter().map(TopicView::from).collect()
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatusView {
    Unanswered,
    Correct,
    Incorrect,
}

impl From<AnswerStatus> for AnswerStatusView {
    fn from(status: AnswerStatus) -> Self {
        match status {
            AnswerStatus::Unanswered => AnswerStatusView::Unanswered,
            AnswerStatus::Correct => AnswerStatusView::Correct,
            AnswerStatus::Incorrect => AnswerStatusView::Incorrect,
        }
    }
}

/// What the client renders for each phase of the session.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QuizView {
    Setup {
        topics: Vec<TopicView>,
    },
    Loading,
    Active {
        /// 1-based.
        question_number: usize,
        total_questions: usize,
        score: usize,
        question: String,
        options: Vec<String>,
        selected_answer: Option<String>,
        answer_status: AnswerStatusView,
        /// Revealed only once the question is resolved.
        correct_answer: Option<String>,
        time_remaining: u32,
        question_time: u32,
    },
    Results {
        score: usize,
        total_questions: usize,
        percentage: f64,
        feedback: String,
    },
}

fn feedback_message(tier: FeedbackTier) -> &'static str {
    match tier {
        FeedbackTier::Master => "Excelente trabalho! Você é um verdadeiro mestre de Donatello!",
        FeedbackTier::OnTrack => "Bom trabalho! Você está no caminho certo.",
        FeedbackTier::KeepStudying => "Continue estudando para se tornar um mestre!",
    }
}

impl From<&QuizSession> for QuizView {
    fn from(session: &QuizSession) -> Self {
        match session.phase() {
            QuizPhase::Setup => QuizView::Setup {
                topics: topic_views(),
            },
            QuizPhase::Loading => QuizView::Loading,
            QuizPhase::Active => match session.current_question() {
                Some(question) => {
                    let status = session.answer_status();
                    QuizView::Active {
                        question_number: session.current_index() + 1,
                        total_questions: session.total_questions(),
                        score: session.score(),
                        question: question.question.clone(),
                        options: session.displayed_options().to_vec(),
                        selected_answer: session.selected_answer().map(str::to_string),
                        answer_status: status.into(),
                        correct_answer: (status != AnswerStatus::Unanswered)
                            .then(|| question.answer.clone()),
                        time_remaining: session.time_remaining(),
                        question_time: QUESTION_TIME_SECS,
                    }
                }
                None => QuizView::Loading,
            },
            QuizPhase::Results => {
                let summary = session.summary();
                let (score, total, percentage, tier) = match summary {
                    Some(s) => (s.score, s.total, s.percentage, s.tier),
                    None => (0, 0, 0.0, FeedbackTier::KeepStudying),
                };
                QuizView::Results {
                    score,
                    total_questions: total,
                    percentage,
                    feedback: feedback_message(tier).to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let start: ClientMessage =
            serde_json::from_str(r#"{"type": "start_quiz", "topic": "vida"}"#).unwrap();
        assert_eq!(
            start,
            ClientMessage::StartQuiz {
                topic: Some("vida".to_string())
            }
        );

        let general: ClientMessage = serde_json::from_str(r#"{"type": "start_quiz"}"#).unwrap();
        assert_eq!(general, ClientMessage::StartQuiz { topic: None });

        let submit: ClientMessage = serde_json::from_str(r#"{"type": "submit_answer"}"#).unwrap();
        assert_eq!(submit, ClientMessage::SubmitAnswer);
    }

    #[test]
    fn setup_view_lists_topics() {
        let view = QuizView::from(&QuizSession::new());
        let value = serde_json::to_value(ServerMessage::State { view }).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["view"]["phase"], "setup");
        assert_eq!(value["view"]["topics"][0], json!({"id": "general", "label": "Geral"}));
        assert_eq!(value["view"]["topics"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn failure_notice_is_destructive() {
        let value = serde_json::to_value(ServerMessage::quiz_generation_failed()).unwrap();
        assert_eq!(value["type"], "notice");
        assert_eq!(value["variant"], "destructive");
        assert_eq!(value["title"], "Erro ao gerar o quiz");
    }
}
