pub mod domain;
pub mod ports;
pub mod session;
pub mod validation;

pub use domain::{
    AuthSession, FeedbackTier, Principal, QuizDraft, QuizQuestion, QuizRequest, ScoreSummary,
    Topic, UnknownTopic,
};
pub use ports::{IdentityProvider, PortError, PortResult, QuizContentProvider};
pub use session::{
    AnswerStatus, Effect, Notice, QuizPhase, QuizSession, SessionError, Ticket, TicketKind,
    QUESTION_TIME_SECS, QUIZ_LENGTH, RESOLUTION_DELAY,
};
pub use validation::{validate_quiz, ContentError};
