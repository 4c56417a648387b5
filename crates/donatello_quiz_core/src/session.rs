//! crates/donatello_quiz_core/src/session.rs
//!
//! The lifecycle of one quiz attempt: Setup -> Loading -> Active -> Results.
//!
//! `QuizSession` is synchronous and performs no I/O. Every transition returns the
//! side effects the caller has to carry out (ask the content provider, start or cancel
//! a timer, show a notice). Each scheduled operation is identified by a `Ticket`, and
//! the session only accepts events for tickets it still considers live, so a timer that
//! fires after the question moved on (or after a reset) cannot touch the session.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::domain::{QuizQuestion, QuizRequest, ScoreSummary, Topic};
use crate::ports::PortResult;

/// Seconds a player has for each question.
pub const QUESTION_TIME_SECS: u32 = 20;
/// How long a resolved question stays on screen before the session moves on.
pub const RESOLUTION_DELAY: Duration = Duration::from_millis(1500);
/// Number of questions requested per quiz.
pub const QUIZ_LENGTH: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Setup,
    Loading,
    Active,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Unanswered,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketKind {
    Load,
    Countdown,
    Advance,
}

/// Handle for one scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    id: u64,
    kind: TicketKind,
}

impl Ticket {
    pub fn kind(&self) -> TicketKind {
        self.kind
    }
}

/// User-visible notifications raised by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    QuizGenerationFailed,
}

/// A side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Call the content provider and report back through `finish_loading`.
    RequestQuiz { ticket: Ticket, request: QuizRequest },
    /// Call `tick` once per second until cancelled.
    StartCountdown { ticket: Ticket },
    /// Call `advance` once, after the given delay.
    ScheduleAdvance { ticket: Ticket, after: Duration },
    /// Stop whatever was scheduled under this ticket.
    Cancel(Ticket),
    Notify(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{intent} is not accepted while the session is {phase:?}")]
    NotAccepted {
        intent: &'static str,
        phase: QuizPhase,
    },
    #[error("the current question has already been answered")]
    AlreadyAnswered,
    #[error("no option has been selected")]
    NothingSelected,
    #[error("'{0}' is not one of the current options")]
    UnknownOption(String),
    #[error("ticket {0:?} is no longer live")]
    StaleTicket(Ticket),
}

pub type Transition = Result<Vec<Effect>, SessionError>;

pub struct QuizSession {
    phase: QuizPhase,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    score: usize,
    selected_answer: Option<String>,
    answer_status: AnswerStatus,
    time_remaining: u32,
    displayed_options: Vec<String>,
    pending_load: Option<Ticket>,
    countdown: Option<Ticket>,
    advance: Option<Ticket>,
    next_ticket: u64,
    rng: StdRng,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A session whose option order is reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            phase: QuizPhase::Setup,
            questions: Vec::new(),
            current_index: 0,
            score: 0,
            selected_answer: None,
            answer_status: AnswerStatus::Unanswered,
            time_remaining: QUESTION_TIME_SECS,
            displayed_options: Vec::new(),
            pending_load: None,
            countdown: None,
            advance: None,
            next_ticket: 0,
            rng,
        }
    }

    //=====================================================================================
    // Intents and scheduled events
    //=====================================================================================

    pub fn start(&mut self, topic: Topic) -> Transition {
        self.expect_phase("start", QuizPhase::Setup)?;

        self.questions.clear();
        self.phase = QuizPhase::Loading;
        let ticket = self.issue(TicketKind::Load);
        self.pending_load = Some(ticket);

        Ok(vec![Effect::RequestQuiz {
            ticket,
            request: QuizRequest::new(topic.filter(), QUIZ_LENGTH),
        }])
    }

    pub fn finish_loading(
        &mut self,
        ticket: Ticket,
        result: PortResult<Vec<QuizQuestion>>,
    ) -> Transition {
        if self.pending_load != Some(ticket) {
            return Err(SessionError::StaleTicket(ticket));
        }
        self.pending_load = None;

        match result {
            Ok(questions) if !questions.is_empty() => {
                self.questions = questions;
                self.score = 0;
                self.phase = QuizPhase::Active;
                Ok(self.begin_question(0))
            }
            _ => {
                self.clear_fields();
                self.phase = QuizPhase::Setup;
                Ok(vec![Effect::Notify(Notice::QuizGenerationFailed)])
            }
        }
    }

    pub fn select_option(&mut self, option: &str) -> Transition {
        self.expect_unanswered("select_option")?;
        if !self.displayed_options.iter().any(|o| o == option) {
            return Err(SessionError::UnknownOption(option.to_string()));
        }
        self.selected_answer = Some(option.to_string());
        Ok(Vec::new())
    }

    pub fn submit(&mut self) -> Transition {
        self.expect_unanswered("submit")?;
        let correct = match (&self.selected_answer, self.current_question()) {
            (Some(selected), Some(question)) => question.is_correct(selected),
            _ => return Err(SessionError::NothingSelected),
        };
        Ok(self.resolve(correct))
    }

    pub fn tick(&mut self, ticket: Ticket) -> Transition {
        if self.countdown != Some(ticket) {
            return Err(SessionError::StaleTicket(ticket));
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            // Timing out counts as a wrong answer; no selection needed.
            return Ok(self.resolve(false));
        }
        Ok(Vec::new())
    }

    pub fn advance(&mut self, ticket: Ticket) -> Transition {
        if self.advance != Some(ticket) {
            return Err(SessionError::StaleTicket(ticket));
        }
        self.advance = None;

        let next = self.current_index + 1;
        if next < self.questions.len() {
            Ok(self.begin_question(next))
        } else {
            self.phase = QuizPhase::Results;
            Ok(Vec::new())
        }
    }

    pub fn play_again(&mut self) -> Transition {
        self.expect_phase("play_again", QuizPhase::Results)?;
        Ok(self.reset())
    }

    /// Drops the session from any phase, cancelling everything still scheduled.
    pub fn abandon(&mut self) -> Vec<Effect> {
        self.reset()
    }

    //=====================================================================================
    // Read access
    //=====================================================================================

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        match self.phase {
            QuizPhase::Active => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn answer_status(&self) -> AnswerStatus {
        self.answer_status
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// The current question's options in the order they are shown.
    pub fn displayed_options(&self) -> &[String] {
        &self.displayed_options
    }

    pub fn summary(&self) -> Option<ScoreSummary> {
        match self.phase {
            QuizPhase::Results => Some(ScoreSummary::new(self.score, self.questions.len())),
            _ => None,
        }
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    fn issue(&mut self, kind: TicketKind) -> Ticket {
        self.next_ticket += 1;
        Ticket {
            id: self.next_ticket,
            kind,
        }
    }

    fn expect_phase(&self, intent: &'static str, phase: QuizPhase) -> Result<(), SessionError> {
        if self.phase != phase {
            return Err(SessionError::NotAccepted {
                intent,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn expect_unanswered(&self, intent: &'static str) -> Result<(), SessionError> {
        self.expect_phase(intent, QuizPhase::Active)?;
        if self.answer_status != AnswerStatus::Unanswered {
            return Err(SessionError::AlreadyAnswered);
        }
        Ok(())
    }

    fn begin_question(&mut self, index: usize) -> Vec<Effect> {
        let mut effects: Vec<Effect> = self.countdown.take().map(Effect::Cancel).into_iter().collect();

        self.current_index = index;
        self.selected_answer = None;
        self.answer_status = AnswerStatus::Unanswered;
        self.time_remaining = QUESTION_TIME_SECS;
        self.displayed_options = self.questions[index].options.clone();
        self.displayed_options.shuffle(&mut self.rng);

        let ticket = self.issue(TicketKind::Countdown);
        self.countdown = Some(ticket);
        effects.push(Effect::StartCountdown { ticket });
        effects
    }

    fn resolve(&mut self, correct: bool) -> Vec<Effect> {
        if correct {
            self.answer_status = AnswerStatus::Correct;
            self.score += 1;
        } else {
            self.answer_status = AnswerStatus::Incorrect;
        }

        let mut effects: Vec<Effect> = self.countdown.take().map(Effect::Cancel).into_iter().collect();
        let ticket = self.issue(TicketKind::Advance);
        self.advance = Some(ticket);
        effects.push(Effect::ScheduleAdvance {
            ticket,
            after: RESOLUTION_DELAY,
        });
        effects
    }

    fn reset(&mut self) -> Vec<Effect> {
        let effects = [
            self.pending_load.take(),
            self.countdown.take(),
            self.advance.take(),
        ]
        .into_iter()
        .flatten()
        .map(Effect::Cancel)
        .collect();

        self.clear_fields();
        self.phase = QuizPhase::Setup;
        effects
    }

    fn clear_fields(&mut self) {
        self.questions.clear();
        self.current_index = 0;
        self.score = 0;
        self.selected_answer = None;
        self.answer_status = AnswerStatus::Unanswered;
        self.time_remaining = QUESTION_TIME_SECS;
        self.displayed_options.clear();
    }
}
