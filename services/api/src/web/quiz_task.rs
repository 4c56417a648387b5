//! services/api/src/web/quiz_task.rs
//!
//! This module contains the asynchronous "worker" that runs one quiz session.
//!
//! A single task owns the `QuizSession`, so no locks are needed around it. Player
//! intents arrive over a channel; everything the session schedules (the provider
//! request, the per-second countdown, the post-answer delay) runs in its own small
//! task that reports back over a second channel, tagged with its `Ticket`. Each of
//! those tasks holds a child `CancellationToken` that is cancelled as soon as the
//! session supersedes it.

use donatello_quiz_core::{
    domain::{QuizQuestion, Topic},
    ports::{PortResult, QuizContentProvider},
    session::{Effect, Notice, QuizSession, SessionError, Ticket},
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, sleep, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::web::protocol::{QuizView, ServerMessage};

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
const INTENT_BUFFER: usize = 32;

/// A player action forwarded from the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Start { topic: Topic },
    Select { option: String },
    Submit,
    PlayAgain,
}

/// Completion of something the session scheduled.
#[derive(Debug)]
enum Scheduled {
    Tick(Ticket),
    AdvanceDue(Ticket),
    Loaded(Ticket, PortResult<Vec<QuizQuestion>>),
}

//=========================================================================================
// Handle Held by the Connection
//=========================================================================================

/// The connection's side of a running quiz task.
pub struct QuizHandle {
    pub intents: mpsc::Sender<Intent>,
    pub updates: mpsc::UnboundedReceiver<ServerMessage>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl QuizHandle {
    /// Stops the task and everything it scheduled, then waits for it to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            error!("Quiz task ended abnormally: {:?}", e);
        }
    }
}

/// Spawns the task that owns `session` and returns the handle used to drive it.
pub fn spawn_quiz_task(
    provider: Arc<dyn QuizContentProvider>,
    session: QuizSession,
) -> QuizHandle {
    let (intent_tx, intent_rx) = mpsc::channel(INTENT_BUFFER);
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (scheduled_tx, scheduled_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let worker = QuizWorker {
        session,
        provider,
        updates: update_tx,
        scheduled: scheduled_tx,
        live: HashMap::new(),
        shutdown: shutdown.clone(),
    };
    let task = tokio::spawn(worker.run(intent_rx, scheduled_rx));

    QuizHandle {
        intents: intent_tx,
        updates: update_rx,
        shutdown,
        task,
    }
}

//=========================================================================================
// The Worker
//=========================================================================================

struct QuizWorker {
    session: QuizSession,
    provider: Arc<dyn QuizContentProvider>,
    updates: mpsc::UnboundedSender<ServerMessage>,
    scheduled: mpsc::UnboundedSender<Scheduled>,
    /// One token per ticket the session still considers live.
    live: HashMap<Ticket, CancellationToken>,
    shutdown: CancellationToken,
}

impl QuizWorker {
    async fn run(
        mut self,
        mut intents: mpsc::Receiver<Intent>,
        mut scheduled: mpsc::UnboundedReceiver<Scheduled>,
    ) {
        info!("Quiz task started.");
        self.publish_state();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => break,
                },
                Some(event) = scheduled.recv() => self.handle_scheduled(event),
            }
        }

        let leftovers = self.session.abandon();
        self.execute_all(leftovers);
        info!("Quiz task stopped.");
    }

    fn handle_intent(&mut self, intent: Intent) {
        debug!("Intent received: {:?}", intent);
        let outcome = match intent {
            Intent::Start { topic } => {
                info!("Starting quiz on topic {}", topic);
                self.session.start(topic)
            }
            Intent::Select { option } => self.session.select_option(&option),
            Intent::Submit => self.session.submit(),
            Intent::PlayAgain => self.session.play_again(),
        };
        match outcome {
            Ok(effects) => self.apply(effects),
            Err(e) => {
                // Ignored intents leave the session untouched; tell the client why.
                warn!("Intent ignored: {}", e);
                self.send(ServerMessage::Error {
                    message: e.to_string(),
                });
            }
        }
    }

    fn handle_scheduled(&mut self, event: Scheduled) {
        let outcome = match event {
            Scheduled::Tick(ticket) => self.session.tick(ticket),
            Scheduled::AdvanceDue(ticket) => {
                self.live.remove(&ticket);
                self.session.advance(ticket)
            }
            Scheduled::Loaded(ticket, result) => {
                self.live.remove(&ticket);
                let failure = result.as_ref().err().map(ToString::to_string);
                let outcome = self.session.finish_loading(ticket, result);
                if let (Ok(_), Some(e)) = (&outcome, failure) {
                    error!("Quiz generation failed: {}", e);
                }
                outcome
            }
        };
        match outcome {
            Ok(effects) => self.apply(effects),
            Err(SessionError::StaleTicket(ticket)) => {
                debug!("Discarding event for stale ticket {:?}", ticket);
            }
            Err(e) => warn!("Scheduled event rejected: {}", e),
        }
    }

    /// Executes a transition's effects, then publishes the new view.
    fn apply(&mut self, effects: Vec<Effect>) {
        self.execute_all(effects);
        self.publish_state();
    }

    fn execute_all(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::RequestQuiz { ticket, request } => {
                let token = self.track(ticket);
                let provider = self.provider.clone();
                let scheduled = self.scheduled.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => debug!("Quiz request {:?} cancelled", ticket),
                        result = provider.request_quiz(&request) => {
                            let _ = scheduled.send(Scheduled::Loaded(ticket, result));
                        }
                    }
                });
            }
            Effect::StartCountdown { ticket } => {
                let token = self.track(ticket);
                let scheduled = self.scheduled.clone();
                tokio::spawn(async move {
                    let mut ticks = interval_at(Instant::now() + COUNTDOWN_PERIOD, COUNTDOWN_PERIOD);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = ticks.tick() => {
                                if scheduled.send(Scheduled::Tick(ticket)).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
            Effect::ScheduleAdvance { ticket, after } => {
                let token = self.track(ticket);
                let scheduled = self.scheduled.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = sleep(after) => {
                            let _ = scheduled.send(Scheduled::AdvanceDue(ticket));
                        }
                    }
                });
            }
            Effect::Cancel(ticket) => {
                if let Some(token) = self.live.remove(&ticket) {
                    token.cancel();
                }
            }
            Effect::Notify(Notice::QuizGenerationFailed) => {
                self.send(ServerMessage::quiz_generation_failed());
            }
        }
    }

    fn track(&mut self, ticket: Ticket) -> CancellationToken {
        let token = self.shutdown.child_token();
        if let Some(previous) = self.live.insert(ticket, token.clone()) {
            previous.cancel();
        }
        token
    }

    fn publish_state(&self) {
        self.send(ServerMessage::State {
            view: QuizView::from(&self.session),
        });
    }

    fn send(&self, message: ServerMessage) {
        if self.updates.send(message).is_err() {
            debug!("Connection is gone; dropping quiz update.");
        }
    }
}
