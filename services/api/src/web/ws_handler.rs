//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! Each connection plays one quiz at a time; the session itself lives in the quiz
//! task, and this loop only translates between the socket and that task.

use crate::web::{
    identity::IdentityGate,
    protocol::{ClientMessage, PrincipalView, ServerMessage},
    quiz_task::{spawn_quiz_task, Intent},
    state::{AppState, SignedIn},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use donatello_quiz_core::{
    domain::{Principal, Topic},
    session::QuizSession,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

type WsSender = SplitSink<WebSocket, Message>;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(signed_in): Extension<SignedIn>, // from the auth middleware
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, signed_in))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, signed_in: SignedIn) {
    info!(
        "New WebSocket connection established for principal: {}",
        signed_in.principal.uid
    );
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Observe the principal so a sign-out elsewhere ends the quiz ---
    let principal_rx = match &app_state.identity {
        IdentityGate::Ready(auth) => auth.subscribe(&signed_in.session_id),
        IdentityGate::Unconfigured(_) => None,
    };
    let Some(mut principal_rx) = principal_rx else {
        warn!("Auth session ended before the connection was set up.");
        let _ = send_message(&mut sender, &ServerMessage::SignedOut).await;
        return;
    };

    let ready = ServerMessage::SessionReady {
        principal: PrincipalView::from(&signed_in.principal),
    };
    if send_message(&mut sender, &ready).await.is_err() {
        error!("Failed to send session ready message.");
        return;
    }

    // --- 2. Start the quiz task for this connection ---
    let mut quiz = spawn_quiz_task(app_state.quiz_provider.clone(), QuizSession::new());

    // --- 3. Main Message Loop ---
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(message) = forward_client_message(text.as_str(), &quiz.intents).await {
                        warn!("Rejected client message: {}", message);
                        if send_message(&mut sender, &ServerMessage::Error { message }).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            update = quiz.updates.recv() => match update {
                Some(message) => {
                    if send_message(&mut sender, &message).await.is_err() {
                        error!("Failed to send quiz update to client.");
                        break;
                    }
                }
                None => break,
            },
            _ = signed_out(&mut principal_rx) => {
                info!("Principal {} signed out; closing quiz.", signed_in.principal.uid);
                let _ = send_message(&mut sender, &ServerMessage::SignedOut).await;
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    quiz.shutdown().await;
    info!("WebSocket connection closed.");
}

/// Parses a client message and hands the resulting intent to the quiz task.
async fn forward_client_message(text: &str, intents: &mpsc::Sender<Intent>) -> Result<(), String> {
    let intent = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::StartQuiz { topic }) => {
            let topic = match topic {
                Some(raw) => raw.parse::<Topic>().map_err(|e| e.to_string())?,
                None => Topic::default(),
            };
            Intent::Start { topic }
        }
        Ok(ClientMessage::SelectOption { option }) => Intent::Select { option },
        Ok(ClientMessage::SubmitAnswer) => Intent::Submit,
        Ok(ClientMessage::PlayAgain) => Intent::PlayAgain,
        Err(e) => return Err(format!("Failed to deserialize client message: {}", e)),
    };
    intents
        .send(intent)
        .await
        .map_err(|_| "Quiz task is no longer running".to_string())
}

/// Resolves once the observed principal is gone.
async fn signed_out(principal_rx: &mut watch::Receiver<Option<Principal>>) {
    loop {
        if principal_rx.borrow_and_update().is_none() {
            return;
        }
        if principal_rx.changed().await.is_err() {
            return;
        }
    }
}

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}
