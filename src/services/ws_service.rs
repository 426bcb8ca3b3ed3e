//! Lifecycle of one quiz WebSocket connection.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::QuizStatus,
    dto::events::{ClientMessage, ServerEvent},
    services::auth_service,
    state::{ClientConnection, SharedState},
};

/// Handle the full lifecycle of one quiz room connection.
///
/// The token and quiz id come from the handshake query string; a socket that
/// fails authentication or targets an invisible quiz is closed immediately.
pub async fn handle_socket(state: SharedState, socket: WebSocket, token: String, quiz_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps broadcasts flowing even while we await
    // inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let user = match auth_service::authenticate_token(&state, &token).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "websocket authentication failed");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    match quiz_visible(&state, quiz_id, user.is_admin).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(quiz_id = %quiz_id, "websocket targeted an unknown quiz");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Err(err) => {
            warn!(error = %err, "websocket rejected while storage is unavailable");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    }

    let connection_id = Uuid::new_v4();
    state.rooms().join(ClientConnection {
        id: connection_id,
        user_id: user.id,
        is_admin: user.is_admin,
        quiz_id,
        tx: outbound_tx.clone(),
    });
    info!(user_id = %user.id, quiz_id = %quiz_id, "websocket joined quiz room");

    send_event(
        &outbound_tx,
        &ServerEvent::Connected {
            message: "connected to quiz".into(),
        },
    );

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Ping) => send_event(&outbound_tx, &ServerEvent::Pong),
                Ok(ClientMessage::Unknown) => {
                    warn!(user_id = %user.id, payload = %text, "ignoring unknown client message");
                }
                Err(err) => {
                    warn!(user_id = %user.id, error = %err, "failed to parse client message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(user_id = %user.id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.rooms().leave(connection_id);
    info!(user_id = %user.id, quiz_id = %quiz_id, "websocket left quiz room");

    finalize(writer_task, outbound_tx).await;
}

async fn quiz_visible(
    state: &SharedState,
    quiz_id: Uuid,
    is_admin: bool,
) -> Result<bool, crate::error::ServiceError> {
    let store = state.require_store().await?;
    Ok(store
        .find_quiz(quiz_id)
        .await?
        .is_some_and(|quiz| is_admin || quiz.status != QuizStatus::Draft))
}

fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => warn!(error = %err, "failed to serialize websocket event"),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
