//! Realtime events exchanged over the quiz WebSocket.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::quiz::QuestionView;

/// Server-to-client events, tagged by `type`.
///
/// Events for one quiz are delivered to its room in production order;
/// delivery to an individual client is best effort.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Welcome message right after the socket joins its room.
    Connected { message: String },
    /// The quiz moved to the active status.
    QuizStarted { quiz_id: Uuid },
    /// A question was opened for answers. Non-admin connections receive a
    /// payload with the correct answer redacted.
    QuestionRevealed { question: QuestionView },
    /// The admin closed the answering phase of a question.
    QuestionEnded { question_id: Uuid },
    /// The admin passed over a question without revealing it.
    QuestionSkipped { question_id: Uuid },
    /// A participant's submission was accepted.
    AnswerSubmitted {
        user_id: Uuid,
        question_id: Uuid,
        is_correct: bool,
        points: u32,
    },
    /// The quiz moved to the completed status.
    QuizEnded { quiz_id: Uuid },
    /// Reply to a client `ping`.
    Pong,
}

/// Client-to-server messages, tagged by `type`. Unknown types are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness probe answered with [`ServerEvent::Pong`].
    Ping,
    /// Anything this server version does not understand.
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let quiz_id = Uuid::nil();
        let json = serde_json::to_value(ServerEvent::QuizStarted { quiz_id }).unwrap();
        assert_eq!(json["type"], "quiz_started");
        assert_eq!(json["quiz_id"], quiz_id.to_string());

        let json = serde_json::to_value(ServerEvent::Pong).unwrap();
        assert_eq!(json["type"], "pong");
    }

    #[test]
    fn client_messages_tolerate_unknown_types() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientMessage::Ping));

        let unknown: ClientMessage = serde_json::from_str(r#"{"type":"subscribe"}"#).unwrap();
        assert!(matches!(unknown, ClientMessage::Unknown));
    }
}
