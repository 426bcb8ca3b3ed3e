//! Per-quiz fan-out of realtime events to connected WebSocket clients.

use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Handle used to push messages to one connected client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Connection id, unique per socket.
    pub id: Uuid,
    /// Authenticated user behind the socket.
    pub user_id: Uuid,
    /// Whether the user is an admin; admins receive unredacted payloads.
    pub is_admin: bool,
    /// Quiz room the connection joined.
    pub quiz_id: Uuid,
    /// Writer-task channel for outbound frames.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of live connections grouped into per-quiz rooms.
///
/// Delivery is best effort: a send to a closed channel is skipped, and the
/// stale connection is cleaned up when its socket task exits.
#[derive(Default)]
pub struct RoomRegistry {
    connections: DashMap<Uuid, ClientConnection>,
    rooms: DashMap<Uuid, HashSet<Uuid>>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and add it to its quiz room.
    pub fn join(&self, connection: ClientConnection) {
        let (id, quiz_id) = (connection.id, connection.quiz_id);
        self.connections.insert(id, connection);
        self.rooms.entry(quiz_id).or_default().insert(id);
    }

    /// Remove a connection from its room and the connection map.
    pub fn leave(&self, connection_id: Uuid) {
        let Some((_, connection)) = self.connections.remove(&connection_id) else {
            return;
        };

        if let Some(mut members) = self.rooms.get_mut(&connection.quiz_id) {
            members.remove(&connection_id);
            let empty = members.is_empty();
            drop(members);
            if empty {
                self.rooms.remove_if(&connection.quiz_id, |_, members| members.is_empty());
            }
        }
    }

    /// Number of live connections in a quiz room.
    pub fn room_size(&self, quiz_id: Uuid) -> usize {
        self.rooms
            .get(&quiz_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    /// Send the same event to every connection in a quiz room.
    pub fn broadcast<T>(&self, quiz_id: Uuid, event: &T)
    where
        T: ?Sized + Serialize,
    {
        let Some(payload) = serialize(event) else {
            return;
        };
        self.send_to_room(quiz_id, |_| Some(payload.clone()));
    }

    /// Send one event to admin connections and another to the rest of the room.
    pub fn broadcast_split<A, P>(&self, quiz_id: Uuid, admin_event: &A, public_event: &P)
    where
        A: ?Sized + Serialize,
        P: ?Sized + Serialize,
    {
        let (Some(admin_payload), Some(public_payload)) =
            (serialize(admin_event), serialize(public_event))
        else {
            return;
        };

        self.send_to_room(quiz_id, |connection| {
            Some(if connection.is_admin {
                admin_payload.clone()
            } else {
                public_payload.clone()
            })
        });
    }

    fn send_to_room<F>(&self, quiz_id: Uuid, mut payload_for: F)
    where
        F: FnMut(&ClientConnection) -> Option<String>,
    {
        let member_ids: Vec<Uuid> = match self.rooms.get(&quiz_id) {
            Some(members) => members.iter().copied().collect(),
            None => return,
        };

        for member_id in member_ids {
            let Some(connection) = self.connections.get(&member_id) else {
                continue;
            };
            if let Some(payload) = payload_for(&connection) {
                // A closed channel means the socket task is winding down and
                // will remove itself; nothing to do here.
                let _ = connection.tx.send(Message::Text(payload.into()));
            }
        }
    }
}

fn serialize<T>(event: &T) -> Option<String>
where
    T: ?Sized + Serialize,
{
    match serde_json::to_string(event) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "failed to serialize realtime event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct TestEvent {
        kind: &'static str,
    }

    fn connection(
        quiz_id: Uuid,
        is_admin: bool,
    ) -> (ClientConnection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ClientConnection {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                is_admin,
                quiz_id,
                tx,
            },
            rx,
        )
    }

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_only_the_target_room() {
        let registry = RoomRegistry::new();
        let (quiz_a, quiz_b) = (Uuid::new_v4(), Uuid::new_v4());

        let (conn_a, mut rx_a) = connection(quiz_a, false);
        let (conn_b, mut rx_b) = connection(quiz_b, false);
        registry.join(conn_a);
        registry.join(conn_b);

        registry.broadcast(quiz_a, &TestEvent { kind: "ping" });

        assert_eq!(text_of(rx_a.recv().await.unwrap()), r#"{"kind":"ping"}"#);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_split_redacts_for_non_admins() {
        let registry = RoomRegistry::new();
        let quiz = Uuid::new_v4();

        let (admin, mut admin_rx) = connection(quiz, true);
        let (player, mut player_rx) = connection(quiz, false);
        registry.join(admin);
        registry.join(player);

        registry.broadcast_split(
            quiz,
            &TestEvent { kind: "full" },
            &TestEvent { kind: "redacted" },
        );

        assert_eq!(
            text_of(admin_rx.recv().await.unwrap()),
            r#"{"kind":"full"}"#
        );
        assert_eq!(
            text_of(player_rx.recv().await.unwrap()),
            r#"{"kind":"redacted"}"#
        );
    }

    #[tokio::test]
    async fn leave_removes_the_connection_and_empty_room() {
        let registry = RoomRegistry::new();
        let quiz = Uuid::new_v4();

        let (conn, mut rx) = connection(quiz, false);
        let conn_id = conn.id;
        registry.join(conn);
        assert_eq!(registry.room_size(quiz), 1);

        registry.leave(conn_id);
        assert_eq!(registry.room_size(quiz), 0);

        registry.broadcast(quiz, &TestEvent { kind: "ping" });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receiver_does_not_poison_the_room() {
        let registry = RoomRegistry::new();
        let quiz = Uuid::new_v4();

        let (dead, dead_rx) = connection(quiz, false);
        let (live, mut live_rx) = connection(quiz, false);
        registry.join(dead);
        registry.join(live);
        drop(dead_rx);

        registry.broadcast(quiz, &TestEvent { kind: "ping" });
        assert_eq!(text_of(live_rx.recv().await.unwrap()), r#"{"kind":"ping"}"#);
    }
}
