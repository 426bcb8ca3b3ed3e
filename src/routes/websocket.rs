use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{services::ws_service, state::SharedState};

/// Handshake parameters carried on the WebSocket query string.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    pub quiz_id: Uuid,
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "ws",
    params(
        ("token" = String, Query, description = "Bearer token issued by /auth/verify-otp"),
        ("quiz_id" = Uuid, Query, description = "Quiz room to join")
    ),
    responses((status = 101, description = "Switching protocols to WebSocket"))
)]
/// Upgrade the HTTP connection into a quiz room WebSocket session.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let shared_state = state.clone();
    ws.on_upgrade(move |socket| {
        ws_service::handle_socket(shared_state, socket, query.token, query.quiz_id)
    })
}

/// Configure the WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/ws", get(ws_handler))
}
