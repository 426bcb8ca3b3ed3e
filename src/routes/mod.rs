use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod answer;
pub mod auth;
pub mod docs;
pub mod health;
pub mod quiz;
pub mod websocket;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(auth::router())
        .merge(quiz::router())
        .merge(admin::router())
        .merge(answer::router())
        .merge(websocket::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
