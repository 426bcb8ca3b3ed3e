/// Answer intake, gating, and scoring.
pub mod answer_service;
/// Email one-time-code authentication and request extractors.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Quiz room event broadcasting helpers.
pub mod events;
/// Health check service.
pub mod health_service;
/// Leaderboard aggregation and ranking.
pub mod leaderboard_service;
/// Quiz and question lifecycle transitions.
pub mod lifecycle_service;
/// Quiz creation, discovery, and session management.
pub mod quiz_service;
/// Storage connection coordinator with reconnect backoff.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod ws_service;
