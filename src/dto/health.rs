//! Health endpoint payload.

use serde::Serialize;
use utoipa::ToSchema;

/// Health probe response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
}

impl HealthResponse {
    /// Everything works, storage included.
    pub fn ok() -> Self {
        Self { status: "ok" }
    }

    /// The service runs without its storage backend.
    pub fn degraded() -> Self {
        Self { status: "degraded" }
    }
}
