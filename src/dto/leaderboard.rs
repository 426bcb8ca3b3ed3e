//! Leaderboard projections.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// One ranked row of a quiz leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// Rank starting at 1, contiguous.
    pub rank: u32,
    pub user_id: Uuid,
    pub email: String,
    pub total_score: u32,
    pub correct_answers: u32,
    pub total_answers: u32,
}
