//! Request, response and event payloads exchanged with clients.

use std::time::SystemTime;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

pub mod answer;
pub mod auth;
pub mod events;
pub mod health;
pub mod leaderboard;
pub mod quiz;
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
