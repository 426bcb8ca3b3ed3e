//! Payloads for answer submission.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// One answer submission for a revealed question.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// The caller's participant session.
    pub session_id: Uuid,
    pub question_id: Uuid,
    /// Selected option label (`"A"` or `"Option A"`); null records a skip.
    #[serde(default)]
    pub selected_option: Option<String>,
    /// Client-measured time to answer, in seconds.
    pub elapsed_seconds: u32,
}

impl Validate for SubmitAnswerRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        // An explicitly blank option is a malformed request, distinct from
        // the null that records a skip.
        if let Some(option) = &self.selected_option {
            if option.trim().is_empty() {
                let mut err = validator::ValidationError::new("selected_option_blank");
                err.message =
                    Some("selected_option must be an option label or null for a skip".into());
                errors.add("selected_option", err);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    /// Points awarded by the scoring policy.
    pub points: u32,
}
