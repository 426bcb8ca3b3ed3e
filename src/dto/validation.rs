//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::dao::models::{OptionKey, QuizEntity};

/// Validates that a question carries exactly four non-empty answer options.
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() != OptionKey::COUNT {
        let mut err = ValidationError::new("option_count");
        err.message = Some(
            format!(
                "questions need exactly {} options (got {})",
                OptionKey::COUNT,
                options.len()
            )
            .into(),
        );
        return Err(err);
    }

    if options.iter().any(|option| option.trim().is_empty()) {
        let mut err = ValidationError::new("option_empty");
        err.message = Some("answer options must not be blank".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a correct-answer label resolves to one of the four options.
pub fn validate_correct_answer(label: &str) -> Result<OptionKey, ValidationError> {
    OptionKey::parse_label(label).ok_or_else(|| {
        let mut err = ValidationError::new("correct_answer");
        err.message = Some(
            format!("correct answer must be one of A-D or `Option A`-`Option D` (got `{label}`)")
                .into(),
        );
        err
    })
}

/// Validates a join passkey against the quiz's configured one.
pub fn passkey_matches(quiz: &QuizEntity, passkey: &str) -> bool {
    quiz.passkey == passkey
}
