//! Pure quiz lifecycle rules.
//!
//! Quizzes move `draft -> active -> completed`, never backwards; question
//! reveal is a one-way flag. Everything here is a pure function over the
//! entities so the rules can be tested without storage.

use thiserror::Error;

use crate::dao::models::{QuestionEntity, QuizEntity, QuizStatus};

/// A lifecycle operation attempted from a state that does not permit it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// The quiz status does not allow the requested transition.
    #[error("cannot {action} quiz while it is {from}")]
    Quiz {
        /// Status the quiz was in.
        from: QuizStatus,
        /// Attempted action, e.g. `start`.
        action: &'static str,
    },
    /// Reveal requested for a question that is already revealed.
    #[error("question {question_number} is already revealed")]
    AlreadyRevealed {
        /// 1-based question number.
        question_number: u32,
    },
    /// An operation required a revealed question of an active quiz.
    #[error("question {question_number} is not open for answers")]
    QuestionNotOpen {
        /// 1-based question number.
        question_number: u32,
    },
}

/// Status after starting a quiz, or an error when it is not a draft.
pub fn start(status: QuizStatus) -> Result<QuizStatus, LifecycleError> {
    match status {
        QuizStatus::Draft => Ok(QuizStatus::Active),
        from => Err(LifecycleError::Quiz {
            from,
            action: "start",
        }),
    }
}

/// Status after ending a quiz, or an error when it is not active.
pub fn end(status: QuizStatus) -> Result<QuizStatus, LifecycleError> {
    match status {
        QuizStatus::Active => Ok(QuizStatus::Completed),
        from => Err(LifecycleError::Quiz { from, action: "end" }),
    }
}

/// Check that a question of an active quiz may be revealed now.
pub fn ensure_reveal_allowed(
    quiz: &QuizEntity,
    question: &QuestionEntity,
) -> Result<(), LifecycleError> {
    if quiz.status != QuizStatus::Active {
        return Err(LifecycleError::Quiz {
            from: quiz.status,
            action: "reveal a question of",
        });
    }
    if question.is_revealed {
        return Err(LifecycleError::AlreadyRevealed {
            question_number: question.question_number,
        });
    }
    Ok(())
}

/// Next unrevealed question matching the bonus flag, lowest number first.
///
/// `None` simply means there is no candidate left; it is not an error.
pub fn next_unrevealed(questions: &[QuestionEntity], bonus: bool) -> Option<&QuestionEntity> {
    questions
        .iter()
        .filter(|question| !question.is_revealed && question.is_bonus == bonus)
        .min_by_key(|question| question.question_number)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::dao::models::{OptionKey, ScoringMode};

    fn quiz_with_status(status: QuizStatus) -> QuizEntity {
        QuizEntity {
            id: Uuid::new_v4(),
            title: "t".into(),
            passkey: "p".into(),
            status,
            default_time_limit_secs: 45,
            scoring_mode: ScoringMode::Standard,
            speed_table: None,
            created_by: Uuid::new_v4(),
            created_at: SystemTime::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn question(number: u32, bonus: bool, revealed: bool) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_number: number,
            text: "?".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: OptionKey::A,
            is_bonus: bonus,
            time_limit_secs: 30,
            points: 10,
            is_revealed: revealed,
            revealed_at: None,
        }
    }

    #[test]
    fn start_requires_draft() {
        assert_eq!(start(QuizStatus::Draft), Ok(QuizStatus::Active));
        assert!(start(QuizStatus::Active).is_err());
        assert!(start(QuizStatus::Completed).is_err());
    }

    #[test]
    fn end_requires_active() {
        assert_eq!(end(QuizStatus::Active), Ok(QuizStatus::Completed));
        assert!(end(QuizStatus::Draft).is_err());
        assert!(end(QuizStatus::Completed).is_err());
    }

    #[test]
    fn completed_is_terminal() {
        assert_eq!(
            start(QuizStatus::Completed),
            Err(LifecycleError::Quiz {
                from: QuizStatus::Completed,
                action: "start"
            })
        );
        assert_eq!(
            end(QuizStatus::Completed),
            Err(LifecycleError::Quiz {
                from: QuizStatus::Completed,
                action: "end"
            })
        );
    }

    #[test]
    fn reveal_needs_active_quiz_and_unrevealed_question() {
        let fresh = question(1, false, false);

        assert!(ensure_reveal_allowed(&quiz_with_status(QuizStatus::Active), &fresh).is_ok());
        assert!(ensure_reveal_allowed(&quiz_with_status(QuizStatus::Draft), &fresh).is_err());

        let revealed = question(2, false, true);
        assert_eq!(
            ensure_reveal_allowed(&quiz_with_status(QuizStatus::Active), &revealed),
            Err(LifecycleError::AlreadyRevealed { question_number: 2 })
        );
    }

    #[test]
    fn next_unrevealed_picks_lowest_matching_number() {
        let questions = vec![
            question(3, false, false),
            question(1, false, true),
            question(2, false, false),
            question(4, true, false),
        ];

        assert_eq!(
            next_unrevealed(&questions, false).map(|q| q.question_number),
            Some(2)
        );
        assert_eq!(
            next_unrevealed(&questions, true).map(|q| q.question_number),
            Some(4)
        );
    }

    #[test]
    fn next_unrevealed_returns_none_when_exhausted() {
        let questions = vec![question(1, false, true), question(2, false, true)];
        assert!(next_unrevealed(&questions, false).is_none());
        assert!(next_unrevealed(&questions, true).is_none());
        assert!(next_unrevealed(&[], false).is_none());
    }
}
