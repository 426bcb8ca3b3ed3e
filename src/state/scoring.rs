//! Points computation for accepted answers.
//!
//! Pure and deterministic: the same quiz configuration, correctness and
//! arrival position always produce the same award.

use crate::dao::models::{QuestionEntity, QuizEntity, ScoringMode};

/// Points by arrival position used in `speed` mode when the quiz does not
/// configure its own table. The last entry applies to every later position.
pub const DEFAULT_SPEED_TABLE: [u32; 4] = [20, 15, 10, 5];

/// Compute the points awarded for one submission.
///
/// Incorrect or skipped answers always score zero. In `speed` mode
/// `arrival_position` is the 1-based rank among correct answers; callers must
/// pass it for correct answers. Bonus questions double the result after the
/// mode-specific lookup.
pub fn score(
    quiz: &QuizEntity,
    question: &QuestionEntity,
    is_correct: bool,
    arrival_position: Option<u32>,
) -> u32 {
    if !is_correct {
        return 0;
    }

    let base = match quiz.scoring_mode {
        ScoringMode::Standard | ScoringMode::Negative => question.points,
        ScoringMode::Speed => speed_points(quiz, arrival_position),
    };

    if question.is_bonus { base * 2 } else { base }
}

fn speed_points(quiz: &QuizEntity, arrival_position: Option<u32>) -> u32 {
    let table: Vec<u32> = match &quiz.speed_table {
        Some(tiers) if !tiers.is_empty() => tiers.iter().map(|tier| tier.points).collect(),
        _ => DEFAULT_SPEED_TABLE.to_vec(),
    };

    // Positions past the configured tiers fall into the last one.
    let position = arrival_position.unwrap_or(1).max(1) as usize;
    let index = (position - 1).min(table.len() - 1);
    table[index]
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::dao::models::{OptionKey, QuizStatus, SpeedTierEntity};

    fn quiz(mode: ScoringMode, table: Option<Vec<u32>>) -> QuizEntity {
        QuizEntity {
            id: Uuid::new_v4(),
            title: "t".into(),
            passkey: "p".into(),
            status: QuizStatus::Active,
            default_time_limit_secs: 45,
            scoring_mode: mode,
            speed_table: table.map(|points| {
                points
                    .into_iter()
                    .map(|points| SpeedTierEntity { points })
                    .collect()
            }),
            created_by: Uuid::new_v4(),
            created_at: SystemTime::now(),
            started_at: None,
            completed_at: None,
        }
    }

    fn question(points: u32, bonus: bool) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_number: 1,
            text: "?".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: OptionKey::A,
            is_bonus: bonus,
            time_limit_secs: 30,
            points,
            is_revealed: true,
            revealed_at: Some(SystemTime::now()),
        }
    }

    #[test]
    fn incorrect_answers_score_zero_in_every_mode() {
        for mode in [
            ScoringMode::Standard,
            ScoringMode::Speed,
            ScoringMode::Negative,
        ] {
            let quiz = quiz(mode, None);
            assert_eq!(score(&quiz, &question(10, false), false, None), 0);
            assert_eq!(score(&quiz, &question(10, true), false, Some(1)), 0);
        }
    }

    #[test]
    fn standard_mode_awards_question_points() {
        let quiz = quiz(ScoringMode::Standard, None);
        assert_eq!(score(&quiz, &question(10, false), true, Some(7)), 10);
    }

    #[test]
    fn negative_mode_scores_like_standard() {
        let quiz = quiz(ScoringMode::Negative, None);
        assert_eq!(score(&quiz, &question(10, false), true, Some(1)), 10);
        assert_eq!(score(&quiz, &question(10, false), false, None), 0);
    }

    #[test]
    fn speed_mode_uses_default_table_with_catch_all() {
        let quiz = quiz(ScoringMode::Speed, None);
        let q = question(10, false);
        assert_eq!(score(&quiz, &q, true, Some(1)), 20);
        assert_eq!(score(&quiz, &q, true, Some(2)), 15);
        assert_eq!(score(&quiz, &q, true, Some(3)), 10);
        assert_eq!(score(&quiz, &q, true, Some(4)), 5);
        assert_eq!(score(&quiz, &q, true, Some(5)), 5);
        assert_eq!(score(&quiz, &q, true, Some(100)), 5);
    }

    #[test]
    fn speed_mode_honours_configured_table() {
        let quiz = quiz(ScoringMode::Speed, Some(vec![50, 30]));
        let q = question(10, false);
        assert_eq!(score(&quiz, &q, true, Some(1)), 50);
        assert_eq!(score(&quiz, &q, true, Some(2)), 30);
        assert_eq!(score(&quiz, &q, true, Some(9)), 30);
    }

    #[test]
    fn bonus_doubles_after_mode_lookup() {
        let standard = quiz(ScoringMode::Standard, None);
        assert_eq!(score(&standard, &question(10, true), true, None), 20);

        let speed = quiz(ScoringMode::Speed, None);
        assert_eq!(score(&speed, &question(10, true), true, Some(2)), 30);
    }

    #[test]
    fn empty_configured_table_falls_back_to_default() {
        let quiz = quiz(ScoringMode::Speed, Some(vec![]));
        assert_eq!(score(&quiz, &question(10, false), true, Some(1)), 20);
    }
}
