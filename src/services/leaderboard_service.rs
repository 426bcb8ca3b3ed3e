//! Pull-based leaderboard computation.

use std::cmp::Reverse;

use uuid::Uuid;

use crate::{
    dao::models::{QuizStatus, UserEntity},
    dto::leaderboard::LeaderboardEntry,
    error::ServiceError,
    state::SharedState,
};

/// Compute the ranked standing of every active session of a quiz.
///
/// Ordering is deterministic: total score descending, then cumulative answer
/// time ascending, then join time ascending. Ranks are dense, starting at 1.
pub async fn compute(
    state: &SharedState,
    user: &UserEntity,
    quiz_id: Uuid,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let store = state.require_store().await?;
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz {quiz_id} not found")))?;
    if quiz.status == QuizStatus::Draft && !user.is_admin {
        return Err(ServiceError::NotFound(format!("quiz {quiz_id} not found")));
    }

    let sessions = store.list_sessions_for_quiz(quiz_id).await?;

    struct Row {
        entry: LeaderboardEntry,
        total_time_secs: u64,
        joined_at: std::time::SystemTime,
    }

    let mut rows = Vec::with_capacity(sessions.len());
    for session in sessions.into_iter().filter(|session| session.is_active) {
        let answers = store.list_answers_for_session(session.id).await?;
        let email = store
            .find_user(session.user_id)
            .await?
            .map(|user| user.email)
            .unwrap_or_default();

        rows.push(Row {
            entry: LeaderboardEntry {
                rank: 0,
                user_id: session.user_id,
                email,
                total_score: session.total_score,
                correct_answers: answers.iter().filter(|answer| answer.is_correct).count()
                    as u32,
                total_answers: answers.len() as u32,
            },
            total_time_secs: answers
                .iter()
                .map(|answer| u64::from(answer.time_to_answer_secs))
                .sum(),
            joined_at: session.joined_at,
        });
    }

    rows.sort_by_key(|row| {
        (
            Reverse(row.entry.total_score),
            row.total_time_secs,
            row.joined_at,
        )
    });

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| LeaderboardEntry {
            rank: index as u32 + 1,
            ..row.entry
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::SystemTime};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::models::ScoringMode,
        dao::quiz_store::MemoryStore,
        dto::{
            answer::SubmitAnswerRequest,
            quiz::{CreateQuizRequest, QuestionInput, QuizDetail},
        },
        services::{answer_service, lifecycle_service, quiz_service},
        state::AppState,
    };

    async fn test_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryStore::new())).await
    }

    async fn user(state: &SharedState, email: &str, is_admin: bool) -> UserEntity {
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: email.into(),
            is_admin,
            created_at: SystemTime::now(),
        };
        state
            .require_store()
            .await
            .unwrap()
            .insert_user(user.clone())
            .await
            .unwrap();
        user
    }

    async fn running_speed_quiz(state: &SharedState, questions: usize) -> QuizDetail {
        let admin = user(state, "admin@example.com", true).await;
        let detail = quiz_service::create_quiz(
            state,
            &admin,
            CreateQuizRequest {
                title: "Quiz".into(),
                passkey: "letmein".into(),
                default_time_limit_secs: None,
                scoring_mode: Some(ScoringMode::Speed),
                speed_table: None,
                questions: (0..questions)
                    .map(|index| QuestionInput {
                        text: format!("q{}", index + 1),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_answer: "A".into(),
                        is_bonus: false,
                        time_limit_secs: None,
                        points: None,
                    })
                    .collect(),
            },
        )
        .await
        .unwrap();
        lifecycle_service::start_quiz(state, detail.id).await.unwrap();
        detail
    }

    async fn answer(
        state: &SharedState,
        user: &UserEntity,
        session_id: Uuid,
        question_id: Uuid,
        option: &str,
        elapsed_seconds: u32,
    ) {
        answer_service::submit(
            state,
            user,
            SubmitAnswerRequest {
                session_id,
                question_id,
                selected_option: Some(option.into()),
                elapsed_seconds,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn ranks_are_dense_and_ordered_by_score() {
        let state = test_state().await;
        let quiz = running_speed_quiz(&state, 1).await;
        let question_id = quiz.questions[0].id;

        let p1 = user(&state, "p1@example.com", false).await;
        let p2 = user(&state, "p2@example.com", false).await;
        let p3 = user(&state, "p3@example.com", false).await;
        let s1 = quiz_service::join_quiz(&state, &p1, quiz.id, "letmein").await.unwrap();
        let s2 = quiz_service::join_quiz(&state, &p2, quiz.id, "letmein").await.unwrap();
        let s3 = quiz_service::join_quiz(&state, &p3, quiz.id, "letmein").await.unwrap();

        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        answer(&state, &p2, s2.id, question_id, "A", 3).await; // 20 points
        answer(&state, &p1, s1.id, question_id, "B", 4).await; // 0 points
        answer(&state, &p3, s3.id, question_id, "A", 7).await; // 15 points

        let board = compute(&state, &p1, quiz.id).await.unwrap();
        assert_eq!(board.len(), 3);
        assert_eq!(
            board
                .iter()
                .map(|entry| (entry.rank, entry.email.as_str(), entry.total_score))
                .collect::<Vec<_>>(),
            vec![
                (1, "p2@example.com", 20),
                (2, "p3@example.com", 15),
                (3, "p1@example.com", 0),
            ]
        );
        assert_eq!(board[0].correct_answers, 1);
        assert_eq!(board[2].correct_answers, 0);
        assert_eq!(board[2].total_answers, 1);
    }

    #[tokio::test]
    async fn ties_break_on_cumulative_answer_time() {
        let state = test_state().await;
        let quiz = running_speed_quiz(&state, 2).await;

        let p1 = user(&state, "p1@example.com", false).await;
        let p2 = user(&state, "p2@example.com", false).await;
        let s1 = quiz_service::join_quiz(&state, &p1, quiz.id, "letmein").await.unwrap();
        let s2 = quiz_service::join_quiz(&state, &p2, quiz.id, "letmein").await.unwrap();

        // Both score 20 + 15 = 35 by swapping arrival order across questions,
        // but p2 is faster on the clock.
        let q1 = quiz.questions[0].id;
        let q2 = quiz.questions[1].id;
        lifecycle_service::reveal_question(&state, quiz.id, q1).await.unwrap();
        answer(&state, &p1, s1.id, q1, "A", 10).await;
        answer(&state, &p2, s2.id, q1, "A", 4).await;

        lifecycle_service::reveal_question(&state, quiz.id, q2).await.unwrap();
        answer(&state, &p2, s2.id, q2, "A", 2).await;
        answer(&state, &p1, s1.id, q2, "A", 9).await;

        let board = compute(&state, &p1, quiz.id).await.unwrap();
        assert_eq!(board[0].total_score, board[1].total_score);
        assert_eq!(board[0].email, "p2@example.com");
        assert_eq!(board[1].email, "p1@example.com");
        assert_eq!((board[0].rank, board[1].rank), (1, 2));
    }

    #[tokio::test]
    async fn empty_quiz_yields_an_empty_board() {
        let state = test_state().await;
        let quiz = running_speed_quiz(&state, 1).await;
        let viewer = user(&state, "viewer@example.com", false).await;

        let board = compute(&state, &viewer, quiz.id).await.unwrap();
        assert!(board.is_empty());
    }

    #[tokio::test]
    async fn missing_quiz_is_not_found() {
        let state = test_state().await;
        let viewer = user(&state, "viewer@example.com", false).await;

        assert!(matches!(
            compute(&state, &viewer, Uuid::new_v4()).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }
}
