//! Answer intake: at-most-once recording, arrival ordering and scoring.

use std::time::{Duration, SystemTime};

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, OptionKey, QuizStatus, UserEntity},
    dto::answer::{SubmitAnswerRequest, SubmitAnswerResponse},
    error::ServiceError,
    services::events,
    state::{SharedState, lifecycle::LifecycleError, scoring},
};

/// Record one submission for a revealed question.
///
/// The check-count-insert sequence runs under a per-question gate so that a
/// session can never record two answers for the same question and arrival
/// positions among correct answers stay dense. A null `selected_option`
/// records a skip: incorrect, zero points, but still consuming the attempt.
pub async fn submit(
    state: &SharedState,
    user: &UserEntity,
    payload: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    use validator::Validate;
    payload.validate()?;

    let store = state.require_store().await?;

    // A missing session and someone else's session look the same to the
    // caller; neither is theirs to answer through.
    let session = store
        .find_session(payload.session_id)
        .await?
        .filter(|session| session.user_id == user.id)
        .ok_or_else(|| {
            ServiceError::Forbidden("session does not exist or belongs to another user".into())
        })?;
    if !session.is_active {
        return Err(ServiceError::Forbidden("session is no longer active".into()));
    }

    let question = store
        .find_question(payload.question_id)
        .await?
        .filter(|question| question.quiz_id == session.quiz_id)
        .ok_or_else(|| ServiceError::NotFound("question not found in this quiz".into()))?;

    let quiz = store
        .find_quiz(session.quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("quiz not found".into()))?;
    if quiz.status != QuizStatus::Active {
        return Err(LifecycleError::Quiz {
            from: quiz.status,
            action: "answer a question of",
        }
        .into());
    }

    if !question.is_revealed {
        return Err(LifecycleError::QuestionNotOpen {
            question_number: question.question_number,
        }
        .into());
    }

    // Server-authoritative window: the client timer is advisory only.
    let now = SystemTime::now();
    if let Some(revealed_at) = question.revealed_at {
        let window =
            Duration::from_secs(u64::from(question.time_limit_secs)) + state.config().answer_grace();
        if now > revealed_at + window {
            return Err(ServiceError::TooLate(format!(
                "answering window for question {} has closed",
                question.question_number
            )));
        }
    }

    let selected_option = match &payload.selected_option {
        Some(label) => Some(OptionKey::parse_label(label).ok_or_else(|| {
            ServiceError::Validation(format!("`{label}` is not a valid option label"))
        })?),
        None => None,
    };

    let gate = state.answer_gate(question.id);
    let _guard = gate.lock().await;

    if store
        .find_answer(session.id, question.id)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict(
            "this question has already been answered in this session".into(),
        ));
    }

    let is_correct = selected_option == Some(question.correct_option);
    let arrival_position = if is_correct {
        let prior_correct = store.count_correct_answers(question.id).await?;
        Some(prior_correct as u32 + 1)
    } else {
        None
    };
    let points = scoring::score(&quiz, &question, is_correct, arrival_position);

    store
        .insert_answer(AnswerEntity {
            id: Uuid::new_v4(),
            session_id: session.id,
            question_id: question.id,
            selected_option,
            is_correct,
            points,
            arrival_position,
            time_to_answer_secs: payload.elapsed_seconds,
            submitted_at: now,
        })
        .await?;

    // Recompute the total from scratch rather than incrementing, so the
    // session record always equals the sum of its answers. The per-session
    // gate keeps concurrent submissions to two open questions from writing
    // stale totals over each other.
    {
        let score_gate = state.score_gate(session.id);
        let _score_guard = score_gate.lock().await;
        let total: u32 = store
            .list_answers_for_session(session.id)
            .await?
            .iter()
            .map(|answer| answer.points)
            .sum();
        store.update_session_score(session.id, total).await?;
    }

    drop(_guard);

    info!(
        session_id = %session.id,
        question_number = question.question_number,
        is_correct,
        points,
        "answer recorded"
    );
    events::broadcast_answer_submitted(
        state,
        session.quiz_id,
        user.id,
        question.id,
        is_correct,
        points,
    );

    Ok(SubmitAnswerResponse { is_correct, points })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::models::ScoringMode,
        dao::quiz_store::MemoryStore,
        dto::quiz::{CreateQuizRequest, QuestionInput, QuizDetail, SessionSummary},
        services::{lifecycle_service, quiz_service},
        state::AppState,
    };

    async fn test_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryStore::new())).await
    }

    async fn admin(state: &SharedState) -> UserEntity {
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            is_admin: true,
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

    async fn player(state: &SharedState, email: &str) -> UserEntity {
        let user = UserEntity {
            id: Uuid::new_v4(),
            email: email.into(),
            is_admin: false,
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

    async fn speed_quiz(state: &SharedState) -> QuizDetail {
        let admin = admin(state).await;
        quiz_service::create_quiz(
            state,
            &admin,
            CreateQuizRequest {
                title: "Speed round".into(),
                passkey: "letmein".into(),
                default_time_limit_secs: None,
                scoring_mode: Some(ScoringMode::Speed),
                speed_table: None,
                questions: vec![QuestionInput {
                    text: "q1".into(),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: "B".into(),
                    is_bonus: false,
                    time_limit_secs: None,
                    points: None,
                }],
            },
        )
        .await
        .unwrap()
    }

    async fn joined(state: &SharedState, user: &UserEntity, quiz_id: Uuid) -> SessionSummary {
        quiz_service::join_quiz(state, user, quiz_id, "letmein")
            .await
            .unwrap()
    }

    fn submission(
        session_id: Uuid,
        question_id: Uuid,
        option: Option<&str>,
    ) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            session_id,
            question_id,
            selected_option: option.map(Into::into),
            elapsed_seconds: 5,
        }
    }

    #[tokio::test]
    async fn speed_scoring_awards_by_arrival_among_correct_answers() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let p2 = player(&state, "p2@example.com").await;
        let p3 = player(&state, "p3@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        let s2 = joined(&state, &p2, quiz.id).await;
        let s3 = joined(&state, &p3, quiz.id).await;

        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        // P2 answers correctly first, P1 incorrectly, P3 correctly second.
        let r2 = submit(&state, &p2, submission(s2.id, question_id, Some("B")))
            .await
            .unwrap();
        assert!(r2.is_correct);
        assert_eq!(r2.points, 20);

        let r1 = submit(&state, &p1, submission(s1.id, question_id, Some("A")))
            .await
            .unwrap();
        assert!(!r1.is_correct);
        assert_eq!(r1.points, 0);

        // The incorrect answer in between does not consume a position.
        let r3 = submit(&state, &p3, submission(s3.id, question_id, Some("Option B")))
            .await
            .unwrap();
        assert!(r3.is_correct);
        assert_eq!(r3.points, 15);

        let store = state.require_store().await.unwrap();
        let session = store.find_session(s3.id).await.unwrap().unwrap();
        assert_eq!(session.total_score, 15);
    }

    #[tokio::test]
    async fn skip_is_recorded_and_scores_zero() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        let result = submit(&state, &p1, submission(s1.id, question_id, None))
            .await
            .unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.points, 0);

        // The skip consumed the one attempt.
        assert!(matches!(
            submit(&state, &p1, submission(s1.id, question_id, Some("B")))
                .await
                .unwrap_err(),
            ServiceError::Conflict(_)
        ));

        let store = state.require_store().await.unwrap();
        let answer = store.find_answer(s1.id, question_id).await.unwrap().unwrap();
        assert_eq!(answer.selected_option, None);
        assert_eq!(answer.arrival_position, None);
    }

    #[tokio::test]
    async fn duplicate_submissions_conflict() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        submit(&state, &p1, submission(s1.id, question_id, Some("B")))
            .await
            .unwrap();
        assert!(matches!(
            submit(&state, &p1, submission(s1.id, question_id, Some("C")))
                .await
                .unwrap_err(),
            ServiceError::Conflict(_)
        ));

        // The recorded answer is unchanged.
        let store = state.require_store().await.unwrap();
        let answer = store.find_answer(s1.id, question_id).await.unwrap().unwrap();
        assert_eq!(answer.selected_option, Some(OptionKey::B));
    }

    #[tokio::test]
    async fn concurrent_duplicates_accept_exactly_one() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for _ in 0..2 {
            let state = state.clone();
            let user = p1.clone();
            let session_id = s1.id;
            tasks.push(tokio::spawn(async move {
                submit(&state, &user, submission(session_id, question_id, Some("B"))).await
            }));
        }

        let mut accepted = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(ServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((accepted, conflicts), (1, 1));

        let store = state.require_store().await.unwrap();
        let session = store.find_session(s1.id).await.unwrap().unwrap();
        assert_eq!(session.total_score, 20);
    }

    #[tokio::test]
    async fn concurrent_submissions_to_two_open_questions_keep_the_total_consistent() {
        let state = test_state().await;
        let admin = admin(&state).await;
        let quiz = quiz_service::create_quiz(
            &state,
            &admin,
            CreateQuizRequest {
                title: "Two open questions".into(),
                passkey: "letmein".into(),
                default_time_limit_secs: None,
                scoring_mode: Some(ScoringMode::Speed),
                speed_table: None,
                questions: (0..2)
                    .map(|index| QuestionInput {
                        text: format!("q{}", index + 1),
                        options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                        correct_answer: "B".into(),
                        is_bonus: false,
                        time_limit_secs: None,
                        points: None,
                    })
                    .collect(),
            },
        )
        .await
        .unwrap();
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        for question in &quiz.questions {
            lifecycle_service::reveal_question(&state, quiz.id, question.id)
                .await
                .unwrap();
        }

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;

        // Both questions are open at once, so the submissions race on the
        // session total rather than on a shared question.
        let mut tasks = Vec::new();
        for question in &quiz.questions {
            let state = state.clone();
            let user = p1.clone();
            let session_id = s1.id;
            let question_id = question.id;
            tasks.push(tokio::spawn(async move {
                submit(&state, &user, submission(session_id, question_id, Some("B"))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // First correct on each question: 20 + 20.
        let store = state.require_store().await.unwrap();
        let session = store.find_session(s1.id).await.unwrap().unwrap();
        assert_eq!(session.total_score, 40);
    }

    #[tokio::test]
    async fn unrevealed_questions_reject_submissions() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;

        assert!(matches!(
            submit(
                &state,
                &p1,
                submission(s1.id, quiz.questions[0].id, Some("B"))
            )
            .await
            .unwrap_err(),
            ServiceError::InvalidTransition(_)
        ));
    }

    #[tokio::test]
    async fn submissions_after_the_window_are_too_late() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;

        // Backdate the reveal so the window has closed.
        let window = Duration::from_secs(45) + state.config().answer_grace();
        let revealed_at = SystemTime::now() - window - Duration::from_secs(10);
        let store = state.require_store().await.unwrap();
        assert!(
            store
                .mark_question_revealed(question_id, revealed_at)
                .await
                .unwrap()
        );

        let err = submit(&state, &p1, submission(s1.id, question_id, Some("B")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::TooLate(_)));

        // Nothing was recorded.
        assert!(store.find_answer(s1.id, question_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn foreign_sessions_are_forbidden() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let p2 = player(&state, "p2@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        assert!(matches!(
            submit(&state, &p2, submission(s1.id, question_id, Some("B")))
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));

        // A session that does not exist is indistinguishable from one that
        // is not yours.
        assert!(matches!(
            submit(&state, &p2, submission(Uuid::new_v4(), question_id, Some("B")))
                .await
                .unwrap_err(),
            ServiceError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn bad_option_labels_are_rejected_without_recording() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();

        assert!(matches!(
            submit(&state, &p1, submission(s1.id, question_id, Some("Option E")))
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));

        let store = state.require_store().await.unwrap();
        assert!(store.find_answer(s1.id, question_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ended_quizzes_reject_submissions() {
        let state = test_state().await;
        let quiz = speed_quiz(&state).await;
        lifecycle_service::start_quiz(&state, quiz.id).await.unwrap();
        let question_id = quiz.questions[0].id;

        let p1 = player(&state, "p1@example.com").await;
        let s1 = joined(&state, &p1, quiz.id).await;
        lifecycle_service::reveal_question(&state, quiz.id, question_id)
            .await
            .unwrap();
        lifecycle_service::end_quiz(&state, quiz.id).await.unwrap();

        assert!(matches!(
            submit(&state, &p1, submission(s1.id, question_id, Some("B")))
                .await
                .unwrap_err(),
            ServiceError::InvalidTransition(_)
        ));
    }
}
