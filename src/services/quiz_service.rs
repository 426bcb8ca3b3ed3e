//! Quiz creation, listing and participant management.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{
        models::{
            QuestionEntity, QuizEntity, QuizStatus, ScoringMode, SessionEntity, SpeedTierEntity,
            UserEntity,
        },
        storage::StorageError,
    },
    dto::{
        quiz::{
            CreateQuizRequest, QuizDetail, QuizSummary, SessionSummary, SessionWithAnswers,
        },
        validation::{passkey_matches, validate_correct_answer},
    },
    error::ServiceError,
    state::SharedState,
};

/// Create a quiz with its full question list. Questions are numbered densely
/// in input order.
pub async fn create_quiz(
    state: &SharedState,
    creator: &UserEntity,
    payload: CreateQuizRequest,
) -> Result<QuizDetail, ServiceError> {
    payload.validate()?;

    let store = state.require_store().await?;
    let config = state.config();
    let now = SystemTime::now();

    let quiz = QuizEntity {
        id: Uuid::new_v4(),
        title: payload.title,
        passkey: payload.passkey,
        status: QuizStatus::Draft,
        default_time_limit_secs: payload
            .default_time_limit_secs
            .unwrap_or_else(|| config.default_time_limit_secs()),
        scoring_mode: payload.scoring_mode.unwrap_or(ScoringMode::Standard),
        speed_table: payload.speed_table.map(|points| {
            points
                .into_iter()
                .map(|points| SpeedTierEntity { points })
                .collect()
        }),
        created_by: creator.id,
        created_at: now,
        started_at: None,
        completed_at: None,
    };
    store.insert_quiz(quiz.clone()).await?;

    let mut questions = Vec::with_capacity(payload.questions.len());
    for (index, input) in payload.questions.into_iter().enumerate() {
        // Validation already proved the label parses and the count is four.
        let correct_option = validate_correct_answer(&input.correct_answer)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;
        let options: [String; 4] = input
            .options
            .try_into()
            .map_err(|_| ServiceError::Validation("questions need exactly 4 options".into()))?;

        let question = QuestionEntity {
            id: Uuid::new_v4(),
            quiz_id: quiz.id,
            question_number: index as u32 + 1,
            text: input.text,
            options,
            correct_option,
            is_bonus: input.is_bonus,
            time_limit_secs: input.time_limit_secs.unwrap_or(quiz.default_time_limit_secs),
            points: input.points.unwrap_or_else(|| config.default_question_points()),
            is_revealed: false,
            revealed_at: None,
        };
        store.insert_question(question.clone()).await?;
        questions.push(question);
    }

    info!(quiz_id = %quiz.id, questions = questions.len(), "quiz created");
    Ok(QuizDetail::from_entities(quiz, questions, 0, true))
}

/// List quizzes: admins see everything, participants only what they can join
/// or review.
pub async fn list_quizzes(
    state: &SharedState,
    user: &UserEntity,
) -> Result<Vec<QuizSummary>, ServiceError> {
    let store = state.require_store().await?;
    let quizzes = store.list_quizzes().await?;

    Ok(quizzes
        .into_iter()
        .filter(|quiz| user.is_admin || quiz.status != QuizStatus::Draft)
        .map(QuizSummary::from)
        .collect())
}

/// Fetch a quiz with its questions; drafts stay hidden from participants, and
/// so do correct answers.
pub async fn get_quiz(
    state: &SharedState,
    user: &UserEntity,
    quiz_id: Uuid,
) -> Result<QuizDetail, ServiceError> {
    let store = state.require_store().await?;
    let quiz = find_visible_quiz(state, user, quiz_id).await?;

    let questions = store.list_questions(quiz_id).await?;
    let participant_count = store.list_sessions_for_quiz(quiz_id).await?.len();

    Ok(QuizDetail::from_entities(
        quiz,
        questions,
        participant_count,
        user.is_admin,
    ))
}

/// Join a quiz, creating the participant session on first call. Joining again
/// returns the existing session unchanged.
pub async fn join_quiz(
    state: &SharedState,
    user: &UserEntity,
    quiz_id: Uuid,
    passkey: &str,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_store().await?;
    let quiz = find_visible_quiz(state, user, quiz_id).await?;

    if !passkey_matches(&quiz, passkey) {
        return Err(ServiceError::Forbidden("incorrect passkey".into()));
    }

    if let Some(existing) = store
        .find_session_by_user_and_quiz(user.id, quiz_id)
        .await?
    {
        return Ok(existing.into());
    }

    if quiz.status != QuizStatus::Active {
        return Err(ServiceError::Conflict(format!(
            "quiz is {}, joining is only possible while it is active",
            quiz.status
        )));
    }

    let session = SessionEntity {
        id: Uuid::new_v4(),
        quiz_id,
        user_id: user.id,
        joined_at: SystemTime::now(),
        total_score: 0,
        is_active: true,
    };

    match store.insert_session(session.clone()).await {
        Ok(()) => {
            info!(quiz_id = %quiz_id, user_id = %user.id, "participant joined quiz");
            Ok(session.into())
        }
        // Lost a race against another join from the same user; the session
        // that won is just as good.
        Err(StorageError::Duplicate { .. }) => store
            .find_session_by_user_and_quiz(user.id, quiz_id)
            .await?
            .map(Into::into)
            .ok_or_else(|| ServiceError::Conflict("session vanished during join".into())),
        Err(err) => Err(err.into()),
    }
}

/// Fetch the caller's session for a quiz.
pub async fn get_user_session(
    state: &SharedState,
    user: &UserEntity,
    quiz_id: Uuid,
) -> Result<SessionSummary, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_session_by_user_and_quiz(user.id, quiz_id)
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound("no session for this quiz".into()))
}

/// Admin listing of every session of a quiz, with user identity and answers.
pub async fn list_sessions(
    state: &SharedState,
    quiz_id: Uuid,
) -> Result<Vec<SessionWithAnswers>, ServiceError> {
    let store = state.require_store().await?;
    if store.find_quiz(quiz_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("quiz {quiz_id} not found")));
    }

    let sessions = store.list_sessions_for_quiz(quiz_id).await?;
    let mut result = Vec::with_capacity(sessions.len());
    for session in sessions {
        let user = store.find_user(session.user_id).await?;
        let answers = store.list_answers_for_session(session.id).await?;
        result.push(SessionWithAnswers {
            session: session.into(),
            user: user.map(Into::into),
            answers: answers.into_iter().map(Into::into).collect(),
        });
    }
    Ok(result)
}

/// Fetch a quiz, hiding drafts from non-admins as if they did not exist.
async fn find_visible_quiz(
    state: &SharedState,
    user: &UserEntity,
    quiz_id: Uuid,
) -> Result<QuizEntity, ServiceError> {
    let store = state.require_store().await?;
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz {quiz_id} not found")))?;

    if quiz.status == QuizStatus::Draft && !user.is_admin {
        return Err(ServiceError::NotFound(format!("quiz {quiz_id} not found")));
    }
    Ok(quiz)
}
