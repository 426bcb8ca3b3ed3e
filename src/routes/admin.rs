use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::quiz::{ActionResponse, NextQuestionResponse, QuestionView, SessionWithAnswers},
    error::AppError,
    services::{auth_service::AdminUser, lifecycle_service, quiz_service},
    state::SharedState,
};

/// Admin-only routes driving the live quiz lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes/{id}/start", post(start_quiz))
        .route("/quizzes/{id}/end", post(end_quiz))
        .route(
            "/quizzes/{quiz_id}/questions/{question_id}/reveal",
            post(reveal_question),
        )
        .route(
            "/quizzes/{quiz_id}/questions/{question_id}/end",
            post(end_question),
        )
        .route(
            "/quizzes/{quiz_id}/questions/{question_id}/skip",
            post(skip_question),
        )
        .route("/quizzes/{id}/next-question", get(next_question))
        .route("/quizzes/{id}/sessions", get(list_sessions))
}

/// Move a draft quiz to active and notify the room.
#[utoipa::path(
    post,
    path = "/quizzes/{id}/start",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz started", body = ActionResponse),
        (status = 409, description = "Quiz is not in draft status")
    )
)]
pub async fn start_quiz(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifecycle_service::start_quiz(&state, id).await?;
    Ok(Json(response))
}

/// Move an active quiz to completed and notify the room.
#[utoipa::path(
    post,
    path = "/quizzes/{id}/end",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz ended", body = ActionResponse),
        (status = 409, description = "Quiz is not active")
    )
)]
pub async fn end_quiz(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifecycle_service::end_quiz(&state, id).await?;
    Ok(Json(response))
}

/// Reveal a question, opening its answering window.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/questions/{question_id}/reveal",
    tag = "admin",
    params(
        ("quiz_id" = Uuid, Path, description = "Quiz identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier")
    ),
    responses(
        (status = 200, description = "Question revealed", body = QuestionView),
        (status = 409, description = "Question already revealed or quiz not active")
    )
)]
pub async fn reveal_question(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path((quiz_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<QuestionView>, AppError> {
    let view = lifecycle_service::reveal_question(&state, quiz_id, question_id).await?;
    Ok(Json(view))
}

/// Signal the end of a revealed question to the room.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/questions/{question_id}/end",
    tag = "admin",
    params(
        ("quiz_id" = Uuid, Path, description = "Quiz identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier")
    ),
    responses(
        (status = 200, description = "Question ended", body = ActionResponse),
        (status = 409, description = "Question was never revealed")
    )
)]
pub async fn end_question(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path((quiz_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifecycle_service::end_question(&state, quiz_id, question_id).await?;
    Ok(Json(response))
}

/// Pass over an unrevealed question, announcing the skip to the room.
#[utoipa::path(
    post,
    path = "/quizzes/{quiz_id}/questions/{question_id}/skip",
    tag = "admin",
    params(
        ("quiz_id" = Uuid, Path, description = "Quiz identifier"),
        ("question_id" = Uuid, Path, description = "Question identifier")
    ),
    responses(
        (status = 200, description = "Question skipped", body = ActionResponse),
        (status = 409, description = "Question was already revealed")
    )
)]
pub async fn skip_question(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path((quiz_id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = lifecycle_service::skip_question(&state, quiz_id, question_id).await?;
    Ok(Json(response))
}

/// Query parameters selecting the reveal track.
#[derive(Debug, Deserialize)]
pub struct NextQuestionQuery {
    #[serde(default)]
    pub bonus: bool,
}

/// Peek at the lowest-numbered unrevealed question on a track.
#[utoipa::path(
    get,
    path = "/quizzes/{id}/next-question",
    tag = "admin",
    params(
        ("id" = Uuid, Path, description = "Quiz identifier"),
        ("bonus" = bool, Query, description = "Select the bonus track instead of the normal one")
    ),
    responses((status = 200, description = "Next reveal candidate", body = NextQuestionResponse))
)]
pub async fn next_question(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(query): Query<NextQuestionQuery>,
) -> Result<Json<NextQuestionResponse>, AppError> {
    let response = lifecycle_service::next_question(&state, id, query.bonus).await?;
    Ok(Json(response))
}

/// List every session of a quiz with users and recorded answers.
#[utoipa::path(
    get,
    path = "/quizzes/{id}/sessions",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses((status = 200, description = "Sessions with answers", body = [SessionWithAnswers]))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionWithAnswers>>, AppError> {
    let sessions = quiz_service::list_sessions(&state, id).await?;
    Ok(Json(sessions))
}
