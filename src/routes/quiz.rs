use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::{
        leaderboard::LeaderboardEntry,
        quiz::{CreateQuizRequest, JoinQuizRequest, QuizDetail, QuizSummary, SessionSummary},
    },
    error::AppError,
    services::{
        auth_service::{AdminUser, CurrentUser},
        leaderboard_service, quiz_service,
    },
    state::SharedState,
};

/// Routes handling quiz creation, discovery, joining, and standings.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes", post(create_quiz).get(list_quizzes))
        .route("/quizzes/{id}", get(get_quiz))
        .route("/quizzes/{id}/join", post(join_quiz))
        .route("/quizzes/{id}/leaderboard", get(leaderboard))
        .route("/user/session", get(user_session))
}

/// Create a quiz with its full question list, in draft status.
#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "quiz",
    request_body = CreateQuizRequest,
    responses(
        (status = 200, description = "Quiz created", body = QuizDetail),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<Json<QuizDetail>, AppError> {
    let detail = quiz_service::create_quiz(&state, &admin, payload).await?;
    Ok(Json(detail))
}

/// List quizzes visible to the caller, newest first.
#[utoipa::path(
    get,
    path = "/quizzes",
    tag = "quiz",
    responses((status = 200, description = "Visible quizzes", body = [QuizSummary]))
)]
pub async fn list_quizzes(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<QuizSummary>>, AppError> {
    let quizzes = quiz_service::list_quizzes(&state, &user).await?;
    Ok(Json(quizzes))
}

/// Fetch one quiz with its questions; answers are included for admins only.
#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "quiz",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Quiz detail", body = QuizDetail),
        (status = 404, description = "Quiz not found or not visible")
    )
)]
pub async fn get_quiz(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizDetail>, AppError> {
    let detail = quiz_service::get_quiz(&state, &user, id).await?;
    Ok(Json(detail))
}

/// Join a quiz with its passkey; rejoining returns the existing session.
#[utoipa::path(
    post,
    path = "/quizzes/{id}/join",
    tag = "quiz",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    request_body = JoinQuizRequest,
    responses(
        (status = 200, description = "Participant session", body = SessionSummary),
        (status = 403, description = "Wrong passkey"),
        (status = 409, description = "Quiz is not accepting participants")
    )
)]
pub async fn join_quiz(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinQuizRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = quiz_service::join_quiz(&state, &user, id, &payload.passkey).await?;
    Ok(Json(session))
}

/// Compute the ranked standings of a quiz.
#[utoipa::path(
    get,
    path = "/quizzes/{id}/leaderboard",
    tag = "quiz",
    params(("id" = Uuid, Path, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Ranked standings", body = [LeaderboardEntry]),
        (status = 404, description = "Quiz not found or not visible")
    )
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let board = leaderboard_service::compute(&state, &user, id).await?;
    Ok(Json(board))
}

/// Query parameters selecting the quiz a session belongs to.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub quiz_id: Uuid,
}

/// Fetch the caller's session in the given quiz.
#[utoipa::path(
    get,
    path = "/user/session",
    tag = "quiz",
    params(("quiz_id" = Uuid, Query, description = "Quiz identifier")),
    responses(
        (status = 200, description = "Caller's session", body = SessionSummary),
        (status = 404, description = "Caller has not joined this quiz")
    )
)]
pub async fn user_session(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = quiz_service::get_user_session(&state, &user, query.quiz_id).await?;
    Ok(Json(session))
}
