use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::answer::{SubmitAnswerRequest, SubmitAnswerResponse},
    error::AppError,
    services::{answer_service, auth_service::CurrentUser},
    state::SharedState,
};

/// Routes handling answer submission.
pub fn router() -> Router<SharedState> {
    Router::new().route("/answers", post(submit_answer))
}

/// Record the caller's answer (or skip) for a revealed question.
#[utoipa::path(
    post,
    path = "/answers",
    tag = "answer",
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 409, description = "Question already answered in this session"),
        (status = 410, description = "Answering window has closed")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    let response = answer_service::submit(&state, &user, payload).await?;
    Ok(Json(response))
}
