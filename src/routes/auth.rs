use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::auth::{AuthResponse, OtpIssuedResponse, SendOtpRequest, UserProfile, VerifyOtpRequest},
    error::AppError,
    services::{auth_service, auth_service::CurrentUser},
    state::SharedState,
};

/// Routes handling email one-time-code authentication.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/auth/send-otp", post(send_otp))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/me", get(me))
}

/// Issue a one-time login code to the given email address.
#[utoipa::path(
    post,
    path = "/auth/send-otp",
    tag = "auth",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued", body = OtpIssuedResponse),
        (status = 403, description = "Email domain not allowed")
    )
)]
pub async fn send_otp(
    State(state): State<SharedState>,
    Json(payload): Json<SendOtpRequest>,
) -> Result<Json<OtpIssuedResponse>, AppError> {
    let response = auth_service::send_otp(&state, payload).await?;
    Ok(Json(response))
}

/// Exchange a one-time code for a bearer token.
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid or expired code")
    )
)]
pub async fn verify_otp(
    State(state): State<SharedState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = auth_service::verify_otp(&state, payload).await?;
    Ok(Json(response))
}

/// Return the profile of the authenticated caller.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Caller profile", body = UserProfile),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(user))
}
