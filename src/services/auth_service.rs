//! Email one-time-code authentication and the request extractors built on it.
//!
//! Codes are logged instead of mailed; wiring a real mail provider is a
//! deployment concern, not handled here.

use std::time::SystemTime;

use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{OtpEntity, UserEntity},
    dto::auth::{AuthResponse, OtpIssuedResponse, SendOtpRequest, VerifyOtpRequest},
    error::{AppError, ServiceError},
    state::SharedState,
};

/// Issue a one-time login code for an email address.
pub async fn send_otp(
    state: &SharedState,
    payload: SendOtpRequest,
) -> Result<OtpIssuedResponse, ServiceError> {
    use validator::Validate;
    payload.validate()?;

    let email = payload.email.trim().to_ascii_lowercase();
    if !state.config().email_allowed(&email) {
        return Err(ServiceError::Forbidden(
            "this email domain is not allowed".into(),
        ));
    }

    let store = state.require_store().await?;
    let ttl = state.config().otp_ttl();
    let now = SystemTime::now();
    let code = format!("{:06}", rand::rng().random_range(100_000..1_000_000));

    store
        .insert_otp(OtpEntity {
            id: Uuid::new_v4(),
            email: email.clone(),
            code: code.clone(),
            expires_at: now + ttl,
            is_used: false,
            created_at: now,
        })
        .await?;

    // Stand-in for mail delivery.
    info!(email = %email, code = %code, "issued one-time login code");

    Ok(OtpIssuedResponse {
        message: "verification code sent".into(),
        expires_in_secs: ttl.as_secs(),
    })
}

/// Verify a one-time code, creating the user account on first login.
pub async fn verify_otp(
    state: &SharedState,
    payload: VerifyOtpRequest,
) -> Result<AuthResponse, ServiceError> {
    use validator::Validate;
    payload.validate()?;

    let email = payload.email.trim().to_ascii_lowercase();
    let store = state.require_store().await?;

    let consumed = store
        .consume_otp(email.clone(), payload.code, SystemTime::now())
        .await?;
    if consumed.is_none() {
        return Err(ServiceError::Unauthorized(
            "invalid or expired verification code".into(),
        ));
    }

    let user = match store.find_user_by_email(email.clone()).await? {
        Some(user) => user,
        None => {
            let user = UserEntity {
                id: Uuid::new_v4(),
                email: email.clone(),
                is_admin: state.config().is_admin_email(&email),
                created_at: SystemTime::now(),
            };
            store.insert_user(user.clone()).await?;
            info!(email = %email, is_admin = user.is_admin, "created user on first login");
            user
        }
    };

    let token = state.issue_token(user.id);
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

/// Resolve the bearer token of a request to its user.
pub async fn authenticate(
    state: &SharedState,
    headers: &HeaderMap,
) -> Result<UserEntity, ServiceError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;
    authenticate_token(state, token).await
}

/// Resolve an already-extracted token (also used by the WebSocket handshake,
/// which carries the token in a query parameter).
pub async fn authenticate_token(
    state: &SharedState,
    token: &str,
) -> Result<UserEntity, ServiceError> {
    let user_id = state
        .resolve_token(token)
        .ok_or_else(|| ServiceError::Unauthorized("invalid or expired token".into()))?;

    let store = state.require_store().await?;
    store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("user no longer exists".into()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for any authenticated user.
pub struct CurrentUser(pub UserEntity);

impl FromRequestParts<SharedState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(state, &parts.headers).await?;
        Ok(CurrentUser(user))
    }
}

/// Extractor that additionally requires the admin flag.
pub struct AdminUser(pub UserEntity);

impl FromRequestParts<SharedState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(state, &parts.headers).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::quiz_store::MemoryStore,
        state::AppState,
    };

    async fn test_state() -> SharedState {
        AppState::with_store(AppConfig::default(), Arc::new(MemoryStore::new())).await
    }

    /// Plant a known code, standing in for reading the delivered mail.
    async fn issued_code(state: &SharedState, email: &str) -> String {
        let store = state.require_store().await.unwrap();
        store
            .insert_otp(OtpEntity {
                id: Uuid::new_v4(),
                email: email.into(),
                code: "424242".into(),
                expires_at: SystemTime::now() + state.config().otp_ttl(),
                is_used: false,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
        "424242".into()
    }

    #[tokio::test]
    async fn verify_creates_user_and_issues_working_token() {
        let state = test_state().await;
        let code = issued_code(&state, "player@example.com").await;

        let auth = verify_otp(
            &state,
            VerifyOtpRequest {
                email: "player@example.com".into(),
                code,
            },
        )
        .await
        .unwrap();

        assert_eq!(auth.user.email, "player@example.com");
        assert!(!auth.user.is_admin);

        let user = authenticate_token(&state, &auth.token).await.unwrap();
        assert_eq!(user.id, auth.user.id);
    }

    #[tokio::test]
    async fn wrong_code_is_unauthorized() {
        let state = test_state().await;
        let _ = issued_code(&state, "player@example.com").await;

        let err = verify_otp(
            &state,
            VerifyOtpRequest {
                email: "player@example.com".into(),
                code: "999999".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn code_cannot_be_replayed() {
        let state = test_state().await;
        let code = issued_code(&state, "player@example.com").await;

        verify_otp(
            &state,
            VerifyOtpRequest {
                email: "player@example.com".into(),
                code: code.clone(),
            },
        )
        .await
        .unwrap();

        let err = verify_otp(
            &state,
            VerifyOtpRequest {
                email: "player@example.com".into(),
                code,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn emails_are_normalized_to_lowercase() {
        let state = test_state().await;
        let code = issued_code(&state, "player@example.com").await;

        let auth = verify_otp(
            &state,
            VerifyOtpRequest {
                email: "Player@Example.COM".into(),
                code,
            },
        )
        .await
        .unwrap();
        assert_eq!(auth.user.email, "player@example.com");
    }

    #[tokio::test]
    async fn configured_admin_email_creates_an_admin_account() {
        let config = AppConfig::for_tests(vec!["host@example.com".into()], None);
        let state = AppState::with_store(config, Arc::new(MemoryStore::new())).await;
        let code = issued_code(&state, "host@example.com").await;

        let auth = verify_otp(
            &state,
            VerifyOtpRequest {
                email: "host@example.com".into(),
                code,
            },
        )
        .await
        .unwrap();
        assert!(auth.user.is_admin);
    }

    #[tokio::test]
    async fn domain_restriction_blocks_other_domains() {
        let config = AppConfig::for_tests(Vec::new(), Some("corp.example".into()));
        let state = AppState::with_store(config, Arc::new(MemoryStore::new())).await;

        let err = send_otp(
            &state,
            SendOtpRequest {
                email: "player@elsewhere.example".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        assert!(
            send_otp(
                &state,
                SendOtpRequest {
                    email: "player@corp.example".into(),
                },
            )
            .await
            .is_ok()
        );
    }

    #[tokio::test]
    async fn invalid_email_shape_is_rejected() {
        let state = test_state().await;
        let err = send_otp(
            &state,
            SendOtpRequest {
                email: "not-an-email".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
