//! Payloads for the OTP login exchange.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dao::models::UserEntity, dto::format_system_time};

/// Request a one-time login code for an email address.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SendOtpRequest {
    /// Address the code is issued for.
    #[validate(email)]
    pub email: String,
}

/// Acknowledgement that a code has been issued.
#[derive(Debug, Serialize, ToSchema)]
pub struct OtpIssuedResponse {
    pub message: String,
    /// Seconds until the code expires.
    pub expires_in_secs: u64,
}

/// Exchange a one-time code for a bearer token.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VerifyOtpRequest {
    #[validate(email)]
    pub email: String,
    /// The six-digit code received out of band.
    #[validate(length(equal = 6))]
    pub code: String,
}

/// Public projection of a user account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<UserEntity> for UserProfile {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_admin: user.is_admin,
            created_at: format_system_time(user.created_at),
        }
    }
}

/// Successful login: opaque bearer token plus the profile it belongs to.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}
