use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Errors surfaced by the signup, verification and referral services.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} required")]
    MissingInput(&'static str),

    #[error("Invalid email")]
    InvalidEmail,

    #[error("Email already registered")]
    AlreadyRegistered,

    #[error("Invalid referral code")]
    InvalidReferralCode,

    #[error("Invalid or expired sign-in link")]
    InvalidSignInLink,

    #[error("Not found")]
    NotFound,

    #[error("could not generate a unique referral code after {0} attempts")]
    CodeGenerationExhausted(usize),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingInput(_)
            | AppError::InvalidEmail
            | AppError::InvalidReferralCode
            | AppError::InvalidSignInLink => StatusCode::BAD_REQUEST,
            AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::CodeGenerationExhausted(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_client_statuses() {
        assert_eq!(AppError::MissingInput("Email").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidReferralCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::AlreadyRegistered.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        let err = AppError::Store(StoreError::Missing {
            collection: "users".into(),
            key: "secret@x.com".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::CodeGenerationExhausted(10).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn missing_input_message_names_the_field() {
        assert_eq!(AppError::MissingInput("Email").to_string(), "Email required");
    }
}
