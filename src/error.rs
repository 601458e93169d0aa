use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Why a request was rejected as malformed. Each variant has a stable reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationReason {
    #[error("file is required and cannot be empty")]
    EmptyFile,
    #[error("file type is not allowed; allowed types: image/jpeg, image/jpg, image/png, image/gif, image/webp")]
    UnsupportedType,
    #[error("file size exceeds the maximum allowed size")]
    TooLarge,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password is required")]
    EmptyPassword,
    #[error("name is too long")]
    NameTooLong,
    #[error("multipart field `file` is required")]
    MissingFile,
}

impl ValidationReason {
    pub fn code(self) -> &'static str {
        match self {
            ValidationReason::EmptyFile => "empty_file",
            ValidationReason::UnsupportedType => "unsupported_type",
            ValidationReason::TooLarge => "too_large",
            ValidationReason::InvalidEmail => "invalid_email",
            ValidationReason::EmptyPassword => "empty_password",
            ValidationReason::NameTooLong => "name_too_long",
            ValidationReason::MissingFile => "missing_file",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(ValidationReason),
    #[error("email already registered")]
    Conflict,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("you do not have permission to access this resource")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationReason> for AppError {
    fn from(reason: ValidationReason) -> Self {
        AppError::Validation(reason)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(reason) => json!({ "error": reason.to_string(), "code": reason.code() }),
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                json!({ "error": "internal server error" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
