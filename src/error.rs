use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

use crate::quota::QuotaStatus;
use crate::types::api::QuotaSnapshot;

#[derive(Debug, ThisError)]
pub enum ZakiError {
    #[error("Unauthorized: no valid session")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Email already registered")]
    EmailTaken,

    #[error("Too many attempts, try again later")]
    TooManyAttempts,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Question is required")]
    MissingQuestion,

    #[error("Question limit reached ({} asked)", .0.questions_count)]
    QuestionLimitReached(QuotaStatus),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// The session resolved but its account could not be read.
    #[error("Failed to fetch user data for {0}")]
    UserDataUnavailable(String),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Password hashing failed")]
    PasswordHash,

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Unexpected response status: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Request rejected ({status}): {code}: {message}")]
    Rejected {
        status: StatusCode,
        code: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    #[error("email domain cannot be empty")]
    EmptyDomain,
}

impl ZakiError {
    /// Localized message suitable for showing to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            ZakiError::Unauthorized => "يرجى تسجيل الدخول للمتابعة",
            ZakiError::InvalidCredentials => "البريد الإلكتروني أو كلمة المرور غير صحيحة",
            ZakiError::InvalidEmail(_) => "البريد الإلكتروني غير صالح",
            ZakiError::WeakPassword { .. } => "كلمة المرور قصيرة جداً",
            ZakiError::EmailTaken => "البريد الإلكتروني مستخدم بالفعل",
            ZakiError::TooManyAttempts => "محاولات كثيرة، يرجى المحاولة لاحقاً",
            ZakiError::InvalidResetToken => "رابط إعادة تعيين كلمة المرور غير صالح أو منتهي الصلاحية",
            ZakiError::MissingQuestion => "يرجى كتابة سؤال",
            ZakiError::QuestionLimitReached(_) => {
                "لقد استنفدت الأسئلة المجانية، يرجى تسجيل الدخول أو الترقية"
            }
            ZakiError::Rejected { code, .. } => match code.as_str() {
                "WEAK_PASSWORD" => "كلمة المرور قصيرة جداً",
                "INVALID_EMAIL" => "البريد الإلكتروني غير صالح",
                _ => "حدث خطأ غير متوقع، يرجى المحاولة مرة أخرى",
            },
            ZakiError::AccountNotFound(_)
            | ZakiError::UserDataUnavailable(_)
            | ZakiError::Io(_)
            | ZakiError::DatabaseError(_)
            | ZakiError::PasswordHash
            | ZakiError::Reqwest(_)
            | ZakiError::UrlParse(_)
            | ZakiError::UnexpectedStatus(_)
            | ZakiError::JsonError(_)
            | ZakiError::Config(_)
            | ZakiError::PayloadTooLarge
            | ZakiError::BadRequest(_) => "حدث خطأ غير متوقع، يرجى المحاولة مرة أخرى",
        }
    }

    /// Whether the failure came from rejected or missing credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ZakiError::Unauthorized
                | ZakiError::InvalidCredentials
                | ZakiError::InvalidEmail(_)
                | ZakiError::WeakPassword { .. }
                | ZakiError::EmailTaken
                | ZakiError::TooManyAttempts
                | ZakiError::InvalidResetToken
        )
    }
}

impl IntoResponse for ZakiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, quota) = match &self {
            ZakiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized", None),
            ZakiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password",
                None,
            ),
            ZakiError::InvalidEmail(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_EMAIL", "Invalid email address", None)
            }
            ZakiError::WeakPassword { .. } => {
                (StatusCode::BAD_REQUEST, "WEAK_PASSWORD", "Password is too short", None)
            }
            ZakiError::EmailTaken => (StatusCode::CONFLICT, "EMAIL_TAKEN", "Email already registered", None),
            ZakiError::TooManyAttempts => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT",
                "Too many attempts, try again later",
                None,
            ),
            ZakiError::InvalidResetToken => (
                StatusCode::BAD_REQUEST,
                "INVALID_RESET_TOKEN",
                "Invalid or expired reset token",
                None,
            ),
            ZakiError::MissingQuestion => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", "Question is required", None)
            }
            ZakiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", "Invalid request body", None)
            }
            ZakiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body too large",
                None,
            ),
            ZakiError::QuestionLimitReached(status) => (
                StatusCode::FORBIDDEN,
                "QUESTION_LIMIT_REACHED",
                "Question limit reached",
                Some(*status),
            ),
            ZakiError::AccountNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Account not found", None)
            }
            ZakiError::UserDataUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Failed to fetch user data",
                None,
            ),
            ZakiError::DatabaseError(_)
            | ZakiError::PasswordHash
            | ZakiError::Io(_)
            | ZakiError::Config(_)
            | ZakiError::JsonError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.",
                None,
            ),
            ZakiError::Reqwest(_)
            | ZakiError::UrlParse(_)
            | ZakiError::UnexpectedStatus(_)
            | ZakiError::Rejected { .. } => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.",
                None,
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
            quota: quota.map(QuotaSnapshot::from),
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
    #[serde(flatten)]
    pub quota: Option<QuotaSnapshot>,
}
