//! JSON bodies exchanged over `/api/*`. Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Session, SessionUser};
use crate::quota::QuotaStatus;

/// `{questionsCount, isPaidUser}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    pub questions_count: u32,
    pub is_paid_user: bool,
}

impl From<QuotaStatus> for QuotaSnapshot {
    fn from(s: QuotaStatus) -> Self {
        Self {
            questions_count: s.questions_count,
            is_paid_user: s.is_paid_user,
        }
    }
}

impl From<QuotaSnapshot> for QuotaStatus {
    fn from(s: QuotaSnapshot) -> Self {
        QuotaStatus {
            questions_count: s.questions_count,
            is_paid_user: s.is_paid_user,
        }
    }
}

/// Body of `POST /api/user/questions`. `question` is optional here so that a
/// missing field is reported as 400 rather than a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitQuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub quota: QuotaSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmResetRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user: SessionUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(s: &Session) -> Self {
        Self {
            user: s.user.clone(),
            expires_at: s.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidStatusRequest {
    pub is_paid_user: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    #[serde(flatten)]
    pub quota: QuotaSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
