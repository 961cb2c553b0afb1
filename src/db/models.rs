use crate::quota::QuotaStatus;
use crate::types::api::{AccountResponse, QuotaSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `accounts` without the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbAccount {
    pub id: String,
    pub email: String,
    pub questions_count: u32,
    pub is_paid_user: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbAccount {
    pub fn quota(&self) -> QuotaStatus {
        QuotaStatus {
            questions_count: self.questions_count,
            is_paid_user: self.is_paid_user,
        }
    }
}

impl From<DbAccount> for AccountResponse {
    fn from(a: DbAccount) -> Self {
        let quota = QuotaSnapshot::from(a.quota());
        AccountResponse {
            id: a.id,
            email: a.email,
            quota,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DbQuestion {
    pub id: String,
    pub user_id: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbSession {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Result of the conditional increment.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Question stored and counter bumped; carries the updated status.
    Accepted {
        question: DbQuestion,
        status: QuotaStatus,
    },
    /// Nothing written; carries the status that blocked the submission.
    LimitReached(QuotaStatus),
}
