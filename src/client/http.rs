use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::limits::{AccountBackend, SubmitReply};
use crate::error::{ApiErrorResponse, ZakiError};
use crate::identity::{AuthEvent, AuthEventBus, AuthSubscription, IdentityProvider, Session, SessionUser};
use crate::quota::QuotaStatus;
use crate::types::api::{
    CredentialsRequest, EmailRequest, QuotaSnapshot, SessionResponse, SignUpResponse,
    SubmitQuestionRequest, SubmitQuestionResponse,
};

/// HTTP client for the `/api/*` surface. The session cookie lives in the
/// client's cookie store, so sessions handed out here carry an empty token.
#[derive(Clone)]
pub struct ZakiClient {
    http: reqwest::Client,
    base: Url,
    events: AuthEventBus,
}

impl ZakiClient {
    pub fn new(base: Url) -> Result<Self, ZakiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("zaki-client/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base,
            events: AuthEventBus::default(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ZakiError> {
        Ok(self.base.join(path)?)
    }

    fn to_session(body: SessionResponse) -> Session {
        Session {
            token: String::new(),
            user: body.user,
            expires_at: body.expires_at,
        }
    }

    async fn json_or_error<T: DeserializeOwned>(resp: Response) -> Result<T, ZakiError> {
        if resp.status().is_success() {
            return Ok(resp.json::<T>().await?);
        }
        Err(Self::error_from(resp).await)
    }

    async fn expect_status(resp: Response, expected: StatusCode) -> Result<(), ZakiError> {
        if resp.status() == expected {
            return Ok(());
        }
        Err(Self::error_from(resp).await)
    }

    /// Map an error response back onto the server's error kinds.
    async fn error_from(resp: Response) -> ZakiError {
        let status = resp.status();
        let body = match resp.json::<ApiErrorResponse>().await {
            Ok(body) => body,
            Err(_) => return ZakiError::UnexpectedStatus(status),
        };
        match body.error.code.as_str() {
            "UNAUTHORIZED" => ZakiError::Unauthorized,
            "INVALID_CREDENTIALS" => ZakiError::InvalidCredentials,
            "EMAIL_TAKEN" => ZakiError::EmailTaken,
            "RATE_LIMIT" => ZakiError::TooManyAttempts,
            "INVALID_RESET_TOKEN" => ZakiError::InvalidResetToken,
            "PAYLOAD_TOO_LARGE" => ZakiError::PayloadTooLarge,
            "QUESTION_LIMIT_REACHED" => match body.quota {
                Some(quota) => ZakiError::QuestionLimitReached(quota.into()),
                None => ZakiError::UnexpectedStatus(status),
            },
            _ => ZakiError::Rejected {
                status,
                code: body.error.code,
                message: body.error.message,
            },
        }
    }
}

impl IdentityProvider for ZakiClient {
    async fn get_session(&self) -> Result<Option<Session>, ZakiError> {
        let resp = self.http.get(self.url("/api/auth/session")?).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let body: SessionResponse = Self::json_or_error(resp).await?;
        Ok(Some(Self::to_session(body)))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ZakiError> {
        let resp = self
            .http
            .post(self.url("/api/auth/signin")?)
            .json(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let session = Self::to_session(Self::json_or_error(resp).await?);
        info!(user_id = %session.user.id, "signed in");
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, ZakiError> {
        let resp = self
            .http
            .post(self.url("/api/auth/signup")?)
            .json(&CredentialsRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: SignUpResponse = Self::json_or_error(resp).await?;
        Ok(body.user)
    }

    async fn sign_out(&self) -> Result<(), ZakiError> {
        let resp = self.http.post(self.url("/api/auth/signout")?).send().await?;
        Self::expect_status(resp, StatusCode::NO_CONTENT).await?;
        self.events.publish(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), ZakiError> {
        let resp = self
            .http
            .post(self.url("/api/auth/reset-password")?)
            .json(&EmailRequest {
                email: email.to_string(),
            })
            .send()
            .await?;
        Self::expect_status(resp, StatusCode::ACCEPTED).await
    }

    fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }
}

impl AccountBackend for ZakiClient {
    async fn load_quota(&self) -> Result<QuotaStatus, ZakiError> {
        let resp = self.http.get(self.url("/api/user/questions")?).send().await?;
        let body: QuotaSnapshot = Self::json_or_error(resp).await?;
        Ok(body.into())
    }

    async fn submit_question(&self, question: &str) -> Result<SubmitReply, ZakiError> {
        let resp = self
            .http
            .post(self.url("/api/user/questions")?)
            .json(&SubmitQuestionRequest {
                question: Some(question.to_string()),
            })
            .send()
            .await?;
        match Self::json_or_error::<SubmitQuestionResponse>(resp).await {
            Ok(body) => Ok(SubmitReply::Accepted(body.quota.into())),
            Err(ZakiError::QuestionLimitReached(status)) => {
                debug!(count = status.questions_count, "question limit reached");
                Ok(SubmitReply::LimitReached(status))
            }
            Err(e) => Err(e),
        }
    }
}
