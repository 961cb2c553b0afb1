use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::Key;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::db::AccountStorage;
use crate::error::ZakiError;
use crate::handlers::{admin, auth, questions};
use crate::identity::{AuthService, LogDelivery, SharedResetDelivery};
use crate::quota::{SharedPolicy, default_policy};

/// Question bodies are short; anything above this is rejected with 413.
pub const BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct ZakiState {
    pub auth: AuthService,
    pub storage: AccountStorage,
    pub policy: SharedPolicy,
    pub cookie_key: Key,
    pub admin_key: Arc<str>,
    pub insecure_cookie: bool,
    pub session_ttl: time::Duration,
    pub reset_delivery: SharedResetDelivery,
}

impl FromRef<ZakiState> for Key {
    fn from_ref(state: &ZakiState) -> Self {
        state.cookie_key.clone()
    }
}

impl ZakiState {
    pub fn new(storage: AccountStorage, cfg: &Config) -> Result<Self, ZakiError> {
        let cookie_key = match cfg.basic.cookie_secret.as_deref() {
            Some(secret) => {
                let bytes = STANDARD
                    .decode(secret.trim())
                    .map_err(|e| ZakiError::Config(format!("cookie_secret is not base64: {e}")))?;
                Key::try_from(bytes.as_slice()).map_err(|_| {
                    ZakiError::Config("cookie_secret must decode to at least 64 bytes".to_string())
                })?
            }
            None => {
                warn!("no cookie_secret configured; sessions will not survive a restart");
                Key::generate()
            }
        };
        let session_ttl = time::Duration::try_from(cfg.auth.session_ttl())
            .unwrap_or(time::Duration::days(7));

        Ok(Self {
            auth: AuthService::new(storage.clone(), &cfg.auth),
            storage,
            policy: default_policy(),
            cookie_key,
            admin_key: Arc::from(cfg.basic.admin_key.as_str()),
            insecure_cookie: cfg.basic.insecure_cookie,
            session_ttl,
            reset_delivery: Arc::new(LogDelivery::new(&cfg.auth.reset_url)?),
        })
    }

    /// Swap the quota policy shared by every handler.
    pub fn with_policy(mut self, policy: SharedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Swap how password-reset tokens are delivered.
    pub fn with_reset_delivery(mut self, delivery: SharedResetDelivery) -> Self {
        self.reset_delivery = delivery;
        self
    }
}

pub fn zaki_router(state: ZakiState) -> Router {
    Router::new()
        .route(
            "/api/user/questions",
            get(questions::get_questions).post(questions::post_question),
        )
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/signin", post(auth::sign_in))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/api/auth/session", get(auth::current_session))
        .route("/api/auth/reset-password", post(auth::request_reset))
        .route("/api/auth/reset-password/confirm", post(auth::confirm_reset))
        .route("/api/admin/users/{id}", get(admin::get_account))
        .route("/api/admin/users/{id}/paid", put(admin::set_paid))
        .route("/api/admin/users/{id}/questions", get(admin::list_questions))
        .route("/healthz", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}
