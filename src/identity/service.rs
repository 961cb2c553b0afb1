use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{TimeDelta, Utc};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::email::Email;
use super::password::{burn_verify, hash_password, validate_password, verify_password};
use super::{AuthEvent, AuthEventBus, AuthSubscription, Session, SessionUser};
use crate::config::AuthConfig;
use crate::db::{AccountStorage, DbAccount, DbSession};
use crate::error::ZakiError;

/// Server-side identity provider backed by [`AccountStorage`].
#[derive(Clone)]
pub struct AuthService {
    storage: AccountStorage,
    events: AuthEventBus,
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    session_ttl: TimeDelta,
    reset_ttl: TimeDelta,
    min_password_len: usize,
}

/// 32 random bytes, base64url.
fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn session_user(account: &DbAccount) -> SessionUser {
    SessionUser {
        id: account.id.clone(),
        email: account.email.clone(),
    }
}

impl AuthService {
    pub fn new(storage: AccountStorage, cfg: &AuthConfig) -> Self {
        let per_minute = NonZeroU32::new(cfg.attempts_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            storage,
            events: AuthEventBus::default(),
            limiter: Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute))),
            session_ttl: TimeDelta::from_std(cfg.session_ttl()).unwrap_or(TimeDelta::days(7)),
            reset_ttl: TimeDelta::from_std(cfg.reset_ttl()).unwrap_or(TimeDelta::minutes(30)),
            min_password_len: cfg.min_password_len,
        }
    }

    pub fn subscribe(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    /// Drop limiter keys whose quota has fully replenished. Returns the keys left.
    pub fn prune_limiter(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    fn throttle(&self, email: &Email) -> Result<(), ZakiError> {
        self.limiter
            .check_key(&email.as_str().to_string())
            .map_err(|_| {
                warn!(email = %email, "auth attempts throttled");
                ZakiError::TooManyAttempts
            })
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SessionUser, ZakiError> {
        let email = Email::parse(email)?;
        validate_password(password, self.min_password_len)?;
        let hash = hash_password(password)?;
        let account = self.storage.create_account(email.as_str(), &hash).await?;
        Ok(session_user(&account))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ZakiError> {
        let email = Email::parse(email).map_err(|_| ZakiError::InvalidCredentials)?;
        self.throttle(&email)?;

        let Some((account, hash)) = self.storage.credentials_by_email(email.as_str()).await?
        else {
            debug!(email = %email, "sign-in for unknown email");
            burn_verify(password);
            return Err(ZakiError::InvalidCredentials);
        };
        verify_password(password, &hash)?;

        let now = Utc::now();
        let row = DbSession {
            token: new_token(),
            user_id: account.id.clone(),
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.storage.insert_session(&row).await?;

        let session = Session {
            token: row.token,
            user: session_user(&account),
            expires_at: row.expires_at,
        };
        info!(user_id = %account.id, "signed in");
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Resolve a session token; unknown or expired tokens give `None`.
    pub async fn get_session(&self, token: &str) -> Result<Option<Session>, ZakiError> {
        let found = self.storage.find_session(token, Utc::now()).await?;
        Ok(found.map(|(row, account)| Session {
            token: row.token,
            user: session_user(&account),
            expires_at: row.expires_at,
        }))
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), ZakiError> {
        if self.storage.delete_session(token).await? {
            debug!("session revoked");
            self.events.publish(AuthEvent::SignedOut, None);
        }
        Ok(())
    }

    /// Issue a one-shot reset token for `email`.
    ///
    /// Returns `Ok(None)` for unknown emails so callers can answer uniformly.
    /// Delivering the token (mail) is the caller's business.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<String>, ZakiError> {
        let email = Email::parse(email)?;
        self.throttle(&email)?;

        let Some((account, _)) = self.storage.credentials_by_email(email.as_str()).await? else {
            debug!(email = %email, "password reset for unknown email");
            return Ok(None);
        };
        let token = new_token();
        self.storage
            .insert_password_reset(&token, &account.id, Utc::now() + self.reset_ttl)
            .await?;
        info!(user_id = %account.id, "password reset issued");
        Ok(Some(token))
    }

    /// Set a new password with a reset token. Every session of the account
    /// is revoked.
    pub async fn complete_password_reset(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ZakiError> {
        validate_password(new_password, self.min_password_len)?;
        let hash = hash_password(new_password)?;
        let user_id = self
            .storage
            .consume_password_reset(token, &hash, Utc::now())
            .await?
            .ok_or(ZakiError::InvalidResetToken)?;
        info!(user_id = %user_id, "password reset completed");
        self.events.publish(AuthEvent::PasswordRecovery, None);
        Ok(())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64, ZakiError> {
        let purged = self.storage.purge_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            debug!(purged, "expired sessions removed");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect;
    use futures::StreamExt;

    async fn service(cfg: AuthConfig) -> AuthService {
        let storage = connect("sqlite::memory:").await.expect("in-memory database");
        AuthService::new(storage, &cfg)
    }

    #[tokio::test]
    async fn sign_in_publishes_and_resolves_the_session() {
        let auth = service(AuthConfig::default()).await;
        let mut changes = auth.subscribe();

        let user = auth.sign_up("Reader@Example.com", "sesame-123").await.expect("sign up");
        assert_eq!(user.email, "reader@example.com");

        let session = auth.sign_in("reader@example.com", "sesame-123").await.expect("sign in");
        let change = changes.next().await.expect("sign-in event");
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(change.session.as_ref().map(|s| &s.user), Some(&user));

        let found = auth.get_session(&session.token).await.expect("lookup");
        assert_eq!(found.map(|s| s.user), Some(user));

        auth.sign_out(&session.token).await.expect("sign out");
        assert_eq!(changes.next().await.expect("sign-out event").event, AuthEvent::SignedOut);
        assert!(auth.get_session(&session.token).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_ignored_then_purged() {
        let auth = service(AuthConfig {
            session_ttl_hours: 0,
            ..AuthConfig::default()
        })
        .await;
        auth.sign_up("late@example.com", "sesame-123").await.expect("sign up");
        let session = auth.sign_in("late@example.com", "sesame-123").await.expect("sign in");

        assert!(auth.get_session(&session.token).await.expect("lookup").is_none());
        assert_eq!(auth.purge_expired_sessions().await.expect("purge"), 1);
        assert_eq!(auth.purge_expired_sessions().await.expect("purge"), 0);
    }

    #[tokio::test]
    async fn pruning_forgets_replenished_emails() {
        let auth = service(AuthConfig {
            attempts_per_minute: u32::MAX,
            ..AuthConfig::default()
        })
        .await;
        for i in 0..20 {
            let email = format!("stranger{i}@example.com");
            assert!(matches!(
                auth.sign_in(&email, "whatever").await,
                Err(ZakiError::InvalidCredentials)
            ));
        }
        assert_eq!(auth.limiter.len(), 20);

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(auth.prune_limiter(), 0);
        assert!(auth.limiter.is_empty());
    }

    #[tokio::test]
    async fn pruning_keeps_emails_still_throttled() {
        let auth = service(AuthConfig {
            attempts_per_minute: 1,
            ..AuthConfig::default()
        })
        .await;
        let _ = auth.sign_in("busy@example.com", "whatever").await;
        assert_eq!(auth.prune_limiter(), 1);
        assert!(matches!(
            auth.sign_in("busy@example.com", "whatever").await,
            Err(ZakiError::TooManyAttempts)
        ));
    }

    #[tokio::test]
    async fn repeated_attempts_are_throttled_per_email() {
        let auth = service(AuthConfig {
            attempts_per_minute: 2,
            ..AuthConfig::default()
        })
        .await;
        auth.sign_up("guess@example.com", "sesame-123").await.expect("sign up");

        for _ in 0..2 {
            assert!(matches!(
                auth.sign_in("guess@example.com", "wrong-one").await,
                Err(ZakiError::InvalidCredentials)
            ));
        }
        assert!(matches!(
            auth.sign_in("guess@example.com", "sesame-123").await,
            Err(ZakiError::TooManyAttempts)
        ));
        // other accounts are unaffected
        assert!(matches!(
            auth.sign_in("other@example.com", "whatever").await,
            Err(ZakiError::InvalidCredentials)
        ));
    }
}
