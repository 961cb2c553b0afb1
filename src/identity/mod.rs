//! Identity: sessions, credentials and auth-change notifications.
//!
//! - `service.rs`: [`AuthService`], the server-side provider backed by the account store
//! - `email.rs` / `password.rs`: credential validation and Argon2 hashing
//! - `reset.rs`: [`ResetDelivery`], how reset tokens reach their owner
//!
//! Clients consume identity through the [`IdentityProvider`] capability.

pub mod email;
pub mod password;
pub mod reset;
pub mod service;

pub use email::Email;
pub use reset::{LogDelivery, ResetDelivery, SharedResetDelivery};
pub use service::AuthService;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use crate::error::ZakiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}

/// An authenticated session. `token` is the opaque bearer carried in the
/// session cookie and is never serialized into response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    /// Session state read when a client context attaches.
    InitialSession,
    SignedIn,
    SignedOut,
    PasswordRecovery,
}

/// One `(event, session)` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}

/// Fan-out of auth changes to any number of subscribers.
#[derive(Debug, Clone)]
pub struct AuthEventBus {
    tx: broadcast::Sender<AuthChange>,
}

impl AuthEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers that received the change.
    pub fn publish(&self, event: AuthEvent, session: Option<Session>) -> usize {
        self.tx.send(AuthChange { event, session }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            inner: BroadcastStream::new(self.tx.subscribe()),
        }
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Stream of auth changes. Dropping it unsubscribes.
///
/// A subscriber that falls behind skips the missed changes rather than
/// ending the stream.
pub struct AuthSubscription {
    inner: BroadcastStream<AuthChange>,
}

impl Stream for AuthSubscription {
    type Item = AuthChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
                Some(Ok(change)) => return Poll::Ready(Some(change)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "auth subscriber lagged; dropping missed changes");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}

/// The identity capability as seen by a client session.
pub trait IdentityProvider: Send + Sync {
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, ZakiError>> + Send;

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ZakiError>> + Send;

    /// Creates the account. No session is issued; the user signs in afterwards.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SessionUser, ZakiError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), ZakiError>> + Send;

    fn reset_password(&self, email: &str) -> impl Future<Output = Result<(), ZakiError>> + Send;

    fn subscribe(&self) -> AuthSubscription;
}
