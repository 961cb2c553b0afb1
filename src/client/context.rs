use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ZakiError;
use crate::identity::{AuthEvent, IdentityProvider, SessionUser};

/// The signed-in user of one client, kept current from the provider's
/// auth changes.
///
/// Components receive the context explicitly. The background listener lives
/// exactly as long as the context: dropping it stops the listener.
pub struct AuthContext<P> {
    provider: Arc<P>,
    user: watch::Receiver<(AuthEvent, Option<SessionUser>)>,
    watcher: JoinHandle<()>,
}

impl<P> AuthContext<P>
where
    P: IdentityProvider + 'static,
{
    pub async fn attach(provider: Arc<P>) -> Result<Self, ZakiError> {
        // subscribe before reading the session so no change falls in between
        let mut changes = provider.subscribe();
        let initial = provider.get_session().await?.map(|s| s.user);
        let (tx, rx) = watch::channel((AuthEvent::InitialSession, initial));

        let watcher = tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                debug!(event = ?change.event, "auth change");
                let user = change.session.map(|s| s.user);
                if tx.send((change.event, user)).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            provider,
            user: rx,
            watcher,
        })
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.user.borrow().1.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().1.is_some()
    }

    /// The change behind the current user: [`AuthEvent::InitialSession`]
    /// until the provider reports one.
    pub fn last_event(&self) -> AuthEvent {
        self.user.borrow().0
    }

    /// Wait for the next user change. `false` once the listener has stopped.
    pub async fn changed(&mut self) -> bool {
        self.user.changed().await.is_ok()
    }

    pub fn is_listening(&self) -> bool {
        !self.watcher.is_finished()
    }
}

impl<P> Drop for AuthContext<P> {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
