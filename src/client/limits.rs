use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::notice::{self, Notice};
use super::storage::{AnonymousCounter, LocalStore};
use crate::error::ZakiError;
use crate::identity::SessionUser;
use crate::quota::{QuotaStatus, Remaining, SharedPolicy};

/// Answer of the account store to one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReply {
    Accepted(QuotaStatus),
    LimitReached(QuotaStatus),
}

/// Account access for the signed-in user.
pub trait AccountBackend: Send + Sync {
    fn load_quota(&self) -> impl Future<Output = Result<QuotaStatus, ZakiError>> + Send;

    /// Store the question and bump the counter as one operation.
    fn submit_question(
        &self,
        question: &str,
    ) -> impl Future<Output = Result<SubmitReply, ZakiError>> + Send;
}

/// Quota state of whoever is asking: the signed-in account, or the anonymous
/// counter when nobody is signed in.
pub struct QuestionLimits<B, S> {
    policy: SharedPolicy,
    backend: Arc<B>,
    anonymous: AnonymousCounter<S>,
    status: QuotaStatus,
    owner: Option<String>,
    loaded: bool,
}

impl<B, S> QuestionLimits<B, S>
where
    B: AccountBackend,
    S: LocalStore,
{
    pub fn new(policy: SharedPolicy, backend: Arc<B>, store: S) -> Self {
        Self {
            policy,
            backend,
            anonymous: AnonymousCounter::new(store),
            status: QuotaStatus::default(),
            owner: None,
            loaded: false,
        }
    }

    /// Load counters for `user` (or the anonymous visitor).
    ///
    /// A failed account load leaves the status at zero and unpaid and returns a
    /// notice for the user; the server still enforces the limit.
    pub async fn load(&mut self, user: Option<&SessionUser>) -> Option<Notice> {
        self.owner = user.map(|u| u.id.clone());
        self.loaded = true;

        let Some(user) = user else {
            self.status = QuotaStatus::free(self.anonymous.get());
            return None;
        };

        match self.backend.load_quota().await {
            Ok(status) => {
                debug!(user_id = %user.id, count = status.questions_count, "quota loaded");
                self.status = status;
                None
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "failed to load quota");
                self.status = QuotaStatus::default();
                Some(Notice::error(notice::LOAD_FAILED))
            }
        }
    }

    /// Whether the loaded counters belong to `user`.
    pub fn is_loaded_for(&self, user: Option<&SessionUser>) -> bool {
        self.loaded && self.owner.as_deref() == user.map(|u| u.id.as_str())
    }

    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    pub fn status(&self) -> QuotaStatus {
        self.status
    }

    pub fn can_ask_more(&self) -> bool {
        self.policy.can_submit(self.status)
    }

    pub fn remaining(&self) -> Remaining {
        self.policy.remaining(self.status)
    }

    pub fn anonymous(&self) -> &AnonymousCounter<S> {
        &self.anonymous
    }

    /// Count one accepted question for the anonymous visitor.
    pub fn record_anonymous(&mut self) -> Result<u32, ZakiError> {
        let count = self.anonymous.increment()?;
        self.status = QuotaStatus::free(count);
        Ok(count)
    }

    /// Send one question for the signed-in user; counters follow the reply.
    pub async fn submit(&mut self, question: &str) -> Result<SubmitReply, ZakiError> {
        let reply = self.backend.submit_question(question).await?;
        match reply {
            SubmitReply::Accepted(status) | SubmitReply::LimitReached(status) => {
                self.status = status;
            }
        }
        Ok(reply)
    }
}
