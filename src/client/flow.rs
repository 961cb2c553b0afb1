use tracing::{debug, error, trace};

use super::dialog::{AuthDialog, AuthMode};
use super::limits::{AccountBackend, QuestionLimits, SubmitReply};
use super::notice::{self, Notice};
use super::storage::LocalStore;
use crate::identity::SessionUser;
use crate::quota::Remaining;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptReason {
    Unauthenticated,
    LimitReached,
}

#[derive(Debug, Clone)]
pub enum SubmissionState {
    Idle,
    Validating,
    Persisting,
    AuthPrompt {
        reason: PromptReason,
        dialog: AuthDialog,
    },
}

impl SubmissionState {
    fn name(&self) -> &'static str {
        match self {
            SubmissionState::Idle => "idle",
            SubmissionState::Validating => "validating",
            SubmissionState::Persisting => "persisting",
            SubmissionState::AuthPrompt { .. } => "auth_prompt",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Blank draft; nothing happened.
    Ignored,
    Accepted { remaining: Remaining },
    Prompted(PromptReason),
    Failed(Notice),
}

/// One question box: draft text, quota state and the submit state machine.
///
/// ```text
/// Idle -> Validating -> Persisting -> Idle (draft cleared)
///                    \-> AuthPrompt (limit reached / session gone)
/// ```
pub struct SubmissionFlow<B, S> {
    limits: QuestionLimits<B, S>,
    draft: String,
    state: SubmissionState,
}

impl<B, S> SubmissionFlow<B, S>
where
    B: AccountBackend,
    S: LocalStore,
{
    pub fn new(limits: QuestionLimits<B, S>) -> Self {
        Self {
            limits,
            draft: String::new(),
            state: SubmissionState::Idle,
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn limits(&self) -> &QuestionLimits<B, S> {
        &self.limits
    }

    /// The open prompt, if any, for driving sign-in.
    pub fn dialog_mut(&mut self) -> Option<&mut AuthDialog> {
        match &mut self.state {
            SubmissionState::AuthPrompt { dialog, .. } => Some(dialog),
            _ => None,
        }
    }

    /// Close the prompt. The question is not resubmitted.
    pub fn dismiss_prompt(&mut self) {
        if matches!(self.state, SubmissionState::AuthPrompt { .. }) {
            self.transition(SubmissionState::Idle);
        }
    }

    /// Reload counters for `user` if they belong to someone else.
    pub async fn sync_user(&mut self, user: Option<&SessionUser>) -> Option<Notice> {
        if self.limits.is_loaded_for(user) {
            return None;
        }
        self.limits.load(user).await
    }

    /// Submit the current draft on behalf of `user` (`None` = anonymous).
    pub async fn submit(&mut self, user: Option<&SessionUser>) -> FlowOutcome {
        if matches!(self.state, SubmissionState::Validating | SubmissionState::Persisting) {
            debug!(state = self.state.name(), "submit ignored while busy");
            return FlowOutcome::Ignored;
        }
        let question = self.draft.trim().to_string();
        if question.is_empty() {
            self.transition(SubmissionState::Idle);
            return FlowOutcome::Ignored;
        }

        if let Some(n) = self.sync_user(user).await {
            debug!(message = %n.message, "quota load failed before submit");
        }

        self.transition(SubmissionState::Validating);
        if !self.limits.can_ask_more() {
            return self.prompt(PromptReason::LimitReached, user.is_some());
        }

        let Some(user) = user else {
            return match self.limits.record_anonymous() {
                Ok(count) => {
                    debug!(count, "anonymous question accepted");
                    self.accept()
                }
                Err(e) => {
                    error!(error = %e, "failed to update anonymous question count");
                    self.transition(SubmissionState::Idle);
                    FlowOutcome::Failed(Notice::error(notice::COUNT_UPDATE_FAILED))
                }
            };
        };

        self.transition(SubmissionState::Persisting);
        match self.limits.submit(&question).await {
            Ok(SubmitReply::Accepted(status)) => {
                debug!(user_id = %user.id, count = status.questions_count, "question accepted");
                self.accept()
            }
            Ok(SubmitReply::LimitReached(status)) => {
                debug!(user_id = %user.id, count = status.questions_count, "server refused question");
                self.prompt(PromptReason::LimitReached, true)
            }
            Err(e) if e.is_auth_failure() => {
                debug!(user_id = %user.id, error = %e, "session rejected while submitting");
                self.prompt(PromptReason::Unauthenticated, true)
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "failed to submit question");
                self.transition(SubmissionState::Idle);
                FlowOutcome::Failed(Notice::error(notice::SUBMIT_FAILED))
            }
        }
    }

    fn accept(&mut self) -> FlowOutcome {
        self.draft.clear();
        self.transition(SubmissionState::Idle);
        FlowOutcome::Accepted {
            remaining: self.limits.remaining(),
        }
    }

    fn prompt(&mut self, reason: PromptReason, has_account: bool) -> FlowOutcome {
        let mode = if has_account {
            AuthMode::SignIn
        } else {
            AuthMode::SignUp
        };
        self.transition(SubmissionState::AuthPrompt {
            reason,
            dialog: AuthDialog::new(mode),
        });
        FlowOutcome::Prompted(reason)
    }

    fn transition(&mut self, next: SubmissionState) {
        trace!(from = self.state.name(), to = next.name(), "submission state");
        self.state = next;
    }
}
