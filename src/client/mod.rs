//! Client boundary: what a browser tab (or any front end) runs locally.
//!
//! - `storage.rs`: key/value local storage and the anonymous question counter
//! - `context.rs`: [`AuthContext`], the current user kept in sync with auth changes
//! - `limits.rs`: [`QuestionLimits`], quota state for whoever is asking
//! - `flow.rs`: [`SubmissionFlow`], the submit state machine
//! - `dialog.rs`: [`AuthDialog`], sign-in / sign-up / reset prompt state
//! - `http.rs`: [`ZakiClient`], identity and account access over `/api/*`

pub mod context;
pub mod dialog;
pub mod flow;
pub mod http;
pub mod limits;
pub mod notice;
pub mod storage;

pub use context::AuthContext;
pub use dialog::{AuthDialog, AuthMode};
pub use flow::{FlowOutcome, PromptReason, SubmissionFlow, SubmissionState};
pub use http::ZakiClient;
pub use limits::{AccountBackend, QuestionLimits, SubmitReply};
pub use notice::Notice;
pub use storage::{AnonymousCounter, FileStore, LocalStore, MemoryStore};
