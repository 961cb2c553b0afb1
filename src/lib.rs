pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod quota;
pub mod router;
pub mod types;

pub use error::ZakiError;
pub use quota::{FREE_QUESTION_LIMIT, QuotaPolicy, QuotaStatus, can_submit};
