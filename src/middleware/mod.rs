pub mod admin;
pub mod json;
pub mod session;

pub use admin::RequireAdminKey;
pub use json::ApiJson;
pub use session::RequireSession;
