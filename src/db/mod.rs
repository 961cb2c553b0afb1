//! Account store: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: `AccountStorage`, the only code issuing SQL

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{DbAccount, DbQuestion, DbSession, SubmitOutcome};
pub use schema::SQLITE_INIT;
pub use sqlite::{AccountStorage, SqlitePool, connect, connect_with_retry};
