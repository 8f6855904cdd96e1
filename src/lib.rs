//! # Sessdb - SQLite session save handler
//!
//! Durable storage for opaque session payloads keyed by session id.
//!
//! Sessdb provides:
//! - A single-connection SQLite store tuned for concurrent readers (WAL)
//! - One table per session namespace inside a shared `sessions.sqlite`
//! - Upsert writes stamped with the wall-clock time, and lifetime-based GC
//! - An optional import path for sessions left behind by a file-based handler
//! - A host-facing handler that follows the open/read/write/close lifecycle

pub mod namespace;
pub mod storage;
pub mod migrate;
pub mod handler;
pub mod output;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use namespace::TableName;
pub use storage::{SessionStore, SessionRecord, StoreStats};
pub use migrate::{FileMigration, LegacyMigration, LegacySession};
pub use handler::SessionHandler;

/// Result type alias for Sessdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Sessdb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid session save path: {0}")]
    Config(String),

    #[error("Invalid session namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid session payload: {0}")]
    InvalidPayload(String),

    #[error("Session store is not open")]
    NotOpen,
}

/// Current Unix time in whole seconds
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
