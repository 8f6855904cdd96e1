//! Storage Layer - SQLite-backed session persistence
//!
//! One database file (`sessions.sqlite`) per save directory, with one table
//! per session namespace:
//! - <namespace>(id, data, time)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SessionStore, SessionRecord, StoreStats, prepare_save_dir};
