//! Session save handler - the host-facing lifecycle
//!
//! The host runtime drives a handler through `open`, any number of `read` /
//! `write` / `destroy` / `gc` calls, and finally `close`. The handler owns at
//! most one [`SessionStore`] at a time and releases it when closed or dropped.
//!
//! Storage failures never panic: reads degrade to an empty payload, and
//! writes, destroys and GC report the error once without retrying.

use std::path::Path;
use crate::migrate::LegacyMigration;
use crate::storage::SessionStore;
use crate::{Error, Result};

type MigrationFactory = Box<dyn Fn() -> Box<dyn LegacyMigration>>;

/// Host-facing session save handler
#[derive(Default)]
pub struct SessionHandler {
    store: Option<SessionStore>,
    migration: Option<MigrationFactory>,
}

impl SessionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure a legacy import strategy for every store this handler opens
    pub fn with_migration<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn LegacyMigration> + 'static,
    {
        self.migration = Some(Box::new(factory));
        self
    }

    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// The open store, if any
    pub fn store(&self) -> Option<&SessionStore> {
        self.store.as_ref()
    }

    /// Open the store for `name` under `save_path`.
    ///
    /// Opening an already-open handler keeps the existing connection.
    pub fn open(&mut self, save_path: &Path, name: &str) -> Result<()> {
        if let Some(store) = &self.store {
            tracing::warn!(
                "Bad call to open(): session store for {} is already open",
                store.table()
            );
            return Ok(());
        }

        let migration = self.migration.as_ref().map(|factory| factory());
        self.store = Some(SessionStore::open_with(save_path, name, migration)?);
        Ok(())
    }

    /// Release the connection. Closing a closed handler does nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    /// Read a session payload; storage failures read as an empty session
    pub fn read(&self, id: &str) -> Result<String> {
        let store = self.open_store()?;
        match store.read(id) {
            Ok(data) => Ok(data),
            Err(e) => {
                tracing::warn!("Failed to read session {}: {}", id, e);
                Ok(String::new())
            }
        }
    }

    pub fn write(&self, id: &str, data: &str) -> Result<()> {
        self.open_store()?.write(id, data).inspect_err(|e| {
            tracing::warn!("Failed to write session {}: {}", id, e);
        })
    }

    pub fn destroy(&self, id: &str) -> Result<()> {
        self.open_store()?.destroy(id).inspect_err(|e| {
            tracing::warn!("Failed to destroy session {}: {}", id, e);
        })
    }

    /// Remove sessions idle for longer than `lifetime` seconds
    pub fn gc(&self, lifetime: u64) -> Result<()> {
        self.gc_count(lifetime).map(|_| ())
    }

    /// GC that also reports how many sessions it removed
    pub fn gc_count(&self, lifetime: u64) -> Result<usize> {
        self.open_store()?.gc_count(lifetime).inspect_err(|e| {
            tracing::warn!("Session GC failed: {}", e);
        })
    }

    fn open_store(&self) -> Result<&SessionStore> {
        self.store.as_ref().ok_or(Error::NotOpen)
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close session store: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::FileMigration;

    #[test]
    fn test_lifecycle_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let save = dir.path().join("sess");

        let mut handler = SessionHandler::new();
        assert!(!handler.is_open());
        handler.open(&save, "PHPSESSID").unwrap();
        assert!(handler.is_open());
        handler.write("abc123", r#"{"user":1}"#).unwrap();
        handler.close().unwrap();
        assert!(!handler.is_open());

        let mut handler = SessionHandler::new();
        handler.open(&save, "PHPSESSID").unwrap();
        assert_eq!(handler.read("abc123").unwrap(), r#"{"user":1}"#);
    }

    #[test]
    fn test_closed_handler_fails_fast() {
        let handler = SessionHandler::new();
        assert!(matches!(handler.read("abc"), Err(Error::NotOpen)));
        assert!(matches!(handler.write("abc", "x"), Err(Error::NotOpen)));
        assert!(matches!(handler.destroy("abc"), Err(Error::NotOpen)));
        assert!(matches!(handler.gc(60), Err(Error::NotOpen)));
    }

    #[test]
    fn test_double_open_keeps_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();

        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        handler.write("abc", "first").unwrap();

        handler.open(other.path(), "OTHER").unwrap();
        assert_eq!(handler.store().unwrap().table().as_str(), "phpsessid");
        assert_eq!(handler.read("abc").unwrap(), "first");
        assert!(!other.path().join("sessions.sqlite").exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.close().unwrap();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        handler.close().unwrap();
        handler.close().unwrap();
    }

    #[test]
    fn test_bad_save_path_surfaces_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "x").unwrap();

        let mut handler = SessionHandler::new();
        let err = handler.open(&file, "PHPSESSID").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!handler.is_open());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        assert!(matches!(handler.write("abc", "bad\0payload"), Err(Error::InvalidPayload(_))));
        assert_eq!(handler.read("abc").unwrap(), "");
    }

    #[test]
    fn test_read_degrades_when_table_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        handler.write("abc", "x").unwrap();

        let other = rusqlite::Connection::open(dir.path().join("sessions.sqlite")).unwrap();
        other.execute_batch("DROP TABLE phpsessid").unwrap();

        assert_eq!(handler.read("abc").unwrap(), "");
        assert!(matches!(handler.write("abc", "y"), Err(Error::Storage(_))));
    }

    #[test]
    fn test_write_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        handler.write("abc", "before").unwrap();

        let other = rusqlite::Connection::open(dir.path().join("sessions.sqlite")).unwrap();
        other.execute_batch("BEGIN IMMEDIATE").unwrap();

        let started = std::time::Instant::now();
        let result = handler.write("abc", "blocked");
        let waited = started.elapsed();
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(waited >= std::time::Duration::from_millis(1900), "waited {:?}", waited);
        assert!(waited < std::time::Duration::from_secs(5), "waited {:?}", waited);

        // WAL readers are not blocked by the writer
        assert_eq!(handler.read("abc").unwrap(), "before");

        other.execute_batch("ROLLBACK").unwrap();
        handler.write("abc", "after").unwrap();
        assert_eq!(handler.read("abc").unwrap(), "after");
    }

    #[test]
    fn test_destroy_and_gc_through_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();

        handler.destroy("never-written").unwrap();
        handler.write("abc", "x").unwrap();
        handler.gc(3600).unwrap();
        assert_eq!(handler.read("abc").unwrap(), "x");
        handler.destroy("abc").unwrap();
        assert_eq!(handler.read("abc").unwrap(), "");
    }

    #[test]
    fn test_gc_count_ignores_concurrent_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = SessionHandler::new();
        handler.open(dir.path(), "PHPSESSID").unwrap();
        handler.store().unwrap().write_at("stale", "x", 5).unwrap();
        handler.write("fresh", "x").unwrap();

        let mut other = SessionHandler::new();
        other.open(dir.path(), "PHPSESSID").unwrap();
        other.write("newcomer", "x").unwrap();

        assert_eq!(handler.gc_count(60).unwrap(), 1);
        assert_eq!(handler.store().unwrap().count().unwrap(), 2);
        assert!(matches!(SessionHandler::new().gc_count(60), Err(Error::NotOpen)));
    }

    #[test]
    fn test_migration_factory_applies_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().to_path_buf();
        std::fs::write(legacy.join("sess_old"), "imported").unwrap();

        let mut handler = SessionHandler::new()
            .with_migration(move || {
                Box::new(FileMigration::new(legacy.clone())) as Box<dyn LegacyMigration>
            });
        handler.open(dir.path(), "PHPSESSID").unwrap();
        assert_eq!(handler.read("old").unwrap(), "imported");
    }
}
