//! Legacy session import
//!
//! A store can be given a [`LegacyMigration`] strategy. When a read finds no
//! row for an id, the strategy is asked for a session left behind by a
//! previous backend; if one exists it is written into the store with its
//! original timestamp and then served like any other row.

use crate::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// A session recovered from a previous backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySession {
    /// Serialized payload, imported verbatim
    pub data: String,
    /// Unix time of the last write seen by the previous backend
    pub modified: i64,
}

/// Source of sessions written before the store existed
pub trait LegacyMigration {
    /// Look up a legacy session by id. `Ok(None)` when there is nothing to import.
    fn load(&self, id: &str) -> Result<Option<LegacySession>>;
}

/// Imports `sess_<id>` files written by a file-based session handler.
///
/// The files are only read; cleaning them up is left to whoever owns the
/// directory.
#[derive(Debug, Clone)]
pub struct FileMigration {
    dir: PathBuf,
}

impl FileMigration {
    pub const FILE_PREFIX: &'static str = "sess_";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the legacy file for `id`, or `None` if the id could escape the directory
    pub fn file_for(&self, id: &str) -> Option<PathBuf> {
        if id.is_empty()
            || id.contains(['/', '\\', '\0'])
            || id.contains("..")
        {
            return None;
        }
        Some(self.dir.join(format!("{}{}", Self::FILE_PREFIX, id)))
    }
}

impl LegacyMigration for FileMigration {
    fn load(&self, id: &str) -> Result<Option<LegacySession>> {
        let Some(path) = self.file_for(id) else {
            return Ok(None);
        };

        let metadata = match std::fs::metadata(&path) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let data = std::fs::read_to_string(&path)?;
        let modified = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        tracing::debug!("Found legacy session file {}", path.display());
        Ok(Some(LegacySession { data, modified }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sess_abc123"), "user|i:1;").unwrap();

        let migration = FileMigration::new(dir.path());
        let legacy = migration.load("abc123").unwrap().unwrap();
        assert_eq!(legacy.data, "user|i:1;");
        assert!(legacy.modified > 0);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let migration = FileMigration::new(dir.path());
        assert!(migration.load("nothing-here").unwrap().is_none());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("inner");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("secret"), "nope").unwrap();

        let migration = FileMigration::new(&nested);
        assert!(migration.file_for("../secret").is_none());
        assert!(migration.file_for("a/b").is_none());
        assert!(migration.file_for("").is_none());
        assert!(migration.load("../../secret").unwrap().is_none());
    }

    #[test]
    fn test_directory_named_like_session_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sess_dir")).unwrap();
        let migration = FileMigration::new(dir.path());
        assert!(migration.load("dir").unwrap().is_none());
    }
}
