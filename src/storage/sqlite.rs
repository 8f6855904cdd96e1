//! SQLite storage implementation

use std::path::{Path, PathBuf};
use std::time::Duration;
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::migrate::LegacyMigration;
use crate::namespace::TableName;
use super::schema;

/// SQLite-backed storage for one session namespace
pub struct SessionStore {
    conn: Connection,
    table: TableName,
    path: Option<PathBuf>,
    migration: Option<Box<dyn LegacyMigration>>,
}

impl SessionStore {
    /// Open `sessions.sqlite` inside `save_dir` (creates directory, file and table as needed)
    pub fn open(save_dir: &Path, namespace: &str) -> Result<Self> {
        Self::open_with(save_dir, namespace, None)
    }

    /// Open with an optional legacy import strategy consulted on reads
    pub fn open_with(
        save_dir: &Path,
        namespace: &str,
        migration: Option<Box<dyn LegacyMigration>>,
    ) -> Result<Self> {
        let table = TableName::parse(namespace)?;
        let dir = prepare_save_dir(save_dir)?;
        let path = dir.join(schema::DATABASE_FILE);

        let conn = Connection::open(&path).map_err(|e| {
            Error::Config(format!("cannot open {}: {}", path.display(), e))
        })?;
        tracing::debug!("Opened session database {} (table {})", path.display(), table);

        let store = Self { conn, table, path: Some(path), migration };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(namespace: &str) -> Result<Self> {
        let table = TableName::parse(namespace)?;
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, table, path: None, migration: None };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Attach or replace the legacy import strategy
    pub fn set_migration(&mut self, migration: Option<Box<dyn LegacyMigration>>) {
        self.migration = migration;
    }

    /// Apply connection settings: WAL, bounded journal, 2s lock wait
    fn configure(&self) -> Result<()> {
        self.conn.busy_timeout(Duration::from_secs(schema::BUSY_TIMEOUT_SECS))?;

        for (name, value) in schema::CREATE_TIME_PRAGMAS {
            self.conn.pragma_update(None, name, value)?;
        }

        // These two report the resulting value as a row
        let mode: String = self.conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if self.path.is_some() && !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!("Session database is using journal_mode={} instead of WAL", mode);
        }
        let _: i64 = self.conn.pragma_update_and_check(
            None,
            "journal_size_limit",
            schema::JOURNAL_SIZE_LIMIT,
            |row| row.get(0),
        )?;

        for (name, value) in schema::CONNECTION_PRAGMAS {
            self.conn.pragma_update(None, name, value)?;
        }
        Ok(())
    }

    /// Initialize the table for this namespace (never drops existing data)
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements(&self.table) {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    /// Namespace table this store reads and writes
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Database file path (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        tracing::debug!("Closing session store (table {})", self.table);
        self.conn.close().map_err(|(_, e)| e.into())
    }

    // ========== Session Operations ==========

    /// Read a session payload. A missing session reads as an empty string.
    pub fn read(&self, id: &str) -> Result<String> {
        if self.migration.is_some() && !self.exists(id)? {
            self.import_legacy(id)?;
        }

        let data: Option<String> = self.conn
            .query_row(
                &format!("SELECT data FROM {} WHERE id = ?1 LIMIT 1", self.table.quoted()),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(data.unwrap_or_default())
    }

    /// Insert or fully replace a session, stamped with the current time
    pub fn write(&self, id: &str, data: &str) -> Result<()> {
        self.write_at(id, data, crate::unix_now())
    }

    /// Insert or replace a session with an explicit timestamp
    pub(crate) fn write_at(&self, id: &str, data: &str, time: i64) -> Result<()> {
        if data.contains('\0') {
            return Err(Error::InvalidPayload(format!(
                "payload for session {} contains a NUL character",
                id
            )));
        }

        self.conn.execute(
            &format!("REPLACE INTO {} (id, data, time) VALUES (?1, ?2, ?3)", self.table.quoted()),
            params![id, data, time],
        )?;
        Ok(())
    }

    /// Delete a session. Deleting an unknown id succeeds.
    pub fn destroy(&self, id: &str) -> Result<()> {
        self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table.quoted()),
            [id],
        )?;
        Ok(())
    }

    /// Delete sessions not written during the last `lifetime` seconds
    pub fn gc(&self, lifetime: u64) -> Result<()> {
        self.gc_count(lifetime)?;
        Ok(())
    }

    /// Same as [`gc`](Self::gc), returning how many sessions this call removed
    pub fn gc_count(&self, lifetime: u64) -> Result<usize> {
        self.gc_at(lifetime, crate::unix_now())
    }

    /// GC relative to a given `now`; returns the number of sessions removed
    pub(crate) fn gc_at(&self, lifetime: u64, now: i64) -> Result<usize> {
        let cutoff = now.saturating_sub(i64::try_from(lifetime).unwrap_or(i64::MAX));
        let deleted = self.conn.execute(
            &format!("DELETE FROM {} WHERE time < ?1", self.table.quoted()),
            [cutoff],
        )?;
        tracing::info!("Session GC on {} removed {} expired session(s)", self.table, deleted);
        Ok(deleted)
    }

    /// Check whether a row exists for `id`
    pub fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = self.conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", self.table.quoted()),
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn import_legacy(&self, id: &str) -> Result<()> {
        let Some(migration) = &self.migration else {
            return Ok(());
        };
        if let Some(legacy) = migration.load(id)? {
            tracing::debug!("Importing legacy session {} into {}", id, self.table);
            self.write_at(id, &legacy.data, legacy.modified)?;
        }
        Ok(())
    }

    // ========== Administration ==========

    /// Count sessions in this namespace
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table.quoted()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// List sessions, most recently written first
    pub fn list(&self, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, length(CAST(data AS BLOB)), time FROM {} ORDER BY time DESC, id LIMIT ?1",
            self.table.quoted()
        ))?;

        let records = stmt
            .query_map([limit as i64], |row| {
                Ok(SessionRecord {
                    id: row.get(0)?,
                    size: row.get::<_, i64>(1)? as usize,
                    time: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Get statistics for this namespace
    pub fn stats(&self) -> Result<StoreStats> {
        let stats = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), MIN(time), MAX(time), COALESCE(SUM(length(CAST(data AS BLOB))), 0) FROM {}",
                self.table.quoted()
            ),
            [],
            |row| {
                Ok(StoreStats {
                    namespace: self.table.to_string(),
                    sessions: row.get::<_, i64>(0)? as usize,
                    oldest: row.get(1)?,
                    newest: row.get(2)?,
                    payload_bytes: row.get::<_, i64>(3)? as u64,
                })
            },
        )?;
        Ok(stats)
    }

    /// Names of every session table in the database file
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Return free pages to the filesystem; yields the number of pages released
    pub fn vacuum(&self) -> Result<u64> {
        let before = self.freelist_count()?;
        // Each step of the pragma releases one page
        let mut stmt = self.conn.prepare("PRAGMA incremental_vacuum")?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
        let after = self.freelist_count()?;
        Ok(before.saturating_sub(after))
    }

    fn freelist_count(&self) -> Result<u64> {
        let pages: i64 = self.conn.pragma_query_value(None, "freelist_count", |row| row.get(0))?;
        Ok(pages.max(0) as u64)
    }
}

impl SessionStore {
    /// Whether `<save_dir>/sessions.sqlite` exists and can be read.
    ///
    /// Hosts check this before installing the handler and keep their default
    /// session backend when it fails.
    pub fn is_available(save_dir: &Path) -> bool {
        let path = save_dir.join(schema::DATABASE_FILE);
        match std::fs::File::open(&path) {
            Ok(file) if file.metadata().map(|m| m.is_file()).unwrap_or(false) => true,
            Ok(_) => {
                tracing::warn!("{} is not a file, switch to default session handler", path.display());
                false
            }
            Err(e) => {
                tracing::warn!(
                    "{} not readable ({}), switch to default session handler",
                    path.display(),
                    e
                );
                false
            }
        }
    }
}

/// Resolve and validate a save directory.
///
/// An empty path falls back to the platform temp directory; a missing one is
/// created (mode 0700 on Unix). Anything that is not a writable directory is
/// a configuration error.
pub fn prepare_save_dir(save_dir: &Path) -> Result<PathBuf> {
    let dir = if save_dir.as_os_str().is_empty() {
        let tmp = std::env::temp_dir();
        tracing::warn!("Session save path is empty, using {}", tmp.display());
        tmp
    } else {
        save_dir.to_path_buf()
    };

    if !dir.exists() {
        create_private_dir(&dir).map_err(|e| {
            Error::Config(format!("{}: cannot create directory: {}", dir.display(), e))
        })?;
    }

    if !dir.is_dir() {
        return Err(Error::Config(format!("{} is not a directory", dir.display())));
    }
    if !is_writable(&dir) {
        return Err(Error::Config(format!("{} is not writable", dir.display())));
    }
    Ok(dir)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Create and remove a scratch file; permission bits alone miss ACLs and read-only mounts
fn is_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".sessdb-write-check-{}", std::process::id()));
    match std::fs::OpenOptions::new().write(true).create_new(true).open(&probe) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&probe) {
                tracing::warn!("Could not remove {}: {}", probe.display(), e);
            }
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => true,
        Err(_) => false,
    }
}

/// One row of a session listing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionRecord {
    pub id: String,
    /// Payload size in bytes
    pub size: usize,
    /// Unix time of the last write
    pub time: i64,
}

/// Namespace statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub namespace: String,
    pub sessions: usize,
    pub oldest: Option<i64>,
    pub newest: Option<i64>,
    pub payload_bytes: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Session Statistics ({}):", self.namespace)?;
        writeln!(f, "  Sessions: {}", self.sessions)?;
        writeln!(f, "  Payload bytes: {}", self.payload_bytes)?;
        match (self.oldest, self.newest) {
            (Some(oldest), Some(newest)) => {
                writeln!(f, "  Oldest write: {}", oldest)?;
                writeln!(f, "  Newest write: {}", newest)
            }
            _ => writeln!(f, "  Oldest write: -"),
        }
    }
}
