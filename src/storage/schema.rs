//! Database schema and connection settings

use crate::namespace::TableName;

/// Database file created inside the save directory
pub const DATABASE_FILE: &str = "sessions.sqlite";

/// How long a connection waits on a held write lock before failing
pub const BUSY_TIMEOUT_SECS: u64 = 2;

/// WAL journal cap (4 MiB)
pub const JOURNAL_SIZE_LIMIT: i64 = 4 * 1024 * 1024;

/// Settings that only take effect before the first table is created
pub const CREATE_TIME_PRAGMAS: &[(&str, &str)] = &[
    ("page_size", "4096"),
    ("auto_vacuum", "INCREMENTAL"),
    ("encoding", "UTF-8"),
];

/// Per-connection settings
pub const CONNECTION_PRAGMAS: &[(&str, &str)] = &[
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
    ("cache_size", "4000"),
];

/// SQL to create the session table for one namespace
pub fn create_sessions_table(table: &TableName) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    id TEXT PRIMARY KEY NOT NULL,
    data TEXT CHECK (typeof(data) = 'text') NOT NULL DEFAULT '',
    time INTEGER CHECK (typeof(time) = 'integer') NOT NULL
)
"#,
        table.quoted()
    )
}

/// Name of the last-write index; `$` keeps it out of the namespace charset
pub fn time_index_name(table: &TableName) -> String {
    format!("{}$time", table.as_str())
}

/// SQL to index last-write time, so GC does not scan every row
pub fn create_time_index(table: &TableName) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS \"{}\" ON {}(time)",
        time_index_name(table),
        table.quoted()
    )
}

/// All schema creation statements for one namespace
pub fn all_schema_statements(table: &TableName) -> Vec<String> {
    vec![create_sessions_table(table), create_time_index(table)]
}
