//! Session namespace - the table a store reads and writes
//!
//! A namespace is the session name supplied by the host (e.g. `PHPSESSID`).
//! It is lower-cased and checked against a strict identifier charset before
//! it is ever interpolated into SQL.
//!
//! Examples:
//! - `PHPSESSID` -> `"phpsessid"`
//! - `admin_session` -> `"admin_session"`

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Allowed table identifiers (SQLite's own names start with `sqlite_`)
static IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("identifier pattern is valid")
});

/// Validated, lower-cased table name for one session namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    /// Parse a host-supplied namespace into a table name
    pub fn parse(namespace: &str) -> Result<Self> {
        let name = namespace.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::InvalidNamespace("namespace must not be empty".to_string()));
        }
        if name.starts_with("sqlite_") {
            return Err(Error::InvalidNamespace(format!("{} is reserved", namespace)));
        }
        if !IDENT.is_match(&name) {
            return Err(Error::InvalidNamespace(format!(
                "{} must match [a-z_][a-z0-9_]* (at most 63 chars)",
                namespace
            )));
        }
        Ok(Self(name))
    }

    /// Bare table name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier-quoted form, safe to interpolate into statements
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_quotes() {
        let table = TableName::parse("PHPSESSID").unwrap();
        assert_eq!(table.as_str(), "phpsessid");
        assert_eq!(table.quoted(), "\"phpsessid\"");
    }

    #[test]
    fn test_trims_whitespace() {
        let table: TableName = "  Admin_Session ".parse().unwrap();
        assert_eq!(table.to_string(), "admin_session");
    }

    #[test]
    fn test_rejects_injection() {
        assert!(TableName::parse("x\"; DROP TABLE y; --").is_err());
        assert!(TableName::parse("a b").is_err());
        assert!(TableName::parse("sess-id").is_err());
        assert!(TableName::parse("9lives").is_err());
    }

    #[test]
    fn test_rejects_empty_and_reserved() {
        assert!(matches!(TableName::parse("   "), Err(Error::InvalidNamespace(_))));
        assert!(TableName::parse("sqlite_master").is_err());
        assert!(TableName::parse(&"a".repeat(64)).is_err());
        assert!(TableName::parse(&"a".repeat(63)).is_ok());
    }
}
