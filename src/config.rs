use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session name used when neither the config nor the command line gives one
pub const DEFAULT_NAME: &str = "PHPSESSID";

/// Default idle lifetime before a session is collected (24 minutes)
pub const DEFAULT_GC_MAXLIFETIME: u64 = 1440;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessdbConfig {
    pub save_path: Option<String>,
    pub name: Option<String>,
    pub gc_maxlifetime: Option<u64>,
    pub legacy_dir: Option<String>,
}

impl SessdbConfig {
    /// Save directory; empty means "use the temp directory"
    pub fn save_path(&self) -> PathBuf {
        self.save_path.as_deref().map(PathBuf::from).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    pub fn gc_maxlifetime(&self) -> u64 {
        self.gc_maxlifetime.unwrap_or(DEFAULT_GC_MAXLIFETIME)
    }

    pub fn legacy_dir(&self) -> Option<PathBuf> {
        self.legacy_dir.as_deref().map(PathBuf::from)
    }

    /// Overlay values set in `other` on top of this config
    pub fn merge(mut self, other: SessdbConfig) -> Self {
        if other.save_path.is_some() {
            self.save_path = other.save_path;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.gc_maxlifetime.is_some() {
            self.gc_maxlifetime = other.gc_maxlifetime;
        }
        if other.legacy_dir.is_some() {
            self.legacy_dir = other.legacy_dir;
        }
        self
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("sessdb.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SessdbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SessdbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SessdbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessdbConfig::default();
        assert_eq!(config.name(), "PHPSESSID");
        assert_eq!(config.gc_maxlifetime(), 1440);
        assert_eq!(config.save_path(), PathBuf::new());
        assert!(config.legacy_dir().is_none());
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessdb.toml");
        let config = SessdbConfig {
            save_path: Some("/var/lib/sessions".to_string()),
            name: Some("MYAPP".to_string()),
            gc_maxlifetime: Some(2_592_000),
            legacy_dir: None,
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessdb.toml");
        std::fs::write(&path, "gc_maxlifetime = 60\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.gc_maxlifetime(), 60);
        assert_eq!(loaded.name(), "PHPSESSID");
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = SessdbConfig {
            save_path: Some("/a".to_string()),
            name: Some("BASE".to_string()),
            gc_maxlifetime: Some(10),
            legacy_dir: Some("/legacy".to_string()),
        };
        let overrides = SessdbConfig {
            name: Some("CLI".to_string()),
            ..Default::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.name(), "CLI");
        assert_eq!(merged.save_path(), PathBuf::from("/a"));
        assert_eq!(merged.gc_maxlifetime(), 10);
        assert_eq!(merged.legacy_dir(), Some(PathBuf::from("/legacy")));
    }
}
