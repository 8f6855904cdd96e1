use crate::{OutputMode, emit_success};
use owo_colors::OwoColorize;
use sessdb::config::{self, SessdbConfig};
use sessdb::ui::{self, Icons, banner, header, info, section, success, summary_row};
use sessdb::{FileMigration, LegacyMigration, SessionHandler, SessionStore};
use std::io::Read;
use std::path::Path;

/// Open a handler the way the host runtime would
fn open_handler(settings: &SessdbConfig) -> anyhow::Result<SessionHandler> {
    let mut handler = SessionHandler::new();
    if let Some(dir) = settings.legacy_dir() {
        handler = handler.with_migration(move || {
            Box::new(FileMigration::new(dir.clone())) as Box<dyn LegacyMigration>
        });
    }
    handler.open(&settings.save_path(), settings.name())?;
    Ok(handler)
}

pub fn run_init(
    output_mode: OutputMode,
    path: &Path,
    settings: &SessdbConfig,
    force: bool,
) -> anyhow::Result<()> {
    let mut to_write = settings.clone();
    to_write.name.get_or_insert_with(|| config::DEFAULT_NAME.to_string());
    to_write.gc_maxlifetime.get_or_insert(config::DEFAULT_GC_MAXLIFETIME);
    config::write_config(path, &to_write, force)?;

    // Hosts only install the handler once the database file exists
    let mut handler = open_handler(&to_write)?;
    handler.close()?;

    if output_mode.is_human() {
        success(&format!("Wrote config to {}", path.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({
            "path": path.display().to_string(),
            "config": to_write,
        }))?;
    }
    Ok(())
}

/// Report whether a host would install the SQLite handler for this save path
pub fn run_check(output_mode: OutputMode, settings: &SessdbConfig) -> anyhow::Result<()> {
    let mut save_path = settings.save_path();
    if save_path.as_os_str().is_empty() {
        save_path = std::env::temp_dir();
    }
    let available = SessionStore::is_available(&save_path);

    if output_mode.is_human() {
        if available {
            success(&format!("{} is ready", save_path.join("sessions.sqlite").display()));
        } else {
            anyhow::bail!(
                "{} is not readable; hosts will fall back to their default session handler",
                save_path.join("sessions.sqlite").display()
            );
        }
    } else {
        emit_success(output_mode, "check", serde_json::json!({
            "save_path": save_path.display().to_string(),
            "available": available,
        }))?;
    }
    Ok(())
}

pub fn run_read(output_mode: OutputMode, settings: &SessdbConfig, id: &str) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let data = handler.read(id)?;
    handler.close()?;

    if output_mode.is_human() {
        if data.is_empty() {
            ui::warn(&format!("No data for session {}", id));
        } else {
            println!("{}", data);
        }
    } else {
        emit_success(output_mode, "read", serde_json::json!({
            "id": id,
            "data": data,
        }))?;
    }
    Ok(())
}

pub fn run_write(
    output_mode: OutputMode,
    settings: &SessdbConfig,
    id: &str,
    data: Option<String>,
) -> anyhow::Result<()> {
    let data = match data {
        Some(data) => data,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut handler = open_handler(settings)?;
    handler.write(id, &data)?;
    handler.close()?;

    if output_mode.is_human() {
        success(&format!("Stored session {} ({} bytes)", id, data.len()));
    } else {
        emit_success(output_mode, "write", serde_json::json!({
            "id": id,
            "bytes": data.len(),
        }))?;
    }
    Ok(())
}

pub fn run_destroy(output_mode: OutputMode, settings: &SessdbConfig, id: &str) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    handler.destroy(id)?;
    handler.close()?;

    if output_mode.is_human() {
        println!("{} Destroyed session {}", Icons::DEL, id.bold());
    } else {
        emit_success(output_mode, "destroy", serde_json::json!({ "id": id }))?;
    }
    Ok(())
}

pub fn run_gc(output_mode: OutputMode, settings: &SessdbConfig, lifetime: u64) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let removed = handler.gc_count(lifetime)?;
    let after = match handler.store() {
        Some(store) => store.count()?,
        None => 0,
    };
    handler.close()?;

    if output_mode.is_human() {
        header(Icons::BROOM, "Session GC");
        summary_row("Lifetime:", &format!("{}s", lifetime));
        summary_row("Removed:", &removed.to_string());
        summary_row("Remaining:", &after.to_string());
    } else {
        emit_success(output_mode, "gc", serde_json::json!({
            "lifetime": lifetime,
            "removed": removed,
            "remaining": after,
        }))?;
    }
    Ok(())
}

pub fn run_list(output_mode: OutputMode, settings: &SessdbConfig, limit: usize) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let records = match handler.store() {
        Some(store) => store.list(limit)?,
        None => Vec::new(),
    };
    handler.close()?;

    if output_mode.is_human() {
        if records.is_empty() {
            ui::warn("No sessions stored.");
        } else {
            header(Icons::KEY, &format!("{} session(s)", records.len()));
            println!("{}", ui::sessions_table(&records));
        }
    } else {
        emit_success(output_mode, "list", serde_json::json!({ "sessions": records }))?;
    }
    Ok(())
}

pub fn run_stats(output_mode: OutputMode, settings: &SessdbConfig) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let (stats, path) = match handler.store() {
        Some(store) => (store.stats()?, store.path().map(|p| p.display().to_string())),
        None => anyhow::bail!("session store did not open"),
    };
    handler.close()?;

    if output_mode.is_human() {
        header(Icons::STATS, "Session Statistics");
        if let Some(path) = &path {
            info("Database", path);
        }
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success(output_mode, "stats", serde_json::json!({
            "database": path,
            "stats": stats,
        }))?;
    }
    Ok(())
}

pub fn run_namespaces(output_mode: OutputMode, settings: &SessdbConfig) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let names = match handler.store() {
        Some(store) => store.namespaces()?,
        None => Vec::new(),
    };
    handler.close()?;

    if output_mode.is_human() {
        section("Namespaces");
        for name in &names {
            println!("  {} {}", Icons::FOLDER, name);
        }
    } else {
        emit_success(output_mode, "namespaces", serde_json::json!({ "namespaces": names }))?;
    }
    Ok(())
}

pub fn run_vacuum(output_mode: OutputMode, settings: &SessdbConfig) -> anyhow::Result<()> {
    let mut handler = open_handler(settings)?;
    let freed = match handler.store() {
        Some(store) => store.vacuum()?,
        None => 0,
    };
    handler.close()?;

    if output_mode.is_human() {
        success(&format!("Released {} free page(s)", freed));
    } else {
        emit_success(output_mode, "vacuum", serde_json::json!({ "pages_freed": freed }))?;
    }
    Ok(())
}

pub fn run_version(output_mode: OutputMode) -> anyhow::Result<()> {
    if output_mode.is_human() {
        banner(
            &format!("{}", "Sessdb".bold()),
            &format!("Version {}", env!("CARGO_PKG_VERSION")),
        );
    } else {
        emit_success(output_mode, "version", serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }))?;
    }
    Ok(())
}
