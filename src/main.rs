//! Sessdb CLI - inspect and maintain a SQLite session store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sessdb::config::{self, SessdbConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "sessdb")]
#[command(version)]
#[command(about = "SQLite session save handler - inspect, write and expire stored sessions")]
#[command(long_about = r#"
Sessdb keeps session payloads in <save-path>/sessions.sqlite, one table per
session name. This tool drives the same open/read/write/destroy/gc/close
lifecycle a host runtime uses, for inspection and maintenance.

Example usage:
  sessdb --save-path /var/lib/php/sessions stats
  sessdb --name PHPSESSID read abc123
  sessdb gc --lifetime 2592000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress banners and headers (same as SESSDB_QUIET=1)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session save directory (overrides config)
    #[arg(short, long, global = true)]
    save_path: Option<PathBuf>,

    /// Session name / namespace (overrides config)
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Directory of legacy sess_<id> files to import on read (overrides config)
    #[arg(long, global = true)]
    legacy_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the current settings
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Check that the session database exists and is readable
    Check,

    /// Print a session payload (empty when the session does not exist)
    Read {
        /// Session id
        id: String,
    },

    /// Store a session payload (read from stdin when omitted)
    Write {
        /// Session id
        id: String,

        /// Serialized payload
        data: Option<String>,
    },

    /// Delete a session
    Destroy {
        /// Session id
        id: String,
    },

    /// Delete sessions idle for longer than the lifetime
    Gc {
        /// Lifetime in seconds (defaults to gc_maxlifetime)
        #[arg(short, long)]
        lifetime: Option<u64>,
    },

    /// List stored sessions, most recent first
    List {
        /// Maximum number of sessions
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show statistics for the session namespace
    Stats,

    /// List the session namespaces in the database file
    Namespaces,

    /// Return free pages to the filesystem
    Vacuum,

    /// Print version information
    Version,
}

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a successful JSON result
pub fn emit_success(mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn emit_error(mode: OutputMode, err: &anyhow::Error) {
    match mode {
        OutputMode::Human => sessdb::ui::error(&format!("{:#}", err)),
        OutputMode::Json => {
            let envelope = serde_json::json!({
                "ok": false,
                "error": format!("{:#}", err),
            });
            println!("{}", envelope);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.quiet {
        sessdb::output::set_quiet(true);
    }
    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };

    if let Err(err) = run(cli, output_mode) {
        emit_error(output_mode, &err);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let settings = resolve_settings(&cli)?;

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            commands::run_init(output_mode, &path, &settings, force)
        }
        Commands::Check => commands::run_check(output_mode, &settings),
        Commands::Read { id } => commands::run_read(output_mode, &settings, &id),
        Commands::Write { id, data } => commands::run_write(output_mode, &settings, &id, data),
        Commands::Destroy { id } => commands::run_destroy(output_mode, &settings, &id),
        Commands::Gc { lifetime } => {
            let lifetime = lifetime.unwrap_or_else(|| settings.gc_maxlifetime());
            commands::run_gc(output_mode, &settings, lifetime)
        }
        Commands::List { limit } => commands::run_list(output_mode, &settings, limit),
        Commands::Stats => commands::run_stats(output_mode, &settings),
        Commands::Namespaces => commands::run_namespaces(output_mode, &settings),
        Commands::Vacuum => commands::run_vacuum(output_mode, &settings),
        Commands::Version => commands::run_version(output_mode),
    }
}

/// Config file values, overridden by command-line flags
fn resolve_settings(cli: &Cli) -> anyhow::Result<SessdbConfig> {
    let file = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let overrides = SessdbConfig {
        save_path: cli.save_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        name: cli.name.clone(),
        gc_maxlifetime: None,
        legacy_dir: cli.legacy_dir.as_ref().map(|p| p.to_string_lossy().to_string()),
    };
    Ok(file.merge(overrides))
}
