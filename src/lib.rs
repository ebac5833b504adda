//! Registro: quality tracking for the factory floor.
//!
//! **Registro is a local-first store for inspection records and production
//! counts.**
//!
//! Shop-floor tooling and back-office scripts share one workspace; every
//! mutation routes through a single broker so concurrent writers cannot
//! corrupt a record or a monthly total.
//!
//! # Core Principles
//!
//! - **Local-first**: All state lives in `.registro/` next to the project
//! - **Append-only history**: Inspections and registers are corrected, never
//!   deleted
//! - **Brokered writes**: One keyed transaction per mutation, with an audit
//!   trail (`broker.events.jsonl`)
//!
//! # Subsystems
//!
//! - `identity`: Registered users (`usuarios`) referenced as responsible
//!   parties
//! - `inspection`: Inspection records (`dado_ia`) and their state machine
//! - `production`: Daily production counts (`registros_producao`) with
//!   reconciled monthly totals
//! - `query`: Read-only facade with filtering and pagination
//!
//! # Examples
//!
//! ```bash
//! # Initialize a registro workspace
//! registro init
//!
//! # Register an inspector
//! registro identity register --username alice --name "Alice" --credential <hash>
//!
//! # Receive an inspection document
//! registro inspection create --documento-id DOC-1 --responsavel alice \
//!     --produto "controller board" --quantidade 4
//!
//! # Record a daily production count
//! registro production daily --date 2024-03-01 --tipo D --quantidade 10 \
//!     --responsavel alice
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: Store layout, schema management, the record broker
//! - [`stores`]: Subsystem implementations (identity, inspection, production,
//!   query)

pub mod core;
pub mod stores;

use core::{
    config, error,
    store::{self, Store},
};
use stores::{identity, inspection, production};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "registro",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspection records and production registers"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
    /// Rewrite config.toml even when the workspace already exists.
    #[clap(long)]
    force: bool,
}

#[derive(clap::Args, Debug)]
struct SchemaCli {
    /// Optional: filter by subsystem name.
    #[clap(long)]
    subsystem: Option<String>,
}

#[derive(clap::Args, Debug)]
struct AuditCli {
    /// Maximum number of events to show, oldest first.
    #[clap(long, default_value = "50")]
    limit: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the .registro workspace, config and database
    #[clap(name = "init", visible_alias = "i")]
    Init(InitCli),

    /// User directory for responsible parties
    #[clap(name = "identity", visible_alias = "id")]
    Identity(identity::IdentityCli),

    /// Inspection records and their lifecycle
    #[clap(name = "inspection", visible_alias = "insp")]
    Inspection(inspection::InspectionCli),

    /// Daily counts and monthly production totals
    #[clap(name = "production", visible_alias = "prod")]
    Production(production::ProductionCli),

    /// Subsystem schemas and discovery
    #[clap(name = "schema")]
    Schema(SchemaCli),

    /// Audit log of brokered mutations
    #[clap(name = "audit")]
    Audit(AuditCli),

    /// Show version information
    #[clap(name = "version")]
    Version,
}

fn find_registro_project_root(start_dir: &Path) -> Result<PathBuf, error::RegistroError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(store::WORKSPACE_DIR).exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(error::RegistroError::NotFound(
                "'.registro' directory not found in current or parent directories. Run `registro init` first."
                    .to_string(),
            ));
        }
    }
}

fn run_init(init_cli: InitCli, current_dir: &Path) -> Result<(), error::RegistroError> {
    use colored::Colorize;

    let target_dir = match init_cli.dir {
        Some(d) => d,
        None => current_dir.to_path_buf(),
    };
    let target_dir = std::fs::canonicalize(&target_dir).map_err(error::RegistroError::IoError)?;

    let registro_root = target_dir.join(store::WORKSPACE_DIR);
    let already_initialized = registro_root.exists();
    if already_initialized && !init_cli.force {
        println!(
            "{} workspace already initialized at {} (use {} to rewrite config)",
            "✓".bright_green(),
            registro_root.display(),
            "--force".bright_cyan()
        );
        return Ok(());
    }

    let data_dir = registro_root.join(store::DATA_DIR);
    std::fs::create_dir_all(&data_dir).map_err(error::RegistroError::IoError)?;

    let config_path = registro_root.join("config.toml");
    if !config_path.exists() || init_cli.force {
        std::fs::write(&config_path, config::default_config_toml())
            .map_err(error::RegistroError::IoError)?;
        println!("    {} {}", "●".bright_green(), "config.toml".bright_white());
    } else {
        println!(
            "    {} {} {}",
            "✓".bright_green(),
            "config.toml".bright_white(),
            "(preserved)".bright_black()
        );
    }

    let db_existed = core::db::registro_db_path(&data_dir).exists();
    core::db::initialize_registro_db(&data_dir)?;
    if db_existed {
        println!(
            "    {} {} {}",
            "✓".bright_green(),
            core::schemas::REGISTRO_DB_NAME.bright_white(),
            "(preserved - existing data kept)".bright_black()
        );
    } else {
        println!(
            "    {} {}",
            "●".bright_green(),
            core::schemas::REGISTRO_DB_NAME.bright_white()
        );
    }

    println!();
    println!(
        "{} registro workspace ready at {}",
        "✓".bright_green().bold(),
        registro_root.display()
    );
    Ok(())
}

pub fn run() -> Result<(), error::RegistroError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Version => {
            // Simple output for scripts/parsing
            println!("v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Init(init_cli) => {
            run_init(init_cli, &current_dir)?;
        }
        _ => {
            let project_root = find_registro_project_root(&current_dir)?;
            let config = config::load_config(&project_root)?;
            let project_store = Store::open_with_config(&project_root, &config)?;

            match cli.command {
                Command::Identity(identity_cli) => {
                    identity::run_identity_cli(&project_store, identity_cli)?;
                }
                Command::Inspection(inspection_cli) => {
                    inspection::run_inspection_cli(&project_store, inspection_cli)?;
                }
                Command::Production(production_cli) => {
                    production::run_production_cli(&project_store, production_cli)?;
                }
                Command::Schema(schema_cli) => {
                    let mut schemas = std::collections::BTreeMap::new();
                    schemas.insert("identity", identity::schema());
                    schemas.insert("inspection", inspection::schema());
                    schemas.insert("production", production::schema());
                    schemas.insert("broker", core::broker::schema());

                    let output = if let Some(sub) = schema_cli.subsystem {
                        schemas
                            .get(sub.as_str())
                            .cloned()
                            .unwrap_or(serde_json::json!({ "error": "subsystem not found" }))
                    } else {
                        serde_json::json!({
                            "schema_version": "1.0.0",
                            "subsystems": schemas
                        })
                    };
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                }
                Command::Audit(audit_cli) => {
                    let events = project_store.broker().audit_tail(audit_cli.limit)?;
                    if events.is_empty() {
                        println!("No audit events recorded.");
                    } else {
                        for event in &events {
                            println!("{}", serde_json::to_string(event).unwrap());
                        }
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Ok(())
}
