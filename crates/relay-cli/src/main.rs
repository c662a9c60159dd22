//! `relay` — the orchestrator's CLI entry point.
//!
//! Subcommands: `migrate` (apply the durable schema), `status` (DB
//! connectivity check), `run` (one orchestrator pass over every
//! registered, due source), and `source list` / `source show` (read-only
//! inspection).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Multi-source social-media relay orchestrator", long_about = None)]
struct Cli {
    /// Layered YAML config paths, merged in order (base -> env -> local).
    #[arg(long = "config", global = true)]
    config: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the durable schema (idempotent).
    Migrate,

    /// DB connectivity + schema presence check.
    Status,

    /// Run one orchestrator pass over every registered, due source.
    Run {
        /// Directory of `<source.id>.json` fixture files, used in place of
        /// live platform adapters (none are wired into this workspace; see
        /// `relay-sources`'s crate docs).
        #[arg(long)]
        fixtures: Option<PathBuf>,

        /// Publish against an in-memory mock instead of a live downstream
        /// instance.
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect configured sources.
    Source {
        #[command(subcommand)]
        cmd: SourceCmd,
    },
}

#[derive(Subcommand)]
enum SourceCmd {
    /// List every configured source with its current scheduling state.
    List,
    /// Show one source's full configuration and durable state.
    Show {
        /// The source's configured `id`.
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience); silent if absent.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.cmd {
        Commands::Migrate => migrate().await,
        Commands::Status => status().await,
        Commands::Run { fixtures, dry_run } => commands::run::run_start(&cli.config, fixtures, dry_run).await,
        Commands::Source { cmd } => match cmd {
            SourceCmd::List => commands::source::source_list(&cli.config).await,
            SourceCmd::Show { id } => commands::source::source_show(&cli.config, &id).await,
        },
    };

    // `relay run` exits through `std::process::exit` on its own (the
    // orchestrator's exit-code contract, §6); every other subcommand's
    // failure surfaces here as config/DB unreachable.
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }

    Ok(())
}

async fn migrate() -> Result<()> {
    let pool = relay_db::connect_from_env().await?;
    relay_db::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}

async fn status() -> Result<()> {
    let pool = relay_db::connect_from_env().await?;
    let s = relay_db::status(&pool).await?;
    println!("db_ok={} has_source_state_table={}", s.ok, s.has_source_state_table);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
