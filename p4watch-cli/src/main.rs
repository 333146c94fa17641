//! p4watch — poll a Perforce depot path and sync a CI workspace.
//!
//! # Usage
//!
//! ```text
//! p4watch latest [--json]
//! p4watch local [--json]
//! p4watch status [--since <change>] [--json]
//! p4watch changes --since <change> [--json]
//! p4watch sync [<change>] [--raw]
//! ```
//!
//! Connection settings come from `~/.p4watch/config.yaml` (or `--config`),
//! with any flag below overriding the file.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use commands::{changes::ChangesArgs, revision::RevisionArgs, status::StatusArgs, sync::SyncArgs};
use p4watch_core::{config, P4Config, P4Settings};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "p4watch",
    version,
    about = "Track a Perforce depot path and sync a CI workspace",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the most recent change submitted under the depot path.
    Latest(RevisionArgs),

    /// Show the most recent change synced into the workspace.
    Local(RevisionArgs),

    /// Report whether the workspace is behind the depot.
    Status(StatusArgs),

    /// List changes submitted after a given change.
    Changes(ChangesArgs),

    /// Sync the workspace to head or to a given change.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Connection settings shared by every subcommand
// ---------------------------------------------------------------------------

/// Settings file location plus per-field overrides.
#[derive(Args, Debug, Default)]
struct ConnectionArgs {
    /// Settings file (default: ~/.p4watch/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Server address (P4PORT).
    #[arg(long, global = true)]
    port: Option<String>,

    /// Workspace / client name (P4CLIENT).
    #[arg(long, global = true)]
    client: Option<String>,

    /// User name (P4USER).
    #[arg(long, global = true)]
    user: Option<String>,

    /// Password or ticket (P4PASSWD).
    #[arg(long, global = true)]
    password: Option<String>,

    /// Depot path to watch, e.g. //depot/project/...
    #[arg(long, global = true)]
    depot_path: Option<String>,

    /// Path to the p4 executable.
    #[arg(long, global = true, value_name = "PATH")]
    p4_binary: Option<PathBuf>,

    /// Kill p4 invocations that run longer than this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Let p4 prompt on the terminal.
    #[arg(long, global = true)]
    interactive: bool,
}

impl ConnectionArgs {
    /// Load the settings file, apply flag overrides and validate.
    ///
    /// An explicit `--config` must exist; the default location may be absent.
    fn resolve(self) -> Result<P4Config> {
        let file_settings = match &self.config {
            Some(path) => P4Settings::load(path)?,
            None => {
                let path = config::default_path()?;
                P4Settings::load_or_default(&path)?
            }
        };

        let overrides = P4Settings {
            port: self.port,
            client: self.client,
            user: self.user,
            password: self.password,
            depot_path: self.depot_path,
            interactive: self.interactive.then_some(true),
            log_path: None,
            timeout_secs: self.timeout_secs,
            p4_binary: self.p4_binary,
        };

        file_settings
            .merge(overrides)
            .validate()
            .context("incomplete connection settings")
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.connection.resolve()?;
    match cli.command {
        Commands::Latest(args) => args.run_latest(config),
        Commands::Local(args) => args.run_local(config),
        Commands::Status(args) => args.run(config),
        Commands::Changes(args) => args.run(config),
        Commands::Sync(args) => args.run(config),
    }
}
