//! `p4watch status` — is the workspace behind the depot?

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use p4watch_core::{ChangeNumber, P4Config};
use p4watch_sync::{RevisionTracker, StaleReason, UpToDateCheck};

/// Arguments for `p4watch status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Compare against this change instead of the workspace's latest synced change.
    #[arg(long, value_name = "CHANGE")]
    pub since: Option<ChangeNumber>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, config: P4Config) -> Result<()> {
        let depot_path = config.depot_path.clone();
        let tracker = RevisionTracker::from_config(config);
        let check = match self.since {
            Some(since) => tracker.is_up_to_date(since),
            None => tracker.is_workspace_up_to_date(),
        }
        .with_context(|| format!("status check failed for {depot_path}"))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&check)?);
            return Ok(());
        }

        print_check(&depot_path, &check);
        Ok(())
    }
}

fn print_check(depot_path: &str, check: &UpToDateCheck) {
    if check.up_to_date {
        println!("{} {depot_path} — up to date", "■".green().bold());
        return;
    }

    println!("{} {depot_path} — STALE", "■".yellow().bold());
    for reason in &check.reasons {
        println!("  {reason}");
        if let StaleReason::Intervening { revisions } = reason {
            for revision in revisions {
                let summary = revision.message.lines().next().unwrap_or_default();
                println!("    {} {}", revision.number.to_string().bold(), summary);
            }
        }
    }
    println!("Run 'p4watch sync' to update the workspace.");
}
