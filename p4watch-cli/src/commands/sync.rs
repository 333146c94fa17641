//! `p4watch sync [<change>]` — bring the workspace forward.

use std::io;

use anyhow::{Context, Result};
use clap::Args;

use p4watch_core::{ChangeNumber, P4Config};
use p4watch_sync::Synchronizer;

/// Arguments for `p4watch sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Change to sync to (default: head).
    pub change: Option<ChangeNumber>,

    /// Print the server's sync output verbatim instead of a summary.
    #[arg(long)]
    pub raw: bool,
}

impl SyncArgs {
    pub fn run(self, config: P4Config) -> Result<()> {
        let synchronizer = Synchronizer::from_config(config);
        let target = self
            .change
            .map_or_else(|| "head".to_string(), |n| n.to_string());

        if self.raw {
            let stdout = io::stdout();
            let mut sink = stdout.lock();
            return synchronizer
                .checkout(self.change, &mut sink)
                .with_context(|| format!("sync to {target} failed"));
        }

        let synced = synchronizer
            .sync(self.change)
            .with_context(|| format!("sync to {target} failed"))?;
        if synced.is_empty() {
            println!("✓ workspace already at {target} — nothing to do");
            return Ok(());
        }
        println!("✓ synced {} file(s) to {target}", synced.len());
        for entry in &synced {
            println!("  {:<10} {}", entry.operation(), entry.path());
        }
        Ok(())
    }
}
