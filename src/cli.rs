use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "snapsafe")]
#[command(about = "Backs up media cards and retires stale originals", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up new media, then retire files older than the retention window
    Run {
        /// Report what would happen without touching the filesystem or ledger
        #[arg(long)]
        dry_run: bool,
        /// Skip the confirmation prompt before deleting
        #[arg(long)]
        yes: bool,
    },
    /// Print configuration values
    PrintConfig,
    /// Display the number of content hashes in the archive ledger
    LedgerCount,
}
