pub mod import;
pub mod init;
pub mod preview;
pub mod status;
pub mod transactions;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};

use crate::error::{ImportError, Result};
use crate::ledger::SqliteLedger;

#[derive(Parser)]
#[command(
    name = "csv2ledger",
    version,
    about = "Import bank-statement CSV exports into a ledger, skipping duplicates and linking transfers."
)]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
    /// Ledger database to use instead of the configured one
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger database and remember its location.
    Init,
    /// Import statements as one batch. Give each CSV file its own --config.
    Import {
        /// CSV statement files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Account configuration (JSON5), one per CSV file, in the same order
        #[arg(long = "config", required = true)]
        configs: Vec<PathBuf>,
    },
    /// Show how a statement would be imported without touching the ledger.
    Preview {
        /// CSV statement file
        file: PathBuf,
        /// Account configuration (JSON5)
        #[arg(long)]
        config: PathBuf,
    },
    /// List transactions in the ledger.
    Transactions {
        /// Only this account
        #[arg(long)]
        account: Option<String>,
    },
    /// Show settings and ledger totals.
    Status,
}

/// Open an initialised ledger; refuses to create one implicitly.
pub(crate) fn open_ledger(path: &Path) -> Result<SqliteLedger> {
    if !path.exists() {
        return Err(ImportError::Ledger(format!(
            "no ledger at {}. Run `csv2ledger init` first.",
            path.display()
        )));
    }
    SqliteLedger::open(path)
}
