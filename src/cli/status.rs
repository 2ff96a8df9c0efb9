use std::path::Path;

use crate::cli::open_ledger;
use crate::error::Result;
use crate::settings::settings_path;

pub fn run(ledger_path: &Path) -> Result<()> {
    println!("Settings:   {}", settings_path().display());
    println!("Ledger:     {}", ledger_path.display());

    if ledger_path.exists() {
        let stats = open_ledger(ledger_path)?.stats()?;
        println!();
        println!("Accounts:      {}", stats.accounts);
        println!("Transactions:  {}", stats.transactions);
        println!("Transfers:     {}", stats.transfers);
    } else {
        println!();
        println!("Ledger not found. Run `csv2ledger init` to set up.");
    }

    Ok(())
}
