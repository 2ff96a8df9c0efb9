use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::ledger::SqliteLedger;
use crate::settings::{load_settings, save_settings};

pub fn run(ledger_path: &Path, explicit: bool) -> Result<()> {
    if explicit {
        let mut settings = load_settings();
        settings.ledger_path = absolute(ledger_path).to_string_lossy().to_string();
        save_settings(&settings)?;
    }

    if let Some(dir) = ledger_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    SqliteLedger::open(ledger_path)?;

    println!("Initialized ledger at {}", ledger_path.display());
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
