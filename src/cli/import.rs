use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::cli::open_ledger;
use crate::config::AccountConfig;
use crate::error::{ImportError, Result};
use crate::importer::{import_statements, Statement};

/// Load every (CSV, config) pair; the first failure aborts the whole batch.
pub(crate) fn load_statements(files: &[PathBuf], configs: &[PathBuf]) -> Result<Vec<Statement>> {
    if files.len() != configs.len() {
        return Err(ImportError::Config(format!(
            "{} CSV file(s) but {} --config value(s); give each file its own --config",
            files.len(),
            configs.len()
        )));
    }
    files
        .iter()
        .zip(configs)
        .map(|(file, config_path)| {
            let config = AccountConfig::load(config_path).map_err(|e| e.in_file(config_path))?;
            Statement::from_file(file, config).map_err(|e| e.in_file(file))
        })
        .collect()
}

pub fn run(ledger_path: &Path, files: &[PathBuf], configs: &[PathBuf]) -> Result<()> {
    let statements = load_statements(files, configs)?;
    let mut ledger = open_ledger(ledger_path)?;

    let report = import_statements(&mut ledger, &statements)?;

    println!("Created {} transactions", report.created);
    println!("Skipped {} transactions (already imported)", report.skipped);
    println!("Transfers matched: {}", report.transfers_linked);

    if !report.ambiguous.is_empty() {
        println!();
        println!(
            "{}",
            format!("{} transfer(s) imported unlinked:", report.ambiguous.len())
                .yellow()
                .bold()
        );
        for err in &report.ambiguous {
            println!("  {err}");
        }
    }
    Ok(())
}
