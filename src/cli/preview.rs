use std::path::Path;

use comfy_table::{Cell, Table};

use crate::config::AccountConfig;
use crate::error::Result;
use crate::fmt::{money, short_uid};
use crate::importer::Statement;
use crate::models::TransferDirection;

pub fn run(file: &Path, config_path: &Path) -> Result<()> {
    let config = AccountConfig::load(config_path).map_err(|e| e.in_file(config_path))?;
    let statement = Statement::from_file(file, config).map_err(|e| e.in_file(file))?;
    let candidates = statement.candidates();

    let mut table = Table::new();
    table.set_header(vec!["Line", "Date", "Description", "Amount", "Type", "Transfer", "UID"]);
    for c in &candidates {
        let transfer = match &c.transfer {
            Some(tag) if tag.direction == TransferDirection::Out => format!("-> {}", tag.counterparty),
            Some(tag) => format!("<- {}", tag.counterparty),
            None => String::new(),
        };
        table.add_row(vec![
            Cell::new(c.line),
            Cell::new(c.date.format("%Y-%m-%d")),
            Cell::new(&c.description),
            Cell::new(money(c.amount)),
            Cell::new(c.kind()),
            Cell::new(transfer),
            Cell::new(short_uid(&c.uid)),
        ]);
    }
    println!("{} ({} rows)\n{table}", statement.config.account, candidates.len());
    Ok(())
}
