use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::open_ledger;
use crate::error::Result;
use crate::fmt::{money, short_uid};
use crate::ledger::LedgerSink;

pub fn list(ledger_path: &Path, account: Option<&str>) -> Result<()> {
    let ledger = open_ledger(ledger_path)?;
    let rows = ledger.transactions(account)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Account", "Description", "Amount", "Transfer", "UID"]);
    for t in &rows {
        table.add_row(vec![
            Cell::new(t.id.0),
            Cell::new(t.date.format("%Y-%m-%d")),
            Cell::new(&t.account),
            Cell::new(&t.description),
            Cell::new(money(t.amount)),
            Cell::new(t.transfer_id.map(|id| format!("#{}", id.0)).unwrap_or_default()),
            Cell::new(short_uid(&t.uid)),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}
