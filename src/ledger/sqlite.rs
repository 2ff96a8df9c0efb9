use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use super::{
    CandidateQuery, LedgerSink, LedgerTransaction, TransactionId, TransferId, TransferLeg,
};
use crate::error::{ImportError, Result};
use crate::models::CandidateTransaction;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transfers (
    id INTEGER PRIMARY KEY,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    uid TEXT NOT NULL UNIQUE,
    account TEXT NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    amount TEXT NOT NULL,
    counterparty TEXT,
    transfer_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (transfer_id) REFERENCES transfers(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_account_date ON transactions (account, date);
";

const SELECT_TRANSACTION: &str =
    "SELECT id, uid, account, date, description, amount, counterparty, transfer_id FROM transactions";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<LedgerTransaction> {
    let raw_amount: String = row.get(5)?;
    let amount = Decimal::from_str(&raw_amount)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(LedgerTransaction {
        id: TransactionId(row.get(0)?),
        uid: row.get(1)?,
        account: row.get(2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        amount,
        counterparty: row.get(6)?,
        transfer_id: row.get::<_, Option<i64>>(7)?.map(TransferId),
    })
}

fn insert_transaction(
    conn: &Connection,
    transaction: &CandidateTransaction,
    transfer_id: Option<TransferId>,
) -> Result<TransactionId> {
    conn.execute(
        "INSERT INTO transactions (uid, account, date, description, amount, counterparty, transfer_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            transaction.uid,
            transaction.account,
            transaction.date,
            transaction.description,
            transaction.amount.to_string(),
            transaction.transfer_target(),
            transfer_id.map(|t| t.0),
        ],
    )?;
    Ok(TransactionId(conn.last_insert_rowid()))
}

fn attach_leg(conn: &Connection, leg: TransferLeg<'_>, transfer_id: TransferId) -> Result<()> {
    match leg {
        TransferLeg::New(transaction) => {
            insert_transaction(conn, transaction, Some(transfer_id))?;
        }
        TransferLeg::Existing(id) => {
            let updated = conn.execute(
                "UPDATE transactions SET transfer_id = ?1 WHERE id = ?2 AND transfer_id IS NULL",
                rusqlite::params![transfer_id.0, id.0],
            )?;
            if updated == 0 {
                return Err(ImportError::Ledger(format!(
                    "transaction {} does not exist or is already part of a transfer",
                    id.0
                )));
            }
        }
    }
    Ok(())
}

pub struct LedgerStats {
    pub transactions: i64,
    pub transfers: i64,
    pub accounts: i64,
}

/// Ledger kept in a local SQLite database file.
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Open (and if needed initialise) the ledger at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = get_connection(path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn stats(&self) -> Result<LedgerStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |r| r.get(0))?)
        };
        Ok(LedgerStats {
            transactions: count("SELECT count(*) FROM transactions")?,
            transfers: count("SELECT count(*) FROM transfers")?,
            accounts: count("SELECT count(DISTINCT account) FROM transactions")?,
        })
    }
}

impl LedgerSink for SqliteLedger {
    fn exists(&self, uid: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM transactions WHERE uid = ?1")?;
        Ok(stmt.exists([uid])?)
    }

    fn create(&mut self, transaction: &CandidateTransaction) -> Result<TransactionId> {
        insert_transaction(&self.conn, transaction, None)
    }

    fn create_linked_transfer(
        &mut self,
        leg_a: TransferLeg<'_>,
        leg_b: TransferLeg<'_>,
    ) -> Result<TransferId> {
        let tx = self.conn.transaction()?;
        tx.execute("INSERT INTO transfers DEFAULT VALUES", [])?;
        let transfer_id = TransferId(tx.last_insert_rowid());
        attach_leg(&tx, leg_a, transfer_id)?;
        attach_leg(&tx, leg_b, transfer_id)?;
        tx.commit()?;
        Ok(transfer_id)
    }

    fn find_candidates(&self, query: &CandidateQuery<'_>) -> Result<Vec<LedgerTransaction>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{SELECT_TRANSACTION} WHERE account = ?1 AND date BETWEEN ?2 AND ?3 \
             AND transfer_id IS NULL AND (counterparty IS NULL OR counterparty = ?4) \
             ORDER BY date, id"
        ))?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    query.account,
                    query.first_day(),
                    query.last_day(),
                    query.requester
                ],
                row_to_transaction,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .filter(|t| query.accepts_amount(t.amount))
            .collect())
    }

    fn transactions(&self, account: Option<&str>) -> Result<Vec<LedgerTransaction>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{SELECT_TRANSACTION} WHERE ?1 IS NULL OR account = ?1 ORDER BY date, id"
        ))?;
        let rows = stmt
            .query_map([account], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TransferDirection, TransferTag};
    use chrono::NaiveDate;

    fn test_ledger() -> (tempfile::TempDir, SqliteLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::open(&dir.path().join("test.db")).unwrap();
        (dir, ledger)
    }

    fn candidate(uid: &str, account: &str, day: u32, cents: i64) -> CandidateTransaction {
        CandidateTransaction {
            line: 2,
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            description: format!("TXN {uid}"),
            amount: Decimal::new(cents, 2),
            account: account.to_string(),
            uid: uid.to_string(),
            transfer: None,
        }
    }

    fn query(account: &str, day: u32, cents: i64, window_days: u32) -> CandidateQuery<'_> {
        CandidateQuery {
            account,
            requester: "Checking",
            magnitude: Decimal::new(cents, 2),
            tolerance: Decimal::ZERO,
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            window_days,
            outflow: false,
        }
    }

    fn by_id(ledger: &SqliteLedger, id: TransactionId) -> LedgerTransaction {
        ledger
            .transactions(None)
            .unwrap()
            .into_iter()
            .find(|t| t.id == id)
            .unwrap()
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, ledger) = test_ledger();
        let tables: Vec<String> = ledger
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["transactions", "transfers"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, ledger) = test_ledger();
        init_db(&ledger.conn).unwrap();
    }

    #[test]
    fn test_create_and_exists() {
        let (_dir, mut ledger) = test_ledger();
        assert!(!ledger.exists("a").unwrap());
        let id = ledger.create(&candidate("a", "Checking", 15, -1050)).unwrap();
        assert!(ledger.exists("a").unwrap());
        let stored = by_id(&ledger, id);
        assert_eq!(stored.amount, Decimal::new(-1050, 2));
        assert_eq!(stored.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(stored.transfer_id, None);
    }

    #[test]
    fn test_duplicate_uid_is_rejected() {
        let (_dir, mut ledger) = test_ledger();
        ledger.create(&candidate("a", "Checking", 15, -1050)).unwrap();
        assert!(matches!(
            ledger.create(&candidate("a", "Checking", 15, -1050)),
            Err(ImportError::Db(_))
        ));
    }

    #[test]
    fn test_linked_transfer_with_new_legs() {
        let (_dir, mut ledger) = test_ledger();
        let out = candidate("out", "Checking", 15, -10000);
        let inn = candidate("in", "Savings", 16, 10000);
        let transfer = ledger
            .create_linked_transfer(TransferLeg::New(&out), TransferLeg::New(&inn))
            .unwrap();
        let all = ledger.transactions(None).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.transfer_id == Some(transfer)));
        assert_eq!(ledger.stats().unwrap().transfers, 1);
    }

    #[test]
    fn test_linked_transfer_with_existing_leg() {
        let (_dir, mut ledger) = test_ledger();
        let existing = ledger.create(&candidate("in", "Savings", 16, 10000)).unwrap();
        let out = candidate("out", "Checking", 15, -10000);
        let transfer = ledger
            .create_linked_transfer(TransferLeg::New(&out), TransferLeg::Existing(existing))
            .unwrap();
        let stored = by_id(&ledger, existing);
        assert_eq!(stored.transfer_id, Some(transfer));
    }

    #[test]
    fn test_existing_leg_cannot_be_linked_twice() {
        let (_dir, mut ledger) = test_ledger();
        let existing = ledger.create(&candidate("in", "Savings", 16, 10000)).unwrap();
        let first = candidate("out1", "Checking", 15, -10000);
        ledger
            .create_linked_transfer(TransferLeg::New(&first), TransferLeg::Existing(existing))
            .unwrap();
        let second = candidate("out2", "Checking", 15, -10000);
        let err = ledger
            .create_linked_transfer(TransferLeg::New(&second), TransferLeg::Existing(existing))
            .unwrap_err();
        assert!(matches!(err, ImportError::Ledger(_)));
        // The failed transfer is rolled back entirely.
        assert!(!ledger.exists("out2").unwrap());
        assert_eq!(ledger.stats().unwrap().transfers, 1);
    }

    #[test]
    fn test_find_candidates_filters_window_sign_and_links() {
        let (_dir, mut ledger) = test_ledger();
        ledger.create(&candidate("in-d14", "Savings", 14, 10000)).unwrap();
        ledger.create(&candidate("in-d18", "Savings", 18, 10000)).unwrap();
        ledger.create(&candidate("out-d15", "Savings", 15, -10000)).unwrap();
        ledger.create(&candidate("in-other", "Brokerage", 15, 10000)).unwrap();
        ledger.create(&candidate("in-wrong-amount", "Savings", 15, 9999)).unwrap();
        let linked = candidate("in-linked", "Savings", 15, 10000);
        let partner = candidate("partner", "Checking", 15, -10000);
        ledger
            .create_linked_transfer(TransferLeg::New(&partner), TransferLeg::New(&linked))
            .unwrap();

        let found = ledger.find_candidates(&query("Savings", 15, 10000, 2)).unwrap();
        let uids: Vec<&str> = found.iter().map(|t| t.uid.as_str()).collect();
        assert_eq!(uids, vec!["in-d14"]);

        let found = ledger.find_candidates(&query("Savings", 15, 10000, 3)).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_find_candidates_with_tolerance() {
        let (_dir, mut ledger) = test_ledger();
        ledger.create(&candidate("close", "Savings", 15, 10001)).unwrap();
        let mut q = query("Savings", 15, 10000, 0);
        assert!(ledger.find_candidates(&q).unwrap().is_empty());
        q.tolerance = Decimal::new(1, 2);
        assert_eq!(ledger.find_candidates(&q).unwrap().len(), 1);
    }

    #[test]
    fn test_find_candidates_skips_rows_tagged_for_another_account() {
        let (_dir, mut ledger) = test_ledger();
        let mut brokerage = candidate("from-brokerage", "Savings", 15, 10000);
        brokerage.transfer = Some(TransferTag {
            direction: TransferDirection::In,
            counterparty: "Brokerage".to_string(),
        });
        ledger.create(&brokerage).unwrap();
        assert!(ledger.find_candidates(&query("Savings", 15, 10000, 0)).unwrap().is_empty());

        let mut checking = candidate("from-checking", "Savings", 15, 10000);
        checking.transfer = Some(TransferTag {
            direction: TransferDirection::In,
            counterparty: "Checking".to_string(),
        });
        ledger.create(&checking).unwrap();
        ledger.create(&candidate("plain", "Savings", 15, 10000)).unwrap();
        let found = ledger.find_candidates(&query("Savings", 15, 10000, 0)).unwrap();
        let uids: Vec<&str> = found.iter().map(|t| t.uid.as_str()).collect();
        assert_eq!(uids, vec!["from-checking", "plain"]);
        assert_eq!(found[0].counterparty.as_deref(), Some("Checking"));
    }

    #[test]
    fn test_find_candidates_with_huge_window() {
        let (_dir, mut ledger) = test_ledger();
        ledger.create(&candidate("far", "Savings", 1, 10000)).unwrap();
        let found = ledger
            .find_candidates(&query("Savings", 31, 10000, u32::MAX))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_transactions_by_account() {
        let (_dir, mut ledger) = test_ledger();
        ledger.create(&candidate("b", "Checking", 16, -100)).unwrap();
        ledger.create(&candidate("a", "Checking", 15, -100)).unwrap();
        ledger.create(&candidate("c", "Savings", 15, 100)).unwrap();
        let checking = ledger.transactions(Some("Checking")).unwrap();
        let uids: Vec<&str> = checking.iter().map(|t| t.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b"]);
        assert_eq!(ledger.transactions(None).unwrap().len(), 3);
        assert_eq!(ledger.stats().unwrap().accounts, 2);
    }
}
