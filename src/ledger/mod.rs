//! The ledger that imported transactions end up in.
//!
//! The importer only depends on [`LedgerSink`]; [`SqliteLedger`] is the
//! local store shipped with the binary.

mod sqlite;

pub use sqlite::{LedgerStats, SqliteLedger};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::CandidateTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(pub i64);

/// A transaction as stored in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub uid: String,
    pub account: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    /// Account named by the transfer tag the row was imported with.
    pub counterparty: Option<String>,
    pub transfer_id: Option<TransferId>,
}

/// One side of a linked transfer.
#[derive(Debug, Clone, Copy)]
pub enum TransferLeg<'a> {
    /// Not yet in the ledger; created as part of the transfer.
    New(&'a CandidateTransaction),
    /// Already in the ledger as a plain transaction.
    Existing(TransactionId),
}

/// 0001-01-01 and 9999-12-31 as days from the common era. Dates outside this
/// range do not sort correctly as ISO text.
const FIRST_STORABLE_DAY: i64 = 1;
const LAST_STORABLE_DAY: i64 = 3_652_059;

fn storable_day(days_from_ce: i64) -> NaiveDate {
    let clamped = days_from_ce.clamp(FIRST_STORABLE_DAY, LAST_STORABLE_DAY);
    i32::try_from(clamped)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or(NaiveDate::MIN)
}

/// Search for the other leg of a transfer.
#[derive(Debug, Clone, Copy)]
pub struct CandidateQuery<'a> {
    pub account: &'a str,
    /// Account of the leg looking for its counterpart. Rows tagged as a
    /// transfer with any other account are not offered.
    pub requester: &'a str,
    pub magnitude: Decimal,
    pub tolerance: Decimal,
    pub date: NaiveDate,
    pub window_days: u32,
    /// Whether the wanted leg is an outflow (negative amount).
    pub outflow: bool,
}

impl CandidateQuery<'_> {
    pub fn first_day(&self) -> NaiveDate {
        storable_day(i64::from(self.date.num_days_from_ce()) - i64::from(self.window_days))
    }

    pub fn last_day(&self) -> NaiveDate {
        storable_day(i64::from(self.date.num_days_from_ce()) + i64::from(self.window_days))
    }

    pub fn accepts_counterparty(&self, counterparty: Option<&str>) -> bool {
        counterparty.map_or(true, |c| c == self.requester)
    }

    pub fn accepts_amount(&self, amount: Decimal) -> bool {
        !amount.is_zero()
            && amount.is_sign_negative() == self.outflow
            && (amount.abs() - self.magnitude).abs() <= self.tolerance
    }
}

pub trait LedgerSink {
    /// Whether a transaction with this uid was already imported.
    fn exists(&self, uid: &str) -> Result<bool>;

    /// Store a plain (unlinked) transaction.
    fn create(&mut self, transaction: &CandidateTransaction) -> Result<TransactionId>;

    /// Store two legs as one transfer. Fails if an existing leg is already linked.
    fn create_linked_transfer(
        &mut self,
        leg_a: TransferLeg<'_>,
        leg_b: TransferLeg<'_>,
    ) -> Result<TransferId>;

    /// Unlinked transactions in `query.account` dated within the window whose
    /// amount has the wanted sign and a magnitude within tolerance, and which
    /// are plain or tagged as a transfer with `query.requester`.
    fn find_candidates(&self, query: &CandidateQuery<'_>) -> Result<Vec<LedgerTransaction>>;

    /// All transactions, optionally restricted to one account, oldest first.
    fn transactions(&self, account: Option<&str>) -> Result<Vec<LedgerTransaction>>;
}
