use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One statement row after column mapping, before it has an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// Line in the source file where the row starts (header is line 1).
    pub line: usize,
    pub date: NaiveDate,
    pub description: String,
    /// Positive is inflow, negative is outflow.
    pub amount: Decimal,
    pub account: String,
    /// Raw tie-breaker value for the uid, when the account configures one.
    pub uid_extra: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    Out,
    In,
}

/// Marks a transaction as one leg of a transfer with another tracked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTag {
    pub direction: TransferDirection,
    pub counterparty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTransaction {
    pub line: usize,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub account: String,
    pub uid: String,
    pub transfer: Option<TransferTag>,
}

impl CandidateTransaction {
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn transfer_target(&self) -> Option<&str> {
        self.transfer.as_ref().map(|t| t.counterparty.as_str())
    }

    /// Ledger transaction type as shown to the user.
    pub fn kind(&self) -> &'static str {
        match (&self.transfer, self.amount.is_sign_negative()) {
            (Some(_), _) => "transfer",
            (None, true) => "withdrawal",
            (None, false) => "deposit",
        }
    }
}
