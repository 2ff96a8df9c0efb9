use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// `additional_uid_column` value that selects the row's position in the file.
pub const ROW_INDEX_UID_COLUMN: &str = "idx";

/// Per-account description of a statement export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub account: String,
    pub date_format: String,
    pub date_column: String,
    pub description_column: String,
    pub amount_column: Option<String>,
    pub credit_column: Option<String>,
    pub debit_column: Option<String>,
    #[serde(default)]
    pub invert_amount: bool,
    pub additional_uid_column: Option<String>,
    pub description_suffix_column: Option<String>,
    #[serde(default)]
    pub transfers_out: HashMap<String, String>,
    #[serde(default)]
    pub transfers_in: HashMap<String, String>,
    pub date_window_days: Option<u32>,
    #[serde(default)]
    pub amount_tolerance: Decimal,
    #[serde(default)]
    pub reverse_rows: bool,
}

/// Where the signed amount of a row comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountColumns<'a> {
    Single(&'a str),
    Split { credit: &'a str, debit: &'a str },
}

/// Source of the value that disambiguates otherwise identical rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidSource<'a> {
    Column(&'a str),
    RowIndex,
}

impl AccountConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json5(&content)
    }

    pub fn from_json5(content: &str) -> Result<Self> {
        let config: Self = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() {
            return Err(ImportError::Config("'account' must not be empty".into()));
        }
        if self.date_format.trim().is_empty() {
            return Err(ImportError::Config("'date_format' must not be empty".into()));
        }
        if self.amount_tolerance.is_sign_negative() {
            return Err(ImportError::Config(format!(
                "'amount_tolerance' must not be negative, got {}",
                self.amount_tolerance
            )));
        }
        self.amount_columns()?;
        Ok(())
    }

    pub fn amount_columns(&self) -> Result<AmountColumns<'_>> {
        match (
            self.amount_column.as_deref(),
            self.credit_column.as_deref(),
            self.debit_column.as_deref(),
        ) {
            (Some(amount), None, None) => Ok(AmountColumns::Single(amount)),
            (None, Some(credit), Some(debit)) => Ok(AmountColumns::Split { credit, debit }),
            (Some(_), _, _) => Err(ImportError::Config(
                "'amount_column' cannot be combined with 'credit_column'/'debit_column'".into(),
            )),
            _ => Err(ImportError::Config(
                "set either 'amount_column' or both 'credit_column' and 'debit_column'".into(),
            )),
        }
    }

    pub fn uid_source(&self) -> Option<UidSource<'_>> {
        self.additional_uid_column.as_deref().map(|col| {
            if col == ROW_INDEX_UID_COLUMN {
                UidSource::RowIndex
            } else {
                UidSource::Column(col)
            }
        })
    }
}
