use std::fmt;

use thiserror::Error;

/// Why a row produced no usable amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountProblem {
    /// Every configured amount cell is blank.
    Blank,
    /// Both the credit and the debit cell carry a value.
    Conflict,
    /// A non-blank cell is not a number.
    Unparsable,
}

impl fmt::Display for AmountProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => write!(f, "no amount present"),
            Self::Conflict => write!(f, "both credit and debit present"),
            Self::Unparsable => write!(f, "not a number"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Line {line}: date '{value}' in column '{column}' does not match format '{format}'")]
    MalformedDate {
        line: usize,
        column: String,
        value: String,
        format: String,
    },

    #[error("Line {line}: {problem} (column '{column}', value '{value}')")]
    MissingAmount {
        line: usize,
        column: String,
        value: String,
        problem: AmountProblem,
    },

    #[error("Configured column '{column}' ({field}) not found in CSV header")]
    ConfigColumnMissing { field: &'static str, column: String },

    #[error("Line {line}: '{description}' matches {candidates} transfer candidates in '{account}' equally well")]
    AmbiguousTransferMatch {
        line: usize,
        description: String,
        account: String,
        candidates: usize,
    },

    #[error("{path}: {source}")]
    File {
        path: String,
        #[source]
        source: Box<ImportError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config syntax error: {0}")]
    Json5(#[from] json5::Error),
}

impl ImportError {
    /// Attach the file the error came from.
    pub fn in_file(self, path: &std::path::Path) -> Self {
        Self::File {
            path: path.display().to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
