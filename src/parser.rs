use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;

use crate::config::{AccountConfig, AmountColumns, UidSource};
use crate::error::{AmountProblem, ImportError, Result};
use crate::models::ParsedRow;

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

/// Parse a statement amount. Strips thousands separators, quotes and the
/// dollar sign; `(12.50)` reads as negative. `None` when it is not a number.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<Decimal>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Parse a date cell, accepting formats that also carry a time of day.
pub fn parse_date(raw: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, format).ok().map(|dt| dt.date()))
}

fn cell(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("").trim()
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

/// Amount column position(s), with the configured names for error reports.
enum AmountIndex {
    Single { index: usize, name: String },
    Split {
        credit: usize,
        debit: usize,
        credit_name: String,
        debit_name: String,
    },
}

/// Configured column names resolved to positions in one file's header.
struct ColumnIndex {
    date: usize,
    description: usize,
    amount: AmountIndex,
    uid_extra: Option<usize>,
    description_suffix: Option<usize>,
}

impl ColumnIndex {
    fn resolve(header: &StringRecord, config: &AccountConfig) -> Result<Self> {
        // A repeated header name resolves to its first occurrence.
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            positions.entry(name.trim()).or_insert(i);
        }
        let find = |field: &'static str, column: &str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| ImportError::ConfigColumnMissing {
                    field,
                    column: column.to_string(),
                })
        };

        let amount = match config.amount_columns()? {
            AmountColumns::Single(col) => AmountIndex::Single {
                index: find("amount_column", col)?,
                name: col.to_string(),
            },
            AmountColumns::Split { credit, debit } => AmountIndex::Split {
                credit: find("credit_column", credit)?,
                debit: find("debit_column", debit)?,
                credit_name: credit.to_string(),
                debit_name: debit.to_string(),
            },
        };
        let uid_extra = match config.uid_source() {
            Some(UidSource::Column(col)) => Some(find("additional_uid_column", col)?),
            Some(UidSource::RowIndex) | None => None,
        };
        // Not required in the header.
        let description_suffix = config
            .description_suffix_column
            .as_deref()
            .and_then(|col| positions.get(col).copied());

        Ok(Self {
            date: find("date_column", &config.date_column)?,
            description: find("description_column", &config.description_column)?,
            amount,
            uid_extra,
            description_suffix,
        })
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

fn parse_cell_amount(raw: &str, column: &str, line: usize) -> Result<Decimal> {
    parse_amount(raw).ok_or_else(|| ImportError::MissingAmount {
        line,
        column: column.to_string(),
        value: raw.to_string(),
        problem: AmountProblem::Unparsable,
    })
}

fn row_amount(
    record: &StringRecord,
    columns: &ColumnIndex,
    config: &AccountConfig,
    line: usize,
) -> Result<Decimal> {
    let amount = match &columns.amount {
        AmountIndex::Single { index, name } => {
            let raw = cell(record, *index);
            if raw.is_empty() {
                return Err(ImportError::MissingAmount {
                    line,
                    column: name.to_string(),
                    value: String::new(),
                    problem: AmountProblem::Blank,
                });
            }
            parse_cell_amount(raw, name, line)?
        }
        AmountIndex::Split {
            credit,
            debit,
            credit_name,
            debit_name,
        } => {
            let credit_raw = cell(record, *credit);
            let debit_raw = cell(record, *debit);
            match (credit_raw.is_empty(), debit_raw.is_empty()) {
                (false, true) => parse_cell_amount(credit_raw, credit_name, line)?.abs(),
                (true, false) => -parse_cell_amount(debit_raw, debit_name, line)?.abs(),
                (true, true) => {
                    return Err(ImportError::MissingAmount {
                        line,
                        column: format!("{credit_name}/{debit_name}"),
                        value: String::new(),
                        problem: AmountProblem::Blank,
                    })
                }
                (false, false) => {
                    return Err(ImportError::MissingAmount {
                        line,
                        column: format!("{credit_name}/{debit_name}"),
                        value: format!("{credit_raw}/{debit_raw}"),
                        problem: AmountProblem::Conflict,
                    })
                }
            }
        }
    };
    Ok(if config.invert_amount { -amount } else { amount })
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnIndex,
    config: &AccountConfig,
    line: usize,
    position: usize,
) -> Result<ParsedRow> {
    let raw_date = cell(record, columns.date);
    let date = parse_date(raw_date, &config.date_format).ok_or_else(|| {
        ImportError::MalformedDate {
            line,
            column: config.date_column.clone(),
            value: raw_date.to_string(),
            format: config.date_format.clone(),
        }
    })?;

    let amount = row_amount(record, columns, config, line)?;

    let mut description = cell(record, columns.description).to_string();
    if let Some(i) = columns.description_suffix {
        let suffix = cell(record, i);
        if !suffix.is_empty() {
            description.push(' ');
            description.push_str(suffix);
        }
    }

    let uid_extra = match config.uid_source() {
        Some(UidSource::RowIndex) => Some(position.to_string()),
        Some(UidSource::Column(_)) => columns.uid_extra.map(|i| cell(record, i).to_string()),
        None => None,
    };

    Ok(ParsedRow {
        line,
        date,
        description,
        amount,
        account: config.account.clone(),
        uid_extra,
    })
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// Parse a whole statement. Stops at the first malformed row.
pub fn read_statement<R: Read>(reader: R, config: &AccountConfig) -> Result<Vec<ParsedRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = ColumnIndex::resolve(rdr.headers()?, config)?;

    let mut rows = Vec::new();
    for (position, result) in rdr.records().enumerate() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(position + 2);
        rows.push(parse_row(&record, &columns, config, line, position)?);
    }
    if config.reverse_rows {
        rows.reverse();
    }
    log::debug!("Parsed {} rows for account '{}'", rows.len(), config.account);
    Ok(rows)
}

pub fn read_statement_file(path: &Path, config: &AccountConfig) -> Result<Vec<ParsedRow>> {
    let file = std::fs::File::open(path)?;
    read_statement(std::io::BufReader::new(file), config)
}
