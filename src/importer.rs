use std::collections::HashSet;
use std::path::Path;

use crate::classifier::tag_transfer;
use crate::config::AccountConfig;
use crate::error::{ImportError, Result};
use crate::identity::identify;
use crate::ledger::{LedgerSink, TransferLeg};
use crate::matcher::{find_match, BatchIndex, Counterpart, MatchOutcome, MatchPolicy};
use crate::models::{CandidateTransaction, ParsedRow};
use crate::parser::read_statement_file;

/// One parsed statement file together with the configuration of its account.
pub struct Statement {
    pub config: AccountConfig,
    pub rows: Vec<ParsedRow>,
}

impl Statement {
    pub fn from_file(csv_path: &Path, config: AccountConfig) -> Result<Self> {
        let rows = read_statement_file(csv_path, &config)?;
        Ok(Self { config, rows })
    }

    /// Rows with their uid and transfer tag attached.
    pub fn candidates(&self) -> Vec<CandidateTransaction> {
        self.rows
            .iter()
            .cloned()
            .map(|row| {
                let mut candidate = identify(row);
                tag_transfer(&mut candidate, &self.config);
                candidate
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ledger transactions created, counting both new legs of a transfer.
    pub created: usize,
    /// Rows whose uid was already in the ledger or earlier in the batch.
    pub skipped: usize,
    pub transfers_linked: usize,
    /// Transfers submitted unlinked because the other leg was ambiguous.
    pub ambiguous: Vec<ImportError>,
}

/// Submit a batch of statements to the ledger.
///
/// Rows already known to the ledger are skipped. Transfer legs are paired
/// with their counterpart from the rest of the batch or from the ledger;
/// anything left unpaired is submitted as a plain transaction.
pub fn import_statements<L: LedgerSink + ?Sized>(
    ledger: &mut L,
    statements: &[Statement],
) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut seen = HashSet::new();
    let mut batch = Vec::new();
    let mut policies = Vec::new();

    for statement in statements {
        let policy = MatchPolicy::from(&statement.config);
        for candidate in statement.candidates() {
            if !seen.insert(candidate.uid.clone()) || ledger.exists(&candidate.uid)? {
                log::info!(
                    "Transaction {} already exists (line {}, '{}')",
                    candidate.uid,
                    candidate.line,
                    candidate.description
                );
                report.skipped += 1;
                continue;
            }
            batch.push(candidate);
            policies.push(policy);
        }
    }

    let bucket_days = policies
        .iter()
        .map(MatchPolicy::window)
        .max()
        .unwrap_or(0)
        .saturating_add(1);
    let mut index = BatchIndex::new(&batch, bucket_days);

    for i in 0..batch.len() {
        if !index.is_available(i) {
            continue;
        }
        index.mark_used(i);
        let candidate = &batch[i];

        let outcome = if candidate.transfer.is_some() {
            find_match(i, &batch, &index, &*ledger, policies[i])?
        } else {
            MatchOutcome::NoMatch
        };

        match outcome {
            MatchOutcome::Unique(counterpart) => {
                let (other, new_legs) = match &counterpart {
                    Counterpart::Batch(j) => {
                        index.mark_used(*j);
                        (TransferLeg::New(&batch[*j]), 2)
                    }
                    Counterpart::Ledger(existing) => (TransferLeg::Existing(existing.id), 1),
                };
                let this = TransferLeg::New(candidate);
                let (source, destination) = if candidate.amount.is_sign_negative() {
                    (this, other)
                } else {
                    (other, this)
                };
                let transfer = ledger.create_linked_transfer(source, destination)?;
                log::info!(
                    "Linked transfer {}: {} {} on {} ({})",
                    transfer.0,
                    candidate.account,
                    candidate.amount,
                    candidate.date,
                    candidate.description
                );
                report.created += new_legs;
                report.transfers_linked += 1;
            }
            MatchOutcome::Ambiguous(candidates) => {
                let err = ImportError::AmbiguousTransferMatch {
                    line: candidate.line,
                    description: candidate.description.clone(),
                    account: candidate.transfer_target().unwrap_or_default().to_string(),
                    candidates,
                };
                log::warn!("{err}; importing it unlinked");
                report.ambiguous.push(err);
                create_plain(ledger, candidate)?;
                report.created += 1;
            }
            MatchOutcome::NoMatch => {
                create_plain(ledger, candidate)?;
                report.created += 1;
            }
        }
    }

    Ok(report)
}

fn create_plain<L: LedgerSink + ?Sized>(
    ledger: &mut L,
    candidate: &CandidateTransaction,
) -> Result<()> {
    let id = ledger.create(candidate)?;
    log::info!(
        "Created {} {}: {} - {}",
        candidate.kind(),
        id.0,
        candidate.amount,
        candidate.description
    );
    Ok(())
}
