//! Pairing of transfer legs across tracked accounts.
//!
//! A transfer-tagged transaction looks for its other leg in two places: the
//! not-yet-submitted part of the current batch, and the ledger itself. The
//! best candidate is the one closest in date, then the one with an exact
//! amount. A tie on both is ambiguous and yields no link.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::config::AccountConfig;
use crate::error::Result;
use crate::ledger::{CandidateQuery, LedgerSink, LedgerTransaction};
use crate::models::CandidateTransaction;

/// Matching knobs of the account a transaction was imported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchPolicy {
    /// `None` requires both legs on the same day.
    pub window_days: Option<u32>,
    pub tolerance: Decimal,
}

impl MatchPolicy {
    pub fn window(&self) -> u32 {
        self.window_days.unwrap_or(0)
    }
}

impl From<&AccountConfig> for MatchPolicy {
    fn from(config: &AccountConfig) -> Self {
        Self {
            window_days: config.date_window_days,
            tolerance: config.amount_tolerance,
        }
    }
}

// ---------------------------------------------------------------------------
// In-batch index
// ---------------------------------------------------------------------------

/// Batch transactions bucketed by (account, date) so a window lookup touches
/// a handful of buckets instead of the whole batch. Tracks which entries are
/// still free to be matched.
pub struct BatchIndex {
    bucket_days: i64,
    buckets: HashMap<(String, i64), Vec<usize>>,
    available: Vec<bool>,
}

fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

impl BatchIndex {
    pub fn new(batch: &[CandidateTransaction], bucket_days: u32) -> Self {
        let bucket_days = i64::from(bucket_days.max(1));
        let mut buckets: HashMap<(String, i64), Vec<usize>> = HashMap::new();
        for (i, candidate) in batch.iter().enumerate() {
            let bucket = day_number(candidate.date).div_euclid(bucket_days);
            buckets
                .entry((candidate.account.clone(), bucket))
                .or_default()
                .push(i);
        }
        Self {
            bucket_days,
            buckets,
            available: vec![true; batch.len()],
        }
    }

    pub fn is_available(&self, i: usize) -> bool {
        self.available.get(i).copied().unwrap_or(false)
    }

    pub fn mark_used(&mut self, i: usize) {
        if let Some(slot) = self.available.get_mut(i) {
            *slot = false;
        }
    }

    /// Available batch entries of `account` dated within `window` days of `date`.
    fn near<'a>(
        &'a self,
        batch: &'a [CandidateTransaction],
        account: &'a str,
        date: NaiveDate,
        window: u32,
    ) -> impl Iterator<Item = usize> + 'a {
        let day = day_number(date);
        let window = i64::from(window);
        let first = (day - window).div_euclid(self.bucket_days);
        let last = (day + window).div_euclid(self.bucket_days);
        (first..=last)
            .filter_map(move |bucket| self.buckets.get(&(account.to_string(), bucket)))
            .flatten()
            .copied()
            .filter(move |&j| {
                self.is_available(j) && (day_number(batch[j].date) - day).abs() <= window
            })
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Where the other leg of a transfer was found.
#[derive(Debug, Clone, PartialEq)]
pub enum Counterpart {
    /// Index into the current batch.
    Batch(usize),
    Ledger(LedgerTransaction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Unique(Counterpart),
    NoMatch,
    /// Number of candidates sharing the best score.
    Ambiguous(usize),
}

/// Lower is better: date distance first, then inexact before exact.
type Score = (i64, bool);

fn score(candidate: &CandidateTransaction, date: NaiveDate, amount: Decimal) -> Score {
    let distance = (day_number(date) - day_number(candidate.date)).abs();
    let inexact = amount.abs() != candidate.magnitude();
    (distance, inexact)
}

/// Whether a batch entry could be the other leg of the querying transaction.
fn batch_eligible(other: &CandidateTransaction, query: &CandidateQuery<'_>) -> bool {
    query.accepts_amount(other.amount) && query.accepts_counterparty(other.transfer_target())
}

/// Find the other leg of the transfer-tagged `batch[i]`. The caller marks
/// `batch[i]` as used before calling, so it never matches itself.
pub fn find_match<L: LedgerSink + ?Sized>(
    i: usize,
    batch: &[CandidateTransaction],
    index: &BatchIndex,
    ledger: &L,
    policy: MatchPolicy,
) -> Result<MatchOutcome> {
    let candidate = &batch[i];
    let Some(target) = candidate.transfer_target() else {
        return Ok(MatchOutcome::NoMatch);
    };
    let query = CandidateQuery {
        account: target,
        requester: &candidate.account,
        magnitude: candidate.magnitude(),
        tolerance: policy.tolerance,
        date: candidate.date,
        window_days: policy.window(),
        outflow: !candidate.amount.is_sign_negative(),
    };
    log::debug!(
        "Searching '{}' for {} on {} (±{} days) to pair with line {}",
        target,
        query.magnitude,
        query.date,
        query.window_days,
        candidate.line
    );

    let mut scored: Vec<(Score, Counterpart)> = index
        .near(batch, target, candidate.date, query.window_days)
        .filter(|&j| j != i && batch_eligible(&batch[j], &query))
        .map(|j| (score(candidate, batch[j].date, batch[j].amount), Counterpart::Batch(j)))
        .collect();
    for existing in ledger.find_candidates(&query)? {
        scored.push((
            score(candidate, existing.date, existing.amount),
            Counterpart::Ledger(existing),
        ));
    }

    let Some(best) = scored.iter().map(|(s, _)| *s).min() else {
        return Ok(MatchOutcome::NoMatch);
    };
    let mut winners = scored.into_iter().filter(|(s, _)| *s == best);
    match (winners.next(), winners.count()) {
        (Some((_, counterpart)), 0) => Ok(MatchOutcome::Unique(counterpart)),
        (Some(_), others) => Ok(MatchOutcome::Ambiguous(others + 1)),
        (None, _) => Ok(MatchOutcome::NoMatch),
    }
}
