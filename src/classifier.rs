use rust_decimal::Decimal;

use crate::config::AccountConfig;
use crate::models::{CandidateTransaction, TransferDirection, TransferTag};

/// Decide whether a transaction is a transfer leg. Outflows consult
/// `transfers_out`, inflows `transfers_in`; the description must match a key
/// exactly. Zero amounts are never transfers.
pub fn classify(
    description: &str,
    amount: Decimal,
    config: &AccountConfig,
) -> Option<TransferTag> {
    let (map, direction) = if amount.is_zero() {
        return None;
    } else if amount.is_sign_negative() {
        (&config.transfers_out, TransferDirection::Out)
    } else {
        (&config.transfers_in, TransferDirection::In)
    };
    map.get(description).map(|counterparty| TransferTag {
        direction,
        counterparty: counterparty.clone(),
    })
}

pub fn tag_transfer(candidate: &mut CandidateTransaction, config: &AccountConfig) {
    candidate.transfer = classify(&candidate.description, candidate.amount, config);
}
