use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::models::{CandidateTransaction, ParsedRow};

const FIELD_SEPARATOR: u8 = 0x1f;

/// Amount with at least two decimal places and no trailing noise, so
/// `50`, `50.0` and `50.000` all render as `50.00`.
fn canonical_amount(amount: Decimal) -> String {
    let mut canonical = amount.normalize();
    let scale = canonical.scale().max(2);
    canonical.rescale(scale);
    canonical.to_string()
}

/// Deduplication key of a row: SHA-256 over its account, ISO date,
/// description, amount and optional tie-breaker, hex encoded.
pub fn compute_uid(row: &ParsedRow) -> String {
    let date = row.date.format("%Y-%m-%d").to_string();
    let amount = canonical_amount(row.amount);
    let mut fields = vec![
        row.account.as_str(),
        date.as_str(),
        row.description.as_str(),
        amount.as_str(),
    ];
    if let Some(extra) = &row.uid_extra {
        fields.push(extra.as_str());
    }

    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([FIELD_SEPARATOR]);
        }
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

pub fn identify(row: ParsedRow) -> CandidateTransaction {
    let uid = compute_uid(&row);
    CandidateTransaction {
        line: row.line,
        date: row.date,
        description: row.description,
        amount: row.amount,
        account: row.account,
        uid,
        transfer: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(extra: Option<&str>) -> ParsedRow {
        ParsedRow {
            line: 2,
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            description: "MONTHLY FEE".to_string(),
            amount: Decimal::new(-500, 2),
            account: "Checking".to_string(),
            uid_extra: extra.map(str::to_string),
        }
    }

    #[test]
    fn test_uid_is_deterministic() {
        assert_eq!(compute_uid(&row(None)), compute_uid(&row(None)));
        assert_eq!(compute_uid(&row(Some("1"))), compute_uid(&row(Some("1"))));
    }

    #[test]
    fn test_uid_is_fixed_length_hex() {
        let uid = compute_uid(&row(None));
        assert_eq!(uid.len(), 64);
        assert!(uid.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tie_breaker_separates_identical_rows() {
        assert_ne!(compute_uid(&row(Some("99.00"))), compute_uid(&row(Some("98.00"))));
        assert_ne!(compute_uid(&row(None)), compute_uid(&row(Some("99.00"))));
    }

    #[test]
    fn test_uid_ignores_line_number() {
        let mut other = row(None);
        other.line = 40;
        assert_eq!(compute_uid(&row(None)), compute_uid(&other));
    }

    #[test]
    fn test_uid_sensitive_to_every_field() {
        let base = compute_uid(&row(None));

        let mut r = row(None);
        r.account = "Savings".to_string();
        assert_ne!(compute_uid(&r), base);

        let mut r = row(None);
        r.date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        assert_ne!(compute_uid(&r), base);

        let mut r = row(None);
        r.description = "MONTHLY FEE REFUND".to_string();
        assert_ne!(compute_uid(&r), base);

        let mut r = row(None);
        r.amount = Decimal::new(500, 2);
        assert_ne!(compute_uid(&r), base);
    }

    #[test]
    fn test_canonical_amount() {
        assert_eq!(canonical_amount(Decimal::new(50, 0)), "50.00");
        assert_eq!(canonical_amount(Decimal::new(50000, 3)), "50.00");
        assert_eq!(canonical_amount(Decimal::new(-4210, 2)), "-42.10");
        assert_eq!(canonical_amount(Decimal::new(1125, 3)), "1.125");
    }

    #[test]
    fn test_identify_carries_fields() {
        let candidate = identify(row(None));
        assert_eq!(candidate.uid, compute_uid(&row(None)));
        assert_eq!(candidate.description, "MONTHLY FEE");
        assert!(candidate.transfer.is_none());
    }
}
