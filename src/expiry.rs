// 📅 Expiry Evaluator - 2-digit year/month comparison against a reference date
// The reference date is injectable so month/year boundaries are testable

use crate::record::CardRecord;
use chrono::{Datelike, NaiveDate};

/// Whether a record's expiry has passed relative to `reference`.
///
/// Expired iff the 2-digit year is behind the reference's 2-digit year, or
/// the years match and the month is behind the reference month. The 2-digit
/// comparison is deliberately literal: no century window is applied, so a
/// "99" year compares as 99, not 1999.
pub fn is_expired(record: &CardRecord, reference: NaiveDate) -> bool {
    let current_year = reference.year().rem_euclid(100);
    let current_month = reference.month() as i32;

    // Parser guarantees digit-only month/year, so these parses hold.
    let exp_year: i32 = record.exp_year.parse().unwrap_or(0);
    let exp_month: i32 = record.exp_month.parse().unwrap_or(0);

    exp_year < current_year || (exp_year == current_year && exp_month < current_month)
}

// ============================================================================
// TESTS
// ============================================================================
