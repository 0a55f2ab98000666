// 📝 Line Parser - One raw text line → CardRecord
// Ambiguity-tolerant parsing of the several formats seen in pasted batches

use crate::record::CardRecord;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// REJECTION REASONS
// ============================================================================

/// Why a line did not produce a record. Malformed input is a data outcome,
/// not a fault: the parser never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum ParseReject {
    /// Line is empty after trimming (skipped silently by the pipeline,
    /// not counted as invalid)
    #[error("blank line")]
    Blank,

    /// Fewer than 3 delimited fields
    #[error("expected at least 3 fields, found {found}")]
    TooFewFields { found: usize },

    /// Card number outside 13-19 digits after stripping non-digits
    #[error("card number must be 13-19 digits, found {found}")]
    NumberLength { found: usize },

    /// Month does not parse to 1-12
    #[error("month out of range")]
    MonthOutOfRange,

    /// Year is not 2 digits after normalization
    #[error("year must be 2 digits (or 4, truncated)")]
    BadYear,
}

// ============================================================================
// PARSER
// ============================================================================

/// Parse one raw line into a `CardRecord`.
///
/// Accepted formats (delimiters `|`, `\`, `/`, runs collapsed):
/// - `number|MM|YY|cvv|zip`   (separate month and year fields)
/// - `number|MMYY|cvv|zip`    (4-digit combined expiry)
/// - `number|MMYYYY|cvv|zip`  (6-digit combined expiry, year truncated)
///
/// CVV and zip are optional. A lone-digit month is zero-padded. Trailing
/// non-digit junk in the CVV field is stripped, not rejected.
pub fn parse_card_line(line: &str) -> Result<CardRecord, ParseReject> {
    let raw = line.trim();
    if raw.is_empty() {
        return Err(ParseReject::Blank);
    }

    // Split on any run of delimiter characters; runs collapse so "||"
    // never yields an empty field.
    let fields: Vec<&str> = raw
        .split(|c| matches!(c, '|' | '\\' | '/'))
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if fields.len() < 3 {
        return Err(ParseReject::TooFewFields {
            found: fields.len(),
        });
    }

    let number: String = fields[0].chars().filter(|c| c.is_ascii_digit()).collect();
    if number.len() < 13 || number.len() > 19 {
        return Err(ParseReject::NumberLength {
            found: number.len(),
        });
    }

    // Field 2 disambiguation: exactly 4 digits → MMYY combined, exactly
    // 6 digits → MMYYYY combined, otherwise a standalone month with the
    // year in field 3.
    let expiry_digits: String = fields[1].chars().filter(|c| c.is_ascii_digit()).collect();
    let (month_part, year_part, cvv_index) = match expiry_digits.len() {
        4 => (
            expiry_digits[..2].to_string(),
            expiry_digits[2..].to_string(),
            2,
        ),
        6 => (
            expiry_digits[..2].to_string(),
            expiry_digits[4..].to_string(),
            2,
        ),
        _ => {
            let year: String = fields[2].chars().filter(|c| c.is_ascii_digit()).collect();
            (expiry_digits, year, 3)
        }
    };

    let month_num: u32 = month_part
        .parse()
        .map_err(|_| ParseReject::MonthOutOfRange)?;
    if month_num < 1 || month_num > 12 {
        return Err(ParseReject::MonthOutOfRange);
    }
    let exp_month = format!("{:02}", month_num);

    // 4-digit years normalize to their last two digits; anything that is
    // not 2 digits afterward is rejected.
    let exp_year = match year_part.len() {
        2 => year_part,
        4 => year_part[2..].to_string(),
        _ => return Err(ParseReject::BadYear),
    };

    // Trailing junk after the CVV digits is discarded, not fatal; a
    // missing CVV field is legal (sufficiency is a downstream concern).
    let cvv: String = fields
        .get(cvv_index)
        .map(|f| f.chars().filter(|c| c.is_ascii_digit()).collect())
        .unwrap_or_default();

    let zip = fields.get(cvv_index + 1).map(|f| f.to_string());

    Ok(CardRecord {
        number,
        exp_month,
        exp_year,
        cvv,
        zip,
        raw: raw.to_string(),
    })
}

// ============================================================================
// TESTS
// ============================================================================
