// 💳 Card Record - Core data types for the screening pipeline
// Records are built by the line parser and immutable afterward

use serde::{Deserialize, Serialize};

// ============================================================================
// CARD RECORD
// ============================================================================

/// A structurally valid card record parsed from one input line.
///
/// Invariants (enforced once, by the parser, never re-checked downstream):
/// - `number` is 13-19 ASCII digits
/// - `exp_month` is a zero-padded "01".."12"
/// - `exp_year` is exactly 2 digits (4-digit input years are truncated)
/// - `cvv` is digits only, possibly empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Card number, digits only, length 13-19
    pub number: String,

    /// Expiry month, "01".."12"
    pub exp_month: String,

    /// Expiry year, last two digits
    pub exp_year: String,

    /// CVV digits, empty if absent in input
    pub cvv: String,

    /// Optional postal code, only if a 5th field was supplied
    pub zip: Option<String>,

    /// Original trimmed line, retained for traceability / echo-back
    pub raw: String,
}

impl CardRecord {
    /// Deduplication identity: number + expiry, CVV excluded by design
    pub fn identity(&self) -> IdentityKey {
        IdentityKey {
            number: self.number.clone(),
            exp_month: self.exp_month.clone(),
            exp_year: self.exp_year.clone(),
        }
    }

    /// First 6 digits of the card number
    pub fn bin(&self) -> &str {
        &self.number[..6]
    }

    /// Last 4 digits of the card number
    pub fn last4(&self) -> &str {
        &self.number[self.number.len() - 4..]
    }

    /// Masked reference for logs and removal entries (last 4 digits only)
    pub fn masked(&self) -> String {
        format!("****{}", self.last4())
    }
}

// ============================================================================
// IDENTITY KEY
// ============================================================================

/// Key under which two records count as "the same" for deduplication.
/// Two records with identical number + expiry but different CVV are still
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityKey {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
}

// ============================================================================
// TESTS
// ============================================================================
