// 🧹 Batch Pipeline - Orchestrates parse → Luhn → dedup → expiry per line,
// then classifies the surviving set once

use crate::classifier::{BatchClassifier, GenerationVerdict};
use crate::dedup::DedupIndex;
use crate::expiry::is_expired;
use crate::luhn::is_valid_luhn;
use crate::parser::parse_card_line;
use crate::record::CardRecord;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// OPTIONS
// ============================================================================

/// Per-run toggles for the cleaning stages. Everything defaults to enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    pub remove_duplicates: bool,
    pub remove_expired: bool,
    pub remove_invalid_format: bool,
    pub remove_luhn_failed: bool,
    pub detect_generated: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            remove_duplicates: true,
            remove_expired: true,
            remove_invalid_format: true,
            remove_luhn_failed: true,
            detect_generated: true,
        }
    }
}

// ============================================================================
// REMOVAL LOG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Duplicate,
    Expired,
    InvalidFormat,
    LuhnFailed,
}

/// One removed line, referenced by last-4 digits only (or a truncated echo
/// of the raw line when no number was parsed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalEntry {
    pub reason: RemovalReason,
    pub reference: String,
}

// ============================================================================
// BATCH RESULT
// ============================================================================

/// Aggregated outcome of one pipeline run. Owned by the caller; the
/// pipeline keeps no state between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Non-blank input lines (blank lines are excluded from every statistic)
    pub original_count: usize,

    /// Surviving lines (equals `records.len()` unless invalid-format
    /// removal is disabled and unparseable lines are retained verbatim)
    pub valid_count: usize,

    pub duplicates_removed: usize,
    pub expired_removed: usize,
    pub invalid_format_removed: usize,
    pub luhn_failed_removed: usize,

    /// Surviving records, in input order
    pub records: Vec<CardRecord>,

    /// Surviving raw lines re-joined with newlines; original text is
    /// preserved, not re-serialized from parsed fields
    pub cleaned_input: String,

    /// Audit log of removals, masked for privacy
    pub removals: Vec<RemovalEntry>,

    /// Present only when detection ran over a large-enough survivor set
    pub verdict: Option<GenerationVerdict>,
}

impl BatchResult {
    pub fn summary(&self) -> String {
        format!(
            "{} lines in, {} kept | {} duplicate, {} expired, {} invalid, {} luhn-failed",
            self.original_count,
            self.valid_count,
            self.duplicates_removed,
            self.expired_removed,
            self.invalid_format_removed,
            self.luhn_failed_removed,
        )
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Synchronous, allocation-only pipeline: no I/O, no shared mutable state.
/// Each `process` call owns its own dedup index and counters, so concurrent
/// invocations need no locking.
pub struct BatchPipeline {
    classifier: BatchClassifier,
    reference_date: NaiveDate,
}

impl BatchPipeline {
    /// Pipeline with default thresholds, expiring against today's date.
    pub fn new() -> Self {
        BatchPipeline {
            classifier: BatchClassifier::new(),
            reference_date: Utc::now().date_naive(),
        }
    }

    /// Fix the expiry reference date (for deterministic tests and replays).
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    /// Swap in a classifier with custom thresholds.
    pub fn with_classifier(mut self, classifier: BatchClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Process one pasted batch, line by line in input order.
    ///
    /// Each line short-circuits at its first failing stage and is counted
    /// under exactly one removal reason. Blank lines are skipped entirely.
    pub fn process(&self, raw_text: &str, options: &ProcessOptions) -> BatchResult {
        let mut dedup = DedupIndex::new();
        let mut records: Vec<CardRecord> = Vec::new();
        let mut kept_lines: Vec<String> = Vec::new();
        let mut removals: Vec<RemovalEntry> = Vec::new();

        let mut original_count = 0;
        let mut duplicates_removed = 0;
        let mut expired_removed = 0;
        let mut invalid_format_removed = 0;
        let mut luhn_failed_removed = 0;

        for line in raw_text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            original_count += 1;

            let record = match parse_card_line(trimmed) {
                Ok(record) => record,
                Err(reject) => {
                    if options.remove_invalid_format {
                        invalid_format_removed += 1;
                        debug!(%reject, "line removed: invalid format");
                        removals.push(RemovalEntry {
                            reason: RemovalReason::InvalidFormat,
                            reference: truncate_line(trimmed),
                        });
                    } else {
                        // Retained verbatim; never reaches later stages.
                        kept_lines.push(trimmed.to_string());
                    }
                    continue;
                }
            };

            if options.remove_luhn_failed && !is_valid_luhn(&record.number) {
                luhn_failed_removed += 1;
                debug!(card = %record.masked(), "line removed: luhn check failed");
                removals.push(RemovalEntry {
                    reason: RemovalReason::LuhnFailed,
                    reference: record.masked(),
                });
                continue;
            }

            if options.remove_duplicates && dedup.seen(&record.identity()) {
                duplicates_removed += 1;
                debug!(card = %record.masked(), "line removed: duplicate");
                removals.push(RemovalEntry {
                    reason: RemovalReason::Duplicate,
                    reference: record.masked(),
                });
                continue;
            }

            if options.remove_expired && is_expired(&record, self.reference_date) {
                expired_removed += 1;
                debug!(card = %record.masked(), "line removed: expired");
                removals.push(RemovalEntry {
                    reason: RemovalReason::Expired,
                    reference: record.masked(),
                });
                continue;
            }

            dedup.record(record.identity());
            kept_lines.push(record.raw.clone());
            records.push(record);
        }

        let verdict = if options.detect_generated
            && records.len() >= self.classifier.config().min_batch_size
        {
            Some(self.classifier.classify(&records))
        } else {
            None
        };

        let result = BatchResult {
            original_count,
            valid_count: kept_lines.len(),
            duplicates_removed,
            expired_removed,
            invalid_format_removed,
            luhn_failed_removed,
            records,
            cleaned_input: kept_lines.join("\n"),
            removals,
            verdict,
        };

        info!(
            original = result.original_count,
            kept = result.valid_count,
            generated = result.verdict.as_ref().map(|v| v.is_generated),
            "batch processed"
        );

        result
    }
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Echo of an unparseable line for the removal log, capped so a pasted
/// full number never lands in the log whole.
fn truncate_line(line: &str) -> String {
    const MAX: usize = 12;
    if line.chars().count() <= MAX {
        line.to_string()
    } else {
        let head: String = line.chars().take(MAX).collect();
        format!("{}…", head)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierConfig;

    /// Append the Luhn check digit to a 15-digit prefix.
    fn with_check_digit(prefix: &str) -> String {
        for check in 0..10 {
            let candidate = format!("{}{}", prefix, check);
            if is_valid_luhn(&candidate) {
                return candidate;
            }
        }
        unreachable!("some check digit always validates");
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn pipeline() -> BatchPipeline {
        BatchPipeline::new().with_reference_date(reference())
    }

    #[test]
    fn test_clean_batch_passes_through() {
        let input = "4111111111111111|12|25|123\n4242424242424242|01|26|456";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.original_count, 2);
        assert_eq!(result.valid_count, 2);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.cleaned_input, input);
        assert!(result.removals.is_empty());
    }

    #[test]
    fn test_blank_lines_not_counted() {
        let input = "\n4111111111111111|12|25|123\n\n   \n4242424242424242|01|26|456\n";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.original_count, 2);
        assert_eq!(result.valid_count, 2);
    }

    #[test]
    fn test_invalid_format_removed_and_counted() {
        let input = "not a card line\n4111111111111111|12|25|123";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.invalid_format_removed, 1);
        assert_eq!(result.valid_count, 1);
        assert_eq!(result.removals.len(), 1);
        assert_eq!(result.removals[0].reason, RemovalReason::InvalidFormat);
    }

    #[test]
    fn test_invalid_format_retained_when_disabled() {
        let input = "not a card line\n4111111111111111|12|25|123";
        let options = ProcessOptions {
            remove_invalid_format: false,
            ..Default::default()
        };
        let result = pipeline().process(input, &options);

        assert_eq!(result.invalid_format_removed, 0);
        assert_eq!(result.valid_count, 2);
        assert_eq!(result.records.len(), 1);
        assert!(result.cleaned_input.contains("not a card line"));
    }

    #[test]
    fn test_luhn_failure_removed_with_masked_reference() {
        let input = "4111111111111112|12|25|123\n4111111111111111|12|25|123";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.luhn_failed_removed, 1);
        assert_eq!(result.valid_count, 1);
        assert_eq!(result.removals[0].reason, RemovalReason::LuhnFailed);
        // Last 4 only, for privacy.
        assert_eq!(result.removals[0].reference, "****1112");
    }

    #[test]
    fn test_duplicates_removed_first_occurrence_wins() {
        // Same number + expiry, different CVV: still a duplicate.
        let input = "4111111111111111|12|25|123\n4111111111111111|12|25|999";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.duplicates_removed, 1);
        assert_eq!(result.valid_count, 1);
        assert_eq!(result.records[0].cvv, "123");
    }

    #[test]
    fn test_duplicates_kept_when_disabled() {
        let input = "4111111111111111|12|25|123\n4111111111111111|12|25|123";
        let options = ProcessOptions {
            remove_duplicates: false,
            ..Default::default()
        };
        let result = pipeline().process(input, &options);

        assert_eq!(result.duplicates_removed, 0);
        assert_eq!(result.valid_count, 2);
    }

    #[test]
    fn test_expired_removed() {
        let input = "4111111111111111|05|25|123\n4111111111111111|06|25|123";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.expired_removed, 1);
        assert_eq!(result.valid_count, 1);
        assert_eq!(result.records[0].exp_month, "06");
    }

    #[test]
    fn test_expired_kept_when_disabled() {
        let input = "4111111111111111|05|20|123";
        let options = ProcessOptions {
            remove_expired: false,
            ..Default::default()
        };
        let result = pipeline().process(input, &options);

        assert_eq!(result.expired_removed, 0);
        assert_eq!(result.valid_count, 1);
    }

    #[test]
    fn test_single_removal_reason_per_line() {
        // Luhn-invalid AND a duplicate of itself: the Luhn stage fires
        // first both times, nothing is double-counted.
        let input = "4111111111111112|12|25|123\n4111111111111112|12|25|123";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.luhn_failed_removed, 2);
        assert_eq!(result.duplicates_removed, 0);
        assert_eq!(result.valid_count, 0);
    }

    #[test]
    fn test_conservation() {
        let input = "\
4111111111111111|12|25|123
4111111111111111|12|25|999
4111111111111112|12|25|123
garbage line
4242424242424242|01|20|456
4242424242424242|01|26|456

5555555555554444|7|27|321xyz";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.original_count, 7);
        assert_eq!(
            result.original_count,
            result.valid_count
                + result.duplicates_removed
                + result.expired_removed
                + result.invalid_format_removed
                + result.luhn_failed_removed
        );
        assert_eq!(result.valid_count, 3);
        assert_eq!(result.duplicates_removed, 1);
        assert_eq!(result.expired_removed, 1);
        assert_eq!(result.invalid_format_removed, 1);
        assert_eq!(result.luhn_failed_removed, 1);
    }

    #[test]
    fn test_dedup_idempotence() {
        let input = "\
4111111111111111|12|25|123
4111111111111111|12|25|123
4242424242424242|01|26|456
4242424242424242|01|26|456";
        let options = ProcessOptions::default();
        let first = pipeline().process(input, &options);
        assert_eq!(first.duplicates_removed, 2);

        // A second pass over the cleaned output removes nothing more.
        let second = pipeline().process(&first.cleaned_input, &options);
        assert_eq!(second.duplicates_removed, 0);
        assert_eq!(second.valid_count, first.valid_count);
        assert_eq!(second.cleaned_input, first.cleaned_input);
    }

    #[test]
    fn test_cleaned_input_preserves_original_text() {
        // The user's formatting survives, not a re-serialization.
        let input = "4111 1111 1111 1111|7|2025|123xyz";
        let result = pipeline().process(input, &ProcessOptions::default());

        assert_eq!(result.cleaned_input, "4111 1111 1111 1111|7|2025|123xyz");
        assert_eq!(result.records[0].exp_month, "07");
    }

    #[test]
    fn test_generated_batch_flagged() {
        // 20 Luhn-valid cards sharing a BIN with a middle block stepping
        // by 1 on every adjacent pair.
        let lines: Vec<String> = (0..20)
            .map(|i| {
                let prefix = format!("411111{:06}{:03}", 100_000 + i, 500);
                format!("{}|12|28|{:03}", with_check_digit(&prefix), (i * 53) % 1000)
            })
            .collect();
        let input = lines.join("\n");
        let result = pipeline().process(&input, &ProcessOptions::default());

        assert_eq!(result.valid_count, 20);
        let verdict = result.verdict.expect("verdict for a 20-record batch");
        assert!(verdict.is_generated);
        assert!(verdict.confidence >= 75);
        assert!(verdict.reasons.contains(&"incrementing_middle".to_string()));
    }

    #[test]
    fn test_organic_batch_not_flagged() {
        let lines: Vec<String> = (0..20)
            .map(|i| {
                let prefix = format!(
                    "4{:05}{:06}{:03}",
                    (i * 31 + 7) % 100_000,
                    (i * 372_131 + 91) % 1_000_000,
                    (i * 83) % 1000
                );
                format!(
                    "{}|{:02}|{}|{:03}",
                    with_check_digit(&prefix),
                    (i % 12) + 1,
                    27 + i % 4,
                    (i * 53) % 1000
                )
            })
            .collect();
        let input = lines.join("\n");
        let result = pipeline().process(&input, &ProcessOptions::default());

        assert_eq!(result.valid_count, 20);
        let verdict = result.verdict.expect("verdict for a 20-record batch");
        assert!(!verdict.is_generated);
    }

    #[test]
    fn test_no_verdict_below_minimum() {
        let input = "4111111111111111|12|25|123\n4242424242424242|01|26|456";
        let result = pipeline().process(input, &ProcessOptions::default());
        assert!(result.verdict.is_none());
    }

    #[test]
    fn test_no_verdict_when_detection_disabled() {
        let lines: Vec<String> = (0..20)
            .map(|i| {
                let prefix = format!("411111{:06}{:03}", 100_000 + i, 500);
                format!("{}|12|28|123", with_check_digit(&prefix))
            })
            .collect();
        let options = ProcessOptions {
            detect_generated: false,
            ..Default::default()
        };
        let result = pipeline().process(&lines.join("\n"), &options);

        assert_eq!(result.valid_count, 20);
        assert!(result.verdict.is_none());
    }

    #[test]
    fn test_custom_classifier_threshold() {
        let config = ClassifierConfig {
            min_batch_size: 3,
            ..Default::default()
        };
        let pipeline = pipeline()
            .with_classifier(BatchClassifier::with_config(config).unwrap());

        let lines: Vec<String> = (0..4)
            .map(|i| {
                let prefix = format!("411111{:06}{:03}", 100_000 + i, 500);
                format!("{}|12|28|123", with_check_digit(&prefix))
            })
            .collect();
        let result = pipeline.process(&lines.join("\n"), &ProcessOptions::default());
        assert!(result.verdict.is_some());
    }

    #[test]
    fn test_truncate_line_caps_echo() {
        assert_eq!(truncate_line("short"), "short");
        let echoed = truncate_line("4111111111111111|12|25|123");
        assert_eq!(echoed, "411111111111…");
    }

    #[test]
    fn test_summary_format() {
        let input = "4111111111111111|12|25|123";
        let result = pipeline().process(input, &ProcessOptions::default());
        assert_eq!(
            result.summary(),
            "1 lines in, 1 kept | 0 duplicate, 0 expired, 0 invalid, 0 luhn-failed"
        );
    }
}
