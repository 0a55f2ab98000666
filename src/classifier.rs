// 🧮 Generated-Batch Classifier - Statistical fingerprints of synthetic batches
// Six independent signals, additively scored and capped; thresholds live in
// one immutable config

use crate::record::CardRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// CONFIG
// ============================================================================

/// Tunable thresholds and weights for the classifier. Immutable once the
/// classifier is built; override in tests via `BatchClassifier::with_config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Below this many records the batch has no statistical power and is
    /// never flagged (default: 10)
    pub min_batch_size: usize,

    /// Adjacent last-4 suffix steps in [1,5]; ratio above this triggers
    /// (default: 0.7)
    pub sequential_suffix_ratio: f64,
    pub sequential_suffix_weight: u32,

    /// Same BIN everywhere plus adjacent middle-block steps in (0,1000];
    /// ratio above this triggers (default: 0.8)
    pub incrementing_middle_ratio: f64,
    pub incrementing_middle_weight: u32,

    /// Distinct 4-digit middle substrings / total below this triggers
    /// (default: 0.3)
    pub middle_entropy_ratio: f64,
    pub middle_entropy_weight: u32,

    /// All records share one expiry and the batch is at least this large
    /// (default: 20)
    pub identical_expiry_min: usize,
    pub identical_expiry_weight: u32,

    /// Adjacent CVV steps of exactly +1 among at least `sequential_cvv_min`
    /// numeric CVVs; ratio above this triggers (default: 0.8 over >= 10)
    pub sequential_cvv_ratio: f64,
    pub sequential_cvv_min: usize,
    pub sequential_cvv_weight: u32,

    /// All numeric CVVs equal across at least this many records
    /// (default: 15)
    pub identical_cvv_min: usize,
    pub identical_cvv_weight: u32,

    /// Summed signal scores are capped here (default: 100)
    pub confidence_cap: u32,

    /// Confidence at or above this flags the batch (default: 75)
    pub generated_threshold: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            min_batch_size: 10,
            sequential_suffix_ratio: 0.7,
            sequential_suffix_weight: 40,
            incrementing_middle_ratio: 0.8,
            incrementing_middle_weight: 50,
            middle_entropy_ratio: 0.3,
            middle_entropy_weight: 30,
            identical_expiry_min: 20,
            identical_expiry_weight: 20,
            sequential_cvv_ratio: 0.8,
            sequential_cvv_min: 10,
            sequential_cvv_weight: 35,
            identical_cvv_min: 15,
            identical_cvv_weight: 40,
            confidence_cap: 100,
            generated_threshold: 75,
        }
    }
}

/// Contract violations in a classifier config. These fail fast at
/// construction; per-batch classification itself never errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("min_batch_size must be at least 1")]
    ZeroMinBatchSize,

    #[error("{name} must be in (0, 1], got {value}")]
    RatioOutOfRange { name: &'static str, value: f64 },

    #[error("generated_threshold {threshold} exceeds confidence cap {cap}")]
    ThresholdAboveCap { threshold: u32, cap: u32 },
}

impl ClassifierConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_batch_size == 0 {
            return Err(ConfigError::ZeroMinBatchSize);
        }

        let ratios = [
            ("sequential_suffix_ratio", self.sequential_suffix_ratio),
            ("incrementing_middle_ratio", self.incrementing_middle_ratio),
            ("middle_entropy_ratio", self.middle_entropy_ratio),
            ("sequential_cvv_ratio", self.sequential_cvv_ratio),
        ];
        for (name, value) in ratios {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::RatioOutOfRange { name, value });
            }
        }

        if self.generated_threshold > self.confidence_cap {
            return Err(ConfigError::ThresholdAboveCap {
                threshold: self.generated_threshold,
                cap: self.confidence_cap,
            });
        }

        Ok(())
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// Outcome of classifying one batch. Computed once over the full surviving
/// record set, never mutated, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationVerdict {
    pub is_generated: bool,

    /// 0-100, capped sum of triggered signal weights
    pub confidence: u32,

    /// Names of the triggered signals, in evaluation order
    pub reasons: Vec<String>,
}

impl GenerationVerdict {
    /// Batch too small to analyze: not generated, zero confidence.
    fn inconclusive() -> Self {
        GenerationVerdict {
            is_generated: false,
            confidence: 0,
            reasons: Vec::new(),
        }
    }
}

/// One triggered signal: its score contribution and reason tag.
struct SignalHit {
    weight: u32,
    reason: &'static str,
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct BatchClassifier {
    config: ClassifierConfig,
}

impl BatchClassifier {
    /// Classifier with the default thresholds.
    pub fn new() -> Self {
        BatchClassifier {
            config: ClassifierConfig::default(),
        }
    }

    /// Classifier with custom thresholds. Fails fast on a contract-violating
    /// config rather than misbehaving during per-batch scoring.
    pub fn with_config(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(BatchClassifier { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Score a batch of valid, deduplicated records against all six signals.
    ///
    /// Signals are independent and combinable; the final confidence is their
    /// capped sum. Batches below `min_batch_size` degrade to an inconclusive
    /// verdict instead of risking false positives.
    pub fn classify(&self, records: &[CardRecord]) -> GenerationVerdict {
        if records.len() < self.config.min_batch_size {
            return GenerationVerdict::inconclusive();
        }

        let signals = [
            self.sequential_suffix(records),
            self.incrementing_middle(records),
            self.low_middle_entropy(records),
            self.identical_expiry(records),
            self.sequential_cvv(records),
            self.identical_cvv(records),
        ];

        let mut score: u32 = 0;
        let mut reasons = Vec::new();
        for hit in signals.into_iter().flatten() {
            debug!(reason = hit.reason, weight = hit.weight, "signal triggered");
            score += hit.weight;
            reasons.push(hit.reason.to_string());
        }

        let confidence = score.min(self.config.confidence_cap);
        GenerationVerdict {
            is_generated: confidence >= self.config.generated_threshold,
            confidence,
            reasons,
        }
    }

    // ========================================================================
    // SIGNALS
    // ========================================================================

    /// Signal 1: adjacent last-4 suffixes stepping by 1-5 in input order.
    fn sequential_suffix(&self, records: &[CardRecord]) -> Option<SignalHit> {
        let suffixes: Vec<i64> = records
            .iter()
            .filter_map(|r| r.last4().parse().ok())
            .collect();
        if suffixes.len() < 2 {
            return None;
        }

        let pairs = suffixes.len() - 1;
        let stepping = suffixes
            .windows(2)
            .filter(|w| (1..=5).contains(&(w[1] - w[0])))
            .count();

        if stepping as f64 / pairs as f64 > self.config.sequential_suffix_ratio {
            Some(SignalHit {
                weight: self.config.sequential_suffix_weight,
                reason: "sequential_suffix",
            })
        } else {
            None
        }
    }

    /// Signal 2: one shared BIN with the middle block (digits 7-12) stepping
    /// upward. The strongest single signal: organic batches essentially
    /// never share both BIN and a monotonically stepping middle block.
    fn incrementing_middle(&self, records: &[CardRecord]) -> Option<SignalHit> {
        if records.len() < 2 {
            return None;
        }

        let bin = records[0].bin();
        if !records.iter().all(|r| r.bin() == bin) {
            return None;
        }

        let middles: Vec<i64> = records
            .iter()
            .filter_map(|r| r.number[6..12].parse().ok())
            .collect();
        if middles.len() < 2 {
            return None;
        }

        let pairs = middles.len() - 1;
        let stepping = middles
            .windows(2)
            .filter(|w| {
                let diff = w[1] - w[0];
                diff > 0 && diff <= 1000
            })
            .count();

        if stepping as f64 / pairs as f64 > self.config.incrementing_middle_ratio {
            Some(SignalHit {
                weight: self.config.incrementing_middle_weight,
                reason: "incrementing_middle",
            })
        } else {
            None
        }
    }

    /// Signal 3: few distinct 4-digit substrings at positions 6-10.
    fn low_middle_entropy(&self, records: &[CardRecord]) -> Option<SignalHit> {
        if records.is_empty() {
            return None;
        }

        let distinct: HashSet<&str> = records.iter().map(|r| &r.number[6..10]).collect();
        let ratio = distinct.len() as f64 / records.len() as f64;

        if ratio < self.config.middle_entropy_ratio {
            Some(SignalHit {
                weight: self.config.middle_entropy_weight,
                reason: "low_middle_entropy",
            })
        } else {
            None
        }
    }

    /// Signal 4: every record shares one (month, year) pair across a large
    /// batch. Threshold is higher than the other signals because identical
    /// expiry alone is common in legitimately scraped data.
    fn identical_expiry(&self, records: &[CardRecord]) -> Option<SignalHit> {
        if records.len() < self.config.identical_expiry_min {
            return None;
        }

        let first = (&records[0].exp_month, &records[0].exp_year);
        let all_same = records
            .iter()
            .all(|r| (&r.exp_month, &r.exp_year) == first);

        if all_same {
            Some(SignalHit {
                weight: self.config.identical_expiry_weight,
                reason: "identical_expiry",
            })
        } else {
            None
        }
    }

    /// Signal 5: CVVs stepping by exactly +1 in input order, among records
    /// that carry a numeric CVV.
    fn sequential_cvv(&self, records: &[CardRecord]) -> Option<SignalHit> {
        let cvvs = numeric_cvvs(records);
        if cvvs.len() < self.config.sequential_cvv_min {
            return None;
        }

        let pairs = cvvs.len() - 1;
        let stepping = cvvs.windows(2).filter(|w| w[1] - w[0] == 1).count();

        if stepping as f64 / pairs as f64 > self.config.sequential_cvv_ratio {
            Some(SignalHit {
                weight: self.config.sequential_cvv_weight,
                reason: "sequential_cvv",
            })
        } else {
            None
        }
    }

    /// Signal 6: one CVV value repeated across a large batch.
    fn identical_cvv(&self, records: &[CardRecord]) -> Option<SignalHit> {
        let cvvs = numeric_cvvs(records);
        if cvvs.len() < self.config.identical_cvv_min {
            return None;
        }

        if cvvs.iter().all(|c| *c == cvvs[0]) {
            Some(SignalHit {
                weight: self.config.identical_cvv_weight,
                reason: "identical_cvv",
            })
        } else {
            None
        }
    }
}

impl Default for BatchClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// CVV values of the records that have one, as integers, in input order.
fn numeric_cvvs(records: &[CardRecord]) -> Vec<i64> {
    records
        .iter()
        .filter(|r| !r.cvv.is_empty())
        .filter_map(|r| r.cvv.parse().ok())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
