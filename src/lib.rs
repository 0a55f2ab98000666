// Cardsift - Card batch screening pipeline
// Parses pasted card batches, filters invalid/duplicate/expired records, and
// flags batches with statistical fingerprints of synthetic generation

pub mod classifier;
pub mod dedup;
pub mod expiry;
pub mod luhn;
pub mod parser;
pub mod pipeline;
pub mod record;

// Re-export commonly used types
pub use classifier::{
    BatchClassifier, ClassifierConfig, ConfigError, GenerationVerdict,
};
pub use dedup::DedupIndex;
pub use expiry::is_expired;
pub use luhn::is_valid_luhn;
pub use parser::{parse_card_line, ParseReject};
pub use pipeline::{
    BatchPipeline, BatchResult, ProcessOptions, RemovalEntry, RemovalReason,
};
pub use record::{CardRecord, IdentityKey};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
