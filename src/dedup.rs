// 🔍 Dedup Index - Batch-scoped set of seen record identities
// First occurrence survives; every later occurrence of the same key is a
// duplicate

use crate::record::IdentityKey;
use std::collections::HashSet;

/// Hash-based membership index over identity keys, scoped to one pipeline
/// run. O(1) amortized test and insert, so very large batches stay linear.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: HashSet<IdentityKey>,
}

impl DedupIndex {
    pub fn new() -> Self {
        DedupIndex {
            seen: HashSet::new(),
        }
    }

    /// Has this identity been recorded already?
    pub fn seen(&self, key: &IdentityKey) -> bool {
        self.seen.contains(key)
    }

    /// Record an identity. Returns false if it was already present.
    pub fn record(&mut self, key: IdentityKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
