//! Per-(account, aggregator) exclusive lease.
//!
//! Two concurrent runs over the same pair would each read the same cursor
//! and double-process the same batch; the idempotent upserts make that
//! harmless for the data but wasteful and confusing in reports. The lease
//! map hands out one mutex per live pair, held for the pair's whole run.
//!
//! Entries are stored as weak references and pruned opportunistically, so
//! the map does not grow with the number of pairs ever seen.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use pulse_core::AggregatorKind;

/// Hands out per-pair mutexes.
#[derive(Default)]
pub struct PairLease {
    locks: Mutex<HashMap<(String, AggregatorKind), Weak<Mutex<()>>>>,
}

impl PairLease {
    /// Create an empty lease map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex for a pair. Lock the returned `Arc` to
    /// hold the lease; drop all clones to let the entry be pruned.
    pub fn acquire(&self, account_id: &str, aggregator: AggregatorKind) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, weak| weak.strong_count() > 0);

        let key = (account_id.to_string(), aggregator);
        if let Some(existing) = locks.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(Mutex::new(()));
        let _ = locks.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    /// Number of live entries (testing aid).
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.locks
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
