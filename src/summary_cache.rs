//! Per-patient summary cache.
//!
//! Holds at most one generated summary per patient. An entry is served
//! until it outlives the TTL or until a new note for that patient is
//! saved, whichever comes first.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::patients::PatientSummary;

// ═══════════════════════════════════════════════════════════
// CachedSummary: one patient entry
// ═══════════════════════════════════════════════════════════

struct CachedSummary {
    summary: PatientSummary,
    stored_at: Instant,
}

impl CachedSummary {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

// ═══════════════════════════════════════════════════════════
// SummaryCache
// ═══════════════════════════════════════════════════════════

/// Memo of generated summaries keyed by patient id.
pub struct SummaryCache {
    entries: HashMap<String, CachedSummary>,
    ttl: Duration,
}

impl SummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh summary for a patient. Expired entries are dropped on read.
    pub fn get(&mut self, patient_id: &str) -> Option<PatientSummary> {
        match self.entries.get(patient_id) {
            Some(entry) if entry.is_fresh(self.ttl) => Some(entry.summary.clone()),
            Some(_) => {
                self.entries.remove(patient_id);
                tracing::debug!(patient_id, "Summary cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store (or replace) the summary for a patient.
    pub fn insert(&mut self, patient_id: &str, summary: PatientSummary) {
        // Sweep stale entries before the map grows past the roster size.
        if self.entries.len() > 256 {
            self.purge_expired();
        }
        self.entries.insert(
            patient_id.to_string(),
            CachedSummary {
                summary,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop a patient's entry. Returns true if one was present.
    pub fn invalidate(&mut self, patient_id: &str) -> bool {
        let removed = self.entries.remove(patient_id).is_some();
        if removed {
            tracing::debug!(patient_id, "Summary cache entry invalidated");
        }
        removed
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_fresh(ttl));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
