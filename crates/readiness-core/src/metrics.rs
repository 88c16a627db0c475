//! Atomic counters for engine observability.
//!
//! Each orchestrator owns one [`EngineMetrics`]; there is no process-wide
//! instance. Counters are incremented silently at the call site. Call
//! [`EngineMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lightweight atomic counters, no allocations, no locking.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    oracle_calls: AtomicU64,
    oracle_failures: AtomicU64,
    fallback_verdicts: AtomicU64,
    documents_extracted: AtomicU64,
    documents_skipped: AtomicU64,
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub oracle_calls: u64,
    pub oracle_failures: u64,
    pub fallback_verdicts: u64,
    pub documents_extracted: u64,
    pub documents_skipped: u64,
}

impl EngineMetrics {
    pub const fn new() -> Self {
        Self {
            oracle_calls: AtomicU64::new(0),
            oracle_failures: AtomicU64::new(0),
            fallback_verdicts: AtomicU64::new(0),
            documents_extracted: AtomicU64::new(0),
            documents_skipped: AtomicU64::new(0),
        }
    }

    pub fn inc_oracle_calls(&self) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "oracle_calls", "counter incremented");
    }

    pub fn inc_oracle_failures(&self) {
        self.oracle_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "oracle_failures", "counter incremented");
    }

    pub fn inc_fallback_verdicts(&self) {
        self.fallback_verdicts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fallback_verdicts", "counter incremented");
    }

    pub fn add_documents_extracted(&self, n: u64) {
        self.documents_extracted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_documents_skipped(&self, n: u64) {
        self.documents_skipped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            oracle_failures: self.oracle_failures.load(Ordering::Relaxed),
            fallback_verdicts: self.fallback_verdicts.load(Ordering::Relaxed),
            documents_extracted: self.documents_extracted.load(Ordering::Relaxed),
            documents_skipped: self.documents_skipped.load(Ordering::Relaxed),
        }
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            oracle_calls = s.oracle_calls,
            oracle_failures = s.oracle_failures,
            fallback_verdicts = s.fallback_verdicts,
            documents_extracted = s.documents_extracted,
            documents_skipped = s.documents_skipped,
        );
    }

    pub fn reset(&self) {
        self.oracle_calls.store(0, Ordering::Relaxed);
        self.oracle_failures.store(0, Ordering::Relaxed);
        self.fallback_verdicts.store(0, Ordering::Relaxed);
        self.documents_extracted.store(0, Ordering::Relaxed);
        self.documents_skipped.store(0, Ordering::Relaxed);
    }
}
