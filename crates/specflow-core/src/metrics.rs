//! Global atomic counters for specflow runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (the orchestrator does this when a run ends).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters.
pub struct Metrics {
    agents_executed: AtomicU64,
    agents_failed: AtomicU64,
    agents_skipped: AtomicU64,
    rules_packed: AtomicU64,
    rules_excluded: AtomicU64,
    artifact_conflicts: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub agents_executed: u64,
    pub agents_failed: u64,
    pub agents_skipped: u64,
    pub rules_packed: u64,
    pub rules_excluded: u64,
    pub artifact_conflicts: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            agents_executed: AtomicU64::new(0),
            agents_failed: AtomicU64::new(0),
            agents_skipped: AtomicU64::new(0),
            rules_packed: AtomicU64::new(0),
            rules_excluded: AtomicU64::new(0),
            artifact_conflicts: AtomicU64::new(0),
        }
    }

    /// Count one agent that ran to completion, successful or not.
    pub fn inc_agents_executed(&self) {
        self.agents_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_executed", "counter incremented");
    }

    pub fn inc_agents_failed(&self) {
        self.agents_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_failed", "counter incremented");
    }

    pub fn inc_agents_skipped(&self) {
        self.agents_skipped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "agents_skipped", "counter incremented");
    }

    /// Record one packing pass.
    pub fn add_rules_packed(&self, included: u64, excluded: u64) {
        self.rules_packed.fetch_add(included, Ordering::Relaxed);
        self.rules_excluded.fetch_add(excluded, Ordering::Relaxed);
        tracing::trace!(metric = "rules_packed", included, excluded, "counter incremented");
    }

    pub fn inc_artifact_conflicts(&self) {
        self.artifact_conflicts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "artifact_conflicts", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            agents_executed = s.agents_executed,
            agents_failed = s.agents_failed,
            agents_skipped = s.agents_skipped,
            rules_packed = s.rules_packed,
            rules_excluded = s.rules_excluded,
            artifact_conflicts = s.artifact_conflicts,
        );
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            agents_executed: self.agents_executed.load(Ordering::Relaxed),
            agents_failed: self.agents_failed.load(Ordering::Relaxed),
            agents_skipped: self.agents_skipped.load(Ordering::Relaxed),
            rules_packed: self.rules_packed.load(Ordering::Relaxed),
            rules_excluded: self.rules_excluded.load(Ordering::Relaxed),
            artifact_conflicts: self.artifact_conflicts.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.agents_executed.store(0, Ordering::Relaxed);
        self.agents_failed.store(0, Ordering::Relaxed);
        self.agents_skipped.store(0, Ordering::Relaxed);
        self.rules_packed.store(0, Ordering::Relaxed);
        self.rules_excluded.store(0, Ordering::Relaxed);
        self.artifact_conflicts.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_agents_executed();
        m.inc_agents_executed();
        m.inc_agents_failed();
        m.inc_agents_skipped();
        m.add_rules_packed(3, 2);
        m.add_rules_packed(1, 0);
        m.inc_artifact_conflicts();

        let s = m.snapshot();
        assert_eq!(s.agents_executed, 2);
        assert_eq!(s.agents_failed, 1);
        assert_eq!(s.agents_skipped, 1);
        assert_eq!(s.rules_packed, 4);
        assert_eq!(s.rules_excluded, 2);
        assert_eq!(s.artifact_conflicts, 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_agents_executed();
        m.add_rules_packed(5, 5);
        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
