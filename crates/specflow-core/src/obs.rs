//! Structured lifecycle events for flow runs.
//!
//! - `run_span` tagging everything inside a run with its id
//! - `emit_*` helpers for run, agent, rule-packing and artifact events
//!
//! Events carry an `event = "<name>"` field so they can be filtered with
//! `RUST_LOG` and picked out of JSON logs.

use tracing::{info, warn};

use crate::budget::BudgetUsage;

/// Run-scoped span; attach with `Instrument::instrument` so every event
/// emitted while the run is in progress carries its `run_id`.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("specflow.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, spec_id: &str, strategy: &str, agents: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        spec_id = %spec_id,
        strategy = %strategy,
        agents = agents,
    );
}

pub fn emit_run_finished(run_id: &str, status: &str, duration_ms: u64, agents: usize) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        status = %status,
        duration_ms = duration_ms,
        agents = agents,
    );
}

pub fn emit_agent_dispatched(agent: &str, sections: usize, rules: usize) {
    info!(
        event = "agent.dispatched",
        agent = %agent,
        sections = sections,
        rules = rules,
    );
}

pub fn emit_agent_finished(agent: &str, status: &str, duration_ms: u64) {
    info!(
        event = "agent.finished",
        agent = %agent,
        status = %status,
        duration_ms = duration_ms,
    );
}

/// Agent never ran (or its result was abandoned); `reason` says why.
pub fn emit_agent_skipped(agent: &str, reason: &str) {
    warn!(event = "agent.skipped", agent = %agent, reason = %reason);
}

pub fn emit_rules_packed(consumer: &str, included: usize, excluded: usize, usage: &BudgetUsage) {
    info!(
        event = "rules.packed",
        consumer = %consumer,
        included = included,
        excluded = excluded,
        budget = usage.budget,
        consumed = usage.consumed,
        overage = usage.overage,
    );
    if usage.is_over_budget() {
        warn!(
            event = "rules.over_budget",
            consumer = %consumer,
            overage = usage.overage,
            "mandatory rules exceed the budget"
        );
    }
}

pub fn emit_artifact_conflict(artifact: &str, existing: &str, attempted_by: &str) {
    warn!(
        event = "artifact.conflict",
        artifact = %artifact,
        existing_producer = %existing,
        attempted_by = %attempted_by,
    );
}

/// A hook callback failed or panicked; the run continues.
pub fn emit_hook_failed(point: &str, agent: Option<&str>, error: &dyn std::fmt::Display) {
    warn!(
        event = "hook.failed",
        point = %point,
        agent = agent.unwrap_or("-"),
        error = %error,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let _entered = run_span("test-run-id").entered();
        emit_agent_skipped("a", "upstream failed");
    }
}
