//! Outcome of one flow execution.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::agent::{AgentResult, AgentStatus};
use crate::flow::artifacts::{Artifact, ArtifactConflict};
use crate::flow::message::FlowMessage;
use crate::flow::orchestrator::FlowStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    /// At least one agent failed.
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-agent entry in a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentRecord {
    pub agent: String,
    pub result: AgentResult,
    /// Unset for agents that never started.
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// The upstream agent whose outcome prevented this one from running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
}

impl AgentRecord {
    pub fn status(&self) -> AgentStatus {
        self.result.status
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub spec_id: String,
    pub spec_digest: String,
    pub strategy: FlowStrategy,
    pub status: RunStatus,
    /// Every registered agent, keyed by identity.
    pub records: BTreeMap<String, AgentRecord>,
    /// Agents in the order their outcome was recorded.
    pub completion_order: Vec<String>,
    pub messages: Vec<FlowMessage>,
    pub artifacts: BTreeMap<String, Artifact>,
    pub artifact_conflicts: Vec<ArtifactConflict>,
    /// In-flight agents were abandoned after a failure.
    pub terminated_early: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn record(&self, agent: &str) -> Option<&AgentRecord> {
        self.records.get(agent)
    }

    pub fn result(&self, agent: &str) -> Option<&AgentResult> {
        self.records.get(agent).map(|r| &r.result)
    }

    pub fn status_of(&self, agent: &str) -> Option<AgentStatus> {
        self.records.get(agent).map(AgentRecord::status)
    }

    fn agents_with(&self, status: AgentStatus) -> Vec<&str> {
        self.records
            .values()
            .filter(|r| r.status() == status)
            .map(|r| r.agent.as_str())
            .collect()
    }

    pub fn successful_agents(&self) -> Vec<&str> {
        self.agents_with(AgentStatus::Success)
    }

    pub fn failed_agents(&self) -> Vec<&str> {
        self.agents_with(AgentStatus::Failed)
    }

    pub fn skipped_agents(&self) -> Vec<&str> {
        self.agents_with(AgentStatus::Skipped)
    }

    /// `(agent, error)` pairs across all failed agents.
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.records
            .values()
            .flat_map(|r| r.result.errors.iter().map(|e| (r.agent.as_str(), e.as_str())))
            .collect()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            status: self.status,
            total: self.records.len(),
            succeeded: self.successful_agents().len(),
            failed: self.failed_agents().len(),
            skipped: self.skipped_agents().len(),
            artifacts: self.artifacts.values().filter(|a| a.available).count(),
            conflicts: self.artifact_conflicts.len(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Counts for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub artifacts: usize,
    pub conflicts: usize,
    pub duration_ms: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} {}: {}/{} succeeded, {} failed, {} skipped",
            self.run_id, self.status, self.succeeded, self.total, self.failed, self.skipped
        )?;
        write!(
            f,
            ", {} artifacts ({} conflicts) in {}ms",
            self.artifacts, self.conflicts, self.duration_ms
        )
    }
}
