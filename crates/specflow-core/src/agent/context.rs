//! Per-dispatch input handed to an agent.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::agent::result::AgentResult;
use crate::flow::artifacts::ArtifactView;
use crate::routing::RoutedSpec;
use crate::rules::RulePack;
use crate::spec::Specification;

/// Everything an agent may read during one execution.
///
/// Built fresh for each dispatch; nothing here is shared mutable state.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub run_id: Uuid,
    pub agent: String,
    pub routed: RoutedSpec,
    pub rules: Arc<RulePack>,
    /// Snapshot of the artifact store taken at dispatch.
    pub artifacts: ArtifactView,
    /// Results of this agent's direct dependencies.
    pub upstream: BTreeMap<String, AgentResult>,
    pub project_root: PathBuf,
    pub language: Option<String>,
}

impl AgentContext {
    pub fn specification(&self) -> &Arc<Specification> {
        self.routed.specification()
    }

    pub fn artifact(&self, name: &str) -> Option<&Value> {
        self.artifacts.get(name)
    }

    pub fn upstream_result(&self, agent: &str) -> Option<&AgentResult> {
        self.upstream.get(agent)
    }

    /// Routed sections followed by the packed rules, ready for a prompt.
    pub fn to_prompt(&self) -> String {
        format!(
            "{}\n{}",
            self.routed.to_prompt_context(),
            self.rules.to_prompt()
        )
    }
}
