//! Agent outcomes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data key an agent uses to ask the orchestrator a question.
pub const PENDING_QUESTION_KEY: &str = "pending_question";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Failed,
    Skipped,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Success => "success",
            AgentStatus::Failed => "failed",
            AgentStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an agent hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub status: AgentStatus,
    pub message: String,
    #[serde(default)]
    pub data: BTreeMap<String, Value>,
    /// Named artifacts for downstream agents.
    #[serde(default)]
    pub artifacts: BTreeMap<String, Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl AgentResult {
    fn with_status(status: AgentStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_status(AgentStatus::Success, message)
    }

    /// A failed result; `message` is also recorded as the first error.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let mut result = Self::with_status(AgentStatus::Failed, message.clone());
        result.errors.push(message);
        result
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::with_status(AgentStatus::Skipped, message)
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_artifact(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.artifacts.insert(name.into(), value.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == AgentStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == AgentStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == AgentStatus::Skipped
    }

    /// Question the agent wants answered before it can proceed, if any.
    pub fn pending_question(&self) -> Option<&Value> {
        self.data
            .get(PENDING_QUESTION_KEY)
            .filter(|v| !v.is_null())
    }
}
