//! Error types for flow construction.
//!
//! Every variant is a configuration error surfaced before any agent runs.
//! Agent failures never appear here; they are recorded in the run result.

use thiserror::Error;

use crate::routing::RoutingError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("agent already registered: {agent}")]
    DuplicateAgent { agent: String },

    #[error("agent '{agent}' depends on unknown agent '{dependency}'")]
    UnknownDependency { agent: String, dependency: String },

    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("routing failed for agent '{agent}': {source}")]
    Routing {
        agent: String,
        #[source]
        source: RoutingError,
    },

    /// A template names an agent the registry cannot supply.
    #[error("agent '{agent}' is not in the registry")]
    AgentNotRegistered { agent: String },

    #[error("unknown flow template: {0}")]
    UnknownTemplate(String),
}

pub type FlowResult<T> = std::result::Result<T, FlowError>;
