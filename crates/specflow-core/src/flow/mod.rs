//! Dependency-graph orchestration of agents.
//!
//! - [`graph`]: `AgentSpec`, `FlowGraph` (validation, ordering, levels)
//! - [`orchestrator`]: `FlowOrchestrator`, `ExecutionPlan`, strategies
//! - [`artifacts`]: per-run `ArtifactStore` and `ArtifactView`
//! - [`hooks`]: lifecycle hook points and callbacks
//! - [`message`]: `FlowMessage` log entries
//! - [`run`]: `RunResult`, `AgentRecord`, `RunStatus`
//! - [`template`]: standard flows
//! - [`error`]: `FlowError`, `FlowResult`

pub mod artifacts;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod message;
pub mod orchestrator;
pub mod run;
pub mod template;

pub use artifacts::{Artifact, ArtifactConflict, ArtifactStore, ArtifactView};
pub use error::{FlowError, FlowResult};
pub use graph::{AgentSpec, FlowGraph};
pub use hooks::{HookEvent, HookFn, HookPoint, HookRegistry};
pub use message::{FlowMessage, MessageKind, Recipient};
pub use orchestrator::{
    CancelHandle, ExecutionPlan, FlowOrchestrator, FlowStrategy, InFlightPolicy,
    OrchestratorConfig, PlanSummary, PlannedAgent, PlannedAgentSummary, Planner,
};
pub use run::{AgentRecord, RunResult, RunStatus, RunSummary};
pub use template::{standard_dependencies, FlowTemplate, STANDARD_DEPENDENCIES};
