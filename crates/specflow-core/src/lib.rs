//! specflow core library
//!
//! Section routing, budgeted rule packing and dependency-graph orchestration
//! of agents working from a structured specification.

pub mod agent;
pub mod budget;
pub mod config;
pub mod flow;
pub mod metrics;
pub mod obs;
pub mod routing;
pub mod rules;
pub mod spec;
pub mod telemetry;

pub use agent::{Agent, AgentContext, AgentRegistry, AgentResult, AgentStatus, FnAgent};

pub use budget::{pack, BudgetUsage, Candidate, Packed};

pub use config::{ConfigError, ConfigResult, FlowConfig};

pub use flow::{
    AgentRecord, AgentSpec, ArtifactConflict, ArtifactView, CancelHandle, ExecutionPlan,
    FlowError, FlowMessage, FlowOrchestrator, FlowResult, FlowStrategy, FlowTemplate, HookEvent,
    HookPoint, InFlightPolicy, MessageKind, OrchestratorConfig, Planner, Recipient, RunResult,
    RunStatus, RunSummary,
};

pub use routing::{
    RoutedSpec, RoutingError, RoutingResult, SectionPolicy, SectionPolicyRegistry, SectionRouter,
};

pub use rules::{
    chunk_rules, summarize_rules, Rule, RuleCategory, RuleContextManager, RuleError, RuleLevel,
    RulePack, RuleResult, RuleSet, RuleSeverity,
};

pub use spec::{Section, SectionContent, SectionId, SpecError, SpecInfo, SpecResult, Specification};

pub use metrics::METRICS;

/// Crate version, for CLI banners and run metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
