//! Flow orchestration: planning and executing a graph of agents.
//!
//! [`FlowOrchestrator::build`] validates the graph and computes every
//! agent's routed spec and rule pack, so configuration errors surface before
//! anything runs. [`FlowOrchestrator::execute`] then drives the plan under
//! one of two strategies:
//!
//! * `Sequential`: one agent at a time in plan order.
//! * `Dag`: every eligible agent is spawned on a [`JoinSet`], bounded by
//!   `max_concurrent`. The coordinator is the only writer of scheduler
//!   state; tasks just run the agent and hand the result back.
//!
//! A failed agent never aborts the run: its declared artifacts are marked
//! unavailable and every transitive dependent is recorded as skipped.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::agent::{Agent, AgentContext, AgentRegistry, AgentResult, AgentStatus};
use crate::flow::artifacts::ArtifactStore;
use crate::flow::error::{FlowError, FlowResult};
use crate::flow::graph::{AgentSpec, FlowGraph};
use crate::flow::hooks::{panic_message, HookEvent, HookRegistry, HookPoint};
use crate::flow::message::{FlowMessage, MessageKind};
use crate::flow::run::{AgentRecord, RunResult, RunStatus};
use crate::metrics::METRICS;
use crate::obs;
use crate::routing::{RoutedSpec, SectionRouter};
use crate::rules::{Rule, RuleContextManager, RulePack, DEFAULT_RULE_BUDGET};
use crate::spec::Specification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStrategy {
    #[default]
    Sequential,
    Dag,
}

impl FlowStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStrategy::Sequential => "sequential",
            FlowStrategy::Dag => "dag",
        }
    }
}

/// What happens to agents still running once a failure has blocked
/// everything that was left to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InFlightPolicy {
    /// Stop waiting; the tasks keep running detached and are reported as
    /// skipped.
    #[default]
    Detach,
    /// Wait for every in-flight agent and record its real result.
    Drain,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub strategy: FlowStrategy,
    pub rule_budget: usize,
    /// When set, optional sections are dropped to fit this budget.
    pub section_budget: Option<usize>,
    pub max_concurrent: usize,
    pub in_flight: InFlightPolicy,
    pub project_root: PathBuf,
    pub language: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strategy: FlowStrategy::Sequential,
            rule_budget: DEFAULT_RULE_BUDGET,
            section_budget: None,
            max_concurrent: 4,
            in_flight: InFlightPolicy::Detach,
            project_root: PathBuf::from("."),
            language: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn with_strategy(mut self, strategy: FlowStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// One agent's precomputed inputs.
#[derive(Debug, Clone)]
pub struct PlannedAgent {
    pub spec: AgentSpec,
    pub routed: RoutedSpec,
    pub rules: Arc<RulePack>,
}

/// Routes and packs for a set of agent specs.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    pub spec: &'a Arc<Specification>,
    pub router: &'a SectionRouter,
    pub manager: &'a RuleContextManager,
    pub rules: &'a [Rule],
    pub rule_budget: usize,
    pub section_budget: Option<usize>,
}

impl Planner<'_> {
    pub fn plan(&self, specs: &[AgentSpec]) -> FlowResult<ExecutionPlan> {
        let graph = FlowGraph::build(specs)?;

        let mut agents = Vec::with_capacity(specs.len());
        for spec in specs {
            let routed = match self.section_budget {
                Some(budget) => self.router.route_within(self.spec, &spec.name, budget),
                None => self.router.route(self.spec, &spec.name),
            }
            .map_err(|source| FlowError::Routing {
                agent: spec.name.clone(),
                source,
            })?;

            let targets = spec
                .target_sections
                .clone()
                .unwrap_or_else(|| routed.section_ids().to_vec());
            let rules =
                self.manager
                    .pack_rules(self.rules, &targets, &spec.name, self.rule_budget);

            agents.push(PlannedAgent {
                spec: spec.clone(),
                routed,
                rules: Arc::new(rules),
            });
        }

        let order = graph.topological_order();
        let levels = graph.levels();
        Ok(ExecutionPlan {
            graph,
            agents,
            order,
            levels,
        })
    }
}

/// A validated flow, ready to run.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    graph: FlowGraph,
    agents: Vec<PlannedAgent>,
    order: Vec<usize>,
    levels: Vec<Vec<usize>>,
}

impl ExecutionPlan {
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agent(&self, name: &str) -> Option<&PlannedAgent> {
        self.graph.index_of(name).map(|i| &self.agents[i])
    }

    pub fn agents(&self) -> &[PlannedAgent] {
        &self.agents
    }

    /// Agent names in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.graph.name(i)).collect()
    }

    /// Parallel waves, for display.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&i| self.graph.name(i)).collect())
            .collect()
    }

    pub fn describe(&self) -> PlanSummary {
        PlanSummary {
            order: self.order().into_iter().map(str::to_string).collect(),
            levels: self
                .levels()
                .into_iter()
                .map(|l| l.into_iter().map(str::to_string).collect())
                .collect(),
            agents: self
                .order
                .iter()
                .map(|&i| {
                    let a = &self.agents[i];
                    PlannedAgentSummary {
                        name: a.spec.name.clone(),
                        depends_on: a.spec.depends_on.clone(),
                        provides: a.spec.provides.clone(),
                        priority: a.spec.priority,
                        sections: to_strings(a.routed.section_ids()),
                        omitted_sections: to_strings(a.routed.omitted()),
                        rules_included: to_strings(a.rules.included_ids()),
                        rules_excluded: to_strings(a.rules.excluded_ids()),
                        rule_overage: a.rules.usage.overage,
                    }
                })
                .collect(),
        }
    }
}

fn to_strings<T: ToString>(items: impl IntoIterator<Item = T>) -> Vec<String> {
    items.into_iter().map(|item| item.to_string()).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub order: Vec<String>,
    pub levels: Vec<Vec<String>>,
    pub agents: Vec<PlannedAgentSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedAgentSummary {
    pub name: String,
    pub depends_on: Vec<String>,
    pub provides: Vec<String>,
    pub priority: i32,
    pub sections: Vec<String>,
    pub omitted_sections: Vec<String>,
    pub rules_included: Vec<String>,
    pub rules_excluded: Vec<String>,
    pub rule_overage: usize,
}

/// Cancels the runs of the orchestrator it came from.
///
/// Cancellation is sticky: once cancelled, later runs end immediately.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

struct AgentNode {
    spec: AgentSpec,
    agent: Arc<dyn Agent>,
}

pub struct FlowOrchestrator {
    spec: Arc<Specification>,
    router: SectionRouter,
    rules: Vec<Rule>,
    manager: RuleContextManager,
    config: OrchestratorConfig,
    nodes: Vec<AgentNode>,
    hooks: HookRegistry,
    cancel: Arc<watch::Sender<bool>>,
}

impl std::fmt::Debug for FlowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowOrchestrator")
            .field("spec", &self.spec.info().id)
            .field("agents", &self.agent_names())
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl FlowOrchestrator {
    pub fn new(
        spec: Arc<Specification>,
        router: SectionRouter,
        rules: Vec<Rule>,
        config: OrchestratorConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            spec,
            router,
            rules,
            manager: RuleContextManager::new(config.rule_budget),
            config,
            nodes: Vec::new(),
            hooks: HookRegistry::new(),
            cancel: Arc::new(tx),
        }
    }

    pub fn with_rule_manager(mut self, manager: RuleContextManager) -> Self {
        self.manager = manager;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn specification(&self) -> &Arc<Specification> {
        &self.spec
    }

    pub fn agent_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.spec.name.as_str()).collect()
    }

    /// Register `agent`. Dependencies are checked at [`build`](Self::build)
    /// time, so agents may be registered in any order.
    pub fn register_agent(
        &mut self,
        agent: Arc<dyn Agent>,
        depends_on: &[&str],
        provides: &[&str],
        priority: i32,
    ) -> FlowResult<()> {
        let spec = AgentSpec::new(agent.name())
            .depends_on(depends_on.iter().copied())
            .provides(provides.iter().copied())
            .priority(priority);
        self.register(agent, spec)
    }

    /// Register `agent` with a full [`AgentSpec`]; the spec's name is taken
    /// from the agent.
    pub fn register(&mut self, agent: Arc<dyn Agent>, mut spec: AgentSpec) -> FlowResult<()> {
        spec.name = agent.name().to_string();
        if self.nodes.iter().any(|n| n.spec.name == spec.name) {
            return Err(FlowError::DuplicateAgent { agent: spec.name });
        }
        if let Some(sections) = agent.target_sections() {
            spec.target_sections = Some(sections);
        }
        debug!(agent = %spec.name, depends_on = ?spec.depends_on, "agent registered");
        self.nodes.push(AgentNode { spec, agent });
        Ok(())
    }

    /// Register every spec, taking implementations from `registry`.
    pub fn register_specs(
        &mut self,
        registry: &AgentRegistry,
        specs: &[AgentSpec],
    ) -> FlowResult<()> {
        for spec in specs {
            let agent = registry
                .get(&spec.name)
                .ok_or_else(|| FlowError::AgentNotRegistered {
                    agent: spec.name.clone(),
                })?;
            self.register(agent, spec.clone())?;
        }
        Ok(())
    }

    pub fn add_hook<F>(&mut self, point: HookPoint, hook: F)
    where
        F: Fn(&HookEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.add(point, hook);
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel),
        }
    }

    /// Validate the graph and precompute every agent's inputs.
    pub fn build(&self) -> FlowResult<ExecutionPlan> {
        let specs: Vec<AgentSpec> = self.nodes.iter().map(|n| n.spec.clone()).collect();
        Planner {
            spec: &self.spec,
            router: &self.router,
            manager: &self.manager,
            rules: &self.rules,
            rule_budget: self.config.rule_budget,
            section_budget: self.config.section_budget,
        }
        .plan(&specs)
    }

    /// Build and run the flow.
    ///
    /// Returns `Err` only for configuration errors; agent failures are
    /// reported in the [`RunResult`].
    pub async fn execute(&self) -> FlowResult<RunResult> {
        let plan = self.build()?;
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string());
        Ok(self.run(&plan, run_id).instrument(span).await)
    }

    async fn run(&self, plan: &ExecutionPlan, run_id: Uuid) -> RunResult {
        let started_at = Utc::now();
        let clock = Instant::now();
        let spec_digest = self.spec.digest();
        obs::emit_run_started(
            &run_id.to_string(),
            &self.spec.info().id,
            self.config.strategy.as_str(),
            plan.len(),
        );

        let mut state = RunState::new(self, plan, run_id);
        match self.config.strategy {
            FlowStrategy::Sequential => self.run_sequential(&mut state).await,
            FlowStrategy::Dag => self.run_dag(&mut state).await,
        }

        let status = if state.cancelled {
            RunStatus::Cancelled
        } else if state.failure_seen {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };

        self.hooks.invoke(&HookEvent::OnComplete { run_id, status });

        let duration_ms = clock.elapsed().as_millis() as u64;
        obs::emit_run_finished(&run_id.to_string(), status.as_str(), duration_ms, plan.len());
        METRICS.flush();

        let terminated_early = state.terminated_early;
        let (records, completion_order, messages, conflicts, artifacts) = state.into_parts();
        RunResult {
            run_id,
            spec_id: self.spec.info().id.clone(),
            spec_digest,
            strategy: self.config.strategy,
            status,
            records,
            completion_order,
            messages,
            artifacts,
            artifact_conflicts: conflicts,
            terminated_early,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }

    async fn run_sequential(&self, state: &mut RunState<'_>) {
        let cancel_rx = self.cancel.subscribe();
        let plan = state.plan;
        for &idx in &plan.order {
            if *cancel_rx.borrow() {
                state.cancel_pending();
                break;
            }
            if !state.is_pending(idx) {
                continue;
            }
            let (agent, ctx, started_at) = state.dispatch(idx);
            let (result, duration_ms) = run_agent(agent, ctx).await;
            state.finish(idx, result, started_at, duration_ms);
        }
    }

    async fn run_dag(&self, state: &mut RunState<'_>) {
        let mut cancel_rx = self.cancel.subscribe();
        let mut cancel_open = true;
        let limit = self.config.max_concurrent.max(1);
        let mut tasks: JoinSet<JoinedAgent> = JoinSet::new();
        let mut running = 0usize;

        loop {
            if !state.cancelled && *cancel_rx.borrow() {
                state.cancel_pending();
            }

            if !state.cancelled {
                for idx in state.ready(limit.saturating_sub(running)) {
                    let (agent, ctx, started_at) = state.dispatch(idx);
                    running += 1;
                    tasks.spawn(async move {
                        let (result, duration_ms) = run_agent(agent, ctx).await;
                        (idx, started_at, result, duration_ms)
                    });
                }
            }

            if running == 0 {
                break;
            }

            if state.failure_seen && self.config.in_flight == InFlightPolicy::Detach {
                // Agents that already finished report their real outcome.
                let mut collected = false;
                while let Some(joined) = tasks.try_join_next() {
                    running -= 1;
                    collected = true;
                    collect_joined(state, joined);
                }
                if collected {
                    continue;
                }
                if !state.has_pending() {
                    state.terminated_early = true;
                    break;
                }
            }

            tokio::select! {
                changed = cancel_rx.changed(), if cancel_open && !state.cancelled => {
                    if changed.is_err() {
                        cancel_open = false;
                    }
                }
                joined = tasks.join_next() => match joined {
                    Some(joined) => {
                        running -= 1;
                        collect_joined(state, joined);
                    }
                    None => break,
                },
            }
        }

        if state.terminated_early {
            state.detach_running();
            tasks.detach_all();
        }
        state.settle_leftovers();
    }
}

type JoinedAgent = (usize, DateTime<Utc>, AgentResult, u64);

fn collect_joined(state: &mut RunState<'_>, joined: Result<JoinedAgent, JoinError>) {
    match joined {
        Ok((idx, started_at, result, duration_ms)) => {
            state.finish(idx, result, started_at, duration_ms)
        }
        Err(e) => warn!(error = %e, "agent task ended abnormally"),
    }
}

/// Run one agent, converting a panic into a failed result.
async fn run_agent(agent: Arc<dyn Agent>, ctx: AgentContext) -> (AgentResult, u64) {
    let clock = Instant::now();
    let result = match AssertUnwindSafe(agent.execute(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => AgentResult::failure(format!(
            "agent panicked: {}",
            panic_message(panic.as_ref())
        )),
    };
    (result, clock.elapsed().as_millis() as u64)
}

enum Slot {
    Pending,
    Running { started_at: DateTime<Utc> },
    Done(AgentRecord),
}

/// Scheduler state for one run. Owned by the coordinator only.
struct RunState<'a> {
    orchestrator: &'a FlowOrchestrator,
    plan: &'a ExecutionPlan,
    run_id: Uuid,
    store: ArtifactStore,
    slots: Vec<Slot>,
    completion_order: Vec<String>,
    messages: Vec<FlowMessage>,
    conflicts: Vec<crate::flow::artifacts::ArtifactConflict>,
    failure_seen: bool,
    cancelled: bool,
    terminated_early: bool,
}

impl<'a> RunState<'a> {
    fn new(orchestrator: &'a FlowOrchestrator, plan: &'a ExecutionPlan, run_id: Uuid) -> Self {
        Self {
            orchestrator,
            plan,
            run_id,
            store: ArtifactStore::new(),
            slots: (0..plan.len()).map(|_| Slot::Pending).collect(),
            completion_order: Vec::new(),
            messages: Vec::new(),
            conflicts: Vec::new(),
            failure_seen: false,
            cancelled: false,
            terminated_early: false,
        }
    }

    fn name(&self, idx: usize) -> &'a str {
        let plan: &'a ExecutionPlan = self.plan;
        plan.graph.name(idx)
    }

    fn is_pending(&self, idx: usize) -> bool {
        matches!(self.slots[idx], Slot::Pending)
    }

    fn has_pending(&self) -> bool {
        self.slots.iter().any(|s| matches!(s, Slot::Pending))
    }

    fn succeeded(&self, idx: usize) -> bool {
        matches!(&self.slots[idx], Slot::Done(r) if r.result.status == AgentStatus::Success)
    }

    /// Up to `max` pending agents whose dependencies all succeeded, in plan
    /// order.
    fn ready(&self, max: usize) -> Vec<usize> {
        let plan = self.plan;
        plan.order
            .iter()
            .copied()
            .filter(|&i| self.is_pending(i))
            .filter(|&i| plan.graph.upstream(i).iter().all(|&u| self.succeeded(u)))
            .take(max)
            .collect()
    }

    /// Claim `idx`: build its context, fire `pre_agent`, mark it running.
    fn dispatch(&mut self, idx: usize) -> (Arc<dyn Agent>, AgentContext, DateTime<Utc>) {
        let plan = self.plan;
        let orchestrator = self.orchestrator;
        let planned = &plan.agents[idx];
        let name = self.name(idx);

        let upstream = plan
            .graph
            .upstream(idx)
            .iter()
            .filter_map(|&u| match &self.slots[u] {
                Slot::Done(record) => Some((self.name(u).to_string(), record.result.clone())),
                _ => None,
            })
            .collect();

        let ctx = AgentContext {
            run_id: self.run_id,
            agent: name.to_string(),
            routed: planned.routed.clone(),
            rules: Arc::clone(&planned.rules),
            artifacts: self.store.view(),
            upstream,
            project_root: orchestrator.config.project_root.clone(),
            language: orchestrator.config.language.clone(),
        };

        orchestrator.hooks.invoke(&HookEvent::PreAgent {
            agent: name.to_string(),
            sections: planned.routed.section_ids().to_vec(),
            rules: planned
                .rules
                .included_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
        obs::emit_agent_dispatched(name, planned.routed.section_ids().len(), planned.rules.len());

        let started_at = Utc::now();
        self.slots[idx] = Slot::Running { started_at };
        (Arc::clone(&orchestrator.nodes[idx].agent), ctx, started_at)
    }

    fn finish(
        &mut self,
        idx: usize,
        result: AgentResult,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) {
        let plan = self.plan;
        let orchestrator = self.orchestrator;
        let hooks = &orchestrator.hooks;
        let provides = &plan.agents[idx].spec.provides;
        let name = self.name(idx);

        METRICS.inc_agents_executed();

        let mut undeclared = Vec::new();
        if result.is_success() {
            for (artifact, value) in &result.artifacts {
                let declared = provides.contains(artifact);
                if !declared {
                    undeclared.push(artifact.clone());
                }
                self.publish(name, artifact, value.clone(), declared);
            }
            for artifact in provides {
                if result.artifacts.contains_key(artifact) {
                    continue;
                }
                if let Some(value) = result.data.get(artifact) {
                    self.publish(name, artifact, value.clone(), true);
                }
            }
        } else {
            for artifact in provides {
                self.store.mark_unavailable(artifact, name);
            }
        }
        if !undeclared.is_empty() {
            warn!(agent = %name, artifacts = ?undeclared, "agent produced undeclared artifacts");
        }

        self.messages.push(FlowMessage::to_orchestrator(
            name,
            MessageKind::Result,
            json!({ "status": result.status, "message": result.message }),
        ));
        if result.is_failed() {
            METRICS.inc_agents_failed();
            self.failure_seen = true;
            self.messages.push(FlowMessage::to_orchestrator(
                name,
                MessageKind::Error,
                json!({ "errors": result.errors }),
            ));
        }
        if let Some(question) = result.pending_question() {
            info!(
                event = "agent.question",
                agent = %name,
                question = %question,
                "agent requested input"
            );
            self.messages.push(FlowMessage::to_orchestrator(
                name,
                MessageKind::Request,
                question.clone(),
            ));
        }

        obs::emit_agent_finished(name, result.status.as_str(), duration_ms);

        hooks.invoke(&HookEvent::PostAgent {
            agent: name.to_string(),
            result: result.clone(),
            undeclared_artifacts: undeclared,
        });
        if result.is_failed() {
            hooks.invoke(&HookEvent::OnError {
                agent: name.to_string(),
                errors: result.errors.clone(),
            });
        }

        let status = result.status;
        self.record(
            idx,
            AgentRecord {
                agent: name.to_string(),
                result,
                started_at: Some(started_at),
                finished_at: Some(Utc::now()),
                duration_ms,
                blocked_by: None,
            },
        );

        if status != AgentStatus::Success {
            self.block_dependents(idx, status);
        }
    }

    fn publish(&mut self, producer: &str, artifact: &str, value: Value, declared: bool) {
        match self.store.try_insert(artifact, producer, value, declared) {
            Ok(()) => self.messages.push(FlowMessage::broadcast(
                producer,
                MessageKind::Artifact,
                json!({ "name": artifact, "declared": declared }),
            )),
            Err(conflict) => {
                obs::emit_artifact_conflict(
                    &conflict.artifact,
                    &conflict.existing_producer,
                    &conflict.attempted_by,
                );
                METRICS.inc_artifact_conflicts();
                self.conflicts.push(conflict);
            }
        }
    }

    fn record(&mut self, idx: usize, record: AgentRecord) {
        self.completion_order.push(record.agent.clone());
        self.slots[idx] = Slot::Done(record);
    }

    fn skip(
        &mut self,
        idx: usize,
        reason: String,
        blocked_by: Option<String>,
        started_at: Option<DateTime<Utc>>,
    ) {
        let name = self.name(idx);
        obs::emit_agent_skipped(name, &reason);
        METRICS.inc_agents_skipped();
        for artifact in &self.plan.agents[idx].spec.provides {
            self.store.mark_unavailable(artifact, name);
        }
        self.record(
            idx,
            AgentRecord {
                agent: name.to_string(),
                result: AgentResult::skipped(reason),
                started_at,
                finished_at: None,
                duration_ms: 0,
                blocked_by,
            },
        );
    }

    /// Skip every pending transitive dependent of `idx`, in plan order.
    fn block_dependents(&mut self, idx: usize, status: AgentStatus) {
        let plan = self.plan;
        let blocker = self.name(idx);
        let dependents = plan.graph.transitive_dependents(idx);
        for &d in &plan.order {
            if dependents.contains(&d) && self.is_pending(d) {
                self.skip(
                    d,
                    format!("skipped: upstream agent '{blocker}' {status}"),
                    Some(blocker.to_string()),
                    None,
                );
            }
        }
    }

    fn cancel_pending(&mut self) {
        self.cancelled = true;
        let plan = self.plan;
        for &idx in &plan.order {
            if self.is_pending(idx) {
                self.skip(idx, "skipped: run cancelled".to_string(), None, None);
            }
        }
    }

    /// Report agents still in flight as skipped; their results are dropped.
    fn detach_running(&mut self) {
        let plan = self.plan;
        for &idx in &plan.order {
            if let Slot::Running { started_at } = self.slots[idx] {
                self.skip(
                    idx,
                    "skipped: detached after an upstream failure; result not awaited".to_string(),
                    None,
                    Some(started_at),
                );
            }
        }
    }

    /// Give every agent still without an outcome a terminal record.
    fn settle_leftovers(&mut self) {
        let plan = self.plan;
        for &idx in &plan.order {
            match self.slots[idx] {
                Slot::Pending => {
                    self.skip(idx, "skipped: never became eligible".to_string(), None, None);
                }
                Slot::Running { started_at } => {
                    let name = self.name(idx);
                    self.failure_seen = true;
                    METRICS.inc_agents_failed();
                    self.record(
                        idx,
                        AgentRecord {
                            agent: name.to_string(),
                            result: AgentResult::failure("agent task ended without a result"),
                            started_at: Some(started_at),
                            finished_at: Some(Utc::now()),
                            duration_ms: 0,
                            blocked_by: None,
                        },
                    );
                }
                Slot::Done(_) => {}
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn into_parts(
        self,
    ) -> (
        BTreeMap<String, AgentRecord>,
        Vec<String>,
        Vec<FlowMessage>,
        Vec<crate::flow::artifacts::ArtifactConflict>,
        BTreeMap<String, crate::flow::artifacts::Artifact>,
    ) {
        let records = self
            .slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Done(record) => Some((record.agent.clone(), record)),
                _ => None,
            })
            .collect();
        (
            records,
            self.completion_order,
            self.messages,
            self.conflicts,
            self.store.into_inner(),
        )
    }
}
