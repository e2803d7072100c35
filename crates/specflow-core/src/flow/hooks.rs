//! Lifecycle hooks.
//!
//! Callbacks run synchronously on the coordinator in registration order.
//! A callback that returns an error or panics is logged and ignored; it can
//! never change the outcome of a run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::agent::AgentResult;
use crate::flow::run::RunStatus;
use crate::obs;
use crate::spec::SectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    PreAgent,
    PostAgent,
    OnError,
    OnComplete,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::PreAgent => "pre_agent",
            HookPoint::PostAgent => "post_agent",
            HookPoint::OnError => "on_error",
            HookPoint::OnComplete => "on_complete",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload passed to hook callbacks.
#[derive(Debug, Clone)]
pub enum HookEvent {
    PreAgent {
        agent: String,
        sections: Vec<SectionId>,
        rules: Vec<String>,
    },
    PostAgent {
        agent: String,
        result: AgentResult,
        /// Artifacts the agent produced without declaring them.
        undeclared_artifacts: Vec<String>,
    },
    OnError {
        agent: String,
        errors: Vec<String>,
    },
    OnComplete {
        run_id: Uuid,
        status: RunStatus,
    },
}

impl HookEvent {
    pub fn point(&self) -> HookPoint {
        match self {
            HookEvent::PreAgent { .. } => HookPoint::PreAgent,
            HookEvent::PostAgent { .. } => HookPoint::PostAgent,
            HookEvent::OnError { .. } => HookPoint::OnError,
            HookEvent::OnComplete { .. } => HookPoint::OnComplete,
        }
    }

    pub fn agent(&self) -> Option<&str> {
        match self {
            HookEvent::PreAgent { agent, .. }
            | HookEvent::PostAgent { agent, .. }
            | HookEvent::OnError { agent, .. } => Some(agent),
            HookEvent::OnComplete { .. } => None,
        }
    }
}

pub type HookFn = Arc<dyn Fn(&HookEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: BTreeMap<HookPoint, Vec<HookFn>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, point: HookPoint, hook: F)
    where
        F: Fn(&HookEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.entry(point).or_default().push(Arc::new(hook));
    }

    pub fn count(&self, point: HookPoint) -> usize {
        self.hooks.get(&point).map_or(0, Vec::len)
    }

    /// Run every callback for the event's hook point.
    ///
    /// Returns how many callbacks failed.
    pub fn invoke(&self, event: &HookEvent) -> usize {
        let point = event.point();
        let Some(hooks) = self.hooks.get(&point) else {
            return 0;
        };

        let mut failures = 0;
        for hook in hooks {
            match catch_unwind(AssertUnwindSafe(|| hook(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    obs::emit_hook_failed(point.as_str(), event.agent(), &e);
                }
                Err(panic) => {
                    failures += 1;
                    let msg = panic_message(panic.as_ref());
                    obs::emit_hook_failed(point.as_str(), event.agent(), &msg);
                }
            }
        }
        failures
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<HookPoint, usize> =
            self.hooks.iter().map(|(p, h)| (*p, h.len())).collect();
        f.debug_struct("HookRegistry").field("hooks", &counts).finish()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
