//! The pluggable agent contract.
//!
//! - [`Agent`]: the trait every unit of work implements
//! - [`FnAgent`]: adapter for an async closure
//! - [`context`]: `AgentContext`, the per-dispatch input
//! - [`result`]: `AgentResult`, `AgentStatus`
//! - [`registry`]: `AgentRegistry`, identity → implementation

pub mod context;
pub mod registry;
pub mod result;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::spec::SectionId;

pub use context::AgentContext;
pub use registry::AgentRegistry;
pub use result::{AgentResult, AgentStatus, PENDING_QUESTION_KEY};

/// A unit of work driven by the orchestrator.
///
/// Agents report failure through [`AgentResult::failure`]; a panic inside
/// `execute` is caught by the orchestrator and recorded the same way.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Sections used to filter rules for this agent. `None` means the
    /// agent's routed sections.
    fn target_sections(&self) -> Option<Vec<SectionId>> {
        None
    }

    async fn execute(&self, ctx: AgentContext) -> AgentResult;
}

type AgentFn = dyn Fn(AgentContext) -> BoxFuture<'static, AgentResult> + Send + Sync;

/// [`Agent`] backed by an async closure.
///
/// ```ignore
/// let agent = FnAgent::new("coding_agent", |ctx| async move {
///     AgentResult::success(format!("saw {} sections", ctx.routed.section_ids().len()))
/// });
/// ```
#[derive(Clone)]
pub struct FnAgent {
    name: String,
    target_sections: Option<Vec<SectionId>>,
    run: Arc<AgentFn>,
}

impl FnAgent {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(AgentContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            target_sections: None,
            run: Arc::new(move |ctx| f(ctx).boxed()),
        }
    }

    pub fn with_target_sections(mut self, sections: impl IntoIterator<Item = SectionId>) -> Self {
        self.target_sections = Some(sections.into_iter().collect());
        self
    }
}

impl fmt::Debug for FnAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAgent")
            .field("name", &self.name)
            .field("target_sections", &self.target_sections)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Agent for FnAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn target_sections(&self) -> Option<Vec<SectionId>> {
        self.target_sections.clone()
    }

    async fn execute(&self, ctx: AgentContext) -> AgentResult {
        (self.run)(ctx).await
    }
}
