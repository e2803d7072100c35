//! Explicit identity → implementation map, built once at process start.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agent::Agent;

#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the agent's own name, replacing any previous entry.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Option<Arc<dyn Agent>> {
        self.agents.insert(agent.name().to_string(), agent)
    }

    pub fn with(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentResult, FnAgent};

    fn noop(name: &str) -> Arc<dyn Agent> {
        Arc::new(FnAgent::new(name, |_| async { AgentResult::success("ok") }))
    }

    #[test]
    fn test_register_keys_by_agent_name() {
        let registry = AgentRegistry::new()
            .with(noop("coding_agent"))
            .with(noop("security_agent"));
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("coding_agent"));
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["coding_agent", "security_agent"]
        );
    }

    #[test]
    fn test_register_replaces_previous_entry() {
        let mut registry = AgentRegistry::new();
        assert!(registry.register(noop("a")).is_none());
        assert!(registry.register(noop("a")).is_some());
        assert_eq!(registry.len(), 1);
    }
}
