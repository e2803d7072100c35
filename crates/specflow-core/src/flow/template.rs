//! Pre-wired flows for the standard agent roster.
//!
//! A template only describes the graph ([`AgentSpec`]s); implementations
//! come from an [`AgentRegistry`](crate::agent::AgentRegistry) via
//! [`FlowOrchestrator::register_specs`](crate::flow::FlowOrchestrator::register_specs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::flow::error::FlowError;
use crate::flow::graph::AgentSpec;

/// `(agent, depends_on, provides)` for every standard agent.
pub const STANDARD_DEPENDENCIES: &[(&str, &[&str], &[&str])] = &[
    ("coding_agent", &[], &["code", "files_created"]),
    ("linter_agent", &["coding_agent"], &["linted_code"]),
    ("test_generator_agent", &["coding_agent"], &["tests", "test_files"]),
    ("testing_agent", &["coding_agent"], &["tests", "test_files"]),
    ("code_review_agent", &["coding_agent", "testing_agent"], &["review"]),
    ("security_agent", &["coding_agent"], &["security_report"]),
    ("architecture_agent", &["coding_agent"], &["architecture_update"]),
];

/// Standard `(depends_on, provides)` for `agent`.
pub fn standard_dependencies(
    agent: &str,
) -> Option<(&'static [&'static str], &'static [&'static str])> {
    STANDARD_DEPENDENCIES
        .iter()
        .find(|(name, _, _)| *name == agent)
        .map(|(_, deps, provides)| (*deps, *provides))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowTemplate {
    /// Code, then security scan and tests in parallel, then review.
    Full,
    /// Code and a security scan only.
    Quick,
    /// Code and tests only.
    #[serde(alias = "test")]
    TestFocused,
}

impl FlowTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowTemplate::Full => "full",
            FlowTemplate::Quick => "quick",
            FlowTemplate::TestFocused => "test_focused",
        }
    }

    pub fn agent_specs(&self) -> Vec<AgentSpec> {
        let coding = AgentSpec::new("coding_agent")
            .provides(["code", "files_created"])
            .priority(100);
        let security = AgentSpec::new("security_agent")
            .depends_on(["coding_agent"])
            .provides(["security_report"])
            .priority(80);
        let tests = AgentSpec::new("test_generator_agent")
            .depends_on(["coding_agent"])
            .provides(["tests", "test_files"])
            .priority(80);

        match self {
            FlowTemplate::Full => vec![
                coding,
                security,
                tests,
                AgentSpec::new("code_review_agent")
                    .depends_on(["coding_agent", "test_generator_agent"])
                    .provides(["review"])
                    .priority(50),
            ],
            FlowTemplate::Quick => vec![coding, security],
            FlowTemplate::TestFocused => vec![coding, tests],
        }
    }

    /// Specs for an arbitrary set of agents using the standard dependency
    /// table. Dependencies on agents outside `agents` are dropped; unknown
    /// agents get no dependencies.
    pub fn custom(agents: &[&str]) -> Vec<AgentSpec> {
        agents
            .iter()
            .map(|&name| match standard_dependencies(name) {
                Some((deps, provides)) => AgentSpec::new(name)
                    .depends_on(deps.iter().copied().filter(|d| agents.contains(d)))
                    .provides(provides.iter().copied()),
                None => AgentSpec::new(name),
            })
            .collect()
    }
}

impl fmt::Display for FlowTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowTemplate {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(FlowTemplate::Full),
            "quick" => Ok(FlowTemplate::Quick),
            "test" | "test_focused" => Ok(FlowTemplate::TestFocused),
            other => Err(FlowError::UnknownTemplate(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::graph::FlowGraph;

    #[test]
    fn test_every_template_is_a_valid_graph() {
        for template in [FlowTemplate::Full, FlowTemplate::Quick, FlowTemplate::TestFocused] {
            FlowGraph::build(&template.agent_specs()).unwrap();
        }
    }

    #[test]
    fn test_full_template_runs_review_last() {
        let specs = FlowTemplate::Full.agent_specs();
        let graph = FlowGraph::build(&specs).unwrap();
        let order: Vec<&str> = graph
            .topological_order()
            .into_iter()
            .map(|i| graph.name(i))
            .collect();
        assert_eq!(order.first(), Some(&"coding_agent"));
        assert_eq!(order.last(), Some(&"code_review_agent"));
    }

    #[test]
    fn test_custom_drops_dependencies_outside_the_set() {
        let specs = FlowTemplate::custom(&["code_review_agent", "coding_agent", "docs_agent"]);
        assert_eq!(specs[0].depends_on, vec!["coding_agent".to_string()]);
        assert_eq!(specs[0].provides, vec!["review".to_string()]);
        assert!(specs[2].depends_on.is_empty());
        FlowGraph::build(&specs).unwrap();
    }

    #[test]
    fn test_template_names_parse() {
        assert_eq!("test".parse::<FlowTemplate>().unwrap(), FlowTemplate::TestFocused);
        assert!(matches!(
            "nightly".parse::<FlowTemplate>(),
            Err(FlowError::UnknownTemplate(name)) if name == "nightly"
        ));
    }

    #[test]
    fn test_serde_accepts_the_same_names_as_from_str() {
        for name in ["full", "quick", "test", "test_focused"] {
            let parsed: FlowTemplate = name.parse().unwrap();
            let deserialized: FlowTemplate = serde_json::from_value(serde_json::json!(name)).unwrap();
            assert_eq!(parsed, deserialized);
        }
    }
}
