//! Index-based dependency graph over registered agents.
//!
//! Node `i` is the `i`-th registered agent. An edge `a → b` means "b
//! depends on a". Validation rejects unknown dependencies and cycles (DFS
//! colour marking, reporting the cycle path). Ordering ties are broken by
//! descending priority, then registration order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::flow::error::{FlowError, FlowResult};
use crate::spec::SectionId;

/// Declared shape of one agent in a flow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub provides: Vec<String>,
    /// Informational; only breaks ordering ties.
    #[serde(default)]
    pub priority: i32,
    /// Overrides the routed sections when filtering rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sections: Option<Vec<SectionId>>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn provides<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Heap key: higher priority first, then lower index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyKey {
    priority: i32,
    index: Reverse<usize>,
}

impl Ord for ReadyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for ReadyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Validated, acyclic agent graph.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    names: Vec<String>,
    priorities: Vec<i32>,
    index: HashMap<String, usize>,
    upstream: Vec<BTreeSet<usize>>,
    downstream: Vec<BTreeSet<usize>>,
}

impl FlowGraph {
    /// Build and validate the graph for `specs`, in registration order.
    pub fn build(specs: &[AgentSpec]) -> FlowResult<Self> {
        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(FlowError::DuplicateAgent {
                    agent: spec.name.clone(),
                });
            }
        }

        let mut upstream = vec![BTreeSet::new(); specs.len()];
        let mut downstream = vec![BTreeSet::new(); specs.len()];
        for (i, spec) in specs.iter().enumerate() {
            for dep in &spec.depends_on {
                let &d = index.get(dep).ok_or_else(|| FlowError::UnknownDependency {
                    agent: spec.name.clone(),
                    dependency: dep.clone(),
                })?;
                upstream[i].insert(d);
                downstream[d].insert(i);
            }
        }

        let graph = Self {
            names: specs.iter().map(|s| s.name.clone()).collect(),
            priorities: specs.iter().map(|s| s.priority).collect(),
            index,
            upstream,
            downstream,
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(FlowError::CyclicDependency { cycle });
        }
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn priority(&self, index: usize) -> i32 {
        self.priorities[index]
    }

    /// Direct dependencies of `index`.
    pub fn upstream(&self, index: usize) -> &BTreeSet<usize> {
        &self.upstream[index]
    }

    /// Direct dependents of `index`.
    pub fn downstream(&self, index: usize) -> &BTreeSet<usize> {
        &self.downstream[index]
    }

    fn ready_key(&self, index: usize) -> ReadyKey {
        ReadyKey {
            priority: self.priorities[index],
            index: Reverse(index),
        }
    }

    /// Topological order with deterministic tie-breaking.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self.upstream.iter().map(BTreeSet::len).collect();
        let mut ready: BinaryHeap<ReadyKey> = (0..self.len())
            .filter(|&i| in_degree[i] == 0)
            .map(|i| self.ready_key(i))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(ReadyKey {
            index: Reverse(i), ..
        }) = ready.pop()
        {
            order.push(i);
            for &d in &self.downstream[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    ready.push(self.ready_key(d));
                }
            }
        }
        order
    }

    /// Kahn waves: every node in a wave depends only on earlier waves.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let mut in_degree: Vec<usize> = self.upstream.iter().map(BTreeSet::len).collect();
        let mut current: Vec<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut levels = Vec::new();

        while !current.is_empty() {
            current.sort_by_key(|&i| self.ready_key(i));
            current.reverse();

            let mut next = Vec::new();
            for &i in &current {
                for &d in &self.downstream[i] {
                    in_degree[d] -= 1;
                    if in_degree[d] == 0 {
                        next.push(d);
                    }
                }
            }
            levels.push(std::mem::take(&mut current));
            current = next;
        }
        levels
    }

    /// Every node reachable downstream of `index` (BFS), excluding itself.
    pub fn transitive_dependents(&self, index: usize) -> BTreeSet<usize> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([index]);
        while let Some(current) = queue.pop_front() {
            for &d in &self.downstream[current] {
                if visited.insert(d) {
                    queue.push_back(d);
                }
            }
        }
        visited
    }

    /// DFS over dependency edges; returns the cycle as a closed name path.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::White; self.len()];
        let mut path = Vec::new();
        for start in 0..self.len() {
            if marks[start] == Mark::White {
                if let Some(cycle) = self.visit(start, &mut marks, &mut path) {
                    return Some(cycle.into_iter().map(|i| self.names[i].clone()).collect());
                }
            }
        }
        None
    }

    fn visit(&self, node: usize, marks: &mut [Mark], path: &mut Vec<usize>) -> Option<Vec<usize>> {
        marks[node] = Mark::Grey;
        path.push(node);
        for &dep in &self.upstream[node] {
            match marks[dep] {
                Mark::Grey => {
                    let start = path.iter().position(|&n| n == dep).unwrap_or(0);
                    let mut cycle: Vec<usize> = path[start..].to_vec();
                    cycle.push(dep);
                    return Some(cycle);
                }
                Mark::White => {
                    if let Some(cycle) = self.visit(dep, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Black => {}
            }
        }
        path.pop();
        marks[node] = Mark::Black;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &FlowGraph, order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| graph.name(i).to_string()).collect()
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let graph = FlowGraph::build(&[
            AgentSpec::new("review").depends_on(["code", "tests"]),
            AgentSpec::new("tests").depends_on(["code"]),
            AgentSpec::new("code"),
        ])
        .unwrap();
        assert_eq!(names(&graph, &graph.topological_order()), ["code", "tests", "review"]);
    }

    #[test]
    fn test_ties_break_on_priority_then_registration() {
        let graph = FlowGraph::build(&[
            AgentSpec::new("root").priority(100),
            AgentSpec::new("low").depends_on(["root"]).priority(10),
            AgentSpec::new("first_high").depends_on(["root"]).priority(80),
            AgentSpec::new("second_high").depends_on(["root"]).priority(80),
        ])
        .unwrap();
        assert_eq!(
            names(&graph, &graph.topological_order()),
            ["root", "first_high", "second_high", "low"]
        );
    }

    #[test]
    fn test_levels_group_parallel_waves() {
        let graph = FlowGraph::build(&[
            AgentSpec::new("a"),
            AgentSpec::new("b").depends_on(["a"]),
            AgentSpec::new("c").depends_on(["a"]),
            AgentSpec::new("d").depends_on(["b", "c"]),
        ])
        .unwrap();
        let levels: Vec<Vec<String>> = graph.levels().iter().map(|l| names(&graph, l)).collect();
        assert_eq!(levels, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let err = FlowGraph::build(&[AgentSpec::new("b").depends_on(["a"])]).unwrap_err();
        assert!(matches!(
            err,
            FlowError::UnknownDependency { agent, dependency } if agent == "b" && dependency == "a"
        ));
    }

    #[test]
    fn test_cycle_is_reported_with_path() {
        let err = FlowGraph::build(&[
            AgentSpec::new("a").depends_on(["c"]),
            AgentSpec::new("b").depends_on(["a"]),
            AgentSpec::new("c").depends_on(["b"]),
        ])
        .unwrap_err();
        match err {
            FlowError::CyclicDependency { cycle } => {
                assert_eq!(cycle.first(), cycle.last());
                assert_eq!(cycle.len(), 4);
                for name in ["a", "b", "c"] {
                    assert!(cycle.iter().any(|n| n == name));
                }
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = FlowGraph::build(&[AgentSpec::new("a").depends_on(["a"])]).unwrap_err();
        assert!(matches!(err, FlowError::CyclicDependency { cycle } if cycle == ["a", "a"]));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = FlowGraph::build(&[AgentSpec::new("a"), AgentSpec::new("a")]).unwrap_err();
        assert!(matches!(err, FlowError::DuplicateAgent { agent } if agent == "a"));
    }

    #[test]
    fn test_transitive_dependents() {
        let graph = FlowGraph::build(&[
            AgentSpec::new("a"),
            AgentSpec::new("b").depends_on(["a"]),
            AgentSpec::new("c").depends_on(["b"]),
            AgentSpec::new("d"),
        ])
        .unwrap();
        assert_eq!(graph.transitive_dependents(0), BTreeSet::from([1, 2]));
        assert!(graph.transitive_dependents(3).is_empty());
    }
}
