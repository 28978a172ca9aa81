// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashSet};

use petgraph::Direction;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::dag::WorkSpec;
use crate::errors::{PipelineError, Result};
use crate::shaper::ShaperRegistry;

/// Internal node structure: the spec (with normalised dependencies) and the
/// ids of the steps that list it as a dependency.
#[derive(Debug, Clone)]
struct GraphNode {
    spec: WorkSpec,
    dependents: Vec<String>,
}

/// Validated dependency graph keyed by work id.
///
/// Construction guarantees that every dependency names an existing step and
/// that the `dependencies` relation is acyclic. The node set never changes
/// after construction; [`DependencyGraph::filter_to_targets`] returns a new
/// graph instead of pruning in place.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, GraphNode>,
}

impl DependencyGraph {
    /// Build and validate a graph from specs keyed by id.
    ///
    /// Fails with:
    /// - `Configuration` if a key disagrees with its spec's id, a dependency
    ///   names a step that does not exist, or a non-empty dependency clause
    ///   contains no usable id;
    /// - `CyclicDependency` if the steps form a cycle of any length.
    pub fn build(specs: &BTreeMap<String, WorkSpec>) -> Result<Self> {
        let mut nodes = BTreeMap::new();

        for (key, spec) in specs.iter() {
            if *key != spec.id {
                return Err(PipelineError::configuration(
                    key.clone(),
                    format!("spec registered under '{}' declares id '{}'", key, spec.id),
                ));
            }

            let dependencies = normalize_dependencies(spec)?;
            for dep in &dependencies {
                if !specs.contains_key(dep) {
                    return Err(PipelineError::configuration(
                        dep.clone(),
                        format!("step '{}' depends on unknown step '{}'", spec.id, dep),
                    ));
                }
            }

            let mut spec = spec.clone();
            spec.dependencies = dependencies;
            nodes.insert(
                key.clone(),
                GraphNode {
                    spec,
                    dependents: Vec::new(),
                },
            );
        }

        let graph = Self::link(nodes);
        graph.detect_cycle()?;

        debug!(works = graph.len(), "dependency graph built");
        Ok(graph)
    }

    /// Convenience wrapper over [`DependencyGraph::build`] for a list of
    /// specs. Duplicate ids are a configuration error.
    pub fn from_specs<I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = WorkSpec>,
    {
        let mut by_id = BTreeMap::new();
        for spec in specs {
            let id = spec.id.clone();
            if by_id.insert(id.clone(), spec).is_some() {
                return Err(PipelineError::configuration(id, "duplicate step id"));
            }
        }
        Self::build(&by_id)
    }

    /// Populate dependents from dependencies.
    fn link(mut nodes: BTreeMap<String, GraphNode>) -> Self {
        let edges: Vec<(String, String)> = nodes
            .values()
            .flat_map(|n| {
                n.spec
                    .dependencies
                    .iter()
                    .map(move |dep| (dep.clone(), n.spec.id.clone()))
            })
            .collect();

        for (dep, dependent) in edges {
            if let Some(node) = nodes.get_mut(&dep) {
                node.dependents.push(dependent);
            }
        }

        Self { nodes }
    }

    /// Check that following `dependencies` from any step never leads back to
    /// it. The error names the steps on one such cycle, in traversal order.
    pub fn detect_cycle(&self) -> Result<()> {
        // Edge direction follows the declaration: for
        //   [shaper.B]
        //   after = ["A"]
        // we add edge B -> A.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (id, node) in self.nodes.iter() {
            graph.add_node(id.as_str());
            for dep in node.spec.dependencies.iter() {
                if dep == id {
                    return Err(PipelineError::CyclicDependency {
                        path: vec![id.clone(), id.clone()],
                    });
                }
                graph.add_edge(id.as_str(), dep.as_str(), ());
            }
        }

        // A topological sort will fail if there is a cycle.
        let origin = match toposort(&graph, None) {
            Ok(_order) => return Ok(()),
            Err(cycle) => cycle.node_id(),
        };

        let component: HashSet<&str> = tarjan_scc(&graph)
            .into_iter()
            .find(|scc| scc.contains(&origin))
            .unwrap_or_else(|| vec![origin])
            .into_iter()
            .collect();

        Err(PipelineError::CyclicDependency {
            path: cycle_through(&graph, origin, &component),
        })
    }

    /// Restrict the graph to the targets and everything they transitively
    /// depend on. Steps no target needs are dropped.
    pub fn filter_to_targets(&self, targets: &BTreeSet<String>) -> Result<Self> {
        let mut stack: Vec<&str> = Vec::new();
        for target in targets {
            if !self.nodes.contains_key(target) {
                return Err(PipelineError::UnknownTarget { id: target.clone() });
            }
            stack.push(target.as_str());
        }

        let mut keep: BTreeSet<&str> = BTreeSet::new();
        while let Some(id) = stack.pop() {
            if !keep.insert(id) {
                continue;
            }
            stack.extend(self.dependencies_of(id).iter().map(String::as_str));
        }

        let nodes = keep
            .iter()
            .filter_map(|id| self.nodes.get(*id))
            .map(|node| {
                (
                    node.spec.id.clone(),
                    GraphNode {
                        spec: node.spec.clone(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        let filtered = Self::link(nodes);
        debug!(
            requested = targets.len(),
            kept = filtered.len(),
            dropped = self.len() - filtered.len(),
            "filtered dependency graph to targets"
        );
        Ok(filtered)
    }

    /// Instantiate every step once through the registry so that unknown
    /// kinds and malformed params surface before execution.
    pub fn validate_kinds(&self, registry: &ShaperRegistry) -> Result<()> {
        for node in self.nodes.values() {
            registry
                .instantiate(&node.spec.kind, &node.spec.params)
                .map_err(|e| PipelineError::configuration(node.spec.id.clone(), e.to_string()))?;
        }
        Ok(())
    }

    /// All work ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn spec(&self, id: &str) -> Option<&WorkSpec> {
        self.nodes.get(id).map(|n| &n.spec)
    }

    pub fn specs(&self) -> impl Iterator<Item = &WorkSpec> {
        self.nodes.values().map(|n| &n.spec)
    }

    /// Immediate dependencies of a step, in declaration order.
    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.spec.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a step (steps that list it in `after`).
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Ids ordered so that every step comes after all of its dependencies.
    pub fn topological_order(&self) -> Vec<&str> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for (id, node) in self.nodes.iter() {
            graph.add_node(id.as_str());
            for dep in node.spec.dependencies.iter() {
                graph.add_edge(dep.as_str(), id.as_str(), ());
            }
        }
        // Acyclic by construction.
        toposort(&graph, None).unwrap_or_default()
    }
}

/// Trim dependency ids and drop blanks and repeats. A clause that declared
/// something but resolves to nothing is malformed.
fn normalize_dependencies(spec: &WorkSpec) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let deps: Vec<String> = spec
        .dependencies
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .filter(|d| seen.insert(d.to_string()))
        .map(str::to_string)
        .collect();

    if !spec.dependencies.is_empty() && deps.is_empty() {
        return Err(PipelineError::configuration(
            spec.id.clone(),
            "dependency clause does not name any step",
        ));
    }
    Ok(deps)
}

/// Walk outgoing edges inside one strongly connected component until the
/// walk returns to `origin`. Returns the ids along the way, starting and
/// ending with `origin`.
fn cycle_through<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    origin: &'a str,
    component: &HashSet<&'a str>,
) -> Vec<String> {
    let mut path: Vec<&str> = vec![origin];
    let mut visited: HashSet<&str> = HashSet::from([origin]);
    let mut frontier: Vec<Vec<&str>> = vec![successors(graph, origin, component)];

    while let Some(candidates) = frontier.last_mut() {
        match candidates.pop() {
            Some(next) if next == origin => {
                path.push(origin);
                return path.into_iter().map(str::to_string).collect();
            }
            Some(next) => {
                if visited.insert(next) {
                    path.push(next);
                    frontier.push(successors(graph, next, component));
                }
            }
            None => {
                frontier.pop();
                path.pop();
            }
        }
    }

    vec![origin.to_string()]
}

fn successors<'a>(
    graph: &DiGraphMap<&'a str, ()>,
    node: &'a str,
    component: &HashSet<&'a str>,
) -> Vec<&'a str> {
    graph
        .neighbors_directed(node, Direction::Outgoing)
        .filter(|n| component.contains(n))
        .collect()
}
