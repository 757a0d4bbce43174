//! Dependency graph view and cycle detection using petgraph.
//!
//! [`DependencyGraph`] is an immutable-by-default adjacency view built from a
//! tenant snapshot. Edges point from **dependent -> dependency**: if task A
//! depends on task B the graph holds `A -> B`.
//!
//! Edges whose target is not in the snapshot are never added; they are a
//! referential-integrity problem, not a cycle. Self-edges and repeated edges
//! are likewise left out so cycle search only ever reports cycles through at
//! least two distinct tasks.
//!
//! All traversals use explicit stacks, so call depth stays constant no matter
//! how long a dependency chain gets.

use crate::domain::{Task, TaskId};
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Which back edges end a cycle search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackEdge {
    /// Any edge to a task on the current path
    Any,
    /// Only an edge back to the task the search started from
    ToStart,
}

/// Tasks of a snapshot in ascending sequence-number order.
///
/// Every pass over a snapshot uses this order so that issue and fix lists
/// are reproducible for a fixed input.
#[must_use]
pub fn in_number_order(tasks: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.id.cmp(&b.id)));
    ordered
}

/// Adjacency view over a tenant's tasks.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Nodes contain `TaskId` values. Edge direction: dependent -> dependency.
    graph: DiGraph<TaskId, ()>,

    /// Mapping from `TaskId` to graph `NodeIndex`.
    node_map: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    /// Build the full adjacency view of a snapshot.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut graph = Self::with_nodes(tasks);
        for task in tasks {
            for dep in &task.dependencies {
                graph.add_edge(&task.id, dep);
            }
        }
        graph
    }

    /// Build a view holding every task of the snapshot but no edges.
    #[must_use]
    pub fn with_nodes(tasks: &[Task]) -> Self {
        let mut graph = DiGraph::with_capacity(tasks.len(), 0);
        let mut node_map = HashMap::with_capacity(tasks.len());
        for task in tasks {
            node_map
                .entry(task.id.clone())
                .or_insert_with(|| graph.add_node(task.id.clone()));
        }
        Self { graph, node_map }
    }

    /// Add the edge `from -> to`.
    ///
    /// Returns `false` without touching the graph when either endpoint is
    /// unknown, the edge is a self-edge, or the edge is already present.
    pub fn add_edge(&mut self, from: &TaskId, to: &TaskId) -> bool {
        if from == to {
            return false;
        }
        let (Some(&from_node), Some(&to_node)) = (self.node_map.get(from), self.node_map.get(to))
        else {
            return false;
        };
        if self.graph.find_edge(from_node, to_node).is_some() {
            return false;
        }
        self.graph.add_edge(from_node, to_node, ());
        true
    }

    /// Whether the task is part of the snapshot.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of distinct edges in the view.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of a task, in the order they were added.
    #[must_use]
    pub fn dependencies_of(&self, id: &TaskId) -> Vec<&TaskId> {
        self.node_map
            .get(id)
            .map(|&node| {
                self.ordered_neighbors(node)
                    .into_iter()
                    .map(|n| &self.graph[n])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether adding `task -> candidate` would close a cycle.
    ///
    /// True when `candidate` already reaches `task` through zero or more
    /// edges. A task that is not in the view has no incoming edges, so it
    /// cannot be reached from anywhere but itself.
    #[must_use]
    pub fn would_create_cycle(&self, task: &TaskId, candidate: &TaskId) -> bool {
        if task == candidate {
            return true;
        }
        let (Some(&task_node), Some(&candidate_node)) =
            (self.node_map.get(task), self.node_map.get(candidate))
        else {
            return false;
        };

        // Dfs with an explicit stack and visited map, stopping at the first hit.
        algo::has_path_connecting(&self.graph, candidate_node, task_node, None)
    }

    /// Find a cycle reachable from `task` along its own dependency edges.
    ///
    /// Walks depth-first in dependency-list order. The first time an edge
    /// leads back to a task still on the current path, the path slice from
    /// that task to the end of the path is returned: `[A, B, C]` for
    /// `A -> B -> C -> A`. Returns an empty vector when no cycle is reachable.
    ///
    /// The returned cycle does not necessarily contain `task` itself; it may
    /// be a cycle further downstream.
    #[must_use]
    pub fn find_cycle_containing(&self, task: &TaskId) -> Vec<TaskId> {
        self.search_back_edge(task, BackEdge::Any)
    }

    /// Find a cycle that passes through `task` itself.
    ///
    /// Same walk as [`find_cycle_containing`](Self::find_cycle_containing),
    /// but only an edge leading back to `task` ends the search, so the
    /// returned path always starts at `task`. Empty when `task` is not on any
    /// cycle.
    #[must_use]
    pub fn find_cycle_through(&self, task: &TaskId) -> Vec<TaskId> {
        self.search_back_edge(task, BackEdge::ToStart)
    }

    /// Whether the view contains any cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !algo::is_cyclic_directed(&self.graph)
    }

    fn search_back_edge(&self, task: &TaskId, accept: BackEdge) -> Vec<TaskId> {
        let Some(&start) = self.node_map.get(task) else {
            return Vec::new();
        };

        // Each frame is a node on the current path and its unexplored edges.
        let mut stack = vec![(start, self.ordered_neighbors(start).into_iter())];
        let mut on_path = HashSet::from([start]);
        let mut finished = HashSet::new();

        while let Some((node, pending)) = stack.last_mut() {
            let node = *node;
            match pending.next() {
                Some(next) if on_path.contains(&next) => {
                    if accept == BackEdge::ToStart && next != start {
                        continue;
                    }
                    if let Some(pos) = stack.iter().position(|(n, _)| *n == next) {
                        return stack[pos..]
                            .iter()
                            .map(|(n, _)| self.graph[*n].clone())
                            .collect();
                    }
                }
                Some(next) => {
                    if finished.contains(&next) {
                        continue;
                    }
                    on_path.insert(next);
                    stack.push((next, self.ordered_neighbors(next).into_iter()));
                }
                None => {
                    stack.pop();
                    on_path.remove(&node);
                    finished.insert(node);
                }
            }
        }

        Vec::new()
    }

    /// Outgoing neighbors in insertion order.
    ///
    /// petgraph lists a node's edges most-recent first.
    fn ordered_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        neighbors.reverse();
        neighbors
    }
}
