//! Path search
//!
//! Edge cost is `1 - weight`, so strong relationships are cheap to traverse.
//! Shortest paths run petgraph's A* with a zero heuristic; all-paths
//! enumeration walks `all_simple_paths` under a hop bound.

use petgraph::algo::{all_simple_paths, astar};
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::iter;
use std::time::Instant;
use tracing::debug;

use super::{KnowledgeEdge, KnowledgeGraph, NodeId};
use crate::error::{GraphError, Result};

/// Default hop bound for all-paths enumeration
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// A path through the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<KnowledgeEdge>,
    /// Accumulated traversal cost
    pub total_weight: f64,
    /// Number of edges
    pub length: usize,
}

/// Bounds for all-paths enumeration
#[derive(Debug, Clone)]
pub struct PathSearch {
    pub max_depth: usize,
    /// Stop after this many paths
    pub max_paths: Option<usize>,
    pub deadline: Option<Instant>,
}

impl Default for PathSearch {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_paths: None,
            deadline: None,
        }
    }
}

impl PathSearch {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    fn is_full(&self, found: usize) -> bool {
        self.max_paths.map(|max| found >= max).unwrap_or(false)
    }

    fn check_deadline(&self) -> Result<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(GraphError::DeadlineExceeded("all-paths search".into()))
            }
            _ => Ok(()),
        }
    }
}

type Route = Vec<NodeIndex>;

impl KnowledgeGraph {
    /// Minimum-cost path from `source` to `target`.
    ///
    /// Returns `None` when either node is unknown or the target is unreachable.
    pub fn find_shortest_path(&self, source: &str, target: &str) -> Option<GraphPath> {
        let from = self.node_index(source)?;
        let to = self.node_index(target)?;

        let view = self.node_view();
        let (_, route) = astar(
            &view,
            from,
            |n| n == to,
            |e| self.edge_cost(e.weight()),
            |_| 0.0,
        )?;

        let path = self.path_along(&route);
        debug!(source, target, cost = path.total_weight, "shortest path found");
        Some(path)
    }

    /// Every simple path from `source` to `target` with at most `max_depth` edges
    pub fn find_all_paths(&self, source: &str, target: &str, max_depth: usize) -> Vec<GraphPath> {
        self.simple_routes(source, target, max_depth)
            .map(|route| self.path_along(&route))
            .collect()
    }

    /// All-paths enumeration with a result cap and an optional deadline
    pub fn find_all_paths_bounded(
        &self,
        source: &str,
        target: &str,
        search: &PathSearch,
    ) -> Result<Vec<GraphPath>> {
        let mut routes = self.simple_routes(source, target, search.max_depth);
        let mut found = Vec::new();

        while !search.is_full(found.len()) {
            search.check_deadline()?;
            match routes.next() {
                Some(route) => found.push(self.path_along(&route)),
                None => break,
            }
        }

        debug!(source, target, paths = found.len(), "all-paths search finished");
        Ok(found)
    }

    /// Distinct simple vertex sequences of at most `max_depth` edges that stay
    /// on actual nodes.
    fn simple_routes<'a>(
        &'a self,
        source: &str,
        target: &str,
        max_depth: usize,
    ) -> Box<dyn Iterator<Item = Route> + 'a> {
        let (Some(from), Some(to)) = (self.node_index(source), self.node_index(target)) else {
            return Box::new(iter::empty());
        };
        if from == to {
            return Box::new(iter::once(vec![from]));
        }
        if max_depth == 0 {
            return Box::new(iter::empty());
        }

        // Parallel edges make petgraph report the same vertex sequence twice
        let mut seen: HashSet<Route> = HashSet::new();
        let routes = all_simple_paths::<Route, _>(self.structure(), from, to, 0, Some(max_depth - 1))
            .filter(move |route| {
                route
                    .iter()
                    .all(|&index| self.contains_node(&self.structure()[index]))
            })
            .filter(move |route| seen.insert(route.clone()));
        Box::new(routes)
    }

    /// Materialise a vertex sequence, taking the cheapest edge at each hop
    fn path_along(&self, route: &[NodeIndex]) -> GraphPath {
        let edges: Vec<KnowledgeEdge> = route
            .windows(2)
            .filter_map(|hop| self.cheapest_edge(hop[0], hop[1]))
            .cloned()
            .collect();

        GraphPath {
            nodes: route
                .iter()
                .map(|&index| self.structure()[index].clone())
                .collect(),
            total_weight: edges.iter().map(KnowledgeEdge::cost).sum(),
            length: edges.len(),
            edges,
        }
    }
}
