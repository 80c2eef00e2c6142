//! Graph Metrics
//!
//! Aggregate statistics, computed fresh on every call.

use petgraph::algo::kosaraju_scc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::{EdgeType, KnowledgeGraph, NodeType};

/// Summary statistics of a knowledge graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(default)]
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    #[serde(default)]
    pub edges_by_type: BTreeMap<EdgeType, usize>,
    /// Mean out-degree over all nodes
    pub average_degree: f64,
    pub clustering_coefficient: f64,
    pub connected_components: usize,
    /// Strongly connected components with more than one member
    #[serde(default)]
    pub cycle_groups: usize,
}

impl KnowledgeGraph {
    pub fn calculate_metrics(&self) -> GraphMetrics {
        let mut nodes_by_type = BTreeMap::new();
        for node in self.nodes() {
            *nodes_by_type.entry(node.node_type).or_insert(0) += 1;
        }

        let mut edges_by_type = BTreeMap::new();
        for edge in self.edges() {
            *edges_by_type.entry(edge.edge_type).or_insert(0) += 1;
        }

        let node_count = self.node_count();
        let average_degree = if node_count == 0 {
            0.0
        } else {
            let total: usize = self.nodes().map(|n| self.neighbors_out(&n.id).len()).sum();
            total as f64 / node_count as f64
        };

        GraphMetrics {
            node_count,
            edge_count: self.edge_count(),
            nodes_by_type,
            edges_by_type,
            average_degree,
            clustering_coefficient: self.clustering_coefficient(),
            connected_components: self.communities().len(),
            cycle_groups: self.cycle_groups().len(),
        }
    }

    /// Mean local clustering over nodes with at least two out-neighbours.
    ///
    /// A pair of out-neighbours counts as closed when an edge joins them in
    /// either direction.
    pub fn clustering_coefficient(&self) -> f64 {
        let mut total = 0.0;
        let mut counted = 0usize;

        for node in self.nodes() {
            let neighbors = self.successors(&node.id);
            let k = neighbors.len();
            if k < 2 {
                continue;
            }

            let mut closed = 0usize;
            for (i, a) in neighbors.iter().enumerate() {
                for b in &neighbors[i + 1..] {
                    if self.linked(a, b) || self.linked(b, a) {
                        closed += 1;
                    }
                }
            }

            let possible = (k * (k - 1) / 2) as f64;
            total += closed as f64 / possible;
            counted += 1;
        }

        if counted == 0 {
            0.0
        } else {
            total / counted as f64
        }
    }

    /// Groups of nodes that can all reach each other (size > 1)
    pub fn cycle_groups(&self) -> Vec<Vec<String>> {
        let view = self.node_view();
        let graph = self.structure();
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&view)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let members: HashSet<&String> = scc.iter().map(|idx| &graph[*idx]).collect();
                // Report members in insertion order
                self.nodes()
                    .filter(|n| members.contains(&n.id))
                    .map(|n| n.id.clone())
                    .collect()
            })
            .collect();
        groups.sort();
        groups
    }
}
