//! Community detection
//!
//! Partitions nodes into connected groups by depth-first traversal. By default
//! edges are followed in both directions, which yields weakly connected
//! components independent of node order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{KnowledgeGraph, NodeId};

/// Which adjacency community traversal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunityMode {
    /// Forward and reverse edges (weakly connected components)
    #[default]
    Undirected,
    /// Forward edges only; results depend on insertion order
    Directed,
}

/// A group of connected nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub members: Vec<NodeId>,
}

impl KnowledgeGraph {
    /// Communities using the configured mode
    pub fn communities(&self) -> Vec<Community> {
        self.detect_communities(self.settings().community_mode)
    }

    /// Partition every node into exactly one community.
    ///
    /// Each unvisited node (in insertion order) seeds `community-N`.
    pub fn detect_communities(&self, mode: CommunityMode) -> Vec<Community> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.node_count());
        let mut communities = Vec::new();

        for node in self.nodes() {
            if visited.contains(node.id.as_str()) {
                continue;
            }

            let mut members = Vec::new();
            let mut stack = vec![node.id.as_str()];
            visited.insert(node.id.as_str());

            while let Some(current) = stack.pop() {
                members.push(current.to_string());

                let mut neighbors = self.successors(current);
                if mode == CommunityMode::Undirected {
                    neighbors.extend(self.predecessors(current));
                }

                for next in neighbors {
                    if visited.insert(next) {
                        stack.push(next);
                    }
                }
            }

            communities.push(Community {
                id: format!("community-{}", communities.len()),
                members,
            });
        }

        communities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, KnowledgeEdge, KnowledgeNode, NodeType};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::new();
        for id in nodes {
            graph
                .add_node(KnowledgeNode::new(*id, NodeType::Component, *id))
                .unwrap();
        }
        for (source, target) in edges {
            graph
                .add_edge(KnowledgeEdge::between(*source, *target, EdgeType::Related, 0.5))
                .unwrap();
        }
        graph
    }

    fn assert_partition(graph: &KnowledgeGraph, communities: &[Community]) {
        let mut seen = HashSet::new();
        for community in communities {
            for member in &community.members {
                assert!(seen.insert(member.clone()), "{} appears twice", member);
            }
        }
        let all: HashSet<String> = graph.nodes().map(|n| n.id.clone()).collect();
        assert_eq!(seen, all);
    }

    #[test]
    fn test_undirected_joins_reverse_edges() {
        // c is seeded before anything reaches it, and only points into a
        let g = graph(&["c", "a", "b", "x"], &[("c", "a"), ("b", "a")]);
        let communities = g.detect_communities(CommunityMode::Undirected);
        assert_eq!(communities.len(), 2);
        assert_eq!(communities[0].id, "community-0");
        assert_eq!(communities[0].members.len(), 3);
        assert_eq!(communities[1].members, vec!["x"]);
        assert_partition(&g, &communities);
    }

    #[test]
    fn test_directed_depends_on_order() {
        let g = graph(&["a", "b"], &[("b", "a")]);
        let communities = g.detect_communities(CommunityMode::Directed);
        // a is seeded first and has no forward edges, so b starts its own group
        assert_eq!(communities.len(), 2);
        assert_partition(&g, &communities);

        let undirected = g.detect_communities(CommunityMode::Undirected);
        assert_eq!(undirected.len(), 1);
    }

    #[test]
    fn test_empty_graph() {
        let g = KnowledgeGraph::new();
        assert!(g.communities().is_empty());
    }

    #[test]
    fn test_isolated_nodes_are_singletons() {
        let g = graph(&["a", "b", "c"], &[]);
        let communities = g.communities();
        assert_eq!(communities.len(), 3);
        assert_partition(&g, &communities);
    }
}
