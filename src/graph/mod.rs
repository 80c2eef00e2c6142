//! Architecture Knowledge Graph
//!
//! Primary store for architectural entities and their relationships. The
//! structure lives in a petgraph `StableDiGraph` whose vertices carry node ids
//! and whose edges carry edge ids; node and edge payloads sit in id-keyed maps
//! next to it.
//!
//! This module is shared between:
//! - Builder (population from knowledge sources)
//! - Query, path and community analysis
//! - Export/import
//!
//! All of them go through `KnowledgeGraph` methods so the petgraph structure
//! never drifts from the payload maps.

pub mod types;
pub mod builder;
pub mod query;
pub mod paths;
pub mod community;
pub mod metrics;

pub use types::{
    EdgeId, EdgeMetadata, EdgeType, KnowledgeEdge, KnowledgeNode, NodeId, NodeMetadata,
    NodeType, Properties,
};
pub use builder::{
    AdrRecord, Dataset, DatasetSource, EntityRecord, KnowledgeSource, RelationshipRecord,
    SeedSource,
};
pub use query::{GraphQuery, QueryResult, SearchHit};
pub use paths::{GraphPath, PathSearch, DEFAULT_MAX_DEPTH};
pub use community::{Community, CommunityMode};
pub use metrics::GraphMetrics;

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, NodeFiltered};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use crate::config::GraphSettings;
use crate::error::{GraphError, Result};

/// How edges referencing unknown nodes are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrity {
    /// Reject edges whose source or target is not a node
    #[default]
    Strict,
    /// Store dangling edges; traversals never step onto missing nodes
    Lenient,
}

/// A stored payload with its first-insertion sequence number
#[derive(Debug, Clone)]
struct Slot<T> {
    seq: u64,
    value: T,
}

/// The knowledge graph store
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    /// Primary graph structure; vertex weights are node ids, edge weights edge ids
    graph: StableDiGraph<NodeId, EdgeId>,

    /// Vertex lookup: id -> NodeIndex. Under lenient integrity this also holds
    /// endpoints of dangling edges that have no node.
    node_indices: HashMap<NodeId, NodeIndex>,

    /// Edge lookup: id -> EdgeIndex
    edge_indices: HashMap<EdgeId, EdgeIndex>,

    /// Nodes indexed by id
    nodes: HashMap<NodeId, Slot<KnowledgeNode>>,

    /// Edges indexed by id
    edges: HashMap<EdgeId, Slot<KnowledgeEdge>>,

    /// Iteration order: sequence -> node id
    node_order: BTreeMap<u64, NodeId>,

    /// Iteration order: sequence -> edge id
    edge_order: BTreeMap<u64, EdgeId>,

    next_seq: u64,

    settings: GraphSettings,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    // ========== Mutation ==========

    /// Insert or overwrite a node.
    ///
    /// Overwriting keeps the node's original position in iteration order. The
    /// type of an existing id cannot change.
    pub fn add_node(&mut self, mut node: KnowledgeNode) -> Result<()> {
        node.metadata.confidence = unit_interval(node.metadata.confidence, "confidence", &node.id)?;

        match self.nodes.get_mut(&node.id) {
            Some(slot) if slot.value.node_type != node.node_type => {
                return Err(GraphError::NodeTypeChanged {
                    id: node.id,
                    existing: slot.value.node_type.to_string(),
                    requested: node.node_type.to_string(),
                });
            }
            Some(slot) => {
                trace!(id = %node.id, "overwriting node");
                slot.value = node;
            }
            None => {
                self.vertex(&node.id);
                let seq = self.bump_seq();
                self.node_order.insert(seq, node.id.clone());
                self.nodes.insert(node.id.clone(), Slot { seq, value: node });
            }
        }
        Ok(())
    }

    /// Insert or overwrite an edge.
    ///
    /// Overwriting keeps the edge's position in iteration order but reattaches
    /// it to the new endpoints.
    pub fn add_edge(&mut self, mut edge: KnowledgeEdge) -> Result<()> {
        if self.settings.integrity == Integrity::Strict {
            for endpoint in [&edge.source, &edge.target] {
                if !self.nodes.contains_key(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge: edge.id.clone(),
                        endpoint: endpoint.clone(),
                    });
                }
            }
        }

        edge.weight = unit_interval(edge.weight, "weight", &edge.id)?;
        edge.metadata.confidence = unit_interval(edge.metadata.confidence, "confidence", &edge.id)?;

        let seq = match self.detach_edge(&edge.id) {
            Some(previous) => {
                trace!(id = %edge.id, "overwriting edge");
                previous.seq
            }
            None => {
                let seq = self.bump_seq();
                self.edge_order.insert(seq, edge.id.clone());
                seq
            }
        };

        let from = self.vertex(&edge.source);
        let to = self.vertex(&edge.target);
        let index = self.graph.add_edge(from, to, edge.id.clone());
        self.edge_indices.insert(edge.id.clone(), index);
        self.edges.insert(edge.id.clone(), Slot { seq, value: edge });
        Ok(())
    }

    /// Remove an edge, returning it if present
    pub fn remove_edge(&mut self, id: &str) -> Option<KnowledgeEdge> {
        let slot = self.detach_edge(id)?;
        self.edge_order.remove(&slot.seq);
        Some(slot.value)
    }

    /// Remove a node together with every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Option<KnowledgeNode> {
        let slot = self.nodes.remove(id)?;
        self.node_order.remove(&slot.seq);

        let incident: Vec<EdgeId> = match self.node_indices.get(id) {
            Some(&index) => self
                .graph
                .edges_directed(index, Direction::Outgoing)
                .chain(self.graph.edges_directed(index, Direction::Incoming))
                .map(|e| e.weight().clone())
                .collect(),
            None => Vec::new(),
        };
        // Self-loops show up in both directions
        let mut removed = 0;
        for edge_id in &incident {
            if self.remove_edge(edge_id).is_some() {
                removed += 1;
            }
        }

        self.prune_vertex(id);
        debug!(id, removed_edges = removed, "removed node");
        Some(slot.value)
    }

    /// Empty nodes, edges and the graph structure
    pub fn clear(&mut self) {
        *self = Self::with_settings(self.settings.clone());
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Vertex for `id`, created on first use
    fn vertex(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.node_indices.get(id) {
            return index;
        }
        let index = self.graph.add_node(id.to_string());
        self.node_indices.insert(id.to_string(), index);
        index
    }

    /// Take an edge out of the payload map and the graph structure, leaving
    /// iteration order untouched.
    fn detach_edge(&mut self, id: &str) -> Option<Slot<KnowledgeEdge>> {
        let slot = self.edges.remove(id)?;
        if let Some(index) = self.edge_indices.remove(id) {
            self.graph.remove_edge(index);
        }
        self.prune_vertex(&slot.value.source);
        self.prune_vertex(&slot.value.target);
        Some(slot)
    }

    /// Drop the vertex of a dangling endpoint once nothing references it
    fn prune_vertex(&mut self, id: &str) {
        if self.nodes.contains_key(id) {
            return;
        }
        let Some(&index) = self.node_indices.get(id) else {
            return;
        };
        if self.graph.neighbors_undirected(index).next().is_none() {
            self.graph.remove_node(index);
            self.node_indices.remove(id);
        }
    }

    // ========== Public API ==========

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&KnowledgeNode> {
        self.nodes.get(id).map(|slot| &slot.value)
    }

    pub fn edge(&self, id: &str) -> Option<&KnowledgeEdge> {
        self.edges.get(id).map(|slot| &slot.value)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &KnowledgeNode> {
        self.node_order.values().filter_map(|id| self.node(id))
    }

    /// All edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = &KnowledgeEdge> {
        self.edge_order.values().filter_map(|id| self.edge(id))
    }

    /// Distinct targets of a node's outgoing edges, oldest edge first.
    ///
    /// Includes dangling targets in lenient mode.
    pub fn neighbors_out(&self, id: &str) -> Vec<&str> {
        self.adjacent(id, Direction::Outgoing)
    }

    /// Distinct sources of a node's incoming edges, oldest edge first
    pub fn neighbors_in(&self, id: &str) -> Vec<&str> {
        self.adjacent(id, Direction::Incoming)
    }

    /// Every edge from `source` to `target`, in insertion order
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&KnowledgeEdge> {
        let (Some(&from), Some(&to)) = (self.node_indices.get(source), self.node_indices.get(target))
        else {
            return Vec::new();
        };
        let mut slots: Vec<&Slot<KnowledgeEdge>> = self
            .graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to)
            .filter_map(|e| self.edges.get(e.weight()))
            .collect();
        slots.sort_by_key(|slot| slot.seq);
        slots.into_iter().map(|slot| &slot.value).collect()
    }

    fn adjacent(&self, id: &str, direction: Direction) -> Vec<&str> {
        let Some(&index) = self.node_indices.get(id) else {
            return Vec::new();
        };
        // petgraph walks the most recently added edge first
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(index, direction).collect();
        neighbors.reverse();
        let mut seen = HashSet::with_capacity(neighbors.len());
        neighbors.retain(|n| seen.insert(*n));
        neighbors.into_iter().map(|n| self.graph[n].as_str()).collect()
    }

    // ========== Traversal helpers ==========

    /// Vertex of an actual node
    pub(crate) fn node_index(&self, id: &str) -> Option<NodeIndex> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.node_indices.get(id).copied()
    }

    /// The graph structure restricted to actual nodes
    pub(crate) fn node_view(
        &self,
    ) -> NodeFiltered<&StableDiGraph<NodeId, EdgeId>, impl Fn(NodeIndex) -> bool + '_> {
        NodeFiltered::from_fn(&self.graph, move |index: NodeIndex| {
            self.nodes.contains_key(&self.graph[index])
        })
    }

    pub(crate) fn structure(&self) -> &StableDiGraph<NodeId, EdgeId> {
        &self.graph
    }

    /// Forward neighbours that are actual nodes
    pub(crate) fn successors(&self, id: &str) -> Vec<&str> {
        let mut out = self.neighbors_out(id);
        out.retain(|n| self.nodes.contains_key(*n));
        out
    }

    /// Reverse neighbours that are actual nodes
    pub(crate) fn predecessors(&self, id: &str) -> Vec<&str> {
        let mut out = self.neighbors_in(id);
        out.retain(|n| self.nodes.contains_key(*n));
        out
    }

    /// Whether any edge runs from `source` to `target`
    pub(crate) fn linked(&self, source: &str, target: &str) -> bool {
        match (self.node_indices.get(source), self.node_indices.get(target)) {
            (Some(&from), Some(&to)) => self.graph.contains_edge(from, to),
            _ => false,
        }
    }

    /// Cheapest of the edges joining two vertices; ties go to the oldest edge
    pub(crate) fn cheapest_edge(&self, from: NodeIndex, to: NodeIndex) -> Option<&KnowledgeEdge> {
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| e.target() == to)
            .filter_map(|e| self.edges.get(e.weight()))
            .min_by(|a, b| {
                a.value
                    .cost()
                    .total_cmp(&b.value.cost())
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|slot| &slot.value)
    }

    /// Traversal cost of the edge with this id
    pub(crate) fn edge_cost(&self, id: &str) -> f64 {
        self.edge(id).map(KnowledgeEdge::cost).unwrap_or(1.0)
    }
}

/// Clamp a weight or confidence into [0, 1]; NaN and infinities are rejected
fn unit_interval(value: f64, field: &str, id: &str) -> Result<f64> {
    if !value.is_finite() {
        return Err(GraphError::InvalidRecord(format!(
            "{} of '{}' is not a finite number",
            field, id
        )));
    }
    Ok(value.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType) -> KnowledgeNode {
        KnowledgeNode::new(id, node_type, id)
    }

    fn assert_adjacency_consistent(graph: &KnowledgeGraph) {
        for edge in graph.edges() {
            assert!(graph.neighbors_out(&edge.source).contains(&edge.target.as_str()));
            assert!(graph.neighbors_in(&edge.target).contains(&edge.source.as_str()));
        }
        for n in graph.nodes() {
            for target in graph.neighbors_out(&n.id) {
                assert!(!graph.edges_between(&n.id, target).is_empty());
            }
        }
    }

    #[test]
    fn test_add_node_overwrites_in_place() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph.add_node(node("b", NodeType::Pattern)).unwrap();
        graph
            .add_node(KnowledgeNode::new("a", NodeType::Adr, "renamed"))
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        let ids: Vec<_> = graph.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(graph.node("a").unwrap().label, "renamed");
    }

    #[test]
    fn test_add_node_rejects_type_change() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        let err = graph.add_node(node("a", NodeType::Pattern)).unwrap_err();
        assert!(matches!(err, GraphError::NodeTypeChanged { .. }));
        assert_eq!(graph.node("a").unwrap().node_type, NodeType::Adr);
    }

    #[test]
    fn test_strict_integrity_rejects_dangling_edge() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        let err = graph
            .add_edge(KnowledgeEdge::between("a", "ghost", EdgeType::Related, 0.5))
            .unwrap_err();
        match err {
            GraphError::DanglingEdge { endpoint, .. } => assert_eq!(endpoint, "ghost"),
            other => panic!("Expected DanglingEdge, got {:?}", other),
        }
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.neighbors_out("a").is_empty());
    }

    #[test]
    fn test_lenient_integrity_keeps_dangling_edge() {
        let mut graph = KnowledgeGraph::with_settings(GraphSettings {
            integrity: Integrity::Lenient,
            ..GraphSettings::default()
        });
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph
            .add_edge(KnowledgeEdge::between("a", "ghost", EdgeType::Related, 0.5))
            .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_adjacency_consistent(&graph);
        assert!(graph.successors("a").is_empty());
    }

    #[test]
    fn test_edge_overwrite_moves_adjacency() {
        let mut graph = KnowledgeGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(node(id, NodeType::Component)).unwrap();
        }
        graph
            .add_edge(KnowledgeEdge::new("e1", "a", "b", EdgeType::DependsOn, 0.5))
            .unwrap();
        graph
            .add_edge(KnowledgeEdge::new("e1", "a", "c", EdgeType::DependsOn, 0.5))
            .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.neighbors_out("a"), vec!["c"]);
        assert!(graph.neighbors_in("b").is_empty());
        assert_adjacency_consistent(&graph);
    }

    #[test]
    fn test_parallel_edges_share_adjacency_entry() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph.add_node(node("b", NodeType::Adr)).unwrap();
        graph
            .add_edge(KnowledgeEdge::between("a", "b", EdgeType::Related, 0.4))
            .unwrap();
        graph
            .add_edge(KnowledgeEdge::between("a", "b", EdgeType::Supersedes, 0.8))
            .unwrap();
        assert_eq!(graph.neighbors_out("a").len(), 1);

        graph.remove_edge("a-related-b");
        assert_eq!(graph.neighbors_out("a"), vec!["b"]);
        graph.remove_edge("a-supersedes-b");
        assert!(graph.neighbors_out("a").is_empty());
        assert!(graph.neighbors_in("b").is_empty());
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut graph = KnowledgeGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(node(id, NodeType::Component)).unwrap();
        }
        graph
            .add_edge(KnowledgeEdge::between("a", "b", EdgeType::DependsOn, 0.5))
            .unwrap();
        graph
            .add_edge(KnowledgeEdge::between("b", "c", EdgeType::DependsOn, 0.5))
            .unwrap();

        assert!(graph.remove_node("b").is_some());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.neighbors_out("a").is_empty());
        assert!(graph.neighbors_in("c").is_empty());
    }

    #[test]
    fn test_weights_are_clamped() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph.add_node(node("b", NodeType::Adr)).unwrap();
        graph
            .add_edge(KnowledgeEdge::new("e", "a", "b", EdgeType::Related, 3.0))
            .unwrap();
        assert_eq!(graph.edge("e").unwrap().weight, 1.0);
    }

    #[test]
    fn test_clear() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph.add_node(node("b", NodeType::Adr)).unwrap();
        graph
            .add_edge(KnowledgeEdge::between("a", "b", EdgeType::Related, 0.5))
            .unwrap();
        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.neighbors_out("a").is_empty());
    }

    #[test]
    fn test_neighbors_follow_edge_insertion_order() {
        let mut graph = KnowledgeGraph::new();
        for id in ["hub", "x", "y", "z"] {
            graph.add_node(node(id, NodeType::Component)).unwrap();
        }
        for target in ["z", "x", "y"] {
            graph
                .add_edge(KnowledgeEdge::between("hub", target, EdgeType::DependsOn, 0.5))
                .unwrap();
        }
        graph
            .add_edge(KnowledgeEdge::between("hub", "z", EdgeType::Related, 0.5))
            .unwrap();

        assert_eq!(graph.neighbors_out("hub"), vec!["z", "x", "y"]);
        assert_eq!(graph.neighbors_in("z"), vec!["hub"]);
        let between: Vec<_> = graph
            .edges_between("hub", "z")
            .iter()
            .map(|e| e.edge_type)
            .collect();
        assert_eq!(between, vec![EdgeType::DependsOn, EdgeType::Related]);
    }

    #[test]
    fn test_dangling_endpoint_vertex_is_released() {
        let mut graph = KnowledgeGraph::with_settings(GraphSettings {
            integrity: Integrity::Lenient,
            ..GraphSettings::default()
        });
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph
            .add_edge(KnowledgeEdge::new("e", "a", "ghost", EdgeType::Related, 0.5))
            .unwrap();
        assert_eq!(graph.structure().node_count(), 2);

        graph.remove_edge("e");
        assert_eq!(graph.structure().node_count(), 1);
        assert!(graph.neighbors_out("a").is_empty());

        // A later node with the same id picks the vertex back up
        graph
            .add_edge(KnowledgeEdge::new("e", "a", "ghost", EdgeType::Related, 0.5))
            .unwrap();
        graph.add_node(node("ghost", NodeType::Pattern)).unwrap();
        assert_eq!(graph.structure().node_count(), 2);
        assert_eq!(graph.successors("a"), vec!["ghost"]);
    }

    #[test]
    fn test_remove_node_with_self_loop() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Component)).unwrap();
        graph
            .add_edge(KnowledgeEdge::between("a", "a", EdgeType::DependsOn, 0.5))
            .unwrap();
        assert_eq!(graph.neighbors_out("a"), vec!["a"]);

        graph.remove_node("a").unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.structure().node_count(), 0);
        assert_eq!(graph.structure().edge_count(), 0);
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(node("a", NodeType::Adr)).unwrap();
        graph.add_node(node("b", NodeType::Adr)).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = graph
                .add_edge(KnowledgeEdge::new("e", "a", "b", EdgeType::Related, bad))
                .unwrap_err();
            assert!(matches!(err, GraphError::InvalidRecord(_)));
        }
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.neighbors_out("a").is_empty());

        let mut edge = KnowledgeEdge::new("e", "a", "b", EdgeType::Related, 0.5);
        edge.metadata.confidence = f64::NAN;
        assert!(matches!(graph.add_edge(edge), Err(GraphError::InvalidRecord(_))));

        let nan_node = KnowledgeNode::new("c", NodeType::Adr, "c").with_confidence(f64::NAN);
        assert!(matches!(graph.add_node(nan_node), Err(GraphError::InvalidRecord(_))));
        assert!(!graph.contains_node("c"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut graph = KnowledgeGraph::new();
        graph
            .add_node(KnowledgeNode::new("a", NodeType::Adr, "a").with_confidence(1.7))
            .unwrap();
        graph
            .add_node(KnowledgeNode::new("b", NodeType::Adr, "b").with_confidence(-0.2))
            .unwrap();
        let mut edge = KnowledgeEdge::new("e", "a", "b", EdgeType::Related, 0.5);
        edge.metadata.confidence = 4.0;
        graph.add_edge(edge).unwrap();

        assert_eq!(graph.node("a").unwrap().metadata.confidence, 1.0);
        assert_eq!(graph.node("b").unwrap().metadata.confidence, 0.0);
        assert_eq!(graph.edge("e").unwrap().metadata.confidence, 1.0);
    }
}
