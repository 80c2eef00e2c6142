//! Structural fingerprints for knowledge graphs
//!
//! Two graphs with the same nodes (id, type, label) and edges (id, endpoints,
//! type, weight) in the same order share a fingerprint. Timestamps and other
//! metadata are ignored so rebuilds and export/import round trips compare
//! equal.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::KnowledgeGraph;

/// SHA256 fingerprint of a graph's structure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a graph
    pub fn of(graph: &KnowledgeGraph) -> Self {
        let mut hasher = Sha256::new();

        for node in graph.nodes() {
            hasher.update(b"N\0");
            hasher.update(node.id.as_bytes());
            hasher.update(b"\0");
            hasher.update(node.node_type.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(node.label.as_bytes());
            hasher.update(b"\n");
        }

        for edge in graph.edges() {
            hasher.update(b"E\0");
            hasher.update(edge.id.as_bytes());
            hasher.update(b"\0");
            hasher.update(edge.source.as_bytes());
            hasher.update(b"\0");
            hasher.update(edge.target.as_bytes());
            hasher.update(b"\0");
            hasher.update(edge.edge_type.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(edge.weight.to_bits().to_le_bytes());
            hasher.update(b"\n");
        }

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for display
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl KnowledgeGraph {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}
