//! Node and edge model
//!
//! Architectural entities (ADRs, patterns, components, ...) are nodes; typed,
//! weighted relationships between them are directed edges.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// Canonical node identifier
pub type NodeId = String;

/// Canonical edge identifier
pub type EdgeId = String;

/// Open property bag attached to nodes and edges
pub type Properties = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Node
// =============================================================================

/// Category of an architectural entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Adr,
    Pattern,
    Component,
    Dependency,
    Stakeholder,
    Technology,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Adr,
        NodeType::Pattern,
        NodeType::Component,
        NodeType::Dependency,
        NodeType::Stakeholder,
        NodeType::Technology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adr => "adr",
            Self::Pattern => "pattern",
            Self::Component => "component",
            Self::Dependency => "dependency",
            Self::Stakeholder => "stakeholder",
            Self::Technology => "technology",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GraphError::InvalidRecord(format!("unknown node type '{}'", s)))
    }
}

/// Bookkeeping attached to every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub version: Version,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            updated: now,
            version: Version::new(1, 0, 0),
            confidence: 1.0,
        }
    }
}

/// A node in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub metadata: NodeMetadata,
}

impl KnowledgeNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            properties: Properties::new(),
            metadata: NodeMetadata::default(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = confidence;
        self
    }
}

// =============================================================================
// Edge
// =============================================================================

/// Kind of relationship between two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Supersedes,
    Related,
    Conflicts,
    DependsOn,
    Implements,
    Influences,
    Constrains,
}

impl EdgeType {
    pub const ALL: [EdgeType; 7] = [
        EdgeType::Supersedes,
        EdgeType::Related,
        EdgeType::Conflicts,
        EdgeType::DependsOn,
        EdgeType::Implements,
        EdgeType::Influences,
        EdgeType::Constrains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supersedes => "supersedes",
            Self::Related => "related",
            Self::Conflicts => "conflicts",
            Self::DependsOn => "depends_on",
            Self::Implements => "implements",
            Self::Influences => "influences",
            Self::Constrains => "constrains",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| GraphError::InvalidRecord(format!("unknown edge type '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub created: DateTime<Utc>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Free-form statements backing the relationship
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl Default for EdgeMetadata {
    fn default() -> Self {
        Self {
            created: Utc::now(),
            confidence: 1.0,
            evidence: Vec::new(),
        }
    }
}

/// A directed, weighted relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    /// Strength in [0, 1]. A missing weight traverses at full cost.
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub metadata: EdgeMetadata,
}

impl KnowledgeEdge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            edge_type,
            weight,
            properties: Properties::new(),
            metadata: EdgeMetadata::default(),
        }
    }

    /// Edge with the conventional `{source}-{type}-{target}` id
    pub fn between(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: EdgeType,
        weight: f64,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let id = format!("{}-{}-{}", source, edge_type, target);
        Self::new(id, source, target, edge_type, weight)
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.metadata.evidence.push(evidence.into());
        self
    }

    /// Traversal cost: strong relationships are cheap to cross
    pub fn cost(&self) -> f64 {
        1.0 - self.weight.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip_through_serde() {
        let json = serde_json::to_string(&EdgeType::DependsOn).unwrap();
        assert_eq!(json, "\"depends_on\"");
        assert_eq!("depends_on".parse::<EdgeType>().unwrap(), EdgeType::DependsOn);
        assert_eq!("stakeholder".parse::<NodeType>().unwrap(), NodeType::Stakeholder);
        assert!("service".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_node_serializes_type_key() {
        let node = KnowledgeNode::new("adr-001", NodeType::Adr, "Adopt modules")
            .with_property("status", "accepted");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "adr");
        assert_eq!(value["properties"]["status"], "accepted");
        assert_eq!(value["metadata"]["version"], "1.0.0");
    }

    #[test]
    fn test_missing_weight_costs_one() {
        let edge: KnowledgeEdge = serde_json::from_value(serde_json::json!({
            "id": "e", "source": "a", "target": "b", "type": "related"
        }))
        .unwrap();
        assert_eq!(edge.weight, 0.0);
        assert_eq!(edge.cost(), 1.0);
        assert_eq!(KnowledgeEdge::between("a", "b", EdgeType::Related, 1.0).cost(), 0.0);
    }

    #[test]
    fn test_between_builds_conventional_id() {
        let edge = KnowledgeEdge::between("adr-001", "pattern-modular", EdgeType::Implements, 0.9);
        assert_eq!(edge.id, "adr-001-implements-pattern-modular");
    }
}
