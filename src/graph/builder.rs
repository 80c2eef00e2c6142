//! Graph Construction
//!
//! Populates a `KnowledgeGraph` from a `KnowledgeSource`: every node category
//! is loaded first, then relationship edges are wired in a separate pass since
//! a relationship may reference nodes of any category.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{EdgeType, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, NodeType, Properties};
use crate::error::{GraphError, Result};

// =============================================================================
// Records
// =============================================================================

/// An architecture decision record as delivered by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdrRecord {
    pub id: String,
    pub title: String,
    pub status: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// A pattern, component, dependency, stakeholder or technology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

/// A known relationship between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Defaults to `{source}-{type}-{target}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

impl AdrRecord {
    pub fn new(id: &str, title: &str, status: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            status: status.to_string(),
            category: category.to_string(),
            properties: Properties::new(),
        }
    }

    fn into_node(self) -> KnowledgeNode {
        let mut node = KnowledgeNode::new(self.id, NodeType::Adr, self.title.clone());
        node.properties = self.properties;
        node.properties.insert("title".into(), self.title.into());
        node.properties.insert("status".into(), self.status.into());
        node.properties.insert("category".into(), self.category.into());
        node
    }
}

impl EntityRecord {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            properties: Properties::new(),
        }
    }

    fn into_node(self, node_type: NodeType) -> KnowledgeNode {
        let mut node = KnowledgeNode::new(self.id, node_type, self.label);
        node.properties = self.properties;
        node
    }
}

impl RelationshipRecord {
    pub fn new(source: &str, target: &str, edge_type: EdgeType, weight: f64) -> Self {
        Self {
            id: None,
            source: source.to_string(),
            target: target.to_string(),
            edge_type,
            weight,
            evidence: Vec::new(),
        }
    }

    fn into_edge(self) -> KnowledgeEdge {
        let mut edge = match self.id {
            Some(id) => KnowledgeEdge::new(id, self.source, self.target, self.edge_type, self.weight),
            None => KnowledgeEdge::between(self.source, self.target, self.edge_type, self.weight),
        };
        edge.metadata.evidence = self.evidence;
        edge
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Provider of the six entity categories and the relationships between them
pub trait KnowledgeSource {
    fn load_adrs(&self) -> Result<Vec<AdrRecord>>;
    fn load_patterns(&self) -> Result<Vec<EntityRecord>>;
    fn load_components(&self) -> Result<Vec<EntityRecord>>;
    fn load_dependencies(&self) -> Result<Vec<EntityRecord>>;
    fn load_stakeholders(&self) -> Result<Vec<EntityRecord>>;
    fn load_technologies(&self) -> Result<Vec<EntityRecord>>;

    fn load_relationships(&self) -> Result<Vec<RelationshipRecord>> {
        Ok(Vec::new())
    }
}

/// A complete set of records, as stored in a dataset file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub adrs: Vec<AdrRecord>,
    #[serde(default)]
    pub patterns: Vec<EntityRecord>,
    #[serde(default)]
    pub components: Vec<EntityRecord>,
    #[serde(default)]
    pub dependencies: Vec<EntityRecord>,
    #[serde(default)]
    pub stakeholders: Vec<EntityRecord>,
    #[serde(default)]
    pub technologies: Vec<EntityRecord>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRecord>,
}

impl KnowledgeSource for Dataset {
    fn load_adrs(&self) -> Result<Vec<AdrRecord>> {
        Ok(self.adrs.clone())
    }

    fn load_patterns(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.patterns.clone())
    }

    fn load_components(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.components.clone())
    }

    fn load_dependencies(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.dependencies.clone())
    }

    fn load_stakeholders(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.stakeholders.clone())
    }

    fn load_technologies(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.technologies.clone())
    }

    fn load_relationships(&self) -> Result<Vec<RelationshipRecord>> {
        Ok(self.relationships.clone())
    }
}

/// Records read from a JSON or TOML dataset file
#[derive(Debug, Clone)]
pub struct DatasetSource {
    dataset: Dataset,
}

impl DatasetSource {
    /// Load a dataset file; `.toml` files are parsed as TOML, anything else as JSON
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext == "toml")
            .unwrap_or(false);

        let source = if is_toml {
            Self::from_toml_str(&content)?
        } else {
            Self::from_json_str(&content)?
        };
        debug!(path = %path.display(), "loaded dataset");
        Ok(source)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(Self {
            dataset: serde_json::from_str(content)?,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(Self {
            dataset: toml::from_str(content)?,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl KnowledgeSource for DatasetSource {
    fn load_adrs(&self) -> Result<Vec<AdrRecord>> {
        self.dataset.load_adrs()
    }

    fn load_patterns(&self) -> Result<Vec<EntityRecord>> {
        self.dataset.load_patterns()
    }

    fn load_components(&self) -> Result<Vec<EntityRecord>> {
        self.dataset.load_components()
    }

    fn load_dependencies(&self) -> Result<Vec<EntityRecord>> {
        self.dataset.load_dependencies()
    }

    fn load_stakeholders(&self) -> Result<Vec<EntityRecord>> {
        self.dataset.load_stakeholders()
    }

    fn load_technologies(&self) -> Result<Vec<EntityRecord>> {
        self.dataset.load_technologies()
    }

    fn load_relationships(&self) -> Result<Vec<RelationshipRecord>> {
        self.dataset.load_relationships()
    }
}

/// Built-in sample architecture used when no dataset is supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedSource;

static SEED: Lazy<Dataset> = Lazy::new(SeedSource::dataset);

impl SeedSource {
    pub fn dataset() -> Dataset {
        use EdgeType::*;

        let adrs = vec![
            AdrRecord::new("adr-001", "Adopt Modular Monorepo Architecture", "accepted", "architecture"),
            AdrRecord::new("adr-002", "Use Event-Driven Communication Between Services", "accepted", "architecture"),
            AdrRecord::new("adr-003", "Poll Backend for Dashboard Updates", "superseded", "performance"),
            AdrRecord::new("adr-004", "Centralize Authentication with JWT", "accepted", "security"),
            AdrRecord::new("adr-005", "Push Dashboard Updates over WebSockets", "accepted", "performance"),
        ];

        fn entities(pairs: &[(&str, &str)]) -> Vec<EntityRecord> {
            pairs.iter().map(|(id, label)| EntityRecord::new(id, label)).collect()
        }

        let relationships = [
            ("adr-001", "pattern-modular", Implements, 0.9),
            ("adr-002", "pattern-event-driven", Implements, 0.9),
            ("adr-002", "pattern-pubsub", Implements, 0.7),
            ("adr-001", "adr-002", Related, 0.7),
            ("adr-005", "adr-003", Supersedes, 1.0),
            ("adr-005", "pattern-pubsub", Implements, 0.6),
            ("adr-003", "pattern-event-driven", Conflicts, 0.4),
            ("adr-004", "component-auth", Constrains, 0.8),
            ("component-auth", "adr-004", Implements, 0.9),
            ("component-api", "adr-001", Implements, 0.8),
            ("component-dashboard", "adr-005", Implements, 0.8),
            ("component-cache", "pattern-caching", Implements, 0.7),
            ("component-api", "component-auth", DependsOn, 0.8),
            ("component-api", "component-cache", DependsOn, 0.7),
            ("component-auth", "dep-jsonwebtoken", DependsOn, 0.9),
            ("component-cache", "dep-redis", DependsOn, 0.9),
            ("component-dashboard", "dep-websocket", DependsOn, 0.8),
            ("dep-redis", "tech-redis", DependsOn, 1.0),
            ("stakeholder-architects", "adr-001", Influences, 0.8),
            ("stakeholder-architects", "adr-002", Influences, 0.7),
            ("stakeholder-security", "adr-004", Influences, 0.9),
            ("stakeholder-frontend", "adr-005", Influences, 0.6),
            ("tech-typescript", "component-dashboard", Constrains, 0.5),
            ("tech-python", "component-api", Constrains, 0.5),
            ("tech-redis", "component-cache", Influences, 0.6),
        ]
        .into_iter()
        .map(|(source, target, edge_type, weight)| RelationshipRecord::new(source, target, edge_type, weight))
        .collect();

        Dataset {
            adrs,
            patterns: entities(&[
                ("pattern-modular", "Modular Architecture"),
                ("pattern-event-driven", "Event-Driven Architecture"),
                ("pattern-caching", "Cache-Aside"),
                ("pattern-pubsub", "Publish/Subscribe"),
            ]),
            components: entities(&[
                ("component-auth", "Authentication Service"),
                ("component-api", "API Gateway"),
                ("component-dashboard", "Dashboard UI"),
                ("component-cache", "Cache Service"),
            ]),
            dependencies: entities(&[
                ("dep-redis", "redis"),
                ("dep-jsonwebtoken", "jsonwebtoken"),
                ("dep-websocket", "ws"),
            ]),
            stakeholders: entities(&[
                ("stakeholder-architects", "Architecture Team"),
                ("stakeholder-security", "Security Team"),
                ("stakeholder-frontend", "Frontend Team"),
            ]),
            technologies: entities(&[
                ("tech-typescript", "TypeScript"),
                ("tech-python", "Python"),
                ("tech-redis", "Redis"),
                ("tech-postgres", "PostgreSQL"),
            ]),
            relationships,
        }
    }
}

impl KnowledgeSource for SeedSource {
    fn load_adrs(&self) -> Result<Vec<AdrRecord>> {
        SEED.load_adrs()
    }

    fn load_patterns(&self) -> Result<Vec<EntityRecord>> {
        SEED.load_patterns()
    }

    fn load_components(&self) -> Result<Vec<EntityRecord>> {
        SEED.load_components()
    }

    fn load_dependencies(&self) -> Result<Vec<EntityRecord>> {
        SEED.load_dependencies()
    }

    fn load_stakeholders(&self) -> Result<Vec<EntityRecord>> {
        SEED.load_stakeholders()
    }

    fn load_technologies(&self) -> Result<Vec<EntityRecord>> {
        SEED.load_technologies()
    }

    fn load_relationships(&self) -> Result<Vec<RelationshipRecord>> {
        SEED.load_relationships()
    }
}

// =============================================================================
// Build
// =============================================================================

impl KnowledgeGraph {
    /// Rebuild the graph from scratch out of `source`.
    ///
    /// On failure the graph is left empty rather than half-built.
    pub fn build_graph<S: KnowledgeSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.clear();
        if let Err(e) = self.populate(source) {
            warn!(error = %e, "graph build failed");
            self.clear();
            return Err(e);
        }
        info!(
            nodes = self.node_count(),
            edges = self.edge_count(),
            "knowledge graph built"
        );
        Ok(())
    }

    fn populate<S: KnowledgeSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        let adrs = source.load_adrs()?;
        debug!(count = adrs.len(), "loading adrs");
        for record in adrs {
            if record.id.is_empty() {
                return Err(GraphError::InvalidRecord(format!("{} record without id", NodeType::Adr)));
            }
            self.add_node(record.into_node())?;
        }

        self.load_entities(NodeType::Pattern, source.load_patterns()?)?;
        self.load_entities(NodeType::Component, source.load_components()?)?;
        self.load_entities(NodeType::Dependency, source.load_dependencies()?)?;
        self.load_entities(NodeType::Stakeholder, source.load_stakeholders()?)?;
        self.load_entities(NodeType::Technology, source.load_technologies()?)?;

        let relationships = source.load_relationships()?;
        debug!(count = relationships.len(), "wiring relationships");
        for record in relationships {
            self.add_edge(record.into_edge())?;
        }
        Ok(())
    }

    fn load_entities(&mut self, node_type: NodeType, records: Vec<EntityRecord>) -> Result<()> {
        debug!(%node_type, count = records.len(), "loading entities");
        for record in records {
            if record.id.is_empty() {
                return Err(GraphError::InvalidRecord(format!("{} record without id", node_type)));
            }
            self.add_node(record.into_node(node_type))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl KnowledgeSource for FailingSource {
        fn load_adrs(&self) -> Result<Vec<AdrRecord>> {
            Ok(vec![AdrRecord::new("adr-001", "A", "accepted", "architecture")])
        }
        fn load_patterns(&self) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }
        fn load_components(&self) -> Result<Vec<EntityRecord>> {
            Err(GraphError::Source("component scan failed".into()))
        }
        fn load_dependencies(&self) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }
        fn load_stakeholders(&self) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }
        fn load_technologies(&self) -> Result<Vec<EntityRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_seed_build_loads_all_categories() {
        let mut graph = KnowledgeGraph::new();
        graph.build_graph(&SeedSource).unwrap();

        let seed = SeedSource::dataset();
        let expected_nodes = seed.adrs.len()
            + seed.patterns.len()
            + seed.components.len()
            + seed.dependencies.len()
            + seed.stakeholders.len()
            + seed.technologies.len();
        assert_eq!(graph.node_count(), expected_nodes);
        assert_eq!(graph.edge_count(), seed.relationships.len());

        // Categories load in a fixed order
        let first = graph.nodes().next().unwrap();
        assert_eq!(first.node_type, NodeType::Adr);
        let last = graph.nodes().last().unwrap();
        assert_eq!(last.node_type, NodeType::Technology);
    }

    #[test]
    fn test_adr_record_properties() {
        let mut graph = KnowledgeGraph::new();
        graph.build_graph(&SeedSource).unwrap();
        let adr = graph.node("adr-003").unwrap();
        assert_eq!(adr.label, "Poll Backend for Dashboard Updates");
        assert_eq!(adr.properties["status"], "superseded");
        assert_eq!(adr.properties["category"], "performance");
    }

    #[test]
    fn test_rebuild_leaves_no_previous_state() {
        let mut graph = KnowledgeGraph::new();
        graph.build_graph(&SeedSource).unwrap();
        graph
            .add_node(KnowledgeNode::new("extra", NodeType::Component, "Extra"))
            .unwrap();

        graph.build_graph(&Dataset::default()).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_failed_source_leaves_graph_empty() {
        let mut graph = KnowledgeGraph::new();
        graph.build_graph(&SeedSource).unwrap();
        let err = graph.build_graph(&FailingSource).unwrap_err();
        assert!(matches!(err, GraphError::Source(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_relationship_to_unknown_node_fails_strict_build() {
        let mut dataset = SeedSource::dataset();
        dataset
            .relationships
            .push(RelationshipRecord::new("adr-001", "adr-999", EdgeType::Related, 0.5));
        let mut graph = KnowledgeGraph::new();
        let err = graph.build_graph(&dataset).unwrap_err();
        assert!(matches!(err, GraphError::DanglingEdge { .. }));
    }

    #[test]
    fn test_dataset_from_toml() {
        let source = DatasetSource::from_toml_str(
            r#"
            [[adrs]]
            id = "adr-100"
            title = "Use PostgreSQL"
            status = "proposed"
            category = "data"

            [[technologies]]
            id = "tech-postgres"
            label = "PostgreSQL"

            [[relationships]]
            source = "adr-100"
            target = "tech-postgres"
            type = "depends_on"
            weight = 0.8
            evidence = ["benchmark results"]
            "#,
        )
        .unwrap();

        let mut graph = KnowledgeGraph::new();
        graph.build_graph(&source).unwrap();
        assert_eq!(graph.node_count(), 2);
        let edge = graph.edge("adr-100-depends_on-tech-postgres").unwrap();
        assert_eq!(edge.metadata.evidence, vec!["benchmark results".to_string()]);
    }

    #[test]
    fn test_adr_without_id_rejected() {
        let mut dataset = Dataset::default();
        dataset.adrs.push(AdrRecord::new("", "Untitled", "proposed", "architecture"));

        let mut graph = KnowledgeGraph::new();
        let err = graph.build_graph(&dataset).unwrap_err();
        assert!(matches!(err, GraphError::InvalidRecord(_)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_seed_source_serves_shared_dataset() {
        let seed = SeedSource::dataset();
        assert_eq!(SeedSource.load_adrs().unwrap(), seed.adrs);
        assert_eq!(SeedSource.load_relationships().unwrap(), seed.relationships);
    }
}
