//! Graph export and import
//!
//! Exports are pure functions of the current graph. JSON is the only format
//! that can be imported back; importing replaces the whole graph.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::OutputFormat;
use crate::error::{GraphError, Result};
use crate::graph::{GraphMetrics, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, NodeType};

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// `{ nodes, edges, metrics }`
    Json,
    /// Attributed graph markup
    GraphMl,
    /// Graph database statements (Neo4j Cypher)
    Cypher,
    /// GraphViz
    Dot,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::GraphMl => "graphml",
            Self::Cypher => "cypher",
            Self::Dot => "dot",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "graphml" => Ok(Self::GraphMl),
            "cypher" | "neo4j" => Ok(Self::Cypher),
            "dot" => Ok(Self::Dot),
            _ => Err(GraphError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Shape of a JSON export
#[derive(Serialize)]
struct GraphExport<'a> {
    nodes: Vec<&'a KnowledgeNode>,
    edges: Vec<&'a KnowledgeEdge>,
    metrics: GraphMetrics,
}

/// Accepted import shape; missing lists are empty
#[derive(Deserialize)]
struct GraphImport {
    #[serde(default)]
    nodes: Vec<KnowledgeNode>,
    #[serde(default)]
    edges: Vec<KnowledgeEdge>,
}

impl KnowledgeGraph {
    /// Export by format name, pretty-printing JSON
    pub fn export_graph(&self, format: &str) -> Result<String> {
        self.export_as(format.parse()?, OutputFormat::Pretty)
    }

    pub fn export_as(&self, format: ExportFormat, layout: OutputFormat) -> Result<String> {
        debug!(%format, nodes = self.node_count(), edges = self.edge_count(), "exporting graph");
        match format {
            ExportFormat::Json => self.to_json(layout),
            ExportFormat::GraphMl => Ok(self.to_graphml()),
            ExportFormat::Cypher => Ok(self.to_cypher()),
            ExportFormat::Dot => Ok(self.to_dot()),
        }
    }

    /// Replace the whole graph with the contents of a JSON export.
    ///
    /// The new graph is assembled separately, so a failed import leaves the
    /// current graph untouched.
    pub fn import_graph(&mut self, json: &str) -> Result<()> {
        let data: GraphImport = serde_json::from_str(json)?;

        let mut imported = KnowledgeGraph::with_settings(self.settings().clone());
        for node in data.nodes {
            imported.add_node(node)?;
        }
        for edge in data.edges {
            imported.add_edge(edge)?;
        }

        info!(
            nodes = imported.node_count(),
            edges = imported.edge_count(),
            "imported graph"
        );
        *self = imported;
        Ok(())
    }

    fn to_json(&self, layout: OutputFormat) -> Result<String> {
        let export = GraphExport {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
            metrics: self.calculate_metrics(),
        };
        let json = match layout {
            OutputFormat::Pretty => serde_json::to_string_pretty(&export)?,
            OutputFormat::Compact => serde_json::to_string(&export)?,
        };
        Ok(json)
    }

    /// Export to GraphML
    pub fn to_graphml(&self) -> String {
        let mut output = String::new();

        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
        output.push_str("  <key id=\"label\" for=\"node\" attr.name=\"label\" attr.type=\"string\"/>\n");
        output.push_str("  <key id=\"type\" for=\"node\" attr.name=\"type\" attr.type=\"string\"/>\n");
        output.push_str("  <key id=\"edge_type\" for=\"edge\" attr.name=\"type\" attr.type=\"string\"/>\n");
        output.push_str("  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>\n");
        output.push_str("  <graph id=\"knowledge-graph\" edgedefault=\"directed\">\n");

        for node in self.nodes() {
            let _ = writeln!(output, "    <node id=\"{}\">", xml_escape(&node.id));
            let _ = writeln!(output, "      <data key=\"label\">{}</data>", xml_escape(&node.label));
            let _ = writeln!(output, "      <data key=\"type\">{}</data>", node.node_type);
            output.push_str("    </node>\n");
        }

        for edge in self.edges() {
            let _ = writeln!(
                output,
                "    <edge id=\"{}\" source=\"{}\" target=\"{}\">",
                xml_escape(&edge.id),
                xml_escape(&edge.source),
                xml_escape(&edge.target)
            );
            let _ = writeln!(output, "      <data key=\"edge_type\">{}</data>", edge.edge_type);
            let _ = writeln!(output, "      <data key=\"weight\">{}</data>", edge.weight);
            output.push_str("    </edge>\n");
        }

        output.push_str("  </graph>\n");
        output.push_str("</graphml>\n");
        output
    }

    /// Export to Cypher statements: node creation first, then relationships
    pub fn to_cypher(&self) -> String {
        let mut output = String::new();

        for node in self.nodes() {
            let _ = writeln!(
                output,
                "CREATE (:KnowledgeNode {{id: {}, label: {}, type: {}}});",
                cypher_quote(&node.id),
                cypher_quote(&node.label),
                cypher_quote(node.node_type.as_str())
            );
        }

        for edge in self.edges() {
            let _ = writeln!(
                output,
                "MATCH (a:KnowledgeNode {{id: {}}}), (b:KnowledgeNode {{id: {}}}) CREATE (a)-[:{} {{weight: {}}}]->(b);",
                cypher_quote(&edge.source),
                cypher_quote(&edge.target),
                edge.edge_type.as_str().to_uppercase(),
                edge.weight
            );
        }

        output
    }

    /// Export to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        // Header with styling
        output.push_str("digraph KnowledgeGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  bgcolor=\"#1e1e1e\";\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10, fontcolor=\"white\", color=\"#404040\"];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for node in self.nodes() {
            let color = match node.node_type {
                NodeType::Adr => "#2196F3",
                NodeType::Pattern => "#9C27B0",
                NodeType::Component => "#FF9800",
                NodeType::Dependency => "#607D8B",
                NodeType::Stakeholder => "#4CAF50",
                NodeType::Technology => "#00BCD4",
            };
            let _ = writeln!(
                output,
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
                dot_escape(&node.id),
                dot_escape(&node.label),
                color
            );
        }

        output.push('\n');

        for edge in self.edges() {
            // Only include edges between nodes we have
            if self.contains_node(&edge.source) && self.contains_node(&edge.target) {
                let _ = writeln!(
                    output,
                    "  \"{}\" -> \"{}\" [label=\"{}\"];",
                    dot_escape(&edge.source),
                    dot_escape(&edge.target),
                    edge.edge_type
                );
            }
        }

        output.push_str("}\n");
        output
    }
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn cypher_quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn dot_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
