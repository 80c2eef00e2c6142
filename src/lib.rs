//! Architecture Knowledge Graph
//!
//! An in-memory graph of architecture decision records and the entities they
//! touch: patterns, components, dependencies, stakeholders and technologies.
//!
//! ## Features
//!
//! - **Consistent Store**: petgraph structure kept in step with every node and edge mutation
//! - **Pluggable Sources**: graphs are built from any `KnowledgeSource` (seed data, dataset files)
//! - **Queries**: type/property filters, bounded reachability, fuzzy label search
//! - **Paths**: A* shortest path, bounded all-paths enumeration with deadlines
//! - **Analysis**: communities, clustering, degree and cycle metrics
//! - **Export**: JSON (re-importable), GraphML, Cypher, DOT
//!
//! ## Architecture
//!
//! ```text
//! KnowledgeSource ──build_graph──▶ KnowledgeGraph ──▶ query / paths / communities
//!                                        │                        │
//!                                        └──────▶ metrics ◀───────┘
//!                                                    │
//!                                                 export
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod graph;

pub use config::{GraphConfig, GraphSettings, OutputFormat};
pub use error::{GraphError, Result};
pub use export::ExportFormat;
pub use fingerprint::Fingerprint;
pub use graph::{
    Community, CommunityMode, DatasetSource, EdgeType, GraphMetrics, GraphPath, GraphQuery,
    Integrity, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, KnowledgeSource, NodeType,
    PathSearch, QueryResult, SeedSource,
};
