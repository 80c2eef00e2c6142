//! Error types for the knowledge graph engine

use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Knowledge graph errors
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Edge {edge} references missing node {endpoint}")]
    DanglingEdge { edge: String, endpoint: String },

    #[error("Node {id} already exists as {existing}, cannot re-add as {requested}")]
    NodeTypeChanged {
        id: String,
        existing: String,
        requested: String,
    },

    #[error("Deadline exceeded during {0}")]
    DeadlineExceeded(String),

    #[error("Knowledge source failed: {0}")]
    Source(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
