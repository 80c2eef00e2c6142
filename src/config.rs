//! Configuration management for the knowledge graph engine
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (knowledge-graph.toml)
//! - Environment variables (KG__*)
//!
//! ## Example config file (knowledge-graph.toml):
//! ```toml
//! [graph]
//! integrity = "strict"
//! community_mode = "undirected"
//!
//! [paths]
//! max_depth = 5
//! max_paths = 1000
//! timeout_ms = 2000
//!
//! [export]
//! output_format = "pretty"
//! default_format = "graphml"
//!
//! [source]
//! dataset = "architecture.json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::graph::{CommunityMode, Integrity, PathSearch, DEFAULT_MAX_DEPTH};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Store behaviour
    #[serde(default)]
    pub graph: GraphSettings,

    /// Path search bounds
    #[serde(default)]
    pub paths: PathConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Where graph data comes from
    #[serde(default)]
    pub source: SourceConfig,
}

/// Settings carried by every `KnowledgeGraph`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Whether edges may reference unknown nodes
    #[serde(default)]
    pub integrity: Integrity,

    /// Adjacency followed by community detection
    #[serde(default)]
    pub community_mode: CommunityMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Stop all-paths search after this many results
    #[serde(default)]
    pub max_paths: Option<usize>,

    /// Wall-clock budget for all-paths and depth queries
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// JSON layout (pretty or compact)
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Format used when none is requested
    #[serde(default = "default_export_format")]
    pub default_format: String,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Dataset file (JSON or TOML); the built-in seed data is used when unset
    #[serde(default)]
    pub dataset: Option<PathBuf>,
}

// Default value functions
fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_export_format() -> String {
    "json".to_string()
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_paths: None,
            timeout_ms: None,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            default_format: default_export_format(),
        }
    }
}

impl PathConfig {
    /// Deadline measured from now, if a timeout is configured
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms))
    }

    /// Search bounds starting now
    pub fn search(&self) -> PathSearch {
        PathSearch {
            max_depth: self.max_depth,
            max_paths: self.max_paths,
            deadline: self.deadline(),
        }
    }
}

impl GraphConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "knowledge-graph.toml",
            ".knowledge-graph.toml",
            "config/knowledge-graph.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "knowledge-graph") {
            let xdg_config = config_dir.config_dir().join("knowledge-graph.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (KG__*)
        builder = builder.add_source(
            Environment::with_prefix("KG")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
