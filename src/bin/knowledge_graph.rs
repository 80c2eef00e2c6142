//! Knowledge Graph CLI
//!
//! Builds the architecture knowledge graph from seed data, a dataset file or a
//! previous JSON export, then queries, analyses or exports it.

use std::path::PathBuf;

use adr_knowledge_graph::{
    DatasetSource, EdgeType, ExportFormat, GraphConfig, GraphPath, GraphQuery, KnowledgeGraph,
    NodeType, SeedSource,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "knowledge-graph")]
#[command(about = "Build, query and export the architecture knowledge graph")]
struct Cli {
    /// Configuration file (defaults to knowledge-graph.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Dataset file (JSON or TOML) to build from instead of the seed data
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Previously exported JSON graph to load instead of building
    #[arg(short, long, conflicts_with = "dataset")]
    import: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print graph metrics
    Stats,

    /// Export the graph
    Export {
        /// json, graphml, cypher or dot
        #[arg(short, long)]
        format: Option<String>,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Filter nodes and edges
    Query {
        #[arg(long = "node-type")]
        node_types: Vec<String>,
        #[arg(long = "edge-type")]
        edge_types: Vec<String>,
        /// key=value (value parsed as JSON, else taken as a string)
        #[arg(long = "property")]
        properties: Vec<String>,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Cheapest path between two nodes
    Path { from: String, to: String },

    /// Every simple path between two nodes
    AllPaths {
        from: String,
        to: String,
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// List connected communities
    Communities,

    /// Fuzzy search node labels
    Search {
        text: String,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GraphConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    let graph = load_graph(&cli, &config)?;

    match cli.command {
        Commands::Stats => {
            let metrics = graph.calculate_metrics();
            println!("📊 Knowledge graph {}", graph.fingerprint().short());
            println!("  Nodes: {}", metrics.node_count);
            for (node_type, count) in &metrics.nodes_by_type {
                println!("    {:<12} {}", node_type, count);
            }
            println!("  Edges: {}", metrics.edge_count);
            for (edge_type, count) in &metrics.edges_by_type {
                println!("    {:<12} {}", edge_type, count);
            }
            println!("  Average degree:         {:.3}", metrics.average_degree);
            println!("  Clustering coefficient: {:.3}", metrics.clustering_coefficient);
            println!("  Connected components:   {}", metrics.connected_components);
            println!("  Cycle groups:           {}", metrics.cycle_groups);
        }

        Commands::Export { format, output } => {
            let format: ExportFormat = format
                .as_deref()
                .unwrap_or(config.export.default_format.as_str())
                .parse()?;
            let content = graph.export_as(format, config.export.output_format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("✅ Exported {} to: {:?}", format, path);
                }
                None => print!("{}", content),
            }
        }

        Commands::Query {
            node_types,
            edge_types,
            properties,
            depth,
            limit,
        } => {
            let mut query = GraphQuery::new();
            if !node_types.is_empty() {
                query = query.node_types(
                    node_types
                        .iter()
                        .map(|t| t.parse::<NodeType>())
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
            if !edge_types.is_empty() {
                query = query.edge_types(
                    edge_types
                        .iter()
                        .map(|t| t.parse::<EdgeType>())
                        .collect::<Result<Vec<_>, _>>()?,
                );
            }
            for pair in &properties {
                let Some((key, raw)) = pair.split_once('=') else {
                    bail!("property filter '{}' is not key=value", pair);
                };
                let value = serde_json::from_str(raw)
                    .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
                query = query.property(key, value);
            }
            query.depth = depth;
            query.limit = limit;

            let result = match config.paths.deadline() {
                Some(deadline) => graph.query_graph_until(&query, deadline)?,
                None => graph.query_graph(&query),
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Path { from, to } => match graph.find_shortest_path(&from, &to) {
            Some(path) => print_path(&path),
            None => println!("No path from {} to {}", from, to),
        },

        Commands::AllPaths { from, to, max_depth } => {
            let mut search = config.paths.search();
            if let Some(max_depth) = max_depth {
                search.max_depth = max_depth;
            }
            let paths = graph.find_all_paths_bounded(&from, &to, &search)?;
            println!("🔍 {} path(s) from {} to {}", paths.len(), from, to);
            for path in &paths {
                print_path(path);
            }
        }

        Commands::Communities => {
            for community in graph.communities() {
                println!("{} ({} members)", community.id, community.members.len());
                for member in &community.members {
                    println!("  - {}", member);
                }
            }
        }

        Commands::Search { text, limit } => {
            for hit in graph.search(&text, limit) {
                println!("{:>5}  {:<28} {:<12} {}", hit.score, hit.id, hit.node_type, hit.label);
            }
        }
    }

    Ok(())
}

fn load_graph(cli: &Cli, config: &GraphConfig) -> anyhow::Result<KnowledgeGraph> {
    let mut graph = KnowledgeGraph::with_settings(config.graph.clone());

    if let Some(path) = &cli.import {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        graph.import_graph(&json)?;
        return Ok(graph);
    }

    match cli.dataset.as_ref().or(config.source.dataset.as_ref()) {
        Some(path) => {
            debug!(path = %path.display(), "building from dataset");
            let source = DatasetSource::from_path(path)
                .with_context(|| format!("loading dataset {}", path.display()))?;
            graph.build_graph(&source)?;
        }
        None => graph.build_graph(&SeedSource)?,
    }
    Ok(graph)
}

fn print_path(path: &GraphPath) {
    println!(
        "  {}  (length {}, cost {:.3})",
        path.nodes.join(" → "),
        path.length,
        path.total_weight
    );
}
