//! Filtered projections over the graph
//!
//! A `GraphQuery` narrows the node set step by step (type, properties,
//! reachability, limit) and returns the edges running between surviving nodes.
//! Queries never mutate the store and preserve insertion order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::time::Instant;

use super::{EdgeType, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, NodeId, NodeType, Properties};
use crate::error::{GraphError, Result};

/// Query filters; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_types: Option<Vec<NodeType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_types: Option<Vec<EdgeType>>,
    /// Exact-match constraints on node properties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    /// Expand the result by this many forward hops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl GraphQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_types(mut self, types: impl IntoIterator<Item = NodeType>) -> Self {
        self.node_types = Some(types.into_iter().collect());
        self
    }

    pub fn edge_types(mut self, types: impl IntoIterator<Item = EdgeType>) -> Self {
        self.edge_types = Some(types.into_iter().collect());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Result of a query: cloned nodes and edges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

impl QueryResult {
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }
}

/// Fuzzy search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: NodeId,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub score: i64,
}

impl KnowledgeGraph {
    /// Run a query without a time bound
    pub fn query_graph(&self, query: &GraphQuery) -> QueryResult {
        match self.run_query(query, || Ok::<(), Infallible>(())) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Run a query, giving up once `deadline` passes during depth expansion
    pub fn query_graph_until(&self, query: &GraphQuery, deadline: Instant) -> Result<QueryResult> {
        self.run_query(query, || {
            if Instant::now() >= deadline {
                Err(GraphError::DeadlineExceeded("query depth expansion".into()))
            } else {
                Ok(())
            }
        })
    }

    /// Apply the filters in order. `checkpoint` runs before each node the depth
    /// expansion visits and aborts the query when it fails.
    fn run_query<E>(
        &self,
        query: &GraphQuery,
        checkpoint: impl FnMut() -> std::result::Result<(), E>,
    ) -> std::result::Result<QueryResult, E> {
        let mut nodes: Vec<&KnowledgeNode> = self.nodes().collect();

        if let Some(types) = &query.node_types {
            nodes.retain(|n| types.contains(&n.node_type));
        }

        let mut edges: Vec<&KnowledgeEdge> = self.edges().collect();
        if let Some(types) = &query.edge_types {
            edges.retain(|e| types.contains(&e.edge_type));
        }

        if let Some(wanted) = &query.properties {
            nodes.retain(|n| {
                wanted
                    .iter()
                    .all(|(key, value)| n.properties.get(key) == Some(value))
            });
        }

        if let Some(depth) = query.depth.filter(|d| *d > 0) {
            let seeds: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            let reached = self.reachable_within(&seeds, depth, checkpoint)?;
            nodes = self
                .nodes()
                .filter(|n| reached.contains_key(n.id.as_str()))
                .collect();
        }

        let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        edges.retain(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()));

        if let Some(limit) = query.limit {
            nodes.truncate(limit);
        }

        Ok(QueryResult {
            nodes: nodes.into_iter().cloned().collect(),
            edges: edges.into_iter().cloned().collect(),
        })
    }

    /// Nodes within `max_depth` forward hops of any seed, with their hop distance.
    ///
    /// Breadth-first from all seeds at once so each node gets its minimal
    /// distance regardless of seed order.
    fn reachable_within<'a, E>(
        &'a self,
        seeds: &[&'a str],
        max_depth: usize,
        mut checkpoint: impl FnMut() -> std::result::Result<(), E>,
    ) -> std::result::Result<HashMap<&'a str, usize>, E> {
        let mut reached: HashMap<&str, usize> = HashMap::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();

        for &seed in seeds {
            if reached.insert(seed, 0).is_none() {
                queue.push_back((seed, 0));
            }
        }

        while let Some((id, depth)) = queue.pop_front() {
            checkpoint()?;
            if depth == max_depth {
                continue;
            }
            for next in self.successors(id) {
                if !reached.contains_key(next) {
                    reached.insert(next, depth + 1);
                    queue.push_back((next, depth + 1));
                }
            }
        }

        Ok(reached)
    }

    /// Search nodes by label or id (fuzzy), best matches first
    pub fn search(&self, text: &str, limit: usize) -> Vec<SearchHit> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        let matcher = SkimMatcherV2::default();
        let mut results: Vec<(i64, &KnowledgeNode)> = Vec::new();

        for node in self.nodes() {
            let score = matcher
                .fuzzy_match(&node.label, text)
                .or_else(|| matcher.fuzzy_match(&node.id, text));
            if let Some(score) = score {
                results.push((score, node));
            }
        }

        // Stable sort keeps insertion order among equal scores
        results.sort_by(|a, b| b.0.cmp(&a.0));

        results
            .into_iter()
            .take(limit)
            .map(|(score, node)| SearchHit {
                id: node.id.clone(),
                label: node.label.clone(),
                node_type: node.node_type,
                score,
            })
            .collect()
    }
}
