//! Keyword retrieval over the graph, weighted by confidence.
//!
//! Scoring: one point per distinct query term found as a substring of the
//! node's search surface (label, type and serialized properties, lowercased),
//! times the node's confidence. Terms are lowercased and de-duplicated before
//! matching, so "dog dog" scores the same as "dog". A weak match on a trusted
//! node can outrank a strong match on a doubtful one.
//!
//! Ties keep no particular order; callers must not rely on it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::{Edge, KnowledgeGraph, Node, Timestamp};

/// A node together with its retrieval score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    pub node: Node,
    /// `matched_terms × confidence`.
    pub score: f32,
    pub matched_terms: usize,
}

/// What a retrieval call hands back to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryContext {
    /// Best matches, highest score first.
    pub nodes: Vec<ScoredNode>,
    /// Every edge touching a selected node.
    pub edges: Vec<Edge>,
    /// Readable sentences for the inferred edges among `edges`.
    pub inferred_facts: Vec<String>,
    /// Validity windows of the selected nodes, one clause per node. Empty if none.
    pub temporal_context: String,
    /// Mean confidence of the selected nodes; 0 when nothing matched.
    pub confidence_summary: f32,
}

impl QueryContext {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Display for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "no context available");
        }
        writeln!(f, "entities:")?;
        for scored in &self.nodes {
            writeln!(
                f,
                "  {} [{}] (score {:.2}, confidence {:.2})",
                scored.node.label, scored.node.node_type, scored.score, scored.node.confidence
            )?;
        }
        writeln!(f, "relationships: {}", self.edges.len())?;
        if !self.inferred_facts.is_empty() {
            writeln!(f, "inferred:")?;
            for fact in &self.inferred_facts {
                writeln!(f, "  {fact}")?;
            }
        }
        if !self.temporal_context.is_empty() {
            writeln!(f, "temporal: {}", self.temporal_context)?;
        }
        writeln!(f, "mean confidence: {:.2}", self.confidence_summary)
    }
}

/// Lowercased, whitespace-delimited, de-duplicated query terms.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

/// Text a node is matched against.
pub fn search_surface(node: &Node) -> String {
    let properties = serde_json::to_string(&node.properties).unwrap_or_default();
    format!("{} {} {}", node.label, node.node_type, properties).to_lowercase()
}

/// Scores nodes of one graph against free-text queries.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalScorer<'g> {
    graph: &'g KnowledgeGraph,
}

impl<'g> RetrievalScorer<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self { graph }
    }

    /// Every node with a non-zero score, best first.
    pub fn score_nodes(&self, query: &str) -> Vec<ScoredNode> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return vec![];
        }

        let mut scored: Vec<ScoredNode> = self
            .graph
            .nodes()
            .filter_map(|node| {
                let surface = search_surface(node);
                let matched_terms = terms.iter().filter(|t| surface.contains(t.as_str())).count();
                let score = matched_terms as f32 * node.confidence;
                (score > 0.0).then(|| ScoredNode {
                    node: node.clone(),
                    score,
                    matched_terms,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    /// Assemble the context for `query` from at most `max_nodes` best matches.
    pub fn context_for_query(&self, query: &str, max_nodes: usize) -> QueryContext {
        let mut nodes = self.score_nodes(query);
        nodes.truncate(max_nodes);
        if nodes.is_empty() {
            return QueryContext::default();
        }

        let mut seen: HashSet<(&str, &str, &str)> = HashSet::new();
        let mut edges: Vec<Edge> = Vec::new();
        for scored in &nodes {
            let id = scored.node.id.as_str();
            let incident = self
                .graph
                .get_edges_from(id)
                .into_iter()
                .chain(self.graph.get_edges_to(id));
            for edge in incident {
                let triple = (edge.source.as_str(), edge.relation.as_str(), edge.target.as_str());
                if seen.insert(triple) {
                    edges.push(edge.clone());
                }
            }
        }

        let inferred_facts = edges
            .iter()
            .filter(|e| e.provenance.inferred)
            .map(|e| self.describe_inferred(e))
            .collect();

        let temporal_context = nodes
            .iter()
            .filter(|s| s.node.has_validity_window())
            .map(|s| describe_validity(&s.node))
            .collect::<Vec<_>>()
            .join("; ");

        let confidence_summary =
            nodes.iter().map(|s| s.node.confidence).sum::<f32>() / nodes.len() as f32;

        QueryContext {
            nodes,
            edges,
            inferred_facts,
            temporal_context,
            confidence_summary,
        }
    }

    fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.graph.get_node(id).map_or(id, |n| n.label.as_str())
    }

    fn describe_inferred(&self, edge: &Edge) -> String {
        let mut fact = format!(
            "{} {} {}",
            self.label_of(&edge.source),
            edge.relation,
            self.label_of(&edge.target)
        );
        match edge.properties.get("via").and_then(|v| v.as_str()) {
            Some(via) => fact.push_str(&format!(
                " (inferred via {}, confidence {:.2})",
                self.label_of(via),
                edge.confidence
            )),
            None => fact.push_str(&format!(" (inferred, confidence {:.2})", edge.confidence)),
        }
        fact
    }
}

fn describe_validity(node: &Node) -> String {
    match (node.valid_from, node.valid_until) {
        (Some(from), Some(until)) => format!(
            "{} valid from {} until {}",
            node.label,
            format_timestamp(from),
            format_timestamp(until)
        ),
        (Some(from), None) => format!("{} valid since {}", node.label, format_timestamp(from)),
        (None, Some(until)) => format!("{} valid until {}", node.label, format_timestamp(until)),
        (None, None) => format!("{} always valid", node.label),
    }
}

/// Calendar date of a timestamp, or the raw seconds if out of range.
fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
