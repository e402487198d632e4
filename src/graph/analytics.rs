//! Graph analytics: monitoring counts and degree rankings.
//!
//! All functions operate on a [`KnowledgeGraph`] reference and return owned,
//! serializable results.

use std::collections::BTreeMap;

use serde::Serialize;

use super::index::KnowledgeGraph;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Snapshot of graph size and health for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Node count per node type.
    pub nodes_by_type: BTreeMap<String, usize>,
    /// Edge count per relation type.
    pub edges_by_type: BTreeMap<String, usize>,
    /// Edges whose provenance marks them as inferred.
    pub inferred_edge_count: usize,
    /// Mean node confidence; 0 for an empty graph.
    pub average_confidence: f32,
}

/// Compute counts, histograms and mean confidence in one sweep.
pub fn graph_stats(kg: &KnowledgeGraph) -> GraphStats {
    let mut stats = GraphStats {
        node_count: kg.node_count(),
        edge_count: kg.edge_count(),
        ..Default::default()
    };

    let mut confidence_sum = 0.0_f64;
    for node in kg.nodes() {
        *stats.nodes_by_type.entry(node.node_type.clone()).or_insert(0) += 1;
        confidence_sum += node.confidence as f64;
    }
    for edge in kg.edges() {
        *stats.edges_by_type.entry(edge.relation.clone()).or_insert(0) += 1;
        if edge.provenance.inferred {
            stats.inferred_edge_count += 1;
        }
    }
    if stats.node_count > 0 {
        stats.average_confidence = (confidence_sum / stats.node_count as f64) as f32;
    }
    stats
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "knowledge graph stats")?;
        writeln!(f, "  nodes:          {}", self.node_count)?;
        writeln!(f, "  edges:          {}", self.edge_count)?;
        writeln!(f, "  inferred edges: {}", self.inferred_edge_count)?;
        writeln!(f, "  avg confidence: {:.3}", self.average_confidence)?;
        if !self.nodes_by_type.is_empty() {
            writeln!(f, "  node types:")?;
            for (ty, count) in &self.nodes_by_type {
                writeln!(f, "    {ty}: {count}")?;
            }
        }
        if !self.edges_by_type.is_empty() {
            writeln!(f, "  relation types:")?;
            for (ty, count) in &self.edges_by_type {
                writeln!(f, "    {ty}: {count}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Degree centrality
// ---------------------------------------------------------------------------

/// Degree centrality metrics for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegreeCentrality {
    pub id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    /// `in_degree + out_degree`.
    pub total: usize,
}

/// Compute degree centrality for all nodes. Returns sorted by total degree desc.
pub fn degree_centrality(kg: &KnowledgeGraph) -> Vec<DegreeCentrality> {
    let mut results: Vec<DegreeCentrality> = kg
        .nodes()
        .map(|node| {
            let out_degree = kg.get_edges_from(&node.id).len();
            let in_degree = kg.get_edges_to(&node.id).len();
            DegreeCentrality {
                id: node.id.clone(),
                in_degree,
                out_degree,
                total: in_degree + out_degree,
            }
        })
        .collect();
    results.sort_by(|a, b| b.total.cmp(&a.total));
    results
}
