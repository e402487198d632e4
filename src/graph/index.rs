//! In-memory entity and relation store.
//!
//! Nodes and edges live in a petgraph arena (`DiGraph`), which gives dense
//! index-addressed storage and per-node adjacency lists. Two hash maps resolve
//! string ids to arena indices. Nothing is ever removed, so indices stay stable
//! for the lifetime of the graph.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{GraphError, GraphResult};
use crate::provenance::{EdgeProvenance, NodeProvenance};

use super::{
    DEFAULT_CONFIDENCE, Edge, EdgeInput, EdgeOptions, Node, NodeInput, NodeOptions, Properties,
    Timestamp, now_secs, unit_interval,
};

/// Whether an insert created a record or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Merged,
}

/// Tunables for merge and decay behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSettings {
    /// Weight given to a new edge when the caller supplies none.
    pub default_edge_weight: f32,
    /// Added to an edge's weight each time it is observed again (capped at 1.0).
    pub edge_weight_increment: f32,
    /// Lowest confidence decay can push a node to.
    pub confidence_floor: f32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            default_edge_weight: 0.5,
            edge_weight_increment: 0.1,
            confidence_floor: 0.1,
        }
    }
}

/// Identity of an edge: endpoints plus relation label.
type EdgeKey = (NodeIndex, String, NodeIndex);

/// In-memory knowledge graph: the entity store and the relation store.
///
/// Adjacency lookups (`get_edges_from`, `get_parents`, ...) walk only the
/// incident edges of a node, so they cost O(degree), not O(E).
pub struct KnowledgeGraph {
    /// Arena: nodes carry [`Node`], edges carry [`Edge`].
    graph: DiGraph<Node, Edge>,
    /// Node id → arena index.
    node_index: HashMap<String, NodeIndex>,
    /// (source, relation, target) → arena index.
    edge_index: HashMap<EdgeKey, EdgeIndex>,
    /// Display id → arena index. Distinct triples can join to the same id;
    /// the first one inserted keeps it.
    edge_ids: HashMap<String, EdgeIndex>,
    settings: GraphSettings,
}

impl KnowledgeGraph {
    /// Create an empty graph with default settings.
    pub fn new() -> Self {
        Self::with_settings(GraphSettings::default())
    }

    pub fn with_settings(settings: GraphSettings) -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            edge_ids: HashMap::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Entity store
    // -----------------------------------------------------------------------

    /// Insert a node, or merge into the node with the same id.
    ///
    /// A merge overwrites property keys, keeps the larger confidence, advances
    /// `updated_at` and folds in provenance. It never lowers confidence.
    pub fn insert_node(&mut self, input: NodeInput) -> (Upsert, &Node) {
        let NodeInput {
            id,
            node_type,
            label,
            properties,
            options,
        } = input;
        let now = options.observed_at.unwrap_or_else(now_secs);

        if let Some(&idx) = self.node_index.get(&id) {
            let node = &mut self.graph[idx];
            merge_node(node, properties, options, now);
            tracing::debug!(id = %node.id, confidence = node.confidence, "merged node");
            return (Upsert::Merged, &self.graph[idx]);
        }

        let confidence = unit_interval(options.confidence.unwrap_or(DEFAULT_CONFIDENCE));
        let node = Node {
            id: id.clone(),
            node_type,
            label,
            properties,
            ontology_class: options.ontology_class,
            confidence,
            asserted_confidence: confidence,
            created_at: now,
            updated_at: now,
            valid_from: options.valid_from,
            valid_until: options.valid_until,
            provenance: options.provenance.unwrap_or_default(),
        };
        tracing::debug!(id = %node.id, node_type = %node.node_type, "created node");
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        (Upsert::Created, &self.graph[idx])
    }

    /// Insert-or-merge a node and return a copy of the stored record.
    ///
    /// Never fails: ingestion of nodes is addition-only.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        label: impl Into<String>,
        properties: Properties,
        options: NodeOptions,
    ) -> Node {
        let input = NodeInput {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            properties,
            options,
        };
        self.insert_node(input).1.clone()
    }

    /// Look up a node by id.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Node at an arena position (insertion order).
    pub(crate) fn node_at(&self, position: usize) -> Option<&Node> {
        self.graph.node_weight(NodeIndex::new(position))
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.graph.node_weights_mut()
    }

    // -----------------------------------------------------------------------
    // Relation store
    // -----------------------------------------------------------------------

    /// Insert an edge, or merge into the edge with the same
    /// (source, relation, target) triple.
    ///
    /// Fails with [`GraphError::DanglingReference`] if either endpoint is
    /// missing; the graph is left untouched in that case.
    pub fn insert_edge(&mut self, input: EdgeInput) -> GraphResult<(Upsert, &Edge)> {
        let id = input.id();
        let EdgeInput {
            source,
            target,
            relation,
            properties,
            options,
        } = input;

        let src_idx = self.resolve_endpoint(&id, &source)?;
        let dst_idx = self.resolve_endpoint(&id, &target)?;
        let now = options.observed_at.unwrap_or_else(now_secs);

        let key = (src_idx, relation.clone(), dst_idx);
        if let Some(&idx) = self.edge_index.get(&key) {
            let increment = self.settings.edge_weight_increment;
            let edge = &mut self.graph[idx];
            merge_edge(edge, properties, options, increment, now);
            tracing::debug!(id = %edge.id, weight = edge.weight, "merged edge");
            return Ok((Upsert::Merged, &self.graph[idx]));
        }

        let edge = Edge {
            id: id.clone(),
            source,
            target,
            relation,
            properties,
            weight: unit_interval(options.weight.unwrap_or(self.settings.default_edge_weight)),
            confidence: unit_interval(options.confidence.unwrap_or(DEFAULT_CONFIDENCE)),
            temporal: options.temporal,
            provenance: options.provenance.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(id = %edge.id, inferred = edge.provenance.inferred, "created edge");
        let idx = self.graph.add_edge(src_idx, dst_idx, edge);
        self.edge_index.insert(key, idx);
        self.edge_ids.entry(id).or_insert(idx);
        Ok((Upsert::Created, &self.graph[idx]))
    }

    /// Insert-or-merge an edge, returning a copy of the stored record or the
    /// reason it was rejected.
    pub fn try_add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
        properties: Properties,
        options: EdgeOptions,
    ) -> GraphResult<Edge> {
        let input = EdgeInput {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            properties,
            options,
        };
        self.insert_edge(input).map(|(_, edge)| edge.clone())
    }

    /// Insert-or-merge an edge. Returns `None` when an endpoint is missing.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
        properties: Properties,
        options: EdgeOptions,
    ) -> Option<Edge> {
        match self.try_add_edge(source, target, relation, properties, options) {
            Ok(edge) => Some(edge),
            Err(e) => {
                tracing::debug!("rejected edge: {e}");
                None
            }
        }
    }

    fn resolve_endpoint(&self, edge_id: &str, node_id: &str) -> GraphResult<NodeIndex> {
        self.node_index
            .get(node_id)
            .copied()
            .ok_or_else(|| GraphError::DanglingReference {
                edge_id: edge_id.to_string(),
                missing: node_id.to_string(),
            })
    }

    /// Look up an edge by its display id.
    ///
    /// Ids built from hyphenated node ids can collide; use
    /// [`find_edge`](Self::find_edge) when the triple is known.
    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edge_ids.get(id).map(|&idx| &self.graph[idx])
    }

    /// Look up an edge by its triple.
    pub fn find_edge(&self, source: &str, relation: &str, target: &str) -> Option<&Edge> {
        let src = *self.node_index.get(source)?;
        let dst = *self.node_index.get(target)?;
        self.edge_index
            .get(&(src, relation.to_string(), dst))
            .map(|&idx| &self.graph[idx])
    }

    /// Whether an edge with this triple exists.
    pub fn has_edge(&self, source: &str, relation: &str, target: &str) -> bool {
        self.find_edge(source, relation, target).is_some()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// Outgoing edges of a node.
    pub fn get_edges_from(&self, id: &str) -> Vec<&Edge> {
        self.edges_directed(id, Direction::Outgoing)
    }

    /// Incoming edges of a node.
    pub fn get_edges_to(&self, id: &str) -> Vec<&Edge> {
        self.edges_directed(id, Direction::Incoming)
    }

    /// Targets of the node's outgoing edges of the given relation type.
    ///
    /// For `is_a`, these are the node's superclasses.
    pub fn get_parents(&self, id: &str, relation: &str) -> Vec<&Node> {
        let Some(&idx) = self.node_index.get(id) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().relation == relation)
            .map(|e| &self.graph[e.target()])
            .collect()
    }

    /// Sources of the node's incoming edges of the given relation type.
    pub fn get_children(&self, id: &str, relation: &str) -> Vec<&Node> {
        let Some(&idx) = self.node_index.get(id) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().relation == relation)
            .map(|e| &self.graph[e.source()])
            .collect()
    }

    fn edges_directed(&self, id: &str, direction: Direction) -> Vec<&Edge> {
        let Some(&idx) = self.node_index.get(id) else {
            return vec![];
        };
        self.graph
            .edges_directed(idx, direction)
            .map(|e| e.weight())
            .collect()
    }
}

fn merge_node(node: &mut Node, properties: Properties, options: NodeOptions, now: Timestamp) {
    node.properties.extend(properties);

    if let Some(class) = options.ontology_class {
        node.ontology_class = Some(class);
    }
    if let Some(from) = options.valid_from {
        node.valid_from = Some(from);
    }
    if let Some(until) = options.valid_until {
        node.valid_until = Some(until);
    }

    if let Some(confidence) = options.confidence {
        node.confidence = node.confidence.max(unit_interval(confidence));
    }
    // Decay restarts from whatever the node is believed at now.
    node.asserted_confidence = node.confidence;
    node.updated_at = node.updated_at.max(now);

    let incoming_provenance = options.provenance.unwrap_or_else(NodeProvenance::default);
    node.provenance.absorb(&incoming_provenance);
}

fn merge_edge(
    edge: &mut Edge,
    properties: Properties,
    options: EdgeOptions,
    increment: f32,
    now: Timestamp,
) {
    edge.properties.extend(properties);
    edge.weight = (edge.weight + increment).min(1.0);

    if let Some(confidence) = options.confidence {
        edge.confidence = edge.confidence.max(unit_interval(confidence));
    }
    if let Some(window) = options.temporal {
        edge.temporal = Some(window);
    }

    let incoming_provenance = options.provenance.unwrap_or_else(EdgeProvenance::default);
    edge.provenance.absorb(&incoming_provenance);
    edge.updated_at = edge.updated_at.max(now);
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
