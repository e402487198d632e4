//! Knowledge graph: typed entities and relationships with provenance.
//!
//! - **Data model** (this module): [`Node`], [`Edge`] and the input records
//!   ([`NodeInput`], [`EdgeInput`]) that ingestion and inference both feed in.
//! - **Store** ([`KnowledgeGraph`]): a petgraph arena holding nodes and edges,
//!   with string-id lookup maps and insert-or-merge semantics.
//! - **Analytics** ([`analytics`]): counts, histograms and degree rankings.

pub mod analytics;
pub mod index;

use serde::{Deserialize, Serialize};

use crate::provenance::{EdgeProvenance, NodeProvenance};
use crate::temporal::TemporalWindow;

pub use index::{GraphSettings, KnowledgeGraph, Upsert};

/// Open-schema property bag. Merged shallowly: later values overwrite same keys.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Seconds since the UNIX epoch.
pub type Timestamp = u64;

/// Seconds in one day.
pub const SECS_PER_DAY: u64 = 86_400;

/// Confidence assigned when the caller does not supply one.
pub const DEFAULT_CONFIDENCE: f32 = 1.0;

/// Current wall-clock time in seconds since the UNIX epoch.
pub fn now_secs() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Derive the identity of an edge from its triple.
///
/// Two edges of the same type between the same ordered pair share an id and
/// therefore can never coexist.
pub fn edge_id(source: &str, relation: &str, target: &str) -> String {
    format!("{source}-{relation}-{target}")
}

/// Clamp into `[0.0, 1.0]`, mapping NaN to zero.
pub(crate) fn unit_interval(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// An entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, stable across merges.
    pub id: String,
    /// Free-form category label (e.g. "Person", "Concept").
    #[serde(rename = "type")]
    pub node_type: String,
    /// Human-readable display name.
    pub label: String,
    /// Open-schema attributes.
    #[serde(default)]
    pub properties: Properties,
    /// Class used by ontology-aware rules. Falls back to `node_type` when unset.
    #[serde(default)]
    pub ontology_class: Option<String>,
    /// Current belief strength in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Confidence as of `updated_at`; the basis decay is computed from.
    pub asserted_confidence: f32,
    pub created_at: Timestamp,
    /// Advances on every merge. Decay never touches it.
    pub updated_at: Timestamp,
    #[serde(default)]
    pub valid_from: Option<Timestamp>,
    #[serde(default)]
    pub valid_until: Option<Timestamp>,
    pub provenance: NodeProvenance,
}

impl Node {
    /// The class this node participates in for ontology reasoning.
    pub fn class(&self) -> &str {
        self.ontology_class.as_deref().unwrap_or(&self.node_type)
    }

    /// Whether either end of the validity window is set.
    pub fn has_validity_window(&self) -> bool {
        self.valid_from.is_some() || self.valid_until.is_some()
    }

    /// Whether the node's validity window contains `at`. Open ends are unbounded.
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        self.valid_from.is_none_or(|from| from <= at)
            && self.valid_until.is_none_or(|until| until >= at)
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// A typed, directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// `source + "-" + type + "-" + target`.
    pub id: String,
    pub source: String,
    pub target: String,
    /// Relation label (e.g. "is_a", "precedes", "causes").
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(default)]
    pub properties: Properties,
    /// Strength/frequency signal in `[0.0, 1.0]`; grows on repeated observation.
    pub weight: f32,
    pub confidence: f32,
    /// Window during which the relation holds.
    #[serde(default)]
    pub temporal: Option<TemporalWindow>,
    pub provenance: EdgeProvenance,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Edge {
    /// Whether the edge holds at `at`. Edges without a window always hold.
    pub fn is_valid_at(&self, at: Timestamp) -> bool {
        self.temporal.as_ref().is_none_or(|w| w.contains(at))
    }
}

// ---------------------------------------------------------------------------
// Insert options and input records
// ---------------------------------------------------------------------------

/// Optional fields for node insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    pub ontology_class: Option<String>,
    pub confidence: Option<f32>,
    pub valid_from: Option<Timestamp>,
    pub valid_until: Option<Timestamp>,
    pub provenance: Option<NodeProvenance>,
    /// Observation time. Defaults to now.
    pub observed_at: Option<Timestamp>,
}

impl NodeOptions {
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.ontology_class = Some(class.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Bound the node's validity. Either end may be open.
    pub fn valid_between(mut self, from: Option<Timestamp>, until: Option<Timestamp>) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn with_provenance(mut self, provenance: NodeProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Record the observation as happening at `timestamp` instead of now.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.observed_at = Some(timestamp);
        self
    }
}

/// Optional fields for edge insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOptions {
    pub weight: Option<f32>,
    pub confidence: Option<f32>,
    pub temporal: Option<TemporalWindow>,
    pub provenance: Option<EdgeProvenance>,
    /// Observation time. Defaults to now.
    pub observed_at: Option<Timestamp>,
}

impl EdgeOptions {
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_temporal(mut self, window: TemporalWindow) -> Self {
        self.temporal = Some(window);
        self
    }

    pub fn with_provenance(mut self, provenance: EdgeProvenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.observed_at = Some(timestamp);
        self
    }
}

/// A node record as handed over by an extractor or produced by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(flatten)]
    pub options: NodeOptions,
}

impl NodeInput {
    pub fn new(
        id: impl Into<String>,
        node_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            label: label.into(),
            properties: Properties::new(),
            options: NodeOptions::default(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.options = options;
        self
    }
}

/// An edge record as handed over by an extractor or produced by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeInput {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(flatten)]
    pub options: EdgeOptions,
}

impl EdgeInput {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            properties: Properties::new(),
            options: EdgeOptions::default(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_options(mut self, options: EdgeOptions) -> Self {
        self.options = options;
        self
    }

    /// The id the edge will be stored under.
    pub fn id(&self) -> String {
        edge_id(&self.source, &self.relation, &self.target)
    }
}
