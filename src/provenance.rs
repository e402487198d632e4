//! Provenance: records where a node or edge came from.
//!
//! Nodes carry a full record (source, derivation method, evidence trail).
//! Edges carry a lighter record: a source label and whether the edge was
//! derived by an inference rule.

use serde::{Deserialize, Serialize};

/// Source label attached to everything the inference engine derives.
pub const INFERENCE_SOURCE: &str = "inference";

/// Source label used when the caller does not name one.
pub const DEFAULT_SOURCE: &str = "ingest";

/// How a node came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationMethod {
    /// Directly observed and ingested.
    #[default]
    Direct,
    /// Derived by an inference rule.
    Inferred,
    /// Merged from contributions of more than one source.
    Aggregated,
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Inferred => write!(f, "inferred"),
            Self::Aggregated => write!(f, "aggregated"),
        }
    }
}

/// Provenance of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProvenance {
    /// Who or what contributed the node (an extractor, a federation peer, `inference`).
    pub source: String,
    /// How the node was derived.
    #[serde(default)]
    pub method: DerivationMethod,
    /// Ordered evidence trail: quotes, document ids, or rule names.
    #[serde(default)]
    pub evidence: Vec<String>,
}

impl NodeProvenance {
    /// Provenance for a directly observed node.
    pub fn direct(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            method: DerivationMethod::Direct,
            evidence: Vec::new(),
        }
    }

    /// Provenance for a node produced by the named rule.
    pub fn inferred(rule_name: &str) -> Self {
        Self {
            source: INFERENCE_SOURCE.into(),
            method: DerivationMethod::Inferred,
            evidence: vec![rule_name.to_string()],
        }
    }

    /// Provenance for a node assembled from several contributors.
    pub fn aggregated(source: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            source: source.into(),
            method: DerivationMethod::Aggregated,
            evidence,
        }
    }

    /// Attach an evidence string.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    /// Fold a later contribution into this record.
    ///
    /// Evidence is appended in order, skipping entries already present. A
    /// contribution from a different source turns a direct record into an
    /// aggregated one; inferred records stay inferred until something direct
    /// arrives.
    pub(crate) fn absorb(&mut self, incoming: &NodeProvenance) {
        for item in &incoming.evidence {
            if !self.evidence.contains(item) {
                self.evidence.push(item.clone());
            }
        }

        self.method = match (self.method, incoming.method) {
            (DerivationMethod::Inferred, DerivationMethod::Inferred) => DerivationMethod::Inferred,
            (DerivationMethod::Inferred, _) => {
                self.source = incoming.source.clone();
                incoming.method
            }
            (DerivationMethod::Aggregated, _) | (_, DerivationMethod::Aggregated) => {
                DerivationMethod::Aggregated
            }
            (DerivationMethod::Direct, DerivationMethod::Inferred) => DerivationMethod::Direct,
            (DerivationMethod::Direct, DerivationMethod::Direct) => {
                if self.source == incoming.source {
                    DerivationMethod::Direct
                } else {
                    DerivationMethod::Aggregated
                }
            }
        };
    }
}

impl Default for NodeProvenance {
    fn default() -> Self {
        Self::direct(DEFAULT_SOURCE)
    }
}

/// Provenance of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProvenance {
    /// Who or what contributed the edge.
    pub source: String,
    /// Whether the edge was derived by an inference rule.
    #[serde(default)]
    pub inferred: bool,
}

impl EdgeProvenance {
    /// Provenance for a directly observed edge.
    pub fn direct(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            inferred: false,
        }
    }

    /// Provenance for an edge derived by the inference engine.
    pub fn inferred() -> Self {
        Self {
            source: INFERENCE_SOURCE.into(),
            inferred: true,
        }
    }

    /// Fold a later observation into this record. Once observed directly, an
    /// edge never reverts to inferred.
    pub(crate) fn absorb(&mut self, incoming: &EdgeProvenance) {
        if self.inferred && !incoming.inferred {
            self.inferred = false;
            self.source = incoming.source.clone();
        }
    }
}

impl Default for EdgeProvenance {
    fn default() -> Self {
        Self::direct(DEFAULT_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_source_aggregates() {
        let mut prov = NodeProvenance::direct("extractor-a").with_evidence("doc-1");
        prov.absorb(&NodeProvenance::direct("extractor-b").with_evidence("doc-2"));
        assert_eq!(prov.method, DerivationMethod::Aggregated);
        assert_eq!(prov.source, "extractor-a");
        assert_eq!(prov.evidence, vec!["doc-1", "doc-2"]);
    }

    #[test]
    fn same_source_stays_direct_and_dedupes_evidence() {
        let mut prov = NodeProvenance::direct("extractor-a").with_evidence("doc-1");
        prov.absorb(&NodeProvenance::direct("extractor-a").with_evidence("doc-1"));
        assert_eq!(prov.method, DerivationMethod::Direct);
        assert_eq!(prov.evidence, vec!["doc-1"]);
    }

    #[test]
    fn direct_observation_upgrades_inferred_node() {
        let mut prov = NodeProvenance::inferred("ontology-inheritance");
        prov.absorb(&NodeProvenance::direct("extractor-a"));
        assert_eq!(prov.method, DerivationMethod::Direct);
        assert_eq!(prov.source, "extractor-a");
        assert_eq!(prov.evidence, vec!["ontology-inheritance"]);
    }

    #[test]
    fn edge_never_reverts_to_inferred() {
        let mut prov = EdgeProvenance::direct("extractor-a");
        prov.absorb(&EdgeProvenance::inferred());
        assert!(!prov.inferred);

        let mut derived = EdgeProvenance::inferred();
        derived.absorb(&EdgeProvenance::direct("extractor-b"));
        assert!(!derived.inferred);
        assert_eq!(derived.source, "extractor-b");
    }

    #[test]
    fn method_serializes_lowercase() {
        let json = serde_json::to_string(&DerivationMethod::Aggregated).unwrap();
        assert_eq!(json, "\"aggregated\"");
    }
}
