//! Batch ingestion of extractor output.
//!
//! An extraction batch is a JSON document of node and edge records:
//!
//! ```json
//! {
//!   "nodes": [{"id": "ada", "type": "Person", "label": "Ada Lovelace", "confidence": 0.9}],
//!   "edges": [{"source": "ada", "target": "engine", "type": "designed"}]
//! }
//! ```
//!
//! Nodes are applied before edges, so an edge may reference a node from the
//! same batch. Edges with a missing endpoint are skipped and counted, never
//! fatal.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{IngestError, KgError, KgResult};
use crate::graph::{EdgeInput, NodeInput, Upsert};

/// One extraction batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub edges: Vec<EdgeInput>,
}

/// What applying a batch did to the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_created: usize,
    pub edges_merged: usize,
    /// Edges skipped because an endpoint did not exist.
    pub edges_rejected: usize,
}

impl IngestBatch {
    /// Parse and check a batch. Records with an empty identifying field are rejected.
    pub fn from_json(json: &str) -> Result<Self, IngestError> {
        let batch: Self = serde_json::from_str(json).map_err(|e| IngestError::MalformedRecord {
            message: format!("JSON parse error: {e}"),
        })?;
        batch.check()?;
        Ok(batch)
    }

    fn check(&self) -> Result<(), IngestError> {
        for (i, node) in self.nodes.iter().enumerate() {
            let fields = [
                ("id", &node.id),
                ("type", &node.node_type),
                ("label", &node.label),
            ];
            for (field, value) in fields {
                if value.trim().is_empty() {
                    return Err(IngestError::MalformedRecord {
                        message: format!("node #{i} has an empty `{field}`"),
                    });
                }
            }
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let fields = [
                ("source", &edge.source),
                ("target", &edge.target),
                ("type", &edge.relation),
            ];
            for (field, value) in fields {
                if value.trim().is_empty() {
                    return Err(IngestError::MalformedRecord {
                        message: format!("edge #{i} has an empty `{field}`"),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Insert every record into `engine`, nodes first.
    pub fn apply(self, engine: &mut Engine) -> IngestReport {
        let mut report = IngestReport::default();

        for node in self.nodes {
            match engine.insert_node(node).0 {
                Upsert::Created => report.nodes_created += 1,
                Upsert::Merged => report.nodes_merged += 1,
            }
        }
        for edge in self.edges {
            match engine.insert_edge(edge) {
                Ok((Upsert::Created, _)) => report.edges_created += 1,
                Ok((Upsert::Merged, _)) => report.edges_merged += 1,
                Err(e) => {
                    tracing::warn!("skipping edge: {e}");
                    report.edges_rejected += 1;
                }
            }
        }

        tracing::info!(
            nodes_created = report.nodes_created,
            nodes_merged = report.nodes_merged,
            edges_created = report.edges_created,
            edges_merged = report.edges_merged,
            edges_rejected = report.edges_rejected,
            "ingested batch"
        );
        report
    }
}

/// Parse `json` and apply it to `engine`.
pub fn ingest_json(engine: &mut Engine, json: &str) -> KgResult<IngestReport> {
    let batch = IngestBatch::from_json(json).map_err(KgError::from)?;
    Ok(batch.apply(engine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    const BATCH: &str = r#"{
        "nodes": [
            {"id": "ada", "type": "Person", "label": "Ada Lovelace", "confidence": 0.9,
             "properties": {"born": 1815}},
            {"id": "engine", "type": "Artifact", "label": "Analytical Engine",
             "valid_from": 0, "valid_until": 100}
        ],
        "edges": [
            {"source": "ada", "target": "engine", "type": "designed", "weight": 0.7},
            {"source": "ada", "target": "babbage", "type": "knew"}
        ]
    }"#;

    #[test]
    fn parses_flattened_options() {
        let batch = IngestBatch::from_json(BATCH).unwrap();
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.nodes[0].options.confidence, Some(0.9));
        assert_eq!(batch.nodes[0].properties["born"], 1815);
        assert_eq!(batch.nodes[1].options.valid_until, Some(100));
        assert_eq!(batch.edges[0].options.weight, Some(0.7));
    }

    #[test]
    fn apply_counts_and_skips_dangling_edges() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        let report = ingest_json(&mut engine, BATCH).unwrap();
        assert_eq!(
            report,
            IngestReport {
                nodes_created: 2,
                nodes_merged: 0,
                edges_created: 1,
                edges_merged: 0,
                edges_rejected: 1,
            }
        );

        let again = ingest_json(&mut engine, BATCH).unwrap();
        assert_eq!(again.nodes_merged, 2);
        assert_eq!(again.edges_merged, 1);
        let edge = engine.get_edge("ada-designed-engine").unwrap();
        assert!((edge.weight - 0.8).abs() < 1e-6);
    }

    #[test]
    fn rejects_empty_identifiers() {
        let err = IngestBatch::from_json(r#"{"nodes": [{"id": " ", "type": "X", "label": "x"}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("empty `id`"));

        let json = r#"{"edges": [{"source": "a", "target": "", "type": "r"}]}"#;
        let err = IngestBatch::from_json(json).unwrap_err();
        assert!(err.to_string().contains("empty `target`"));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = IngestBatch::from_json(r#"{"nodes": [{"id": "a"}]}"#).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord { .. }));
    }

    #[test]
    fn empty_document_is_an_empty_batch() {
        assert!(IngestBatch::from_json("{}").unwrap().is_empty());
    }
}
