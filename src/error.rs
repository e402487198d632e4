//! Rich diagnostic error types for the kgraph engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know exactly what went wrong
//! and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the kgraph engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KgError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ontology(#[from] OntologyError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("dangling reference: edge {edge_id} points at missing node {missing}")]
    #[diagnostic(
        code(kgraph::graph::dangling_reference),
        help(
            "Both endpoints of an edge must exist before the edge is inserted. \
             Add the missing node with `add_node()` first, or drop the edge."
        )
    )]
    DanglingReference { edge_id: String, missing: String },

    #[error("node not found: {id}")]
    #[diagnostic(
        code(kgraph::graph::node_not_found),
        help("No node with this id has been ingested. Check the id for typos.")
    )]
    NodeNotFound { id: String },

    #[error("invalid half-life: {half_life_days} days (must be a positive, finite number)")]
    #[diagnostic(
        code(kgraph::graph::invalid_half_life),
        help("Confidence decay needs a half-life greater than zero, e.g. 30 days.")
    )]
    InvalidHalfLife { half_life_days: f64 },
}

// ---------------------------------------------------------------------------
// Ontology errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OntologyError {
    #[error("failed to parse ontology: {message}")]
    #[diagnostic(
        code(kgraph::ontology::parse),
        help(
            "Ontology files map a class name to a list of parent classes, \
             e.g. `Person = [\"Entity\"]` under a `[classes]` table."
        )
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(code(kgraph::config::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(kgraph::config::parse),
        help("Check the TOML syntax and field names against `EngineConfig`.")
    )]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(kgraph::config::invalid), help("Check the EngineConfig fields. {message}"))]
    Invalid { message: String },

    #[error("unknown inference rule: {name}")]
    #[diagnostic(
        code(kgraph::config::unknown_rule),
        help(
            "Valid rule names are: transitive-is-a, transitive-precedes, \
             transitive-causes, ontology-inheritance."
        )
    )]
    UnknownRule { name: String },
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("malformed ingest record: {message}")]
    #[diagnostic(
        code(kgraph::ingest::malformed),
        help(
            "Every node needs `id`, `type` and `label`; every edge needs \
             `source`, `target` and `type`. Fix the extraction output and retry."
        )
    )]
    MalformedRecord { message: String },
}

/// Convenience alias for functions returning kgraph results.
pub type KgResult<T> = std::result::Result<T, KgError>;

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_to_kg_error() {
        let err = GraphError::NodeNotFound { id: "alice".into() };
        let kg: KgError = err.into();
        assert!(matches!(kg, KgError::Graph(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn config_error_converts_to_kg_error() {
        let err = ConfigError::UnknownRule {
            name: "bogus".into(),
        };
        let kg: KgError = err.into();
        assert!(matches!(kg, KgError::Config(ConfigError::UnknownRule { .. })));
    }

    #[test]
    fn dangling_reference_names_the_missing_node() {
        let err = GraphError::DanglingReference {
            edge_id: "a-knows-b".into(),
            missing: "b".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("a-knows-b"));
        assert!(msg.contains("missing node b"));
    }
}
