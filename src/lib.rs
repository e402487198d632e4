// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # kgraph
//!
//! An in-memory knowledge graph with ontology-aware inference, temporal
//! validity and confidence decay, built to assemble compact context for
//! language-model prompts.
//!
//! ## Architecture
//!
//! - **Store** (`graph`): petgraph arena with insert-or-merge nodes and edges
//! - **Ontology** (`ontology`): class hierarchy, bundled and extensible
//! - **Inference** (`infer`): single-pass forward chaining with pluggable rules
//! - **Time** (`temporal`): validity filters and exponential confidence decay
//! - **Retrieval** (`retrieval`): keyword scoring weighted by confidence
//!
//! ## Library usage
//!
//! ```no_run
//! use kgraph::engine::Engine;
//! use kgraph::config::EngineConfig;
//! use kgraph::graph::{EdgeOptions, NodeOptions, Properties};
//!
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! for (id, label) in [("dog", "Dog"), ("mammal", "Mammal"), ("animal", "Animal")] {
//!     engine.add_node(id, "Concept", label, Properties::new(), NodeOptions::default());
//! }
//! engine.add_edge("dog", "mammal", "is_a", Properties::new(), EdgeOptions::default());
//! engine.add_edge("mammal", "animal", "is_a", Properties::new(), EdgeOptions::default());
//! engine.run_inference();
//! println!("{}", engine.get_context_for_query("dog", None));
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod infer;
pub mod ingest;
pub mod ontology;
pub mod provenance;
pub mod retrieval;
pub mod shared;
pub mod temporal;
