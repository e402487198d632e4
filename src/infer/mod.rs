//! Rule-based inference over the knowledge graph.
//!
//! - [`rules`]: the [`Rule`] contract and the built-in rule variants
//! - [`engine`]: the single-pass [`InferenceEngine`]

pub mod engine;
pub mod rules;

pub use engine::{InferenceEngine, InferenceReport};
pub use rules::{BuiltinRule, Derivation, InferenceContext, Rule};
