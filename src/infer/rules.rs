//! Inference rules.
//!
//! A rule is a unit with a `condition` evaluated per node and an `infer`
//! step that proposes candidate nodes and edges. Rules only read the graph;
//! the engine inserts what they propose.
//!
//! The built-in rules are variants of [`BuiltinRule`]. Anything else that
//! implements [`Rule`] can be registered alongside them.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::graph::{
    Edge, EdgeInput, EdgeOptions, KnowledgeGraph, Node, NodeInput, NodeOptions, Properties,
};
use crate::ontology::OntologyIndex;
use crate::provenance::{EdgeProvenance, NodeProvenance};

/// Relation label for class membership and subsumption.
pub const IS_A: &str = "is_a";
/// Relation label for temporal ordering.
pub const PRECEDES: &str = "precedes";
/// Relation label for causal links.
pub const CAUSES: &str = "causes";

/// Node type given to class nodes derived from the ontology.
pub const CLASS_NODE_TYPE: &str = "OntologyClass";

/// Read-only view a rule evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct InferenceContext<'a> {
    pub graph: &'a KnowledgeGraph,
    pub ontology: &'a OntologyIndex,
}

/// Candidates proposed by one rule for one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Derivation {
    pub nodes: Vec<NodeInput>,
    pub edges: Vec<EdgeInput>,
}

impl Derivation {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// A forward-chaining inference rule.
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Stable name, recorded as evidence on what the rule derives.
    fn name(&self) -> &str;

    /// Whether the rule applies to `node`.
    fn condition(&self, ctx: &InferenceContext<'_>, node: &Node) -> bool;

    /// Candidates to insert for `node`. Only called when `condition` holds.
    fn infer(&self, ctx: &InferenceContext<'_>, node: &Node) -> Derivation;
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

/// The rules shipped with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinRule {
    /// `A is_a B ∧ B is_a C ⇒ A is_a C`
    TransitiveIsA,
    /// `A precedes B ∧ B precedes C ⇒ A precedes C`
    TransitivePrecedes,
    /// `A causes B ∧ B causes C ⇒ A causes C`
    TransitiveCauses,
    /// For each ontology parent P of the node's class: a `class:P` node and
    /// `node is_a class:P`.
    OntologyInheritance,
}

impl BuiltinRule {
    pub const ALL: [BuiltinRule; 4] = [
        Self::TransitiveIsA,
        Self::TransitivePrecedes,
        Self::TransitiveCauses,
        Self::OntologyInheritance,
    ];

    /// Rules registered when nothing else is configured.
    pub fn defaults() -> Vec<Self> {
        vec![Self::TransitiveIsA, Self::TransitivePrecedes]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransitiveIsA => "transitive-is-a",
            Self::TransitivePrecedes => "transitive-precedes",
            Self::TransitiveCauses => "transitive-causes",
            Self::OntologyInheritance => "ontology-inheritance",
        }
    }

    /// Parse a rule name. Case, `-` and `_` are ignored.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "transitiveisa" | "isa" => Some(Self::TransitiveIsA),
            "transitiveprecedes" | "precedes" => Some(Self::TransitivePrecedes),
            "transitivecauses" | "causalchain" | "causes" => Some(Self::TransitiveCauses),
            "ontologyinheritance" | "ontology" => Some(Self::OntologyInheritance),
            _ => None,
        }
    }

    /// Chained relation and the factor applied to derived confidence.
    fn chain(self) -> Option<(&'static str, f32)> {
        match self {
            Self::TransitiveIsA => Some((IS_A, 0.95)),
            Self::TransitivePrecedes => Some((PRECEDES, 0.90)),
            Self::TransitiveCauses => Some((CAUSES, 0.85)),
            Self::OntologyInheritance => None,
        }
    }
}

impl std::fmt::Display for BuiltinRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Rule for BuiltinRule {
    fn name(&self) -> &str {
        self.as_str()
    }

    fn condition(&self, ctx: &InferenceContext<'_>, node: &Node) -> bool {
        match self.chain() {
            Some((relation, _)) => ctx
                .graph
                .get_parents(&node.id, relation)
                .iter()
                .any(|parent| !ctx.graph.get_parents(&parent.id, relation).is_empty()),
            None => !ctx.ontology.parents_of(node.class()).is_empty(),
        }
    }

    fn infer(&self, ctx: &InferenceContext<'_>, node: &Node) -> Derivation {
        match self.chain() {
            Some((relation, factor)) => Derivation {
                nodes: Vec::new(),
                edges: chain_edges(ctx.graph, node, relation, factor, self.as_str()),
            },
            None => inherit_classes(ctx.ontology, node, self.as_str()),
        }
    }
}

/// Two-hop chains `node → mid → far` over `relation`, one candidate per
/// distinct `far`. Self-loops are never proposed.
fn chain_edges(
    graph: &KnowledgeGraph,
    node: &Node,
    relation: &str,
    factor: f32,
    rule_name: &str,
) -> Vec<EdgeInput> {
    let mut by_target: BTreeMap<&str, (&Edge, &Edge)> = BTreeMap::new();

    for first in graph.get_edges_from(&node.id) {
        if first.relation != relation {
            continue;
        }
        for second in graph.get_edges_from(&first.target) {
            if second.relation != relation || second.target == node.id {
                continue;
            }
            by_target.entry(second.target.as_str()).or_insert((first, second));
        }
    }

    by_target
        .into_iter()
        .map(|(far, (first, second))| {
            let confidence = factor * (first.confidence + second.confidence) / 2.0;
            let mut properties = Properties::new();
            properties.insert("rule".into(), Value::from(rule_name));
            properties.insert("via".into(), Value::from(first.target.as_str()));

            EdgeInput::new(node.id.as_str(), far, relation)
                .with_properties(properties)
                .with_options(
                    EdgeOptions::default()
                        .with_confidence(confidence)
                        .with_provenance(EdgeProvenance::inferred()),
                )
        })
        .collect()
}

fn inherit_classes(ontology: &OntologyIndex, node: &Node, rule_name: &str) -> Derivation {
    let mut derivation = Derivation::default();

    for parent in ontology.parents_of(node.class()) {
        let class_id = format!("class:{parent}");
        if class_id == node.id {
            continue;
        }

        derivation.nodes.push(
            NodeInput::new(class_id.as_str(), CLASS_NODE_TYPE, parent).with_options(
                NodeOptions::default()
                    .with_class(parent)
                    .with_provenance(NodeProvenance::inferred(rule_name)),
            ),
        );

        let mut properties = Properties::new();
        properties.insert("rule".into(), Value::from(rule_name));
        derivation.edges.push(
            EdgeInput::new(node.id.as_str(), class_id, IS_A)
                .with_properties(properties)
                .with_options(
                    EdgeOptions::default()
                        .with_confidence(node.confidence)
                        .with_provenance(EdgeProvenance::inferred()),
                ),
        );
    }

    derivation
}
