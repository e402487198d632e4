//! Single-pass forward-chaining inference.
//!
//! Every node that exists when the pass starts is visited once, against every
//! registered rule in registration order. Candidates are inserted as soon as a
//! rule fires, so later nodes in the same pass can see them.
//!
//! A candidate whose node id or edge triple already exists is dropped, not
//! merged. Re-deriving a known fact is not a new observation: it must not bump
//! edge weight, stamp `rule`/`via` onto a direct edge, or refresh a node's
//! `updated_at` and keep it from decaying.
//!
//! One call does not reach a fixed point: a chain longer than two hops can
//! need several calls to propagate fully. Callers control propagation depth
//! by deciding how often to call [`InferenceEngine::run`].

use std::collections::BTreeMap;

use crate::graph::{KnowledgeGraph, Upsert};
use crate::ontology::OntologyIndex;

use super::rules::{BuiltinRule, InferenceContext, Rule};

/// Counts of genuinely new records produced by one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceReport {
    pub inferred_nodes: u32,
    pub inferred_edges: u32,
    /// New records per rule name.
    pub rule_stats: BTreeMap<String, u32>,
}

impl InferenceReport {
    /// Whether the pass derived nothing new.
    pub fn is_empty(&self) -> bool {
        self.inferred_nodes == 0 && self.inferred_edges == 0
    }
}

/// Ordered list of rules and the pass that applies them.
#[derive(Debug, Default)]
pub struct InferenceEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl InferenceEngine {
    /// Engine with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the default built-in rules (transitive `is_a`, transitive `precedes`).
    pub fn with_default_rules() -> Self {
        Self::from_builtins(BuiltinRule::defaults())
    }

    pub fn from_builtins(rules: impl IntoIterator<Item = BuiltinRule>) -> Self {
        let mut engine = Self::new();
        for rule in rules {
            engine.register_rule(Box::new(rule));
        }
        engine
    }

    /// Append a rule. It runs after every rule registered before it.
    pub fn register_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.register_rule(rule);
        self
    }

    /// Registered rule names, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run one inference pass over `graph`.
    pub fn run(&self, graph: &mut KnowledgeGraph, ontology: &OntologyIndex) -> InferenceReport {
        let mut report = InferenceReport::default();
        let node_count = graph.node_count();

        for position in 0..node_count {
            for rule in &self.rules {
                let derivation = {
                    let ctx = InferenceContext {
                        graph: &*graph,
                        ontology,
                    };
                    let Some(node) = graph.node_at(position) else {
                        continue;
                    };
                    if !rule.condition(&ctx, node) {
                        continue;
                    }
                    rule.infer(&ctx, node)
                };

                let mut created = 0;
                for candidate in derivation.nodes {
                    if graph.has_node(&candidate.id) {
                        continue;
                    }
                    if let (Upsert::Created, _) = graph.insert_node(candidate) {
                        report.inferred_nodes += 1;
                        created += 1;
                    }
                }
                for candidate in derivation.edges {
                    if graph.has_edge(&candidate.source, &candidate.relation, &candidate.target) {
                        continue;
                    }
                    match graph.insert_edge(candidate) {
                        Ok((Upsert::Created, _)) => {
                            report.inferred_edges += 1;
                            created += 1;
                        }
                        Ok((Upsert::Merged, _)) => {}
                        Err(e) => tracing::debug!(rule = rule.name(), "skipped candidate: {e}"),
                    }
                }
                if created > 0 {
                    *report.rule_stats.entry(rule.name().to_string()).or_insert(0) += created;
                }
            }
        }

        tracing::info!(
            nodes_visited = node_count,
            inferred_nodes = report.inferred_nodes,
            inferred_edges = report.inferred_edges,
            "inference pass complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeInput, EdgeOptions, Node, NodeOptions, Properties};
    use crate::infer::rules::{Derivation, IS_A, PRECEDES};

    fn chain(relation: &str, ids: &[&str]) -> KnowledgeGraph {
        let mut kg = KnowledgeGraph::new();
        for id in ids {
            kg.add_node(*id, "Concept", *id, Properties::new(), NodeOptions::default());
        }
        for pair in ids.windows(2) {
            kg.add_edge(pair[0], pair[1], relation, Properties::new(), EdgeOptions::default())
                .unwrap();
        }
        kg
    }

    #[test]
    fn transitive_is_a_in_one_pass() {
        let mut kg = chain(IS_A, &["dog", "mammal", "animal"]);
        let engine = InferenceEngine::with_default_rules();
        let report = engine.run(&mut kg, &OntologyIndex::new());

        assert_eq!(report.inferred_edges, 1);
        assert_eq!(report.inferred_nodes, 0);
        assert_eq!(report.rule_stats.get("transitive-is-a"), Some(&1));
        let derived = kg.find_edge("dog", IS_A, "animal").unwrap();
        assert!(derived.provenance.inferred);
        assert_eq!(derived.provenance.source, "inference");
    }

    #[test]
    fn second_pass_on_unchanged_graph_derives_nothing() {
        let mut kg = chain(PRECEDES, &["a", "b", "c"]);
        let engine = InferenceEngine::with_default_rules();
        engine.run(&mut kg, &OntologyIndex::new());
        let edges_after_first = kg.edge_count();

        let report = engine.run(&mut kg, &OntologyIndex::new());
        assert!(report.is_empty());
        assert_eq!(kg.edge_count(), edges_after_first);
    }

    #[test]
    fn rederiving_leaves_existing_records_untouched() {
        let mut kg = chain(IS_A, &["dog", "mammal", "animal"]);
        kg.add_edge("dog", "animal", IS_A, Properties::new(), EdgeOptions::default().at(10))
            .unwrap();
        kg.add_node("ada", "Person", "Ada", Properties::new(), NodeOptions::default());
        let engine = InferenceEngine::from_builtins([
            BuiltinRule::TransitiveIsA,
            BuiltinRule::OntologyInheritance,
        ]);
        let ontology = OntologyIndex::bundled();

        engine.run(&mut kg, &ontology);
        let direct = kg.find_edge("dog", IS_A, "animal").unwrap().clone();
        let class = kg.get_node("class:Entity").unwrap().clone();
        let class_edge = kg.find_edge("ada", IS_A, "class:Entity").unwrap().clone();

        for _ in 0..5 {
            assert!(engine.run(&mut kg, &ontology).inferred_nodes <= 1);
        }

        let after = kg.find_edge("dog", IS_A, "animal").unwrap();
        assert_eq!(after, &direct);
        assert!(!after.provenance.inferred);
        assert!(!after.properties.contains_key("via"));
        assert!((after.weight - 0.5).abs() < f32::EPSILON);
        assert_eq!(kg.get_node("class:Entity").unwrap(), &class);
        assert_eq!(kg.find_edge("ada", IS_A, "class:Entity").unwrap(), &class_edge);
    }

    #[test]
    fn long_chains_need_several_passes() {
        let mut kg = chain(IS_A, &["a", "b", "c", "d"]);
        let engine = InferenceEngine::with_default_rules();
        let ontology = OntologyIndex::new();

        engine.run(&mut kg, &ontology);
        assert!(kg.find_edge("a", IS_A, "c").is_some());
        assert!(kg.find_edge("b", IS_A, "d").is_some());
        assert!(kg.find_edge("a", IS_A, "d").is_none());

        engine.run(&mut kg, &ontology);
        assert!(kg.find_edge("a", IS_A, "d").is_some());
    }

    #[test]
    fn ontology_rule_counts_new_nodes() {
        let mut kg = KnowledgeGraph::new();
        kg.add_node("ada", "Person", "Ada", Properties::new(), NodeOptions::default());
        let engine = InferenceEngine::from_builtins([BuiltinRule::OntologyInheritance]);
        let ontology = OntologyIndex::bundled();

        let report = engine.run(&mut kg, &ontology);
        assert_eq!(report.inferred_nodes, 1);
        assert_eq!(report.inferred_edges, 1);
        assert!(kg.find_edge("ada", IS_A, "class:Entity").is_some());
        // class:Entity was created during the pass and is not visited until the next one.
        assert!(kg.get_node("class:Thing").is_none());

        let report = engine.run(&mut kg, &ontology);
        assert_eq!(report.inferred_nodes, 1);
        assert!(kg.find_edge("class:Entity", IS_A, "class:Thing").is_some());
    }

    #[derive(Debug)]
    struct LinkToHub;

    impl Rule for LinkToHub {
        fn name(&self) -> &str {
            "link-to-hub"
        }

        fn condition(&self, ctx: &InferenceContext<'_>, node: &Node) -> bool {
            node.id != "hub" && ctx.graph.has_node("hub")
        }

        fn infer(&self, _ctx: &InferenceContext<'_>, node: &Node) -> Derivation {
            Derivation {
                nodes: Vec::new(),
                edges: vec![EdgeInput::new(node.id.as_str(), "hub", "related_to")],
            }
        }
    }

    #[test]
    fn custom_rules_plug_in() {
        let mut kg = chain(IS_A, &["hub", "x", "y"]);
        let engine = InferenceEngine::new().with_rule(Box::new(LinkToHub));
        assert_eq!(engine.rule_names(), vec!["link-to-hub"]);

        let report = engine.run(&mut kg, &OntologyIndex::new());
        assert_eq!(report.inferred_edges, 2);
        assert!(kg.find_edge("y", "related_to", "hub").is_some());
    }
}
