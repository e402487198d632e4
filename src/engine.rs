//! Engine facade: owns the graph, the ontology and the inference rules.
//!
//! This is the surface callers use. Every operation is a thin delegation to
//! the subsystem that implements it, with configuration applied on the way.

use crate::config::EngineConfig;
use crate::error::{GraphError, KgResult};
use crate::graph::analytics::{self, GraphStats};
use crate::graph::{
    Edge, EdgeInput, EdgeOptions, KnowledgeGraph, Node, NodeInput, NodeOptions, Properties,
    Timestamp, Upsert,
};
use crate::infer::{InferenceEngine, InferenceReport, Rule};
use crate::ontology::OntologyIndex;
use crate::retrieval::{QueryContext, RetrievalScorer};
use crate::temporal::DecayReport;

/// The knowledge-graph engine.
pub struct Engine {
    config: EngineConfig,
    graph: KnowledgeGraph,
    ontology: OntologyIndex,
    inference: InferenceEngine,
}

impl Engine {
    /// Create an empty engine with the given configuration.
    ///
    /// The bundled ontology is loaded first; classes from `config.ontology`
    /// are layered over it.
    pub fn new(config: EngineConfig) -> KgResult<Self> {
        config.validate()?;

        let mut ontology = OntologyIndex::bundled();
        ontology.extend(config.ontology.clone());
        let inference = InferenceEngine::from_builtins(config.rule_set()?);
        let graph = KnowledgeGraph::with_settings(config.graph_settings());

        tracing::info!(
            rules = ?inference.rule_names(),
            ontology_classes = ontology.len(),
            half_life_days = config.half_life_days,
            "initializing kgraph engine"
        );

        Ok(Self {
            config,
            graph,
            ontology,
            inference,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the underlying store.
    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn ontology(&self) -> &OntologyIndex {
        &self.ontology
    }

    /// Append a rule after the configured ones.
    pub fn register_rule(&mut self, rule: Box<dyn Rule>) {
        tracing::debug!(rule = rule.name(), "registered inference rule");
        self.inference.register_rule(rule);
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Insert or merge a node. Always succeeds.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        node_type: impl Into<String>,
        label: impl Into<String>,
        properties: Properties,
        options: NodeOptions,
    ) -> Node {
        self.graph.add_node(id, node_type, label, properties, options)
    }

    pub fn insert_node(&mut self, input: NodeInput) -> (Upsert, &Node) {
        self.graph.insert_node(input)
    }

    /// Insert or merge an edge. Returns `None` if an endpoint is missing.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
        properties: Properties,
        options: EdgeOptions,
    ) -> Option<Edge> {
        self.graph.add_edge(source, target, relation, properties, options)
    }

    /// Like [`add_edge`](Self::add_edge), but reports why an edge was rejected.
    pub fn try_add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
        properties: Properties,
        options: EdgeOptions,
    ) -> KgResult<Edge> {
        Ok(self
            .graph
            .try_add_edge(source, target, relation, properties, options)?)
    }

    pub fn insert_edge(&mut self, input: EdgeInput) -> KgResult<(Upsert, &Edge)> {
        Ok(self.graph.insert_edge(input)?)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.graph.get_node(id)
    }

    /// Like [`get_node`](Self::get_node), but a missing id is an error.
    pub fn require_node(&self, id: &str) -> KgResult<&Node> {
        self.graph
            .get_node(id)
            .ok_or_else(|| GraphError::NodeNotFound { id: id.to_string() }.into())
    }

    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.graph.get_edge(id)
    }

    pub fn get_edges_from(&self, id: &str) -> Vec<&Edge> {
        self.graph.get_edges_from(id)
    }

    pub fn get_edges_to(&self, id: &str) -> Vec<&Edge> {
        self.graph.get_edges_to(id)
    }

    /// Targets of `id`'s outgoing `relation` edges.
    pub fn get_parents(&self, id: &str, relation: &str) -> Vec<&Node> {
        self.graph.get_parents(id, relation)
    }

    /// Sources of `id`'s incoming `relation` edges.
    pub fn get_children(&self, id: &str, relation: &str) -> Vec<&Node> {
        self.graph.get_children(id, relation)
    }

    // -----------------------------------------------------------------------
    // Reasoning, time and retrieval
    // -----------------------------------------------------------------------

    /// Run one inference pass with the registered rules.
    pub fn run_inference(&mut self) -> InferenceReport {
        self.inference.run(&mut self.graph, &self.ontology)
    }

    /// Decay node confidences as of now.
    pub fn apply_confidence_decay(&mut self, half_life_days: f64) -> KgResult<DecayReport> {
        Ok(self.graph.apply_confidence_decay(half_life_days)?)
    }

    /// Decay node confidences as of `now`.
    pub fn apply_confidence_decay_at(
        &mut self,
        half_life_days: f64,
        now: Timestamp,
    ) -> KgResult<DecayReport> {
        Ok(self.graph.apply_confidence_decay_at(half_life_days, now)?)
    }

    /// Decay with the configured half-life.
    pub fn apply_default_decay(&mut self) -> KgResult<DecayReport> {
        self.apply_confidence_decay(self.config.half_life_days)
    }

    pub fn get_valid_nodes(&self, at: Timestamp) -> Vec<Node> {
        self.graph.get_valid_nodes(at)
    }

    pub fn get_valid_edges(&self, at: Timestamp) -> Vec<Edge> {
        self.graph.get_valid_edges(at)
    }

    pub fn get_confident_nodes(&self, min_confidence: f32) -> Vec<Node> {
        self.graph.get_confident_nodes(min_confidence)
    }

    /// Build the retrieval context for `query`.
    ///
    /// `max_nodes` falls back to `config.default_max_nodes`.
    pub fn get_context_for_query(&self, query: &str, max_nodes: Option<usize>) -> QueryContext {
        let max_nodes = max_nodes.unwrap_or(self.config.default_max_nodes);
        let context = RetrievalScorer::new(&self.graph).context_for_query(query, max_nodes);
        tracing::debug!(query, matched = context.nodes.len(), "built query context");
        context
    }

    pub fn get_stats(&self) -> GraphStats {
        analytics::graph_stats(&self.graph)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("ontology_classes", &self.ontology.len())
            .field("rules", &self.inference.rule_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, KgError};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn default_engine_has_default_rules() {
        let engine = engine();
        assert_eq!(engine.get_stats().node_count, 0);
        assert!(engine.ontology().contains("Person"));
        assert!(format!("{engine:?}").contains("transitive-is-a"));
    }

    #[test]
    fn bad_rule_name_fails_construction() {
        let config = EngineConfig {
            rules: vec!["mind-reading".into()],
            ..Default::default()
        };
        let err = Engine::new(config).unwrap_err();
        assert!(matches!(err, KgError::Config(ConfigError::UnknownRule { .. })));
    }

    #[test]
    fn config_ontology_extends_bundled() {
        let mut config = EngineConfig::default();
        config.ontology.insert("Robot".into(), vec!["Agent".into()]);
        let engine = Engine::new(config).unwrap();
        assert!(engine.ontology().is_subclass_of("Robot", "Entity"));
    }

    #[test]
    fn require_node_reports_missing_id() {
        let mut engine = engine();
        engine.add_node("a", "Concept", "A", Properties::new(), NodeOptions::default());
        assert!(engine.require_node("a").is_ok());
        assert!(matches!(
            engine.require_node("b"),
            Err(KgError::Graph(GraphError::NodeNotFound { .. }))
        ));
    }

    #[test]
    fn try_add_edge_surfaces_dangling_reference() {
        let mut engine = engine();
        engine.add_node("a", "Concept", "A", Properties::new(), NodeOptions::default());
        let err = engine
            .try_add_edge("a", "ghost", "is_a", Properties::new(), EdgeOptions::default())
            .unwrap_err();
        assert!(matches!(err, KgError::Graph(GraphError::DanglingReference { .. })));
        assert_eq!(engine.get_stats().edge_count, 0);
    }

    #[test]
    fn query_uses_default_max_nodes() {
        let config = EngineConfig {
            default_max_nodes: 2,
            ..Default::default()
        };
        let mut engine = Engine::new(config).unwrap();
        for i in 0..4 {
            engine.add_node(
                format!("n{i}"),
                "Concept",
                "widget",
                Properties::new(),
                NodeOptions::default(),
            );
        }
        assert_eq!(engine.get_context_for_query("widget", None).nodes.len(), 2);
        assert_eq!(engine.get_context_for_query("widget", Some(3)).nodes.len(), 3);
    }
}
