//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! half_life_days = 14.0
//! confidence_floor = 0.05
//! rules = ["transitive-is-a", "transitive-precedes", "ontology-inheritance"]
//!
//! [ontology]
//! Robot = ["Agent", "Artifact"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::graph::GraphSettings;
use crate::infer::BuiltinRule;

/// Configuration for the [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Half-life used by
    /// [`Engine::apply_default_decay`](crate::engine::Engine::apply_default_decay).
    pub half_life_days: f64,
    /// Lowest confidence decay can push a node to.
    pub confidence_floor: f32,
    /// Weight added to an edge each time it is observed again.
    pub edge_weight_increment: f32,
    /// Weight given to a new edge when none is supplied.
    pub default_edge_weight: f32,
    /// Nodes returned by a retrieval call when the caller gives no limit.
    pub default_max_nodes: usize,
    /// Built-in rules to register, in evaluation order.
    pub rules: Vec<String>,
    /// Extra ontology classes layered over the bundled ontology (class → parents).
    pub ontology: BTreeMap<String, Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_life_days: 30.0,
            confidence_floor: 0.1,
            edge_weight_increment: 0.1,
            default_edge_weight: 0.5,
            default_max_nodes: 10,
            rules: BuiltinRule::defaults()
                .into_iter()
                .map(|r| r.as_str().to_string())
                .collect(),
            ontology: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML. Missing fields take their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), rules = config.rules.len(), "loaded config");
        Ok(config)
    }

    /// Check value ranges and rule names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.half_life_days.is_finite() || self.half_life_days <= 0.0 {
            return Err(ConfigError::Invalid {
                message: format!("half_life_days must be > 0, got {}", self.half_life_days),
            });
        }
        for (name, value) in [
            ("confidence_floor", self.confidence_floor),
            ("edge_weight_increment", self.edge_weight_increment),
            ("default_edge_weight", self.default_edge_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }
        self.rule_set().map(|_| ())
    }

    /// Resolve `rules` to built-in rules, rejecting unknown names.
    pub fn rule_set(&self) -> Result<Vec<BuiltinRule>, ConfigError> {
        self.rules
            .iter()
            .map(|name| {
                BuiltinRule::parse(name).ok_or_else(|| ConfigError::UnknownRule {
                    name: name.clone(),
                })
            })
            .collect()
    }

    /// Store tunables derived from this config.
    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            default_edge_weight: self.default_edge_weight,
            edge_weight_increment: self.edge_weight_increment,
            confidence_floor: self.confidence_floor,
        }
    }
}
