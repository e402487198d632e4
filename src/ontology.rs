//! Ontology index: class name → immediate parent classes.
//!
//! Reference data for inference rules. The graph never validates nodes
//! against it; a node whose class is unknown simply has no parents here.
//!
//! A default hierarchy is bundled into the binary from `data/ontology.toml`
//! and can be extended at construction time.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use serde::Deserialize;

use crate::error::OntologyError;

const BUNDLED_ONTOLOGY: &str = include_str!("../data/ontology.toml");

#[derive(Debug, Deserialize)]
struct OntologyToml {
    #[serde(default)]
    classes: BTreeMap<String, Vec<String>>,
}

/// Static lookup from class name to its immediate parents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologyIndex {
    parents: BTreeMap<String, BTreeSet<String>>,
}

impl OntologyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled default hierarchy (`Person → {Entity}`, `Agent → {Entity, Actor}`, ...).
    pub fn bundled() -> Self {
        match Self::from_toml_str(BUNDLED_ONTOLOGY) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("failed to parse bundled ontology: {e}");
                Self::new()
            }
        }
    }

    /// Parse a `[classes]` table of `Class = ["Parent", ...]` entries.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, OntologyError> {
        let parsed: OntologyToml = toml::from_str(toml_str).map_err(|e| OntologyError::Parse {
            message: e.to_string(),
        })?;
        let mut index = Self::new();
        index.extend(parsed.classes);
        Ok(index)
    }

    /// Register a class with its immediate parents. Parents accumulate across calls.
    pub fn insert_class<I, S>(&mut self, class: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents
            .entry(class.into())
            .or_default()
            .extend(parents.into_iter().map(Into::into));
    }

    /// Layer additional classes over the index.
    pub fn extend<I>(&mut self, classes: I)
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        for (class, parents) in classes {
            self.insert_class(class, parents);
        }
    }

    /// Immediate parents of a class, in name order. Empty for unknown classes.
    pub fn parents_of(&self, class: &str) -> Vec<&str> {
        self.parents
            .get(class)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All transitive ancestors of a class, nearest first. Cycle-safe.
    pub fn ancestors_of(&self, class: &str) -> Vec<&str> {
        let mut ancestors = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(class);
        queue.push_back(class);
        while let Some(current) = queue.pop_front() {
            for parent in self.parents_of(current) {
                if visited.insert(parent) {
                    ancestors.push(parent);
                    queue.push_back(parent);
                }
            }
        }
        ancestors
    }

    /// Whether `class` sits (transitively) below `ancestor`.
    pub fn is_subclass_of(&self, class: &str, ancestor: &str) -> bool {
        self.ancestors_of(class).contains(&ancestor)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.parents.contains_key(class)
    }

    /// All registered class names.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.parents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
