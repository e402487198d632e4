//! Thread-safe handle to an [`Engine`].
//!
//! Readers (queries, stats, temporal filters) run concurrently; ingestion,
//! inference and decay take the write lock and are serialized. A pass never
//! observes a half-applied mutation from another thread.

use std::sync::{Arc, RwLock};

use crate::engine::Engine;

/// Cloneable, shareable engine handle.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Engine) -> R) -> R {
        let engine = self.inner.read().expect("engine lock poisoned");
        f(&engine)
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.inner.write().expect("engine lock poisoned");
        f(&mut engine)
    }
}

impl From<Engine> for SharedEngine {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::graph::{EdgeOptions, NodeOptions, Properties};

    #[test]
    fn concurrent_writers_are_serialized() {
        let shared = SharedEngine::new(Engine::new(EngineConfig::default()).unwrap());
        shared.write(|e| {
            e.add_node("hub", "Concept", "Hub", Properties::new(), NodeOptions::default());
        });

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    shared.write(|e| {
                        let id = format!("n{i}");
                        e.add_node(
                            id.as_str(),
                            "Concept",
                            id.as_str(),
                            Properties::new(),
                            NodeOptions::default(),
                        );
                        let options = EdgeOptions::default();
                        e.add_edge(id, "hub", "related_to", Properties::new(), options).is_some()
                    })
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let stats = shared.read(|e| e.get_stats());
        assert_eq!(stats.node_count, 9);
        assert_eq!(stats.edge_count, 8);
    }

    #[test]
    fn inference_under_write_lock() {
        let shared: SharedEngine = Engine::new(EngineConfig::default()).unwrap().into();
        shared.write(|e| {
            for id in ["a", "b", "c"] {
                e.add_node(id, "Event", id, Properties::new(), NodeOptions::default());
            }
            e.add_edge("a", "b", "precedes", Properties::new(), EdgeOptions::default());
            e.add_edge("b", "c", "precedes", Properties::new(), EdgeOptions::default());
        });
        let report = shared.write(|e| e.run_inference());
        assert_eq!(report.inferred_edges, 1);
        assert!(shared.read(|e| e.get_edge("a-precedes-c").is_some()));
    }
}
