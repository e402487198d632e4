//! Temporal validity and confidence decay.
//!
//! Two independent notions of time apply to graph records:
//!
//! - **Validity windows** bound when a fact is applicable. Nodes carry
//!   `valid_from`/`valid_until`, edges an optional [`TemporalWindow`]. Filtering
//!   never mutates anything.
//! - **Confidence decay** lowers belief in nodes that have not been
//!   re-observed: `c(t) = max(floor, c₀ × 0.5^(age_days / half_life_days))`,
//!   where `c₀` is the confidence asserted at `updated_at`.
//!
//! Decay rewrites `confidence` only. Because it always starts from the
//! asserted value, running it twice at the same instant is a no-op.

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::graph::{Edge, KnowledgeGraph, Node, SECS_PER_DAY, Timestamp, now_secs};

// ---------------------------------------------------------------------------
// Validity windows
// ---------------------------------------------------------------------------

/// Interval during which a relation holds. `end = None` means still ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub start: Timestamp,
    #[serde(default)]
    pub end: Option<Timestamp>,
}

impl TemporalWindow {
    pub fn new(start: Timestamp, end: Option<Timestamp>) -> Self {
        Self { start, end }
    }

    /// Open-ended window starting at `start`.
    pub fn starting(start: Timestamp) -> Self {
        Self { start, end: None }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && self.end.is_none_or(|end| at <= end)
    }
}

// ---------------------------------------------------------------------------
// Decay computation
// ---------------------------------------------------------------------------

/// Multiplicative decay after `age_days`: `0.5^(age_days / half_life_days)`.
pub fn decay_factor(age_days: f64, half_life_days: f64) -> f64 {
    0.5_f64.powf(age_days.max(0.0) / half_life_days)
}

/// Confidence of a record asserted at `asserted_at` with `asserted`
/// confidence, as seen at `now`. Clamped to `[floor, 1.0]`.
///
/// A `now` before `asserted_at` counts as zero age.
pub fn decayed_confidence(
    asserted: f32,
    asserted_at: Timestamp,
    now: Timestamp,
    half_life_days: f64,
    floor: f32,
) -> f32 {
    let age_days = now.saturating_sub(asserted_at) as f64 / SECS_PER_DAY as f64;
    let decayed = asserted as f64 * decay_factor(age_days, half_life_days);
    (decayed as f32).max(floor).min(1.0)
}

fn validate_half_life(half_life_days: f64) -> GraphResult<()> {
    if half_life_days.is_finite() && half_life_days > 0.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidHalfLife { half_life_days })
    }
}

/// Outcome of one decay pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayReport {
    /// Nodes examined.
    pub nodes_visited: usize,
    /// Nodes whose confidence moved.
    pub nodes_changed: usize,
    /// Reference time the ages were measured against.
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// Graph operations
// ---------------------------------------------------------------------------

impl KnowledgeGraph {
    /// Nodes whose validity window contains `at`. Nodes without a window are
    /// always included.
    pub fn get_valid_nodes(&self, at: Timestamp) -> Vec<Node> {
        self.nodes().filter(|n| n.is_valid_at(at)).cloned().collect()
    }

    /// Edges whose temporal window contains `at`. Edges without a window are
    /// always included.
    pub fn get_valid_edges(&self, at: Timestamp) -> Vec<Edge> {
        self.edges().filter(|e| e.is_valid_at(at)).cloned().collect()
    }

    /// Nodes believed at least `min_confidence`.
    pub fn get_confident_nodes(&self, min_confidence: f32) -> Vec<Node> {
        self.nodes()
            .filter(|n| n.confidence >= min_confidence)
            .cloned()
            .collect()
    }

    /// Decay every node's confidence as of now.
    pub fn apply_confidence_decay(&mut self, half_life_days: f64) -> GraphResult<DecayReport> {
        self.apply_confidence_decay_at(half_life_days, now_secs())
    }

    /// Decay every node's confidence as of `now`.
    ///
    /// Rejects a non-positive or non-finite half-life without touching any node.
    pub fn apply_confidence_decay_at(
        &mut self,
        half_life_days: f64,
        now: Timestamp,
    ) -> GraphResult<DecayReport> {
        validate_half_life(half_life_days)?;
        let floor = self.settings().confidence_floor;

        let mut report = DecayReport {
            nodes_visited: 0,
            nodes_changed: 0,
            at: now,
        };
        for node in self.nodes_mut() {
            let decayed = decayed_confidence(
                node.asserted_confidence,
                node.updated_at,
                now,
                half_life_days,
                floor,
            );
            report.nodes_visited += 1;
            if (decayed - node.confidence).abs() > f32::EPSILON {
                node.confidence = decayed;
                report.nodes_changed += 1;
            }
        }

        tracing::info!(
            visited = report.nodes_visited,
            changed = report.nodes_changed,
            half_life_days,
            "applied confidence decay"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeOptions, Properties};

    const DAY: u64 = SECS_PER_DAY;

    #[test]
    fn factor_halves_at_half_life() {
        assert!((decay_factor(30.0, 30.0) - 0.5).abs() < 1e-12);
        assert!((decay_factor(60.0, 30.0) - 0.25).abs() < 1e-12);
        assert!((decay_factor(0.0, 30.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decayed_confidence_respects_floor() {
        let conf = decayed_confidence(0.9, 0, 3650 * DAY, 30.0, 0.1);
        assert!((conf - 0.1).abs() < f32::EPSILON, "conf = {conf}");
    }

    #[test]
    fn no_decay_when_now_precedes_assertion() {
        let conf = decayed_confidence(0.7, 1_000, 500, 30.0, 0.1);
        assert!((conf - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn window_contains_is_inclusive() {
        let w = TemporalWindow::new(5 * DAY, Some(10 * DAY));
        assert!(w.contains(5 * DAY));
        assert!(w.contains(10 * DAY));
        assert!(!w.contains(4 * DAY));
        assert!(!w.contains(11 * DAY));
        assert!(TemporalWindow::starting(DAY).contains(u64::MAX));
    }

    #[test]
    fn decay_is_idempotent_at_the_same_instant() {
        let mut kg = KnowledgeGraph::new();
        kg.add_node(
            "fact",
            "Concept",
            "fact",
            Properties::new(),
            NodeOptions::default().with_confidence(0.8).at(0),
        );

        kg.apply_confidence_decay_at(30.0, 30 * DAY).unwrap();
        let once = kg.get_node("fact").unwrap().confidence;
        let report = kg.apply_confidence_decay_at(30.0, 30 * DAY).unwrap();
        let twice = kg.get_node("fact").unwrap().confidence;

        assert!((once - 0.4).abs() < 1e-6, "once = {once}");
        assert!((once - twice).abs() < f32::EPSILON);
        assert_eq!(report.nodes_changed, 0);
        assert_eq!(kg.get_node("fact").unwrap().updated_at, 0);
    }

    #[test]
    fn invalid_half_life_is_rejected() {
        let mut kg = KnowledgeGraph::new();
        kg.add_node("a", "Concept", "a", Properties::new(), NodeOptions::default().at(0));
        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(kg.apply_confidence_decay_at(bad, 90 * DAY).is_err());
        }
        assert!((kg.get_node("a").unwrap().confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn confident_nodes_threshold() {
        let mut kg = KnowledgeGraph::new();
        kg.add_node(
            "hi",
            "Concept",
            "hi",
            Properties::new(),
            NodeOptions::default().with_confidence(0.9),
        );
        kg.add_node(
            "lo",
            "Concept",
            "lo",
            Properties::new(),
            NodeOptions::default().with_confidence(0.2),
        );
        let ids: Vec<String> = kg.get_confident_nodes(0.5).into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["hi".to_string()]);
    }
}
