//! Timed interpolation of node positions between two layouts.

use crate::geom::{Easing, lerp};
use indexmap::IndexMap;
use std::time::Duration;
use trellis_graph::{Graph, Vec3};

/// Moves every node from its `from` position to its `to` position over `duration`.
///
/// Nodes missing from either snapshot, and pinned nodes, are left alone.
#[derive(Debug, Clone)]
pub struct Transition {
    from: IndexMap<String, Vec3>,
    to: IndexMap<String, Vec3>,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl Transition {
    pub fn new(
        from: IndexMap<String, Vec3>,
        to: IndexMap<String, Vec3>,
        duration: Duration,
        easing: Easing,
    ) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
            easing,
        }
    }

    /// Captures the graph's current positions as the start, runs `place` to compute targets,
    /// then puts the start positions back so the transition can animate toward the targets.
    pub fn capture<E>(
        graph: &mut Graph,
        duration: Duration,
        easing: Easing,
        place: impl FnOnce(&mut Graph) -> Result<(), E>,
    ) -> Result<Self, E> {
        let from = graph.positions();
        let placed = place(graph);
        let to = graph.positions();
        graph.restore_positions(&from);
        placed.map(|()| Self::new(from, to, duration, easing))
    }

    /// True when no node actually moves.
    pub fn is_still(&self) -> bool {
        self.to
            .iter()
            .all(|(id, p)| self.from.get(id).is_none_or(|q| q == p))
    }

    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn targets(&self) -> &IndexMap<String, Vec3> {
        &self.to
    }

    fn write(&self, graph: &mut Graph) {
        let t = self.easing.apply(self.progress());
        for (id, target) in &self.to {
            let Some(start) = self.from.get(id) else {
                continue;
            };
            if let Some(node) = graph.node_mut(id) {
                if !node.is_pinned {
                    node.position = if t >= 1.0 { *target } else { lerp(start, target, t) };
                }
            }
        }
    }

    /// Advances by `dt` and writes interpolated positions. Returns `true` once the targets have
    /// been written exactly.
    pub fn advance(&mut self, graph: &mut Graph, dt: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.write(graph);
        self.is_finished()
    }

    /// Jumps straight to the targets.
    pub fn finish(&mut self, graph: &mut Graph) {
        self.elapsed = self.duration;
        self.write(graph);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_graph::Node;

    fn snapshot(x: f64) -> IndexMap<String, Vec3> {
        IndexMap::from([("a".to_string(), Vec3::new(x, 0.0, 0.0))])
    }

    #[test]
    fn linear_transition_reaches_targets_exactly() {
        let mut g = Graph::new();
        g.add_node(Node::new("a"));
        let mut t = Transition::new(
            snapshot(0.0),
            snapshot(100.0),
            Duration::from_millis(100),
            Easing::Linear,
        );
        assert!(!t.advance(&mut g, Duration::from_millis(25)));
        assert!((g.position("a").unwrap().x - 25.0).abs() < 1e-9);
        assert!(t.advance(&mut g, Duration::from_millis(200)));
        assert_eq!(g.position("a"), Some(Vec3::new(100.0, 0.0, 0.0)));
    }

    #[test]
    fn capture_restores_the_start_positions() {
        let mut g = Graph::new();
        g.add_node(Node::at("a", 5.0, 0.0, 0.0));
        let t = Transition::capture(&mut g, Duration::ZERO, Easing::EaseInOut, |g| {
            g.set_position("a", Vec3::new(50.0, 0.0, 0.0));
            Ok::<(), ()>(())
        })
        .unwrap();
        assert_eq!(g.position("a"), Some(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(t.targets()["a"], Vec3::new(50.0, 0.0, 0.0));
        assert!(t.is_finished());
        assert!(!t.is_still());
    }
}
