//! Single active strategy with animated switches.

use crate::config::LayoutConfig;
use crate::error::Result;
use crate::strategy::{LayoutStrategy, StrategyKind, create_strategy};
use crate::transition::Transition;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};
use trellis_graph::{Graph, GraphEvent};

/// Holds exactly one active strategy. Switching tweens every node from where it was to where the
/// new strategy placed it, then lets the strategy run.
#[derive(Default)]
pub struct LayoutOrchestrator {
    active: Option<Box<dyn LayoutStrategy>>,
    transition: Option<Transition>,
}

impl fmt::Debug for LayoutOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutOrchestrator")
            .field("active", &self.active_kind())
            .field("transitioning", &self.transition.is_some())
            .finish()
    }
}

impl LayoutOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_kind(&self) -> Option<StrategyKind> {
        self.active.as_ref().map(|s| s.kind())
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Switches to the strategy called `name`.
    ///
    /// An unknown name is logged and rejected; the current strategy keeps running.
    pub fn apply_layout(&mut self, graph: &mut Graph, name: &str, config: &LayoutConfig) -> Result<()> {
        let kind = match name.parse::<StrategyKind>() {
            Ok(kind) => kind,
            Err(err) => {
                warn!(name, "unknown layout strategy; keeping current layout");
                return Err(err);
            }
        };
        self.apply(graph, kind, config)
    }

    pub fn apply(&mut self, graph: &mut Graph, kind: StrategyKind, config: &LayoutConfig) -> Result<()> {
        self.stop_active(graph);

        let mut next = create_strategy(kind);
        let captured = Transition::capture(
            graph,
            config.transition.duration(),
            config.transition.easing,
            |g| next.init(g, config),
        );
        let mut transition = match captured {
            Ok(t) => t,
            Err(err) => {
                warn!(strategy = %kind, error = %err, "layout init failed");
                graph.emit(GraphEvent::LayoutError {
                    error: err.to_string(),
                });
                next.dispose();
                return Err(err);
            }
        };

        info!(strategy = %kind, "layout started");
        graph.emit(GraphEvent::LayoutStarted {
            name: kind.to_string(),
        });
        if transition.is_still() {
            transition.finish(graph);
            next.run();
        } else {
            self.transition = Some(transition);
        }
        self.active = Some(next);
        Ok(())
    }

    fn stop_active(&mut self, graph: &mut Graph) {
        self.transition = None;
        if let Some(mut previous) = self.active.take() {
            previous.stop();
            previous.dispose();
            debug!(strategy = %previous.kind(), "layout stopped");
            graph.emit(GraphEvent::LayoutStopped {
                name: previous.kind().to_string(),
            });
        }
    }

    /// Advances the switch tween, or pulls the active strategy's results once it has landed.
    pub fn update(&mut self, graph: &mut Graph, dt: Duration) {
        if let Some(transition) = self.transition.as_mut() {
            if transition.advance(graph, dt) {
                self.transition = None;
                if let Some(active) = self.active.as_mut() {
                    active.run();
                }
            }
            return;
        }
        if let Some(active) = self.active.as_mut() {
            active.update(graph);
        }
    }

    pub fn run(&mut self) {
        if self.transition.is_none() {
            if let Some(active) = self.active.as_mut() {
                active.run();
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.stop();
        }
    }

    pub fn kick(&mut self, intensity: f64) {
        if let Some(active) = self.active.as_mut() {
            active.kick(intensity);
        }
    }

    pub fn add_node(&mut self, graph: &Graph, id: &str) {
        if let Some(active) = self.active.as_mut() {
            active.add_node(graph, id);
        }
    }

    pub fn remove_node(&mut self, id: &str) {
        if let Some(active) = self.active.as_mut() {
            active.remove_node(id);
        }
    }

    pub fn add_edge(&mut self, graph: &Graph, id: &str) {
        if let Some(active) = self.active.as_mut() {
            active.add_edge(graph, id);
        }
    }

    pub fn remove_edge(&mut self, id: &str) {
        if let Some(active) = self.active.as_mut() {
            active.remove_edge(id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.is_running())
    }

    pub fn dispose(&mut self) {
        self.transition = None;
        if let Some(mut active) = self.active.take() {
            active.dispose();
        }
    }
}
