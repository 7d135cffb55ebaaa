//! Mode selection across the layout sub-systems.
//!
//! A [`HybridComposer`] runs the orchestrator, the constraint solver, the nested composer and
//! the adaptive selector alone or together. Within one frame the enabled systems write positions
//! in a fixed order: adaptive, nested, constraint, standard.

use crate::adaptive::{AdaptiveSelector, GraphMetrics};
use crate::config::LayoutConfig;
use crate::constraint::ConstraintSolver;
use crate::error::{Error, Result};
use crate::nested::NestedLayoutComposer;
use crate::orchestrator::LayoutOrchestrator;
use crate::strategy::{StrategyKind, create_inline_strategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use trellis_graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HybridMode {
    #[default]
    Standard,
    Constraint,
    Nested,
    Adaptive,
    Hybrid,
}

impl HybridMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HybridMode::Standard => "standard",
            HybridMode::Constraint => "constraint",
            HybridMode::Nested => "nested",
            HybridMode::Adaptive => "adaptive",
            HybridMode::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for HybridMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HybridMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "constraint" | "constraints" => Ok(Self::Constraint),
            "nested" => Ok(Self::Nested),
            "adaptive" => Ok(Self::Adaptive),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(Error::UnknownMode {
                name: s.to_string(),
            }),
        }
    }
}

/// Which sub-systems take part in a mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Systems {
    pub adaptive: bool,
    pub nested: bool,
    pub constraint: bool,
    pub standard: bool,
}

impl Systems {
    /// In hybrid mode the orchestrator only runs when adaptive selection is off, so a single
    /// strategy owns the top-level positions.
    pub fn for_mode(mode: HybridMode, config: &LayoutConfig) -> Self {
        let flags = &config.hybrid;
        match mode {
            HybridMode::Standard => Self {
                standard: true,
                ..Self::default()
            },
            HybridMode::Constraint => Self {
                constraint: true,
                ..Self::default()
            },
            HybridMode::Nested => Self {
                nested: true,
                ..Self::default()
            },
            HybridMode::Adaptive => Self {
                adaptive: true,
                ..Self::default()
            },
            HybridMode::Hybrid => Self {
                adaptive: flags.enable_adaptive,
                nested: flags.enable_nested,
                constraint: flags.enable_constraints,
                standard: !flags.enable_adaptive,
            },
        }
    }
}

/// Averages density, average degree over ten and node count over a hundred (capped at one).
pub fn complexity(metrics: &GraphMetrics) -> f64 {
    let size = (metrics.node_count as f64 / 100.0).min(1.0);
    (metrics.density + metrics.average_degree / 10.0 + size) / 3.0
}

fn has_containers(graph: &Graph) -> bool {
    graph
        .nodes()
        .any(|n| n.data.is_container || n.data.parent_container.is_some())
        || graph.edges().any(|e| e.data.contains)
}

fn has_constraint_params(graph: &Graph) -> bool {
    graph.edges().any(|e| e.data.has_constraint_params())
}

/// Picks a mode from what the graph carries and how complex it is.
pub fn select_mode(graph: &Graph, config: &LayoutConfig) -> HybridMode {
    let flags = &config.hybrid;
    let containers = flags.enable_nested && has_containers(graph);
    let constraints = flags.enable_constraints && has_constraint_params(graph);
    let score = complexity(&GraphMetrics::compute(graph));
    debug!(score, containers, constraints, "selecting layout mode");

    if score > flags.complexity_threshold {
        if containers || constraints {
            return HybridMode::Hybrid;
        }
        if flags.enable_adaptive {
            return HybridMode::Adaptive;
        }
        return HybridMode::Standard;
    }
    if containers {
        HybridMode::Nested
    } else if constraints {
        HybridMode::Constraint
    } else {
        HybridMode::Standard
    }
}

#[derive(Debug)]
pub struct HybridComposer {
    config: LayoutConfig,
    mode: Option<HybridMode>,
    systems: Systems,
    orchestrator: LayoutOrchestrator,
    solver: ConstraintSolver,
    nested: NestedLayoutComposer,
    adaptive: AdaptiveSelector,
    nested_dirty: bool,
}

impl HybridComposer {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            solver: ConstraintSolver::new(config.solver.clone()),
            adaptive: AdaptiveSelector::new(config.clone()),
            config,
            mode: None,
            systems: Systems::default(),
            orchestrator: LayoutOrchestrator::new(),
            nested: NestedLayoutComposer::new(),
            nested_dirty: false,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn mode(&self) -> Option<HybridMode> {
        self.mode
    }

    pub fn systems(&self) -> Systems {
        self.systems
    }

    pub fn orchestrator(&self) -> &LayoutOrchestrator {
        &self.orchestrator
    }

    pub fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut ConstraintSolver {
        &mut self.solver
    }

    pub fn adaptive(&self) -> &AdaptiveSelector {
        &self.adaptive
    }

    fn default_kind(&self) -> StrategyKind {
        match self.config.hybrid.default_layout.parse() {
            Ok(kind) => kind,
            Err(err) => {
                warn!(error = %err, "falling back to force for the standard path");
                StrategyKind::Force
            }
        }
    }

    /// Lays the graph out under `mode`, or under an automatically chosen mode when `None`.
    pub fn layout(&mut self, graph: &mut Graph, mode: Option<HybridMode>) -> Result<HybridMode> {
        let mode = match mode {
            Some(mode) => mode,
            None if self.config.hybrid.auto_mode_selection => select_mode(graph, &self.config),
            None => HybridMode::Standard,
        };
        self.shutdown();
        let systems = Systems::for_mode(mode, &self.config);
        info!(%mode, ?systems, "layout mode selected");
        self.mode = Some(mode);
        self.systems = systems;

        if systems.adaptive {
            self.adaptive.evaluate_now(graph)?;
        }
        if systems.standard {
            let kind = self.default_kind();
            self.orchestrator.apply(graph, kind, &self.config)?;
        }
        if systems.nested {
            if !systems.adaptive && !systems.standard {
                let mut top = create_inline_strategy(self.default_kind());
                top.init(graph, &self.config)?;
                top.dispose();
            }
            self.nested.layout(graph, &self.config)?;
        }
        if systems.constraint {
            self.solver.layout(graph, &self.config.solver);
        }
        Ok(mode)
    }

    /// One frame for every enabled system, in priority order.
    pub fn update(&mut self, graph: &mut Graph, dt: Duration) {
        let systems = self.systems;
        if systems.adaptive {
            self.adaptive.update(graph, dt);
        }
        if systems.nested && self.nested_dirty {
            self.nested_dirty = false;
            if let Err(err) = self.nested.layout(graph, &self.config) {
                warn!(error = %err, "nested layout failed");
            }
        }
        if systems.constraint {
            self.solver.sync(graph);
            self.solver.pass();
            self.solver.apply(graph);
        }
        if systems.standard {
            self.orchestrator.update(graph, dt);
        }
    }

    pub fn add_node(&mut self, graph: &Graph, id: &str) {
        let systems = self.systems;
        if systems.adaptive {
            self.adaptive.add_node(graph, id);
        }
        if systems.nested {
            self.nested_dirty = true;
        }
        if systems.constraint {
            if let Some(node) = graph.node(id) {
                self.solver.add_node(node);
            }
        }
        if systems.standard {
            self.orchestrator.add_node(graph, id);
        }
    }

    pub fn remove_node(&mut self, id: &str) {
        let systems = self.systems;
        if systems.adaptive {
            self.adaptive.remove_node(id);
        }
        if systems.nested {
            self.nested.remove_node(id);
            self.nested_dirty = true;
        }
        if systems.constraint {
            self.solver.remove_node(id);
        }
        if systems.standard {
            self.orchestrator.remove_node(id);
        }
    }

    pub fn add_edge(&mut self, graph: &Graph, id: &str) {
        let systems = self.systems;
        if systems.adaptive {
            self.adaptive.add_edge(graph, id);
        }
        if systems.nested {
            self.nested_dirty = true;
        }
        if systems.constraint {
            self.solver.add_edge(graph, id);
        }
        if systems.standard {
            self.orchestrator.add_edge(graph, id);
        }
    }

    pub fn remove_edge(&mut self, id: &str) {
        let systems = self.systems;
        if systems.adaptive {
            self.adaptive.remove_edge(id);
        }
        if systems.nested {
            self.nested_dirty = true;
        }
        if systems.constraint {
            self.solver.remove_edge(id);
        }
        if systems.standard {
            self.orchestrator.remove_edge(id);
        }
    }

    pub fn kick(&mut self, intensity: f64) {
        self.adaptive.kick(intensity);
        self.orchestrator.kick(intensity);
    }

    pub fn stop(&mut self) {
        self.adaptive.stop();
        self.orchestrator.stop();
    }

    fn shutdown(&mut self) {
        self.adaptive.dispose();
        self.orchestrator.dispose();
        self.nested.dispose();
        self.nested_dirty = false;
    }

    pub fn dispose(&mut self) {
        self.shutdown();
        self.mode = None;
        self.systems = Systems::default();
    }
}
