#![forbid(unsafe_code)]

//! Headless 3D graph layout.
//!
//! Strategies place the nodes of a [`Graph`]: one-shot geometric placements, a force simulation
//! on a background thread, an iterative constraint solver, recursive container layouts and an
//! adaptive selector that morphs between strategies as the graph's shape changes. The
//! [`HybridComposer`] combines them; the [`ConnectionRouter`] draws obstacle-aware paths between
//! regions.
//!
//! Everything except the force simulation runs on the caller's thread inside
//! `update(graph, dt)`, which hosts call once per frame.

pub mod adaptive;
pub mod config;
pub mod constraint;
pub mod error;
pub mod geom;
pub mod hybrid;
pub mod layouts;
pub mod nested;
pub mod orchestrator;
pub mod router;
pub mod sim;
pub mod strategy;
pub mod transition;

pub use adaptive::{AdaptationRule, AdaptiveSelector, GraphMetrics, RuleCondition, RuleSet};
pub use config::LayoutConfig;
pub use constraint::{BoundaryShape, Constraint, ConstraintSolver, SolveReport};
pub use error::{Error, Result};
pub use geom::{Bounds, Easing};
pub use hybrid::{HybridComposer, HybridMode};
pub use nested::NestedLayoutComposer;
pub use orchestrator::LayoutOrchestrator;
pub use router::{ConnectionRouter, ConnectionType, Route};
pub use sim::{ForceLayout, InlineForceLayout, SimulationEngine};
pub use strategy::{LayoutStrategy, StrategyKind, create_inline_strategy, create_strategy};
pub use transition::Transition;

pub use trellis_graph::{Edge, EdgeConstraint, Graph, GraphEvent, Node, Vec3};
