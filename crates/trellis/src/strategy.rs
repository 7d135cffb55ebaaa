//! The contract shared by every layout, simple or complex.

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::layouts::{Circular, Grid, Layered, LayeredStyle, Sphere};
use crate::sim::{ForceLayout, InlineForceLayout};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trellis_graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    Grid,
    Circular,
    Sphere,
    Hierarchical,
    Radial,
    Flow,
    Force,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 7] = [
        StrategyKind::Grid,
        StrategyKind::Circular,
        StrategyKind::Sphere,
        StrategyKind::Hierarchical,
        StrategyKind::Radial,
        StrategyKind::Flow,
        StrategyKind::Force,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Grid => "grid",
            StrategyKind::Circular => "circular",
            StrategyKind::Sphere => "sphere",
            StrategyKind::Hierarchical => "hierarchical",
            StrategyKind::Radial => "radial",
            StrategyKind::Flow => "flow",
            StrategyKind::Force => "force",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "circular" | "circle" => Ok(Self::Circular),
            "sphere" => Ok(Self::Sphere),
            "hierarchical" | "tree" => Ok(Self::Hierarchical),
            "radial" => Ok(Self::Radial),
            "flow" => Ok(Self::Flow),
            "force" => Ok(Self::Force),
            _ => Err(Error::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

/// A pluggable layout algorithm.
///
/// Only `kind` and `init` are required. Static placements compute everything in `init` and keep
/// the no-op defaults for motion and incremental mutation; strategies that support those
/// override the matching methods.
pub trait LayoutStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// Computes positions for the current graph. Static strategies write final positions here;
    /// asynchronous ones hand the graph off and deliver positions through [`update`].
    ///
    /// [`update`]: LayoutStrategy::update
    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()>;

    /// Begins or resumes autonomous motion.
    fn run(&mut self) {}

    fn stop(&mut self) {}

    /// Re-energizes the layout to escape local minima.
    fn kick(&mut self, _intensity: f64) {}

    fn add_node(&mut self, _graph: &Graph, _id: &str) {}

    fn remove_node(&mut self, _id: &str) {}

    fn add_edge(&mut self, _graph: &Graph, _id: &str) {}

    fn remove_edge(&mut self, _id: &str) {}

    /// Applies results that arrived since the last frame.
    fn update(&mut self, _graph: &mut Graph) {}

    fn is_running(&self) -> bool {
        false
    }

    fn dispose(&mut self) {}
}

/// Creates the interactive strategy for `kind`; force layouts run on a background thread.
pub fn create_strategy(kind: StrategyKind) -> Box<dyn LayoutStrategy> {
    match kind {
        StrategyKind::Force => Box::new(ForceLayout::new()),
        other => create_static(other),
    }
}

/// Creates a strategy that finishes all of its work inside `init`.
pub fn create_inline_strategy(kind: StrategyKind) -> Box<dyn LayoutStrategy> {
    match kind {
        StrategyKind::Force => Box::new(InlineForceLayout::new()),
        other => create_static(other),
    }
}

fn create_static(kind: StrategyKind) -> Box<dyn LayoutStrategy> {
    match kind {
        StrategyKind::Grid => Box::new(Grid),
        StrategyKind::Circular => Box::new(Circular),
        StrategyKind::Sphere => Box::new(Sphere),
        StrategyKind::Hierarchical => Box::new(Layered::new(LayeredStyle::Hierarchical)),
        StrategyKind::Radial => Box::new(Layered::new(LayeredStyle::Radial)),
        StrategyKind::Flow => Box::new(Layered::new(LayeredStyle::Flow)),
        StrategyKind::Force => Box::new(InlineForceLayout::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively_with_aliases() {
        assert_eq!("Circle".parse::<StrategyKind>().unwrap(), StrategyKind::Circular);
        assert_eq!("tree".parse::<StrategyKind>().unwrap(), StrategyKind::Hierarchical);
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "spiral".parse::<StrategyKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy { name } if name == "spiral"));
    }

    #[test]
    fn factories_report_the_requested_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(create_inline_strategy(kind).kind(), kind);
        }
    }
}
