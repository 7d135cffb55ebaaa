//! Messages exchanged between a [`ForceLayout`](super::ForceLayout) and its simulation worker.
//!
//! The caller sends [`Command`]s on one channel and receives [`EngineEvent`]s on another. Both
//! derive serde with a `type` tag so their JSON form is `{"type": "kick", "payload": {...}}` and
//! `{"type": "positionsUpdate", "positions": [...], "energy": ...}`.

use crate::config::ForceSettings;
use serde::{Deserialize, Serialize};
use trellis_graph::{Edge, EdgeConstraint, Node, Vec3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f64,
    pub is_fixed: bool,
    pub is_pinned: bool,
    pub radius: f64,
    pub cluster: Option<String>,
}

impl From<&Node> for NodeSnapshot {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            position: node.position,
            velocity: Vec3::zeros(),
            mass: node.effective_mass(),
            is_fixed: false,
            is_pinned: node.is_pinned,
            radius: node.bounding_sphere_radius(),
            cluster: node.data.cluster_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    pub id: String,
    pub source: String,
    pub target: String,
    pub constraint: EdgeConstraint,
    pub ideal_length: f64,
    pub stiffness: f64,
}

impl EdgeSnapshot {
    /// Resolves the edge's spring parameters against the per-type defaults. Rigid and weld edges
    /// never end up softer than their type default.
    pub fn from_edge(edge: &Edge, settings: &ForceSettings) -> Self {
        let constraint = edge.data.constraint.unwrap_or_default();
        let defaults = settings.spring_defaults(constraint);
        let ideal_length = edge
            .data
            .ideal_length
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(defaults.ideal_length);
        let requested = edge
            .data
            .stiffness
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(defaults.stiffness);
        let stiffness = match constraint {
            EdgeConstraint::Elastic => requested,
            EdgeConstraint::Rigid | EdgeConstraint::Weld => requested.max(defaults.stiffness),
        };
        Self {
            id: edge.id.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            constraint,
            ideal_length,
            stiffness: stiffness.min(1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Command {
    Init {
        nodes: Vec<NodeSnapshot>,
        edges: Vec<EdgeSnapshot>,
        settings: ForceSettings,
    },
    Start,
    Stop,
    Kick {
        intensity: f64,
    },
    AddNode(NodeSnapshot),
    RemoveNode {
        id: String,
    },
    AddEdge(EdgeSnapshot),
    RemoveEdge {
        id: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateNodeState {
        id: String,
        is_fixed: bool,
        is_pinned: bool,
        position: Option<Vec3>,
    },
    UpdateSettings(ForceSettings),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PositionEntry {
    pub fn new(id: impl Into<String>, p: &Vec3) -> Self {
        Self {
            id: id.into(),
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    PositionsUpdate {
        positions: Vec<PositionEntry>,
        energy: f64,
    },
    Stopped {
        energy: f64,
    },
    Error {
        error: String,
    },
}
