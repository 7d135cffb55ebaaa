use serde::{Deserialize, Serialize};

/// How the force simulation treats an edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeConstraint {
    /// Spring toward `ideal_length` with `stiffness`.
    #[default]
    Elastic,
    /// Hard distance target with a raised stiffness.
    Rigid,
    /// Like rigid, stiffer still.
    Weld,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeData {
    pub constraint: Option<EdgeConstraint>,
    pub ideal_length: Option<f64>,
    pub stiffness: Option<f64>,
    /// Target distance for the constraint solver's distance constraint.
    pub distance: Option<f64>,
    /// Strength for the constraint solver's distance constraint.
    pub strength: Option<f64>,
    /// The edge marks containment: `source` is a container holding `target`.
    pub contains: bool,
}

impl EdgeData {
    /// Whether the edge carries explicit constraint parameters.
    pub fn has_constraint_params(&self) -> bool {
        self.constraint.is_some()
            || self.ideal_length.is_some()
            || self.stiffness.is_some()
            || self.distance.is_some()
            || self.strength.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub data: EdgeData,
}

impl Edge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: EdgeData::default(),
        }
    }

    pub fn elastic(mut self, ideal_length: f64, stiffness: f64) -> Self {
        self.data.constraint = Some(EdgeConstraint::Elastic);
        self.data.ideal_length = Some(ideal_length);
        self.data.stiffness = Some(stiffness);
        self
    }

    pub fn with_constraint(mut self, constraint: EdgeConstraint) -> Self {
        self.data.constraint = Some(constraint);
        self
    }

    pub fn with_distance(mut self, distance: f64, strength: f64) -> Self {
        self.data.distance = Some(distance);
        self.data.strength = Some(strength);
        self
    }

    pub fn containment(mut self) -> Self {
        self.data.contains = true;
        self
    }

    pub fn other(&self, id: &str) -> Option<&str> {
        if self.source == id {
            Some(self.target.as_str())
        } else if self.target == id {
            Some(self.source.as_str())
        } else {
            None
        }
    }
}
