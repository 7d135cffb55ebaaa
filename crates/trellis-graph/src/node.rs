use crate::Vec3;
use serde::{Deserialize, Serialize};

/// Free-form layout hints attached to a node by the host application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeData {
    /// Cluster tag used by the force simulation's cluster cohesion.
    pub cluster_id: Option<String>,
    /// Group tag; nodes sharing a group become one cluster constraint.
    pub group: Option<String>,
    /// The node owns a nested sub-layout for its children.
    pub is_container: bool,
    /// Strategy name used for this container's children (e.g. `"grid"`).
    pub child_layout: Option<String>,
    /// Id of the container this node lives in.
    pub parent_container: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub position: Vec3,
    pub mass: f64,
    pub is_pinned: bool,
    /// Bounding sphere radius of the visual.
    pub radius: f64,
    /// Half-size of the visual box. Containers are resized through this field; when unset the
    /// bounding sphere radius is used on every axis.
    pub extent: Option<Vec3>,
    pub data: NodeData,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            id: String::new(),
            position: Vec3::zeros(),
            mass: 1.0,
            is_pinned: false,
            radius: 10.0,
            extent: None,
            data: NodeData::default(),
        }
    }
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn at(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self::new(id).with_position(Vec3::new(x, y, z))
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_extent(mut self, extent: Vec3) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn pinned(mut self) -> Self {
        self.is_pinned = true;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.data.group = Some(group.into());
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.data.cluster_id = Some(cluster.into());
        self
    }

    pub fn container(mut self, child_layout: impl Into<String>) -> Self {
        self.data.is_container = true;
        self.data.child_layout = Some(child_layout.into());
        self
    }

    pub fn inside(mut self, parent: impl Into<String>) -> Self {
        self.data.parent_container = Some(parent.into());
        self
    }

    pub fn bounding_sphere_radius(&self) -> f64 {
        match self.extent {
            Some(e) => e.norm().max(self.radius),
            None => self.radius,
        }
    }

    /// Half-size of the visual box on each axis.
    pub fn half_extent(&self) -> Vec3 {
        self.extent
            .unwrap_or_else(|| Vec3::repeat(self.radius))
            .map(|v| v.abs())
    }

    /// Mass used by force and constraint weighting; non-positive or non-finite masses count as 1.
    pub fn effective_mass(&self) -> f64 {
        if self.mass.is_finite() && self.mass > 0.0 {
            self.mass
        } else {
            1.0
        }
    }
}
