//! Layout configuration.
//!
//! Every section deserializes from camelCase JSON with per-field defaults, so a host can pass a
//! partial document such as `{"force": {"repulsion": 800}}` and keep the remaining defaults.

use crate::error::Result;
use crate::geom::Easing;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trellis_graph::{EdgeConstraint, Vec3};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub force: ForceSettings,
    pub solver: SolverConfig,
    pub nested: NestedConfig,
    pub routing: RouterConfig,
    pub adaptive: AdaptiveConfig,
    pub hybrid: HybridConfig,
    pub transition: TransitionConfig,
    pub placement: PlacementConfig,
}

impl LayoutConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A point written as `{x, y, z}` in configuration documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Point> for Vec3 {
    fn from(p: Point) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<Vec3> for Point {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Default spring parameters for one edge constraint type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpringDefaults {
    pub ideal_length: f64,
    pub stiffness: f64,
}

impl Default for SpringDefaults {
    fn default() -> Self {
        Self {
            ideal_length: 100.0,
            stiffness: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSettings {
    /// Inverse-square repulsion constant.
    pub repulsion: f64,
    /// Pull toward `gravity_center`, per unit of distance.
    pub center_strength: f64,
    /// Fraction of velocity retained after each step.
    pub damping: f64,
    pub min_energy_threshold: f64,
    pub gravity_center: Point,
    /// How long the smoothed energy must stay below the threshold before the engine stops.
    pub auto_stop_delay: u64,
    /// Simulated seconds per integration step, used for the auto-stop clock.
    pub time_step: f64,
    /// Wall-clock pause between steps on the worker thread. Zero runs unthrottled.
    pub tick_interval_ms: u64,
    pub max_velocity: f64,
    /// Cohesion toward the centroid of nodes sharing a cluster tag. Zero disables it.
    pub cluster_strength: f64,
    /// Distances below this are clamped before computing repulsion.
    pub min_distance: f64,
    /// Gap kept between bounding spheres; closer pairs are pushed apart.
    pub node_padding: f64,
    pub elastic: SpringDefaults,
    pub rigid: SpringDefaults,
    pub weld: SpringDefaults,
    pub kick_intensity: f64,
    /// Upper bound on steps for the inline (synchronous) force strategy.
    pub max_inline_steps: usize,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            repulsion: 2000.0,
            center_strength: 0.01,
            damping: 0.9,
            min_energy_threshold: 0.01,
            gravity_center: Point::default(),
            auto_stop_delay: 500,
            time_step: 1.0 / 60.0,
            tick_interval_ms: 16,
            max_velocity: 50.0,
            cluster_strength: 0.02,
            min_distance: 1.0,
            node_padding: 5.0,
            elastic: SpringDefaults::default(),
            rigid: SpringDefaults {
                ideal_length: 100.0,
                stiffness: 0.5,
            },
            weld: SpringDefaults {
                ideal_length: 50.0,
                stiffness: 0.9,
            },
            kick_intensity: 10.0,
            max_inline_steps: 2000,
        }
    }
}

impl ForceSettings {
    pub fn spring_defaults(&self, kind: EdgeConstraint) -> SpringDefaults {
        match kind {
            EdgeConstraint::Elastic => self.elastic,
            EdgeConstraint::Rigid => self.rigid,
            EdgeConstraint::Weld => self.weld,
        }
    }

    pub fn auto_stop_delay(&self) -> Duration {
        Duration::from_millis(self.auto_stop_delay)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub iterations: usize,
    pub convergence_threshold: f64,
    pub damping_factor: f64,
    pub max_force: f64,
    pub collision_avoidance: bool,
    pub collision_padding: f64,
    /// Distance used for edge constraints without explicit `distance` data.
    pub default_distance: f64,
    pub default_strength: f64,
    pub cluster_center_strength: f64,
    pub cluster_separation: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            convergence_threshold: 0.01,
            damping_factor: 0.8,
            max_force: 50.0,
            collision_avoidance: true,
            collision_padding: 5.0,
            default_distance: 200.0,
            default_strength: 0.5,
            cluster_center_strength: 0.1,
            cluster_separation: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NestedConfig {
    pub container_padding: f64,
    /// Inset of the children's footprint inside the local `[-1, 1]` frame.
    pub child_spacing: f64,
    pub recursion_depth: usize,
    pub resize_containers: bool,
    pub default_child_layout: String,
}

impl Default for NestedConfig {
    fn default() -> Self {
        Self {
            container_padding: 10.0,
            child_spacing: 0.1,
            recursion_depth: 8,
            resize_containers: true,
            default_child_layout: "grid".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterConfig {
    pub routing_padding: f64,
    pub bundling_threshold: usize,
    pub bundling_radius: f64,
    /// Control point offset of curved routes, as a fraction of the route length.
    pub curvature: f64,
    /// Number of line segments used to sample a curve.
    pub curve_segments: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routing_padding: 10.0,
            bundling_threshold: 3,
            bundling_radius: 40.0,
            curvature: 0.2,
            curve_segments: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdaptiveConfig {
    pub small_node_threshold: usize,
    pub large_node_threshold: usize,
    pub dense_threshold: f64,
    pub hierarchy_threshold: f64,
    pub grid_connection_density: f64,
    pub grid_min_nodes: usize,
    pub high_degree_threshold: f64,
    pub morph_duration: u64,
    pub morph_easing: Easing,
    pub adaptation_delay: u64,
    /// Re-evaluate automatically after graph mutations.
    pub auto_adapt: bool,
    /// Strategy names rotated through on `pattern_interval`. Empty disables the cycle.
    pub pattern_cycle: Vec<String>,
    pub pattern_interval: u64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            small_node_threshold: 20,
            large_node_threshold: 500,
            dense_threshold: 0.3,
            hierarchy_threshold: 0.7,
            grid_connection_density: 0.3,
            grid_min_nodes: 16,
            high_degree_threshold: 5.0,
            morph_duration: 1000,
            morph_easing: Easing::EaseInOut,
            adaptation_delay: 500,
            auto_adapt: true,
            pattern_cycle: Vec::new(),
            pattern_interval: 0,
        }
    }
}

impl AdaptiveConfig {
    pub fn morph_duration(&self) -> Duration {
        Duration::from_millis(self.morph_duration)
    }

    pub fn adaptation_delay(&self) -> Duration {
        Duration::from_millis(self.adaptation_delay)
    }

    pub fn pattern_interval(&self) -> Duration {
        Duration::from_millis(self.pattern_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HybridConfig {
    pub auto_mode_selection: bool,
    pub complexity_threshold: f64,
    pub enable_adaptive: bool,
    pub enable_nested: bool,
    pub enable_constraints: bool,
    /// Strategy used by the standard (orchestrator) path.
    pub default_layout: String,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            auto_mode_selection: true,
            complexity_threshold: 0.5,
            enable_adaptive: true,
            enable_nested: true,
            enable_constraints: true,
            default_layout: "force".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionConfig {
    pub duration: u64,
    pub easing: Easing,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration: 600,
            easing: Easing::EaseInOut,
        }
    }
}

impl TransitionConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration)
    }
}

/// Parameters of the one-shot geometric strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementConfig {
    pub spacing: f64,
    pub radius: f64,
    pub layer_spacing: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            spacing: 100.0,
            radius: 200.0,
            layer_spacing: 120.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let cfg = LayoutConfig::from_json(
            r#"{"force": {"repulsion": 800, "gravityCenter": {"x": 1, "y": 2}},
                "adaptive": {"morphEasing": "linear", "adaptationDelay": 50}}"#,
        )
        .unwrap();
        assert_eq!(cfg.force.repulsion, 800.0);
        assert_eq!(Vec3::from(cfg.force.gravity_center), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(cfg.force.damping, ForceSettings::default().damping);
        assert_eq!(cfg.adaptive.morph_easing, Easing::Linear);
        assert_eq!(cfg.adaptive.adaptation_delay(), Duration::from_millis(50));
        assert_eq!(cfg.solver, SolverConfig::default());
    }

    #[test]
    fn node_padding_is_a_force_option() {
        let cfg = LayoutConfig::from_json(r#"{"force": {"nodePadding": 12.5}}"#).unwrap();
        assert_eq!(cfg.force.node_padding, 12.5);
        assert_eq!(LayoutConfig::default().force.node_padding, 5.0);
    }

    #[test]
    fn malformed_documents_are_config_errors() {
        let err = LayoutConfig::from_json(r#"{"solver": {"iterations": "many"}}"#).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
