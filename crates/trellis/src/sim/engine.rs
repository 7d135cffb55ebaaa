use super::protocol::{Command, EdgeSnapshot, EngineEvent, NodeSnapshot, PositionEntry};
use crate::config::ForceSettings;
use crate::error::{Error, Result};
use crate::geom::{EPSILON, fallback_direction};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use trellis_graph::{EdgeConstraint, Vec3};

/// Weight of the newest sample in the smoothed kinetic energy.
const ENERGY_SMOOTHING: f64 = 0.2;

/// Push per unit of overlap between padded bounding spheres.
const COLLISION_STRENGTH: f64 = 0.5;

#[derive(Debug, Clone)]
struct SimNode {
    position: Vec3,
    velocity: Vec3,
    mass: f64,
    radius: f64,
    is_fixed: bool,
    is_pinned: bool,
    cluster: Option<String>,
}

impl SimNode {
    fn frozen(&self) -> bool {
        self.is_fixed || self.is_pinned
    }
}

impl From<NodeSnapshot> for SimNode {
    fn from(s: NodeSnapshot) -> Self {
        Self {
            position: s.position,
            velocity: s.velocity,
            mass: if s.mass.is_finite() && s.mass > 0.0 {
                s.mass
            } else {
                1.0
            },
            radius: if s.radius.is_finite() {
                s.radius.max(0.0)
            } else {
                0.0
            },
            is_fixed: s.is_fixed,
            is_pinned: s.is_pinned,
            cluster: s.cluster,
        }
    }
}

#[derive(Debug, Clone)]
struct SimEdge {
    source: String,
    target: String,
    constraint: EdgeConstraint,
    ideal_length: f64,
    stiffness: f64,
}

impl From<EdgeSnapshot> for SimEdge {
    fn from(s: EdgeSnapshot) -> Self {
        Self {
            source: s.source,
            target: s.target,
            constraint: s.constraint,
            ideal_length: s.ideal_length.max(EPSILON),
            stiffness: s.stiffness.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still moving; keep stepping.
    Moving,
    /// The smoothed energy stayed under the threshold for the auto-stop delay. The engine has
    /// stopped itself.
    Settled,
}

/// Many-body repulsion, edge springs, centering gravity and cluster cohesion over a node table.
///
/// The engine is a plain value: the worker thread owns one and drives it with [`handle`] and
/// [`step`], and [`InlineForceLayout`](super::InlineForceLayout) drives one synchronously.
///
/// [`handle`]: SimulationEngine::handle
/// [`step`]: SimulationEngine::step
#[derive(Debug, Clone)]
pub struct SimulationEngine {
    nodes: IndexMap<String, SimNode>,
    edges: IndexMap<String, SimEdge>,
    settings: ForceSettings,
    running: bool,
    energy: f64,
    smoothed_energy: Option<f64>,
    /// Simulated seconds the smoothed energy has spent under the threshold.
    calm_time: f64,
    settled: bool,
    steps: u64,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new(ForceSettings::default())
    }
}

impl SimulationEngine {
    pub fn new(settings: ForceSettings) -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            settings,
            running: false,
            energy: 0.0,
            smoothed_energy: None,
            calm_time: 0.0,
            settled: false,
            steps: 0,
        }
    }

    pub fn load(&mut self, nodes: Vec<NodeSnapshot>, edges: Vec<EdgeSnapshot>) {
        self.nodes = nodes
            .into_iter()
            .map(|n| (n.id.clone(), SimNode::from(n)))
            .collect();
        self.edges.clear();
        for e in edges {
            self.add_edge(e);
        }
        self.running = false;
        self.energy = 0.0;
        self.reset_calm();
        self.steps = 0;
    }

    pub fn settings(&self) -> &ForceSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
        self.reset_calm();
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// True once the engine stopped itself because the smoothed energy stayed low.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Total kinetic energy after the last step.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Exponential moving average of the kinetic energy.
    pub fn smoothed_energy(&self) -> f64 {
        self.smoothed_energy.unwrap_or(self.energy)
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.nodes.get(id).map(|n| n.position)
    }

    pub fn positions(&self) -> Vec<PositionEntry> {
        self.nodes
            .iter()
            .map(|(id, n)| PositionEntry::new(id.as_str(), &n.position))
            .collect()
    }

    fn reset_calm(&mut self) {
        self.smoothed_energy = None;
        self.calm_time = 0.0;
        self.settled = false;
    }

    pub fn add_node(&mut self, node: NodeSnapshot) {
        self.nodes.insert(node.id.clone(), SimNode::from(node));
        self.reset_calm();
    }

    /// Removes a node and every edge that references it.
    pub fn remove_node(&mut self, id: &str) -> bool {
        if self.nodes.shift_remove(id).is_none() {
            return false;
        }
        self.edges.retain(|_, e| e.source != id && e.target != id);
        self.reset_calm();
        true
    }

    /// Adds an edge; edges with an unknown endpoint are skipped.
    pub fn add_edge(&mut self, edge: EdgeSnapshot) -> bool {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            tracing::warn!(
                edge = %edge.id,
                source = %edge.source,
                target = %edge.target,
                "skipping edge with missing endpoint"
            );
            return false;
        }
        self.edges.insert(edge.id.clone(), SimEdge::from(edge));
        self.reset_calm();
        true
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        let removed = self.edges.shift_remove(id).is_some();
        if removed {
            self.reset_calm();
        }
        removed
    }

    pub fn update_node_state(
        &mut self,
        id: &str,
        is_fixed: bool,
        is_pinned: bool,
        position: Option<Vec3>,
    ) -> bool {
        let Some(n) = self.nodes.get_mut(id) else {
            return false;
        };
        n.is_fixed = is_fixed;
        n.is_pinned = is_pinned;
        if let Some(p) = position {
            n.position = p;
        }
        if n.frozen() {
            n.velocity = Vec3::zeros();
        }
        self.reset_calm();
        true
    }

    pub fn update_settings(&mut self, settings: ForceSettings) {
        self.settings = settings;
        self.reset_calm();
    }

    /// Adds `intensity` worth of velocity to every free node along deterministic directions.
    pub fn kick(&mut self, intensity: f64) {
        let intensity = if intensity.is_finite() { intensity.abs() } else { 0.0 };
        let salt = self.steps as usize;
        for (i, n) in self.nodes.values_mut().enumerate() {
            if n.frozen() {
                continue;
            }
            n.velocity += fallback_direction(i.wrapping_mul(7919).wrapping_add(salt)) * intensity;
        }
        self.reset_calm();
    }

    /// Applies one protocol command. Returns the event the command produces, if any.
    pub fn handle(&mut self, command: Command) -> Option<EngineEvent> {
        match command {
            Command::Init {
                nodes,
                edges,
                settings,
            } => {
                self.settings = settings;
                self.load(nodes, edges);
            }
            Command::Start => self.start(),
            Command::Stop => {
                let was_running = self.running;
                self.stop();
                if was_running {
                    return Some(EngineEvent::Stopped {
                        energy: self.energy,
                    });
                }
            }
            Command::Kick { intensity } => self.kick(intensity),
            Command::AddNode(node) => self.add_node(node),
            Command::RemoveNode { id } => {
                self.remove_node(&id);
            }
            Command::AddEdge(edge) => {
                self.add_edge(edge);
            }
            Command::RemoveEdge { id } => {
                self.remove_edge(&id);
            }
            Command::UpdateNodeState {
                id,
                is_fixed,
                is_pinned,
                position,
            } => {
                if !self.update_node_state(&id, is_fixed, is_pinned, position) {
                    tracing::debug!(node = %id, "state update for unknown node ignored");
                }
            }
            Command::UpdateSettings(settings) => self.update_settings(settings),
        }
        None
    }

    fn accumulate_forces(&self) -> Vec<Vec3> {
        let s = &self.settings;
        let n = self.nodes.len();
        let mut forces = vec![Vec3::zeros(); n];
        let min_distance = s.min_distance.max(EPSILON);

        let padding = s.node_padding.max(0.0);
        for i in 0..n {
            let (pi, ri) = (self.nodes[i].position, self.nodes[i].radius);
            for j in (i + 1)..n {
                let delta = pi - self.nodes[j].position;
                let raw = delta.norm();
                let (dir, dist) = if raw.is_finite() && raw > EPSILON {
                    (delta / raw, raw.max(min_distance))
                } else {
                    (fallback_direction(i * 31 + j), min_distance)
                };
                let overlap = (ri + self.nodes[j].radius + padding - raw.max(0.0)).max(0.0);
                let f = dir * (s.repulsion / (dist * dist) + COLLISION_STRENGTH * overlap);
                forces[i] += f;
                forces[j] -= f;
            }
        }

        for e in self.edges.values() {
            let (Some(a), Some(b)) = (
                self.nodes.get_index_of(&e.source),
                self.nodes.get_index_of(&e.target),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            let delta = self.nodes[b].position - self.nodes[a].position;
            let dist = delta.norm();
            if !(dist.is_finite() && dist > EPSILON) {
                continue;
            }
            let stiffness = match e.constraint {
                EdgeConstraint::Elastic => e.stiffness,
                // Hard targets: pull harder when stretched or squeezed.
                EdgeConstraint::Rigid | EdgeConstraint::Weld => e.stiffness.max(0.5),
            };
            let f = (delta / dist) * (stiffness * (dist - e.ideal_length));
            forces[a] += f;
            forces[b] -= f;
        }

        let center: Vec3 = s.gravity_center.into();
        for (i, node) in self.nodes.values().enumerate() {
            forces[i] += (center - node.position) * s.center_strength;
        }

        if s.cluster_strength > 0.0 {
            let mut centroids: FxHashMap<&str, (Vec3, usize)> = FxHashMap::default();
            for node in self.nodes.values() {
                if let Some(c) = node.cluster.as_deref() {
                    let entry = centroids.entry(c).or_insert((Vec3::zeros(), 0));
                    entry.0 += node.position;
                    entry.1 += 1;
                }
            }
            for (i, node) in self.nodes.values().enumerate() {
                let Some(&(sum, count)) = node.cluster.as_deref().and_then(|c| centroids.get(c))
                else {
                    continue;
                };
                if count < 2 {
                    continue;
                }
                let centroid = sum / count as f64;
                forces[i] += (centroid - node.position) * s.cluster_strength;
            }
        }

        forces
    }

    /// Advances the simulation by one integration step.
    ///
    /// Fixed and pinned nodes never integrate. Returns an error if the state stops being finite;
    /// the engine is stopped in that case and is not restarted automatically.
    pub fn step(&mut self) -> Result<StepOutcome> {
        let forces = self.accumulate_forces();
        let damping = self.settings.damping.clamp(0.0, 1.0);
        let max_velocity = self.settings.max_velocity;

        let mut energy = 0.0;
        for (node, force) in self.nodes.values_mut().zip(forces) {
            if node.frozen() {
                node.velocity = Vec3::zeros();
                continue;
            }
            let mut v = (node.velocity + force / node.mass) * damping;
            let speed = v.norm();
            if max_velocity > 0.0 && speed > max_velocity {
                v *= max_velocity / speed;
            }
            node.velocity = v;
            node.position += v;
            energy += 0.5 * node.mass * v.norm_squared();
        }
        self.steps += 1;

        if let Some((id, _)) = self
            .nodes
            .iter()
            .find(|(_, n)| !n.position.iter().all(|c| c.is_finite()))
        {
            self.running = false;
            return Err(Error::Engine {
                message: format!("non-finite position for node {id}"),
            });
        }

        self.energy = energy;
        let smoothed = match self.smoothed_energy {
            Some(prev) => prev + ENERGY_SMOOTHING * (energy - prev),
            None => energy,
        };
        self.smoothed_energy = Some(smoothed);

        if smoothed < self.settings.min_energy_threshold {
            self.calm_time += self.settings.time_step.max(0.0);
        } else {
            self.calm_time = 0.0;
        }
        if self.calm_time >= self.settings.auto_stop_delay().as_secs_f64() {
            self.running = false;
            self.settled = true;
            return Ok(StepOutcome::Settled);
        }
        Ok(StepOutcome::Moving)
    }

    /// Steps until the engine settles or `max_steps` is reached. Returns the number of steps
    /// taken.
    pub fn settle(&mut self, max_steps: usize) -> Result<usize> {
        self.start();
        for taken in 1..=max_steps {
            if self.step()? == StepOutcome::Settled {
                return Ok(taken);
            }
        }
        self.stop();
        Ok(max_steps)
    }
}
