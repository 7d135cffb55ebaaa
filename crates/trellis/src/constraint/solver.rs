use super::{BoundaryShape, Constraint, NodeTable, SolverNode, separate, solve};
use crate::config::SolverConfig;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use trellis_graph::{Edge, Graph, Node, Vec3};

#[derive(Debug, Clone)]
struct Slot {
    /// Edge the constraint was derived from, if any.
    edge: Option<String>,
    constraint: Constraint,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub iterations: usize,
    /// Largest single-node displacement of the last pass.
    pub max_displacement: f64,
    pub converged: bool,
}

/// Iterative relaxation over typed constraints.
///
/// Each pass zeroes the force accumulators, adds every constraint's deltas from [`solve`], adds
/// pairwise collision separation, then moves each unpinned node by its accumulated force times
/// `damping_factor`, clamped to `max_force`.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    config: SolverConfig,
    nodes: NodeTable,
    forces: Vec<Vec3>,
    constraints: Vec<Slot>,
}

impl ConstraintSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Loads the graph and derives the default constraints: one distance constraint per edge and
    /// one cluster constraint per `data.group` with at least two members. Constraints added
    /// earlier are discarded.
    pub fn init(&mut self, graph: &Graph, config: &SolverConfig) {
        self.config = config.clone();
        self.nodes = graph
            .nodes()
            .map(|n| (n.id.clone(), SolverNode::from(n)))
            .collect();
        self.forces = vec![Vec3::zeros(); self.nodes.len()];
        self.constraints.clear();

        for edge in graph.edges() {
            if let Some(c) = self.edge_constraint(edge) {
                self.constraints.push(Slot {
                    edge: Some(edge.id.clone()),
                    constraint: c,
                });
            }
        }

        let mut groups: IndexMap<&str, Vec<String>> = IndexMap::new();
        for node in graph.nodes() {
            if let Some(group) = node.data.group.as_deref() {
                groups.entry(group).or_default().push(node.id.clone());
            }
        }
        for (_, ids) in groups.into_iter().filter(|(_, ids)| ids.len() >= 2) {
            self.constraints.push(Slot {
                edge: None,
                constraint: Constraint::Cluster {
                    ids,
                    center_strength: self.config.cluster_center_strength,
                    internal_separation: self.config.cluster_separation,
                },
            });
        }
        tracing::debug!(
            nodes = self.nodes.len(),
            constraints = self.constraints.len(),
            "constraint solver init"
        );
    }

    fn edge_constraint(&self, edge: &Edge) -> Option<Constraint> {
        if edge.source == edge.target
            || !self.nodes.contains_key(&edge.source)
            || !self.nodes.contains_key(&edge.target)
        {
            return None;
        }
        let positive = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0);
        Some(Constraint::Distance {
            a: edge.source.clone(),
            b: edge.target.clone(),
            distance: positive(edge.data.distance).unwrap_or(self.config.default_distance),
            strength: positive(edge.data.strength).unwrap_or(self.config.default_strength),
            min: None,
            max: None,
        })
    }

    /// Re-reads positions, masses and pin flags from the graph, keeping the constraint set.
    /// Nodes that left the graph are removed along with their constraints; new nodes join.
    pub fn sync(&mut self, graph: &Graph) {
        let gone: Vec<String> = self
            .nodes
            .keys()
            .filter(|id| !graph.has_node(id))
            .cloned()
            .collect();
        for id in gone {
            self.remove_node(&id);
        }
        for node in graph.nodes() {
            self.nodes.insert(node.id.clone(), SolverNode::from(node));
        }
        self.forces = vec![Vec3::zeros(); self.nodes.len()];
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.nodes.get(id).map(|n| n.position)
    }

    /// Force accumulated for `id` during the last pass.
    pub fn force(&self, id: &str) -> Option<Vec3> {
        self.nodes
            .get_index_of(id)
            .and_then(|i| self.forces.get(i).copied())
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().map(|s| &s.constraint)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    fn validate(&self, constraint: &Constraint) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidConstraint { reason });
        let ids = constraint.node_ids();
        if ids.is_empty() {
            return invalid(format!("{} constraint names no nodes", constraint.kind()));
        }
        if let Some(missing) = ids.iter().find(|id| !self.nodes.contains_key(**id)) {
            return invalid(format!(
                "{} constraint references unknown node {missing}",
                constraint.kind()
            ));
        }
        let numbers: Vec<f64> = match constraint {
            Constraint::Distance {
                a,
                b,
                distance,
                strength,
                min,
                max,
            } => {
                if a == b {
                    return invalid(format!("distance constraint joins {a} to itself"));
                }
                [Some(*distance), Some(*strength), *min, *max]
                    .into_iter()
                    .flatten()
                    .collect()
            }
            Constraint::Position {
                target,
                strength,
                tolerance,
                ..
            } => vec![target.x, target.y, target.z, *strength, *tolerance],
            Constraint::Angle {
                a,
                b,
                c,
                angle,
                strength,
            } => {
                if a == b || b == c || a == c {
                    return invalid("angle constraint needs three distinct nodes".to_string());
                }
                vec![*angle, *strength]
            }
            Constraint::Cluster {
                center_strength,
                internal_separation,
                ..
            } => vec![*center_strength, *internal_separation],
            Constraint::Boundary {
                shape,
                strength,
                padding,
                ..
            } => {
                let mut v = vec![*strength, *padding];
                match shape {
                    BoundaryShape::Box { min, max } => {
                        v.extend(min.iter().chain(max.iter()).copied());
                    }
                    BoundaryShape::Sphere { center, radius } => {
                        v.extend(center.iter().copied());
                        v.push(*radius);
                    }
                }
                v
            }
        };
        if numbers.iter().any(|v| !v.is_finite()) {
            return invalid(format!(
                "{} constraint has a non-finite parameter",
                constraint.kind()
            ));
        }
        Ok(())
    }

    /// Adds a constraint after checking that every node it names is loaded.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<()> {
        if let Err(err) = self.validate(&constraint) {
            tracing::warn!(%err, "constraint rejected");
            return Err(err);
        }
        self.constraints.push(Slot {
            edge: None,
            constraint,
        });
        Ok(())
    }

    pub fn add_distance_constraint(
        &mut self,
        a: &str,
        b: &str,
        distance: f64,
        strength: f64,
    ) -> Result<()> {
        self.add_constraint(Constraint::Distance {
            a: a.to_string(),
            b: b.to_string(),
            distance,
            strength,
            min: None,
            max: None,
        })
    }

    pub fn add_position_constraint(
        &mut self,
        id: &str,
        target: Vec3,
        strength: f64,
        tolerance: f64,
    ) -> Result<()> {
        self.add_constraint(Constraint::Position {
            node: id.to_string(),
            target,
            strength,
            tolerance,
        })
    }

    /// `b` is the vertex; `angle` is in radians.
    pub fn add_angle_constraint(
        &mut self,
        a: &str,
        b: &str,
        c: &str,
        angle: f64,
        strength: f64,
    ) -> Result<()> {
        self.add_constraint(Constraint::Angle {
            a: a.to_string(),
            b: b.to_string(),
            c: c.to_string(),
            angle,
            strength,
        })
    }

    pub fn add_cluster_constraint<I, S>(
        &mut self,
        ids: I,
        center_strength: f64,
        internal_separation: f64,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_constraint(Constraint::Cluster {
            ids: ids.into_iter().map(Into::into).collect(),
            center_strength,
            internal_separation,
        })
    }

    pub fn add_boundary_constraint<I, S>(
        &mut self,
        ids: I,
        shape: BoundaryShape,
        strength: f64,
        padding: f64,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_constraint(Constraint::Boundary {
            ids: ids.into_iter().map(Into::into).collect(),
            shape,
            strength,
            padding,
        })
    }

    pub fn add_node(&mut self, node: &Node) {
        self.nodes.insert(node.id.clone(), SolverNode::from(node));
        self.forces.resize(self.nodes.len(), Vec3::zeros());
    }

    /// Removes the node and every constraint that references it. Returns how many constraints
    /// were pruned.
    pub fn remove_node(&mut self, id: &str) -> usize {
        self.nodes.shift_remove(id);
        self.forces.truncate(self.nodes.len());
        let before = self.constraints.len();
        self.constraints.retain(|s| !s.constraint.references(id));
        let pruned = before - self.constraints.len();
        if pruned > 0 {
            tracing::debug!(node = %id, pruned, "pruned constraints for removed node");
        }
        pruned
    }

    /// Derives the distance constraint for a newly added graph edge.
    pub fn add_edge(&mut self, graph: &Graph, id: &str) {
        let Some(edge) = graph.edge(id) else {
            tracing::warn!(edge = %id, "add_edge: edge not in graph");
            return;
        };
        match self.edge_constraint(edge) {
            Some(constraint) => self.constraints.push(Slot {
                edge: Some(id.to_string()),
                constraint,
            }),
            None => tracing::warn!(edge = %id, "add_edge: endpoint not loaded, skipped"),
        }
    }

    pub fn remove_edge(&mut self, id: &str) {
        self.constraints.retain(|s| s.edge.as_deref() != Some(id));
    }

    fn accumulate_collisions(&mut self) {
        let padding = self.config.collision_padding;
        let n = self.nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                if a.is_pinned && b.is_pinned {
                    continue;
                }
                let min = a.radius + b.radius + padding;
                if (b.position - a.position).norm() >= min {
                    continue;
                }
                for (k, delta) in separate(&self.nodes, i, j, min, 1.0) {
                    self.forces[k] += delta;
                }
            }
        }
    }

    /// One relaxation pass. Returns the largest displacement applied.
    pub fn pass(&mut self) -> f64 {
        self.forces.clear();
        self.forces.resize(self.nodes.len(), Vec3::zeros());
        for slot in &self.constraints {
            for (i, delta) in solve(&slot.constraint, &self.nodes) {
                self.forces[i] += delta;
            }
        }
        if self.config.collision_avoidance {
            self.accumulate_collisions();
        }

        let damping = self.config.damping_factor;
        let max_force = self.config.max_force;
        let mut max_displacement: f64 = 0.0;
        for (node, force) in self.nodes.values_mut().zip(&self.forces) {
            if node.is_pinned {
                continue;
            }
            let mut step = force * damping;
            let len = step.norm();
            if !len.is_finite() {
                continue;
            }
            if max_force > 0.0 && len > max_force {
                step *= max_force / len;
            }
            node.position += step;
            max_displacement = max_displacement.max(step.norm());
        }
        max_displacement
    }

    /// Runs passes until the largest displacement drops below `convergence_threshold` or the
    /// iteration budget is spent.
    pub fn solve(&mut self) -> SolveReport {
        let mut report = SolveReport {
            iterations: 0,
            max_displacement: 0.0,
            converged: false,
        };
        for _ in 0..self.config.iterations {
            report.max_displacement = self.pass();
            report.iterations += 1;
            if report.max_displacement < self.config.convergence_threshold {
                report.converged = true;
                break;
            }
        }
        tracing::trace!(
            iterations = report.iterations,
            max_displacement = report.max_displacement,
            converged = report.converged,
            "constraint solve finished"
        );
        report
    }

    /// Writes solved positions onto the graph's unpinned nodes.
    pub fn apply(&self, graph: &mut Graph) {
        for (id, node) in &self.nodes {
            if let Some(target) = graph.node_mut(id) {
                if !target.is_pinned {
                    target.position = node.position;
                }
            }
        }
    }

    /// `init`, `solve` and `apply` in one call.
    pub fn layout(&mut self, graph: &mut Graph, config: &SolverConfig) -> SolveReport {
        self.init(graph, config);
        let report = self.solve();
        self.apply(graph);
        report
    }
}
