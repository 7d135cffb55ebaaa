//! Geometric constraints and the relaxation solver that enforces them.
//!
//! A [`Constraint`] is plain data. [`solve`] turns one constraint plus the current node table into
//! force deltas; the [`ConstraintSolver`] owns the accumulators and applies them.

mod solver;

pub use solver::{ConstraintSolver, SolveReport};

use crate::geom::{EPSILON, fallback_direction, perpendicular, try_normalize};
use indexmap::IndexMap;
use nalgebra::{Unit, UnitQuaternion};
use std::f64::consts::PI;
use trellis_graph::{Node, Vec3};

/// A node as the solver sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverNode {
    pub position: Vec3,
    pub mass: f64,
    pub radius: f64,
    pub is_pinned: bool,
}

impl From<&Node> for SolverNode {
    fn from(node: &Node) -> Self {
        Self {
            position: node.position,
            mass: node.effective_mass(),
            radius: node.bounding_sphere_radius(),
            is_pinned: node.is_pinned,
        }
    }
}

pub type NodeTable = IndexMap<String, SolverNode>;

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryShape {
    Box { min: Vec3, max: Vec3 },
    Sphere { center: Vec3, radius: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Keeps `a` and `b` at `distance`. When `min` or `max` is violated the correction runs at
    /// full strength toward the violated bound.
    Distance {
        a: String,
        b: String,
        distance: f64,
        strength: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Pulls `node` to within `tolerance` of `target`.
    Position {
        node: String,
        target: Vec3,
        strength: f64,
        tolerance: f64,
    },
    /// Opens or closes the angle `a`-`b`-`c` (vertex `b`, radians) by rotating `a` and `c`
    /// around the vertex.
    Angle {
        a: String,
        b: String,
        c: String,
        angle: f64,
        strength: f64,
    },
    /// Centroid cohesion plus a minimum separation between members.
    Cluster {
        ids: Vec<String>,
        center_strength: f64,
        internal_separation: f64,
    },
    /// Keeps members inside `shape`, inset by `padding`.
    Boundary {
        ids: Vec<String>,
        shape: BoundaryShape,
        strength: f64,
        padding: f64,
    },
}

impl Constraint {
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Distance { .. } => "distance",
            Constraint::Position { .. } => "position",
            Constraint::Angle { .. } => "angle",
            Constraint::Cluster { .. } => "cluster",
            Constraint::Boundary { .. } => "boundary",
        }
    }

    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            Constraint::Distance { a, b, .. } => vec![a.as_str(), b.as_str()],
            Constraint::Position { node, .. } => vec![node.as_str()],
            Constraint::Angle { a, b, c, .. } => vec![a.as_str(), b.as_str(), c.as_str()],
            Constraint::Cluster { ids, .. } | Constraint::Boundary { ids, .. } => {
                ids.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn references(&self, id: &str) -> bool {
        self.node_ids().contains(&id)
    }
}

/// Shares a pair correction by inverse mass: the heavier node takes the smaller part and a
/// pinned node takes none.
fn pair_weights(a: &SolverNode, b: &SolverNode) -> (f64, f64) {
    match (a.is_pinned, b.is_pinned) {
        (true, true) => (0.0, 0.0),
        (true, false) => (0.0, 1.0),
        (false, true) => (1.0, 0.0),
        (false, false) => {
            let total = a.mass + b.mass;
            if total > EPSILON {
                (b.mass / total, a.mass / total)
            } else {
                (0.5, 0.5)
            }
        }
    }
}

fn unit_between(from: &Vec3, to: &Vec3, seed: usize) -> (Vec3, f64) {
    let delta = to - from;
    let dist = delta.norm();
    if dist.is_finite() && dist > EPSILON {
        (delta / dist, dist)
    } else {
        (fallback_direction(seed), 0.0)
    }
}

/// Corrections for `a` and `b` that move them toward separation `target`.
pub(crate) fn separate(
    table: &NodeTable,
    ia: usize,
    ib: usize,
    target: f64,
    strength: f64,
) -> [(usize, Vec3); 2] {
    let (na, nb) = (&table[ia], &table[ib]);
    let (dir, dist) = unit_between(&na.position, &nb.position, ia * 31 + ib);
    let error = (dist - target) * strength;
    let (wa, wb) = pair_weights(na, nb);
    [(ia, dir * (error * wa)), (ib, -dir * (error * wb))]
}

fn solve_distance(
    table: &NodeTable,
    ia: usize,
    ib: usize,
    distance: f64,
    strength: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Vec<(usize, Vec3)> {
    let dist = (table[ib].position - table[ia].position).norm();
    let (target, strength) = match (min, max) {
        (Some(lo), _) if dist < lo => (lo, 1.0),
        (_, Some(hi)) if dist > hi => (hi, 1.0),
        _ => (distance, strength),
    };
    separate(table, ia, ib, target, strength).to_vec()
}

fn solve_position(
    node: &SolverNode,
    i: usize,
    target: &Vec3,
    strength: f64,
    tolerance: f64,
) -> Vec<(usize, Vec3)> {
    if node.is_pinned {
        return Vec::new();
    }
    let delta = target - node.position;
    let dist = delta.norm();
    if !(dist.is_finite() && dist > tolerance.max(0.0)) {
        return Vec::new();
    }
    let reach = (dist - tolerance.max(0.0)) / dist;
    vec![(i, delta * (reach * strength))]
}

fn solve_angle(
    table: &NodeTable,
    [ia, ib, ic]: [usize; 3],
    angle: f64,
    strength: f64,
) -> Vec<(usize, Vec3)> {
    let vertex = table[ib].position;
    let va = table[ia].position - vertex;
    let vc = table[ic].position - vertex;
    let (Some(ua), Some(uc)) = (try_normalize(va), try_normalize(vc)) else {
        return Vec::new();
    };
    let current = ua.dot(&uc).clamp(-1.0, 1.0).acos();
    let diff = angle.clamp(0.0, PI) - current;
    if diff.abs() < EPSILON {
        return Vec::new();
    }
    let axis = try_normalize(ua.cross(&uc)).unwrap_or_else(|| perpendicular(ua));
    let axis = Unit::new_unchecked(axis);
    let half = diff * strength / 2.0;

    let mut out = Vec::with_capacity(2);
    if !table[ia].is_pinned {
        let rotated = UnitQuaternion::from_axis_angle(&axis, -half) * va;
        out.push((ia, rotated - va));
    }
    if !table[ic].is_pinned {
        let rotated = UnitQuaternion::from_axis_angle(&axis, half) * vc;
        out.push((ic, rotated - vc));
    }
    out
}

fn solve_cluster(
    table: &NodeTable,
    members: &[usize],
    center_strength: f64,
    internal_separation: f64,
) -> Vec<(usize, Vec3)> {
    if members.len() < 2 {
        return Vec::new();
    }
    let centroid =
        members.iter().map(|&i| table[i].position).sum::<Vec3>() / members.len() as f64;
    // Radius a packed cluster of this size occupies.
    let comfort = internal_separation.max(0.0) * (members.len() as f64).sqrt() / 2.0;

    let mut out = Vec::new();
    for &i in members {
        let node = &table[i];
        if node.is_pinned {
            continue;
        }
        let delta = centroid - node.position;
        let dist = delta.norm();
        if dist > comfort && dist > EPSILON {
            out.push((i, delta * ((dist - comfort) / dist * center_strength)));
        }
    }
    for (k, &i) in members.iter().enumerate() {
        for &j in &members[k + 1..] {
            let d = (table[j].position - table[i].position).norm();
            if d < internal_separation {
                out.extend(separate(table, i, j, internal_separation, 0.5));
            }
        }
    }
    out
}

fn solve_boundary(
    table: &NodeTable,
    members: &[usize],
    shape: &BoundaryShape,
    strength: f64,
    padding: f64,
) -> Vec<(usize, Vec3)> {
    let mut out = Vec::new();
    for &i in members {
        let node = &table[i];
        if node.is_pinned {
            continue;
        }
        let p = node.position;
        let push = match shape {
            BoundaryShape::Sphere { center, radius } => {
                let limit = (radius - padding).max(0.0);
                let delta = p - center;
                let dist = delta.norm();
                if dist > limit && dist > EPSILON {
                    -delta / dist * (dist - limit)
                } else {
                    Vec3::zeros()
                }
            }
            BoundaryShape::Box { min, max } => {
                let center = (min + max) / 2.0;
                let mut push = Vec3::zeros();
                for axis in 0..3 {
                    let lo = (min[axis] + padding).min(center[axis]);
                    let hi = (max[axis] - padding).max(center[axis]);
                    if p[axis] < lo {
                        push[axis] = lo - p[axis];
                    } else if p[axis] > hi {
                        push[axis] = hi - p[axis];
                    }
                }
                push
            }
        };
        if push.norm_squared() > 0.0 {
            out.push((i, push * strength));
        }
    }
    out
}

/// Force deltas that move the table toward satisfying `constraint`, as `(node index, delta)`.
///
/// Ids missing from the table make the constraint a no-op.
pub fn solve(constraint: &Constraint, table: &NodeTable) -> Vec<(usize, Vec3)> {
    let index = |id: &str| table.get_index_of(id);
    let indices = |ids: &[String]| ids.iter().filter_map(|id| index(id)).collect::<Vec<_>>();

    match constraint {
        Constraint::Distance {
            a,
            b,
            distance,
            strength,
            min,
            max,
        } => match (index(a), index(b)) {
            (Some(ia), Some(ib)) if ia != ib => {
                solve_distance(table, ia, ib, *distance, *strength, *min, *max)
            }
            _ => Vec::new(),
        },
        Constraint::Position {
            node,
            target,
            strength,
            tolerance,
        } => match index(node) {
            Some(i) => solve_position(&table[i], i, target, *strength, *tolerance),
            None => Vec::new(),
        },
        Constraint::Angle {
            a,
            b,
            c,
            angle,
            strength,
        } => match (index(a), index(b), index(c)) {
            (Some(ia), Some(ib), Some(ic)) => solve_angle(table, [ia, ib, ic], *angle, *strength),
            _ => Vec::new(),
        },
        Constraint::Cluster {
            ids,
            center_strength,
            internal_separation,
        } => solve_cluster(table, &indices(ids), *center_strength, *internal_separation),
        Constraint::Boundary {
            ids,
            shape,
            strength,
            padding,
        } => solve_boundary(table, &indices(ids), shape, *strength, *padding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(points: &[(&str, Vec3)]) -> NodeTable {
        points
            .iter()
            .map(|(id, p)| {
                (
                    id.to_string(),
                    SolverNode {
                        position: *p,
                        mass: 1.0,
                        radius: 10.0,
                        is_pinned: false,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn heavier_nodes_take_the_smaller_share() {
        let mut t = table(&[("a", Vec3::zeros()), ("b", Vec3::new(300.0, 0.0, 0.0))]);
        t["b"].mass = 3.0;
        let deltas = solve(
            &Constraint::Distance {
                a: "a".into(),
                b: "b".into(),
                distance: 200.0,
                strength: 1.0,
                min: None,
                max: None,
            },
            &t,
        );
        assert_eq!(deltas.len(), 2);
        assert!((deltas[0].1.x - 75.0).abs() < 1e-9);
        assert!((deltas[1].1.x + 25.0).abs() < 1e-9);
    }

    #[test]
    fn distance_bounds_override_the_soft_target() {
        let t = table(&[("a", Vec3::zeros()), ("b", Vec3::new(10.0, 0.0, 0.0))]);
        let deltas = solve(
            &Constraint::Distance {
                a: "a".into(),
                b: "b".into(),
                distance: 100.0,
                strength: 0.1,
                min: Some(50.0),
                max: None,
            },
            &t,
        );
        // Full-strength push out to the minimum, split evenly.
        assert!((deltas[0].1.x + 20.0).abs() < 1e-9);
        assert!((deltas[1].1.x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn position_constraint_stops_at_tolerance() {
        let t = table(&[("a", Vec3::new(10.0, 0.0, 0.0))]);
        let c = Constraint::Position {
            node: "a".into(),
            target: Vec3::zeros(),
            strength: 1.0,
            tolerance: 4.0,
        };
        let deltas = solve(&c, &t);
        assert!((deltas[0].1 - Vec3::new(-6.0, 0.0, 0.0)).norm() < 1e-9);

        let inside = table(&[("a", Vec3::new(3.0, 0.0, 0.0))]);
        assert!(solve(&c, &inside).is_empty());
    }

    #[test]
    fn angle_constraint_opens_toward_target() {
        let t = table(&[
            ("a", Vec3::new(100.0, 0.0, 0.0)),
            ("b", Vec3::zeros()),
            ("c", Vec3::new(100.0, 100.0, 0.0)),
        ]);
        let deltas = solve(
            &Constraint::Angle {
                a: "a".into(),
                b: "b".into(),
                c: "c".into(),
                angle: PI / 2.0,
                strength: 1.0,
            },
            &t,
        );
        let a = t["a"].position + deltas[0].1;
        let c = t["c"].position + deltas[1].1;
        let opened = a.normalize().dot(&c.normalize()).acos();
        assert!((opened - PI / 2.0).abs() < 1e-9);
        // Rotation keeps arm lengths.
        assert!((a.norm() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn box_boundary_pushes_back_inside_padding() {
        let t = table(&[("a", Vec3::new(120.0, 0.0, -5.0))]);
        let deltas = solve(
            &Constraint::Boundary {
                ids: vec!["a".into()],
                shape: BoundaryShape::Box {
                    min: Vec3::repeat(-100.0),
                    max: Vec3::repeat(100.0),
                },
                strength: 1.0,
                padding: 10.0,
            },
            &t,
        );
        assert_eq!(deltas, vec![(0, Vec3::new(-30.0, 0.0, 0.0))]);
    }

    #[test]
    fn missing_ids_make_constraints_inert() {
        let t = table(&[("a", Vec3::zeros())]);
        let c = Constraint::Distance {
            a: "a".into(),
            b: "ghost".into(),
            distance: 10.0,
            strength: 1.0,
            min: None,
            max: None,
        };
        assert!(solve(&c, &t).is_empty());
        assert!(c.references("ghost"));
    }
}
