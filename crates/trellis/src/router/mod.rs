//! Routed connections between layout regions.
//!
//! Regions are named groups of nodes. A connection joins two nodes in different regions and is
//! drawn between the regions' facing connection points, as a straight segment, a midline elbow,
//! a Bézier curve or a shared bundle. Blocked routes fall back to A* over an ephemeral
//! [`RoutingGraph`]; when even that fails the route degrades to a straight segment.

mod graph;

pub use graph::{RoutingGraph, RoutingNode, RoutingOwner};

use crate::config::RouterConfig;
use crate::error::{Error, Result};
use crate::geom::{Bounds, Obstacle, dominant_axis, perpendicular, polyline_blocked, try_normalize};
use crate::strategy::StrategyKind;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use trellis_graph::{Graph, Vec3};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionType {
    #[default]
    Direct,
    Orthogonal,
    Curved,
    Bundled,
}

/// A bounded group of nodes with its own layout. Bounds and obstacles are derived from member
/// positions by [`ConnectionRouter::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub layout: StrategyKind,
    pub members: IndexSet<String>,
    pub bounds: Bounds,
    obstacles: Vec<Obstacle>,
}

impl Region {
    pub fn connection_points(&self) -> Vec<Vec3> {
        self.bounds.connection_points()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Connection point on the face looking toward `other`.
    fn exit_toward(&self, other: &Region) -> Vec3 {
        let dir = other.bounds.center() - self.bounds.center();
        self.bounds.face_toward(&dir)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_region: String,
    pub target_region: String,
    pub kind: ConnectionType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub connection: String,
    pub kind: ConnectionType,
    pub points: Vec<Vec3>,
    /// The preferred shape was blocked and the route came from graph search or degraded to a
    /// straight segment.
    pub rerouted: bool,
}

#[derive(Debug, Default)]
pub struct ConnectionRouter {
    config: RouterConfig,
    regions: IndexMap<String, Region>,
    connections: IndexMap<String, Connection>,
    routing: Option<RoutingGraph>,
    next_id: u64,
}

fn region_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl ConnectionRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.get(id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    fn invalidate(&mut self) {
        self.routing = None;
    }

    /// Registers a region. Bounds are computed on the next [`refresh`](Self::refresh).
    pub fn add_region<I, S>(&mut self, id: &str, layout: StrategyKind, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions.insert(
            id.to_string(),
            Region {
                id: id.to_string(),
                layout,
                members: members.into_iter().map(Into::into).collect(),
                bounds: Bounds::new(Vec3::zeros(), Vec3::zeros()),
                obstacles: Vec::new(),
            },
        );
        self.invalidate();
    }

    /// Removes the region and every connection touching it.
    pub fn remove_region(&mut self, id: &str) -> bool {
        if self.regions.shift_remove(id).is_none() {
            return false;
        }
        self.connections
            .retain(|_, c| c.source_region != id && c.target_region != id);
        self.invalidate();
        true
    }

    pub fn set_region_members<I, S>(&mut self, id: &str, members: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let region = self.regions.get_mut(id).ok_or_else(|| Error::MissingNode {
            id: id.to_string(),
        })?;
        let members: IndexSet<String> = members.into_iter().map(Into::into).collect();
        if region.members != members {
            region.members = members;
            self.invalidate();
        }
        Ok(())
    }

    fn owning_region(&self, node: &str) -> Option<&str> {
        self.regions
            .values()
            .find(|r| r.members.contains(node))
            .map(|r| r.id.as_str())
    }

    /// Connects two nodes. Both must belong to a region.
    pub fn add_connection(
        &mut self,
        source: &str,
        target: &str,
        kind: ConnectionType,
    ) -> Result<String> {
        let resolve = |id: &str| {
            self.owning_region(id)
                .map(str::to_string)
                .ok_or_else(|| Error::MissingNode { id: id.to_string() })
        };
        let (source_region, target_region) = match (resolve(source), resolve(target)) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(err), _) | (_, Err(err)) => {
                tracing::warn!(%err, source, target, "connection endpoint has no region");
                return Err(err);
            }
        };
        self.next_id += 1;
        let id = format!("connection-{}", self.next_id);
        self.connections.insert(
            id.clone(),
            Connection {
                id: id.clone(),
                source: source.to_string(),
                target: target.to_string(),
                source_region,
                target_region,
                kind,
            },
        );
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: &str) -> bool {
        self.connections.shift_remove(id).is_some()
    }

    /// Drops `id` from every region. Connections from or to it are removed too.
    pub fn remove_node(&mut self, id: &str) {
        let mut changed = false;
        for region in self.regions.values_mut() {
            changed |= region.members.shift_remove(id);
        }
        self.connections
            .retain(|_, c| c.source != id && c.target != id);
        if changed {
            self.invalidate();
        }
    }

    /// Recomputes region bounds and obstacles from current node positions. The routing graph is
    /// rebuilt lazily, and only when a region actually changed.
    pub fn refresh(&mut self, graph: &Graph) {
        let padding = self.config.routing_padding;
        let mut changed = false;
        for region in self.regions.values_mut() {
            let members: Vec<_> = region
                .members
                .iter()
                .filter_map(|id| graph.node(id))
                .collect();
            let bounds = Bounds::around_spheres(
                members
                    .iter()
                    .map(|n| (n.position, n.bounding_sphere_radius())),
            )
            .map(|b| b.expand(padding))
            .unwrap_or_else(|| Bounds::new(Vec3::zeros(), Vec3::zeros()));
            let obstacles: Vec<Obstacle> = members
                .iter()
                .map(|n| Obstacle {
                    center: n.position,
                    radius: n.bounding_sphere_radius() + padding,
                    owner: n.id.clone(),
                })
                .collect();
            if region.bounds != bounds || region.obstacles != obstacles {
                region.bounds = bounds;
                region.obstacles = obstacles;
                changed = true;
            }
        }
        if changed {
            self.invalidate();
        }
    }

    /// The routing graph, rebuilt first if region topology changed.
    pub fn routing_graph(&mut self) -> &RoutingGraph {
        let regions = &self.regions;
        self.routing.get_or_insert_with(|| {
            tracing::debug!(regions = regions.len(), "rebuilding routing graph");
            RoutingGraph::build(regions)
        })
    }

    fn obstacles_except(&self, skip: [&str; 2]) -> Vec<&Obstacle> {
        self.regions
            .values()
            .flat_map(|r| r.obstacles.iter())
            .filter(|o| !skip.contains(&o.owner.as_str()))
            .collect()
    }

    fn bundle_size(&self, connection: &Connection) -> usize {
        let pair = region_pair(&connection.source_region, &connection.target_region);
        self.connections
            .values()
            .filter(|c| {
                c.kind == ConnectionType::Bundled
                    && region_pair(&c.source_region, &c.target_region) == pair
            })
            .count()
    }

    fn sample_cubic(&self, p0: Vec3, c1: Vec3, c2: Vec3, p3: Vec3) -> Vec<Vec3> {
        let segments = self.config.curve_segments.max(2);
        (0..=segments)
            .map(|i| {
                let t = i as f64 / segments as f64;
                let u = 1.0 - t;
                p0 * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + p3 * (t * t * t)
            })
            .collect()
    }

    /// Quadratic curve that passes exactly through `waypoint` at its midpoint sample.
    fn sample_through(&self, p0: Vec3, waypoint: Vec3, p2: Vec3) -> Vec<Vec3> {
        let segments = self.config.curve_segments.max(2).div_ceil(2) * 2;
        let control = waypoint * 2.0 - (p0 + p2) / 2.0;
        (0..=segments)
            .map(|i| {
                if i * 2 == segments {
                    return waypoint;
                }
                let t = i as f64 / segments as f64;
                let u = 1.0 - t;
                p0 * (u * u) + control * (2.0 * u * t) + p2 * (t * t)
            })
            .collect()
    }

    fn shaped_route(&self, kind: ConnectionType, connection: &Connection, a: Vec3, b: Vec3) -> Vec<Vec3> {
        let span = b - a;
        let len = span.norm();
        let side = try_normalize(span).map_or_else(Vec3::y, perpendicular);
        match kind {
            ConnectionType::Direct => vec![a, b],
            ConnectionType::Orthogonal => {
                let axis = dominant_axis(&span);
                let mid = (a[axis] + b[axis]) / 2.0;
                let mut first = a;
                first[axis] = mid;
                let mut second = b;
                second[axis] = mid;
                let mut points = vec![a, first, second, b];
                points.dedup();
                points
            }
            ConnectionType::Curved => {
                let bend = side * (self.config.curvature * len);
                self.sample_cubic(a, a + span / 3.0 + bend, b - span / 3.0 + bend, b)
            }
            ConnectionType::Bundled => {
                if self.bundle_size(connection) < self.config.bundling_threshold {
                    return self.shaped_route(ConnectionType::Curved, connection, a, b);
                }
                let waypoint = self.bundle_waypoint(connection);
                self.sample_through(a, waypoint, b)
            }
        }
    }

    /// Shared waypoint of every bundled connection between one region pair.
    fn bundle_waypoint(&self, connection: &Connection) -> Vec3 {
        let (first, second) = region_pair(&connection.source_region, &connection.target_region);
        let (Some(ra), Some(rb)) = (self.regions.get(&first), self.regions.get(&second)) else {
            return Vec3::zeros();
        };
        let (ca, cb) = (ra.bounds.center(), rb.bounds.center());
        let side = try_normalize(cb - ca).map_or_else(Vec3::y, perpendicular);
        (ca + cb) / 2.0 + side * self.config.bundling_radius
    }

    fn search(&mut self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        let routing = self.routing_graph();
        let (start, goal) = (routing.nearest(&from)?, routing.nearest(&to)?);
        let mut path = routing.find_path(start, goal)?;
        if path.first() != Some(&from) {
            path.insert(0, from);
        }
        if path.last() != Some(&to) {
            path.push(to);
        }
        path.dedup();
        Some(path)
    }

    /// Routes one connection. Call [`refresh`](Self::refresh) first when nodes moved.
    pub fn route(&mut self, id: &str) -> Option<Route> {
        let connection = self.connections.get(id)?.clone();
        let (Some(rs), Some(rt)) = (
            self.regions.get(&connection.source_region),
            self.regions.get(&connection.target_region),
        ) else {
            return None;
        };
        let (a, b) = (rs.exit_toward(rt), rt.exit_toward(rs));
        let preferred = self.shaped_route(connection.kind, &connection, a, b);

        let obstacles = self.obstacles_except([connection.source.as_str(), connection.target.as_str()]);
        let blocked = match connection.kind {
            ConnectionType::Curved => polyline_blocked(&[a, b], obstacles.iter().copied()),
            _ => polyline_blocked(&preferred, obstacles.iter().copied()),
        };
        if !blocked {
            return Some(Route {
                connection: connection.id,
                kind: connection.kind,
                points: preferred,
                rerouted: false,
            });
        }

        let points = match self.search(a, b) {
            Some(path) => path,
            None => {
                tracing::debug!(connection = %id, "no obstacle-free path, using a direct segment");
                vec![a, b]
            }
        };
        Some(Route {
            connection: connection.id,
            kind: connection.kind,
            points,
            rerouted: true,
        })
    }

    /// Refreshes regions from `graph` and routes every connection.
    pub fn routes(&mut self, graph: &Graph) -> Vec<Route> {
        self.refresh(graph);
        let ids: Vec<String> = self.connections.keys().cloned().collect();
        ids.iter().filter_map(|id| self.route(id)).collect()
    }
}
