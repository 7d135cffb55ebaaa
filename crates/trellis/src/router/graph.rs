use super::Region;
use crate::geom::{Obstacle, perpendicular, try_normalize};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use trellis_graph::Vec3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOwner {
    Region(String),
    Intermediate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingNode {
    pub position: Vec3,
    pub owner: RoutingOwner,
    /// Routing nodes reachable by an obstacle-free straight segment.
    pub neighbors: Vec<usize>,
}

/// Connection points of every region plus one intermediate waypoint per region pair, linked
/// wherever the straight segment between two of them clears every obstacle.
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    nodes: Vec<RoutingNode>,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    est: f64,
    cost: f64,
    node: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .total_cmp(&self.est)
            .then_with(|| other.cost.total_cmp(&self.cost))
            .then_with(|| self.node.cmp(&other.node))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Waypoint between two regions, pushed sideways off the line between their centers so it can
/// lead around whatever sits on that line.
fn intermediate(a: &Region, b: &Region) -> Vec3 {
    let (ca, cb) = (a.bounds.center(), b.bounds.center());
    let mid = (ca + cb) / 2.0;
    let side = try_normalize(cb - ca).map_or_else(Vec3::y, perpendicular);
    let reach = a.bounds.half_size().norm().max(b.bounds.half_size().norm());
    mid + side * reach
}

impl RoutingGraph {
    pub fn build(regions: &IndexMap<String, Region>) -> Self {
        let mut nodes: Vec<RoutingNode> = Vec::new();
        for region in regions.values() {
            for p in region.connection_points() {
                nodes.push(RoutingNode {
                    position: p,
                    owner: RoutingOwner::Region(region.id.clone()),
                    neighbors: Vec::new(),
                });
            }
        }
        let list: Vec<&Region> = regions.values().collect();
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                nodes.push(RoutingNode {
                    position: intermediate(a, b),
                    owner: RoutingOwner::Intermediate,
                    neighbors: Vec::new(),
                });
            }
        }

        let obstacles: Vec<&Obstacle> = regions.values().flat_map(|r| r.obstacles()).collect();
        let n = nodes.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (nodes[i].position, nodes[j].position);
                if obstacles.iter().all(|o| !o.blocks(&a, &b)) {
                    nodes[i].neighbors.push(j);
                    nodes[j].neighbors.push(i);
                }
            }
        }
        Self { nodes }
    }

    pub fn nodes(&self) -> &[RoutingNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nearest(&self, p: &Vec3) -> Option<usize> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.position - p)
                    .norm_squared()
                    .total_cmp(&(b.position - p).norm_squared())
            })
            .map(|(i, _)| i)
    }

    /// A* with a Euclidean heuristic. Returns the routing node positions from `from` to `to`.
    pub fn find_path(&self, from: usize, to: usize) -> Option<Vec<Vec3>> {
        if from >= self.nodes.len() || to >= self.nodes.len() {
            return None;
        }
        let goal = self.nodes[to].position;
        let heuristic = |i: usize| (self.nodes[i].position - goal).norm();

        let mut best = vec![f64::INFINITY; self.nodes.len()];
        let mut prev: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut heap = BinaryHeap::new();
        best[from] = 0.0;
        heap.push(Entry {
            est: heuristic(from),
            cost: 0.0,
            node: from,
        });

        while let Some(Entry { cost, node, .. }) = heap.pop() {
            if node == to {
                let mut path = vec![self.nodes[to].position];
                let mut cur = to;
                while let Some(p) = prev[cur] {
                    path.push(self.nodes[p].position);
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            if cost > best[node] {
                continue;
            }
            let here = self.nodes[node].position;
            for &next in &self.nodes[node].neighbors {
                let step = (self.nodes[next].position - here).norm();
                let next_cost = cost + step;
                if next_cost >= best[next] {
                    continue;
                }
                best[next] = next_cost;
                prev[next] = Some(node);
                heap.push(Entry {
                    est: next_cost + heuristic(next),
                    cost: next_cost,
                    node: next,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph(points: &[Vec3], links: &[(usize, usize)]) -> RoutingGraph {
        let mut nodes: Vec<RoutingNode> = points
            .iter()
            .map(|p| RoutingNode {
                position: *p,
                owner: RoutingOwner::Intermediate,
                neighbors: Vec::new(),
            })
            .collect();
        for &(a, b) in links {
            nodes[a].neighbors.push(b);
            nodes[b].neighbors.push(a);
        }
        RoutingGraph { nodes }
    }

    #[test]
    fn astar_prefers_the_shorter_detour() {
        let g = line_graph(
            &[
                Vec3::zeros(),
                Vec3::new(50.0, 10.0, 0.0),
                Vec3::new(50.0, 80.0, 0.0),
                Vec3::new(100.0, 0.0, 0.0),
            ],
            &[(0, 1), (1, 3), (0, 2), (2, 3)],
        );
        let path = g.find_path(0, 3).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[1], Vec3::new(50.0, 10.0, 0.0));
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let g = line_graph(&[Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)], &[]);
        assert_eq!(g.find_path(0, 1), None);
        assert_eq!(g.nearest(&Vec3::new(0.9, 0.0, 0.0)), Some(1));
    }
}
