use super::place;
use crate::config::LayoutConfig;
use crate::error::Result;
use crate::strategy::{LayoutStrategy, StrategyKind};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::f64::consts::TAU;
use trellis_graph::{Graph, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayeredStyle {
    /// Layers stacked downward along -Y.
    Hierarchical,
    /// Layers left to right along +X.
    Flow,
    /// Concentric rings, one per layer.
    Radial,
}

/// Breadth-first layering from in-degree-0 roots.
#[derive(Debug, Clone, Copy)]
pub struct Layered {
    style: LayeredStyle,
}

impl Layered {
    pub fn new(style: LayeredStyle) -> Self {
        Self { style }
    }
}

/// Groups node ids by BFS depth. Nodes unreachable from any root start their own traversal, so
/// cyclic graphs still get a layering.
pub(crate) fn layers(graph: &Graph) -> Vec<Vec<String>> {
    let mut depth: IndexMap<&str, usize> = IndexMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    let roots = graph.nodes().filter(|n| graph.in_degree(&n.id) == 0);
    let seeds = roots.chain(graph.nodes()).map(|n| n.id.as_str());
    for seed in seeds {
        if depth.contains_key(seed) {
            continue;
        }
        depth.insert(seed, 0);
        queue.push_back(seed);
        while let Some(v) = queue.pop_front() {
            let d = depth[v];
            for w in graph.successors(v) {
                if !depth.contains_key(w) {
                    depth.insert(w, d + 1);
                    queue.push_back(w);
                }
            }
        }
    }

    let max_depth = depth.values().copied().max().unwrap_or(0);
    let mut out: Vec<Vec<String>> = vec![Vec::new(); if depth.is_empty() { 0 } else { max_depth + 1 }];
    for n in graph.nodes() {
        if let Some(&d) = depth.get(n.id.as_str()) {
            out[d].push(n.id.clone());
        }
    }
    out
}

impl LayoutStrategy for Layered {
    fn kind(&self) -> StrategyKind {
        match self.style {
            LayeredStyle::Hierarchical => StrategyKind::Hierarchical,
            LayeredStyle::Flow => StrategyKind::Flow,
            LayeredStyle::Radial => StrategyKind::Radial,
        }
    }

    fn init(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<()> {
        let layers = layers(graph);
        if layers.is_empty() {
            return Ok(());
        }
        let spacing = config.placement.spacing;
        let layer_spacing = config.placement.layer_spacing;
        let depth_offset = (layers.len() - 1) as f64 * layer_spacing / 2.0;

        let mut positions: Vec<(String, Vec3)> = Vec::with_capacity(graph.node_count());
        for (d, layer) in layers.into_iter().enumerate() {
            let count = layer.len();
            for (i, id) in layer.into_iter().enumerate() {
                let spread = (i as f64 - (count - 1) as f64 / 2.0) * spacing;
                let along = d as f64 * layer_spacing - depth_offset;
                let p = match self.style {
                    LayeredStyle::Hierarchical => Vec3::new(spread, -along, 0.0),
                    LayeredStyle::Flow => Vec3::new(along, -spread, 0.0),
                    LayeredStyle::Radial => {
                        if d == 0 && count == 1 {
                            Vec3::zeros()
                        } else {
                            let r = if d == 0 {
                                layer_spacing / 2.0
                            } else {
                                d as f64 * layer_spacing
                            };
                            let a = TAU * i as f64 / count as f64;
                            Vec3::new(r * a.cos(), r * a.sin(), 0.0)
                        }
                    }
                };
                positions.push((id, p));
            }
        }
        place(graph, positions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_graph::{Edge, Node};

    fn tree() -> Graph {
        let mut g = Graph::new();
        for id in ["root", "a", "b", "a1"] {
            g.add_node(Node::new(id));
        }
        g.add_edge(Edge::new("e1", "root", "a")).unwrap();
        g.add_edge(Edge::new("e2", "root", "b")).unwrap();
        g.add_edge(Edge::new("e3", "a", "a1")).unwrap();
        g
    }

    #[test]
    fn layers_follow_bfs_depth() {
        let l = layers(&tree());
        assert_eq!(
            l,
            vec![
                vec!["root".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["a1".to_string()],
            ]
        );
    }

    #[test]
    fn cycles_still_layer_every_node() {
        let mut g = Graph::new();
        for id in ["x", "y", "z"] {
            g.add_node(Node::new(id));
        }
        g.add_edge(Edge::new("xy", "x", "y")).unwrap();
        g.add_edge(Edge::new("yz", "y", "z")).unwrap();
        g.add_edge(Edge::new("zx", "z", "x")).unwrap();
        let total: usize = layers(&g).iter().map(Vec::len).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn hierarchical_puts_children_below_parents() {
        let mut g = tree();
        Layered::new(LayeredStyle::Hierarchical)
            .init(&mut g, &LayoutConfig::default())
            .unwrap();
        let root = g.position("root").unwrap();
        let a = g.position("a").unwrap();
        let a1 = g.position("a1").unwrap();
        assert!(root.y > a.y && a.y > a1.y);
        assert_eq!(root.x, 0.0);
    }

    #[test]
    fn radial_centers_a_single_root() {
        let mut g = tree();
        Layered::new(LayeredStyle::Radial)
            .init(&mut g, &LayoutConfig::default())
            .unwrap();
        assert_eq!(g.position("root"), Some(Vec3::zeros()));
        assert!((g.position("a1").unwrap().norm() - 240.0).abs() < 1e-9);
    }
}
