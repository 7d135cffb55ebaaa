use rustc_hash::FxHashSet;
use serde::Serialize;
use trellis_graph::Graph;

/// Volume unit for connection density: one cube of 100 world units per side.
const VOLUME_UNIT: f64 = 100.0 * 100.0 * 100.0;

/// Shape statistics that drive strategy selection. Computed on demand, never cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// Edges over possible undirected pairs.
    pub density: f64,
    pub average_degree: f64,
    /// Edges per bounding volume, in units of 100³.
    pub connection_density: f64,
    /// Fraction of degree-1 nodes plus `1 - edges / nodes²`, clamped to `[0, 1]`.
    pub hierarchy_score: f64,
    /// Mean fraction of linked neighbor pairs over nodes with at least two neighbors.
    pub clustering_coefficient: f64,
}

impl GraphMetrics {
    pub fn compute(graph: &Graph) -> Self {
        let n = graph.node_count();
        let e = graph.edge_count();
        if n == 0 {
            return Self::default();
        }
        let nf = n as f64;
        let ef = e as f64;

        let density = if n > 1 {
            ef / (nf * (nf - 1.0) / 2.0)
        } else {
            0.0
        };
        let average_degree = 2.0 * ef / nf;

        let volume = graph
            .bounds()
            .map(|(min, max)| {
                let s = max - min;
                s.x.max(1.0) * s.y.max(1.0) * s.z.max(1.0)
            })
            .unwrap_or(0.0);
        let connection_density = ef / (volume / VOLUME_UNIT).max(1.0);

        let leaves = graph.nodes().filter(|node| graph.degree(&node.id) == 1).count();
        let hierarchy_score = (leaves as f64 / nf + (1.0 - ef / (nf * nf))).clamp(0.0, 1.0);

        Self {
            node_count: n,
            edge_count: e,
            density,
            average_degree,
            connection_density,
            hierarchy_score,
            clustering_coefficient: clustering_coefficient(graph),
        }
    }
}

fn clustering_coefficient(graph: &Graph) -> f64 {
    let links: FxHashSet<(&str, &str)> = graph
        .edges()
        .filter(|e| e.source != e.target)
        .flat_map(|e| {
            [
                (e.source.as_str(), e.target.as_str()),
                (e.target.as_str(), e.source.as_str()),
            ]
        })
        .collect();

    let mut total = 0.0;
    let mut counted = 0usize;
    for node in graph.nodes() {
        let neighbors = graph.neighbors(&node.id);
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut linked = 0usize;
        for (i, a) in neighbors.iter().enumerate() {
            for b in &neighbors[i + 1..] {
                if links.contains(&(*a, *b)) {
                    linked += 1;
                }
            }
        }
        total += linked as f64 / (k * (k - 1) / 2) as f64;
        counted += 1;
    }
    if counted == 0 { 0.0 } else { total / counted as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_graph::{Edge, Node};

    #[test]
    fn triangle_is_fully_clustered() {
        let mut g = Graph::new();
        for id in ["a", "b", "c"] {
            g.add_node(Node::new(id));
        }
        g.add_edge(Edge::new("ab", "a", "b")).unwrap();
        g.add_edge(Edge::new("bc", "b", "c")).unwrap();
        g.add_edge(Edge::new("ca", "c", "a")).unwrap();
        let m = GraphMetrics::compute(&g);
        assert_eq!(m.density, 1.0);
        assert_eq!(m.average_degree, 2.0);
        assert_eq!(m.clustering_coefficient, 1.0);
    }

    #[test]
    fn star_scores_as_hierarchy() {
        let mut g = Graph::new();
        g.add_node(Node::new("hub"));
        for i in 0..6 {
            g.add_node(Node::new(format!("leaf{i}")));
            g.add_edge(Edge::new(format!("e{i}"), "hub", format!("leaf{i}")))
                .unwrap();
        }
        let m = GraphMetrics::compute(&g);
        assert_eq!(m.hierarchy_score, 1.0);
        assert_eq!(m.clustering_coefficient, 0.0);
    }

    #[test]
    fn empty_graph_has_zero_metrics() {
        assert_eq!(GraphMetrics::compute(&Graph::new()), GraphMetrics::default());
    }
}
