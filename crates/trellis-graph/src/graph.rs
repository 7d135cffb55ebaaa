use crate::error::{GraphError, Result};
use crate::{Edge, GraphEvent, Node, Vec3};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Serialized form of a graph: plain node and edge lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Insertion-ordered node and edge tables with an incident-edge index.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<String, Edge>,
    incident: FxHashMap<String, Vec<String>>,
    events: Vec<GraphEvent>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from a document. Edges with a missing endpoint are rejected.
    pub fn from_document(doc: GraphDocument) -> Result<Self> {
        let mut g = Self::new();
        for n in doc.nodes {
            g.add_node(n);
        }
        for e in doc.edges {
            g.add_edge(e)?;
        }
        Ok(g)
    }

    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    /// Inserts or replaces a node.
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.incident.entry(node.id.clone()).or_default();
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Removes a node and its incident edges. Returns the removed node and the ids of the
    /// removed edges.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<String>)> {
        let node = self.nodes.shift_remove(id)?;
        let edge_ids = self.incident.remove(id).unwrap_or_default();
        let mut removed = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            if self.remove_edge(&edge_id).is_some() {
                removed.push(edge_id);
            }
        }
        Some((node, removed))
    }

    /// Inserts or replaces an edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: Edge) -> Result<&mut Self> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint.as_str()) {
                return Err(GraphError::MissingEndpoint {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
        if self.edges.contains_key(edge.id.as_str()) {
            self.remove_edge(&edge.id);
        }
        for endpoint in [&edge.source, &edge.target] {
            let list = self.incident.entry(endpoint.clone()).or_default();
            if !list.iter().any(|e| e == &edge.id) {
                list.push(edge.id.clone());
            }
        }
        self.edges.insert(edge.id.clone(), edge);
        Ok(self)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let edge = self.edges.shift_remove(id)?;
        for endpoint in [&edge.source, &edge.target] {
            if let Some(list) = self.incident.get_mut(endpoint.as_str()) {
                list.retain(|e| e != id);
            }
        }
        Some(edge)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn incident_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.incident
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edges.get(e.as_str()))
    }

    /// Distinct neighbors in first-seen order. Self loops are ignored.
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.incident_edges(id) {
            let Some(other) = e.other(id) else {
                continue;
            };
            if other == id {
                continue;
            }
            if !out.contains(&other) {
                out.push(other);
            }
        }
        out
    }

    pub fn degree(&self, id: &str) -> usize {
        self.incident.get(id).map_or(0, |l| l.len())
    }

    pub fn successors(&self, id: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.incident_edges(id) {
            if e.source == id && e.target != id && !out.contains(&e.target.as_str()) {
                out.push(e.target.as_str());
            }
        }
        out
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.incident_edges(id)
            .filter(|e| e.target == id && e.source != id)
            .count()
    }

    pub fn position(&self, id: &str) -> Option<Vec3> {
        self.nodes.get(id).map(|n| n.position)
    }

    /// Writes a position unless the node is missing. Returns whether it was written.
    pub fn set_position(&mut self, id: &str, position: Vec3) -> bool {
        match self.nodes.get_mut(id) {
            Some(n) => {
                n.position = position;
                true
            }
            None => false,
        }
    }

    pub fn positions(&self) -> IndexMap<String, Vec3> {
        self.nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.position))
            .collect()
    }

    /// Restores a snapshot taken with [`Graph::positions`]. Unknown ids are ignored.
    pub fn restore_positions(&mut self, snapshot: &IndexMap<String, Vec3>) {
        for (id, p) in snapshot {
            self.set_position(id, *p);
        }
    }

    /// Axis-aligned bounds of all node centers, or `None` for an empty graph.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.nodes.values();
        let first = it.next()?.position;
        let (mut min, mut max) = (first, first);
        for n in it {
            min = min.inf(&n.position);
            max = max.sup(&n.position);
        }
        Some((min, max))
    }

    pub fn emit(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }
}
