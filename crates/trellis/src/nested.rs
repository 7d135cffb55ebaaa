//! Recursive container layout.
//!
//! A container node owns a sub-layout for its children. Each pass lays children out in the
//! container's local `[-1, 1]` frame with an inline strategy, maps them back into the container's
//! padded bounds and then refits container extents bottom-up.

use crate::config::{LayoutConfig, NestedConfig};
use crate::error::Result;
use crate::geom::{Bounds, EPSILON};
use crate::strategy::{LayoutStrategy, StrategyKind, create_inline_strategy};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use trellis_graph::{Graph, Node, Vec3};

/// Parent/child relation between containers and the nodes they hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Containment {
    parent: FxHashMap<String, String>,
    children: IndexMap<String, Vec<String>>,
    containers: Vec<String>,
}

impl Containment {
    /// Reads containment from `data.parent_container` and from edges flagged `contains`. The
    /// explicit parent field wins when both are present.
    pub fn from_graph(graph: &Graph) -> Self {
        let mut parent: FxHashMap<String, String> = FxHashMap::default();
        for node in graph.nodes() {
            if let Some(p) = node.data.parent_container.as_deref() {
                if p != node.id && graph.has_node(p) {
                    parent.insert(node.id.clone(), p.to_string());
                } else if p != node.id {
                    tracing::warn!(node = %node.id, parent = %p, "parent container not in graph");
                }
            }
        }
        for edge in graph.edges().filter(|e| e.data.contains) {
            if edge.source != edge.target {
                parent
                    .entry(edge.target.clone())
                    .or_insert_with(|| edge.source.clone());
            }
        }

        let mut children: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut containers = Vec::new();
        for node in graph.nodes() {
            let holds_children = parent.values().any(|p| *p == node.id);
            if node.data.is_container || holds_children {
                containers.push(node.id.clone());
                children.insert(node.id.clone(), Vec::new());
            }
        }
        for node in graph.nodes() {
            if let Some(p) = parent.get(&node.id) {
                if let Some(list) = children.get_mut(p) {
                    list.push(node.id.clone());
                }
            }
        }
        Self {
            parent,
            children,
            containers,
        }
    }

    pub fn parent(&self, id: &str) -> Option<&str> {
        self.parent.get(id).map(String::as_str)
    }

    pub fn children(&self, id: &str) -> &[String] {
        self.children.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn containers(&self) -> &[String] {
        &self.containers
    }

    pub fn is_container(&self, id: &str) -> bool {
        self.children.contains_key(id)
    }

    /// Containers without a container parent.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.containers
            .iter()
            .filter(|c| self.parent(c).is_none_or(|p| !self.is_container(p)))
            .map(String::as_str)
    }

    /// True when walking up from `id` loops instead of reaching a root.
    pub fn is_cyclic(&self, id: &str) -> bool {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut current = id;
        while let Some(p) = self.parent(current) {
            if !seen.insert(p) {
                return true;
            }
            current = p;
        }
        false
    }
}

/// The child frame a container was laid out in, and the extent the resize step wrote back.
#[derive(Debug, Clone, Copy)]
struct Frame {
    half_size: Vec3,
    written: Vec3,
}

/// Lays out container children recursively. Sub-strategies are cached per
/// `(container id, strategy kind)` and re-initialized on every pass.
///
/// When containers are resized to fit their children, the child frame of each container is
/// remembered until something other than the composer changes the container's extent, so
/// repeated passes over an unchanged graph place everything at the same positions.
#[derive(Default)]
pub struct NestedLayoutComposer {
    cache: IndexMap<(String, StrategyKind), Box<dyn LayoutStrategy>>,
    frames: FxHashMap<String, Frame>,
}

impl fmt::Debug for NestedLayoutComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedLayoutComposer")
            .field("cached", &self.cache.keys().collect::<Vec<_>>())
            .finish()
    }
}

struct Pass<'a> {
    containment: &'a Containment,
    config: &'a LayoutConfig,
    visited: FxHashSet<String>,
    laid_out: usize,
}

impl NestedLayoutComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_strategies(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached sub-strategy and the remembered frame belonging to `id`.
    pub fn remove_node(&mut self, id: &str) {
        self.frames.remove(id);
        self.cache.retain(|(container, _), strategy| {
            if container == id {
                strategy.dispose();
                false
            } else {
                true
            }
        });
    }

    pub fn dispose(&mut self) {
        for strategy in self.cache.values_mut() {
            strategy.dispose();
        }
        self.cache.clear();
        self.frames.clear();
    }

    /// Frame the children of `container` are placed in: the padded extent, or the frame of the
    /// previous pass if the extent is still the one that pass wrote.
    fn child_frame(&self, container: &Node, padding: f64) -> Bounds {
        let half_size = match (self.frames.get(&container.id), container.extent) {
            (Some(frame), Some(extent)) if frame.written == extent => frame.half_size,
            _ => Bounds::from_center(Vec3::zeros(), container.half_extent())
                .shrink(padding)
                .half_size(),
        };
        Bounds::from_center(container.position, half_size)
    }

    /// Lays out every container reachable from the roots. Returns how many containers received
    /// a sub-layout.
    pub fn layout(&mut self, graph: &mut Graph, config: &LayoutConfig) -> Result<usize> {
        let containment = Containment::from_graph(graph);
        let mut pass = Pass {
            containment: &containment,
            config,
            visited: FxHashSet::default(),
            laid_out: 0,
        };
        let roots: Vec<String> = containment.roots().map(str::to_string).collect();
        for root in &roots {
            self.layout_container(graph, &mut pass, root, 0)?;
        }
        // Containers caught in a containment cycle have no root.
        for id in containment.containers() {
            if !pass.visited.contains(id) && containment.is_cyclic(id) {
                self.layout_container(graph, &mut pass, id, 0)?;
            }
        }
        tracing::debug!(containers = pass.laid_out, "nested layout pass");
        Ok(pass.laid_out)
    }

    fn child_kind(graph: &Graph, id: &str, nested: &NestedConfig) -> StrategyKind {
        let requested = graph
            .node(id)
            .and_then(|n| n.data.child_layout.as_deref())
            .unwrap_or(nested.default_child_layout.as_str());
        match requested.parse() {
            Ok(kind) => kind,
            Err(err) => {
                tracing::warn!(container = %id, %err, "falling back to grid for children");
                StrategyKind::Grid
            }
        }
    }

    fn layout_container(
        &mut self,
        graph: &mut Graph,
        pass: &mut Pass<'_>,
        id: &str,
        depth: usize,
    ) -> Result<()> {
        let config = pass.config;
        let nested = &config.nested;
        if !pass.visited.insert(id.to_string()) {
            tracing::warn!(container = %id, "cyclic containment, container skipped");
            return Ok(());
        }
        if depth > nested.recursion_depth {
            tracing::warn!(container = %id, depth, "nested recursion depth exceeded");
            return Ok(());
        }
        let children = pass.containment.children(id).to_vec();
        if children.is_empty() {
            return Ok(());
        }
        let Some(container) = graph.node(id) else {
            return Ok(());
        };
        let bounds = self.child_frame(container, nested.container_padding);

        let mut sub = Graph::new();
        for child in &children {
            if let Some(node) = graph.node(child) {
                let mut local = node.clone();
                local.position = bounds.normalize(&node.position);
                sub.add_node(local);
            }
        }
        for edge in graph.edges() {
            if !edge.data.contains && sub.has_node(&edge.source) && sub.has_node(&edge.target) {
                sub.add_edge(edge.clone())?;
            }
        }

        let kind = Self::child_kind(graph, id, nested);
        let strategy = self
            .cache
            .entry((id.to_string(), kind))
            .or_insert_with(|| create_inline_strategy(kind));
        strategy.init(&mut sub, config)?;

        let inset = (1.0 - nested.child_spacing).clamp(0.0, 1.0);
        for (child, local) in fit_to_unit_frame(&sub, inset) {
            if let Some(node) = graph.node_mut(&child) {
                if !node.is_pinned {
                    node.position = bounds.denormalize(&local);
                }
            }
        }
        pass.laid_out += 1;

        for child in &children {
            if pass.containment.is_container(child) {
                self.layout_container(graph, pass, child, depth + 1)?;
            }
        }

        if nested.resize_containers {
            if let Some(written) = resize_to_children(graph, id, &children, nested.container_padding)
            {
                let frame = Frame {
                    half_size: bounds.half_size(),
                    written,
                };
                self.frames.insert(id.to_string(), frame);
            }
        }
        Ok(())
    }
}

/// Uniformly scales and centers the unpinned nodes of `sub` into `[-inset, inset]` on every axis.
fn fit_to_unit_frame(sub: &Graph, inset: f64) -> Vec<(String, Vec3)> {
    let free: Vec<(&str, Vec3)> = sub
        .nodes()
        .filter(|n| !n.is_pinned)
        .map(|n| (n.id.as_str(), n.position))
        .collect();
    let Some(extent) = Bounds::around_spheres(free.iter().map(|(_, p)| (*p, 0.0))) else {
        return Vec::new();
    };
    let center = extent.center();
    let largest = extent.half_size().max();
    let scale = if largest > EPSILON { inset / largest } else { 0.0 };
    free.into_iter()
        .map(|(id, p)| (id.to_string(), (p - center) * scale))
        .collect()
}

/// Sets the container's half-extent so it encloses every child plus `padding`, symmetric about
/// the container's current position. Returns the extent written.
fn resize_to_children(
    graph: &mut Graph,
    id: &str,
    children: &[String],
    padding: f64,
) -> Option<Vec3> {
    let center = graph.position(id)?;
    let mut half = Vec3::zeros();
    for child in children {
        if let Some(node) = graph.node(child) {
            let reach = (node.position - center).map(f64::abs) + node.half_extent();
            half = half.sup(&reach);
        }
    }
    let half = half.add_scalar(padding.max(0.0));
    let container = graph.node_mut(id)?;
    container.extent = Some(half);
    Some(half)
}
