//! One-shot geometric placements.
//!
//! These satisfy the strategy contract with closed-form placement functions; they never iterate
//! and keep the default no-op motion methods. Pinned nodes are left where they are.

mod layered;
mod shapes;

pub use layered::{Layered, LayeredStyle};
pub use shapes::{Circular, Grid, Sphere};

use trellis_graph::{Graph, Vec3};

/// Writes `positions` (in node order) onto every unpinned node.
fn place(graph: &mut Graph, positions: impl IntoIterator<Item = (String, Vec3)>) {
    for (id, p) in positions {
        if let Some(n) = graph.node_mut(&id) {
            if !n.is_pinned {
                n.position = p;
            }
        }
    }
}
