#![forbid(unsafe_code)]

//! Graph container APIs used by `trellis`.
//!
//! The graph owns node and edge records; layout strategies read them each pass and write only
//! node positions (plus container extents). Observability flows back through a queue of
//! [`GraphEvent`]s that the host drains once per frame.

mod edge;
mod error;
mod event;
mod graph;
mod node;

pub use edge::{Edge, EdgeConstraint, EdgeData};
pub use error::{GraphError, Result};
pub use event::GraphEvent;
pub use graph::{Graph, GraphDocument};
pub use node::{Node, NodeData};

/// Position / velocity / force vector used throughout the layout engine.
pub type Vec3 = nalgebra::Vector3<f64>;
