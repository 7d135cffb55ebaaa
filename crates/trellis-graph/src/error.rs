#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("edge {edge_id} references missing node {node_id}")]
    MissingEndpoint { edge_id: String, node_id: String },
}

pub type Result<T> = std::result::Result<T, GraphError>;
