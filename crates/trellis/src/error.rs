#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown layout strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("unknown layout mode: {name}")]
    UnknownMode { name: String },

    #[error("node not found: {id}")]
    MissingNode { id: String },

    #[error("invalid constraint: {reason}")]
    InvalidConstraint { reason: String },

    #[error(transparent)]
    Graph(#[from] trellis_graph::GraphError),

    #[error("simulation engine is not available")]
    EngineUnavailable,

    #[error("simulation engine failure: {message}")]
    Engine { message: String },

    #[error("invalid layout configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
