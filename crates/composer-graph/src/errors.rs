use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph model: missing tree definition")]
    MissingTree,
    #[error("graph model: root node key is not initialized")]
    NotInitialized,
    #[error("cannot move node '{key}' under '{parent}': target lies inside the moved subtree")]
    CyclicMove { key: String, parent: String },
    #[error("invalid node patch: {0}")]
    InvalidPatch(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
