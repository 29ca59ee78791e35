use composer_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("node '{destination}' does not accept resources of type '{resource_type}'")]
    NotAcceptable {
        resource_type: String,
        destination: String,
    },
}
