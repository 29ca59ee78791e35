//! Editor-facing layer over `composer_graph`: node type tags, the semantic
//! passes run after every edit, and the flow and page composers.

pub mod config;
pub mod documents;
pub mod errors;
pub mod flow;
pub mod node_types;
pub mod page;
pub mod passes;

pub use config::*;
pub use documents::*;
pub use errors::*;
pub use flow::*;
pub use page::*;
pub use passes::*;
