//! Ordered compound graph for editor documents.
//!
//! Documents (page component trees, templates, flows) arrive as plain nested
//! trees, are imported into a keyed node set with parent/child edges and a
//! per-sibling order index, get mutated by editor actions, and are exported
//! back to plain trees for rendering and persistence.

pub mod config;
pub mod errors;
pub mod keys;
pub mod model;
pub mod node;
pub mod tree;
pub mod value;
pub mod visit;

pub use config::*;
pub use errors::*;
pub use model::*;
pub use node::*;
pub use tree::*;
pub use visit::*;
