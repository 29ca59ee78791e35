mod enrichment;
mod particles;
mod prune;
mod selection;

pub use enrichment::*;
pub use particles::*;
pub use prune::*;
pub use selection::*;
