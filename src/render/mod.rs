//! Terminal presentation of the project forest.

mod tree_renderer;

pub use tree_renderer::TreeRenderer;
