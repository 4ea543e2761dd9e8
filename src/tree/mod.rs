//! In-memory forest of project trees.
//!
//! Nodes live in an arena addressed by [`NodeId`]. Only directories the user
//! expanded have real children; every other directory holds a single
//! placeholder node.

mod tree_model;
mod tree_node;

pub use tree_model::{TreeChange, TreeModel};
pub use tree_node::{NodeId, NodeKind, TreeNode};
