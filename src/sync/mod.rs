//! Reconciliation of the tree model with the filesystem and status snapshots.

mod tree_synchronizer;

pub use tree_synchronizer::{StatusMaps, TreeSynchronizer};
