//! Entry points for the presentation layer.
//!
//! The [`Workspace`] reacts to editor and tree events by updating the project
//! registry, refreshing statuses and reconciling the tree model.

mod workspace;

pub use workspace::{Activation, Workspace};
