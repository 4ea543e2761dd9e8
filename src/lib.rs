//! Project trees annotated with version-control status.
//!
//! A presentation layer drives a [`workspace::Workspace`] with editor and tree
//! events and applies the [`tree::TreeChange`]s it drains from the model.

#![allow(clippy::enum_variant_names)]

pub mod application;
pub mod cli;
pub mod config;
pub mod ext;
pub mod projects;
pub mod refresh;
pub mod render;
pub mod status;
pub mod sync;
pub mod tree;
pub mod workspace;
