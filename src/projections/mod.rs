//! Topology projections

pub mod scene;

pub use scene::*;
