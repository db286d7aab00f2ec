//! Topology aggregates

pub mod node;
pub mod workspace_graph;

pub use node::*;
pub use workspace_graph::*;
