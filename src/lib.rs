//! Workload topology domain for the Composable Information Machine
//!
//! Operators draw a graph of container images, persistent disks and ingress ports,
//! wire them together through typed anchors, and commit the graph. Commit compiles
//! the graph into services and replication controllers and submits them to a
//! container orchestrator.

pub mod aggregate;
pub mod anchors;
pub mod bridge;
pub mod commands;
pub mod config;
pub mod deployment;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod manifest;
pub mod projections;
pub mod value_objects;

// Re-export main types
pub use aggregate::*;
pub use anchors::{compatible, AnchorRole};
pub use events::*;

pub use commands::{PointerEvent, WorkspaceCommand, WorkspaceCommandError, WorkspaceInput};

pub use handlers::{InteractionController, InteractionState, WorkspaceSession};

pub use bridge::{spawn, SendError, WorkspaceEvents, WorkspaceHandle};

pub use config::{ConfigError, ExecutorKind, WorkspaceConfig};

pub use deployment::{CommitError, CommitReport, DeploymentCompiler};

pub use manifest::{ConstructionWarning, FlagKind, ImageManifest, ManifestError};

pub use projections::Scene;

pub use value_objects::{
    DiskName, EdgeId, ImageReference, IngressPort, InputError, NodeId, Point, Size,
};
