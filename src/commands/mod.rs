//! Workspace commands
//!
//! Commands and pointer events are the only inputs to a workspace. Both arrive through
//! the same ordered queue and are processed one at a time.

use crate::aggregate::GraphError;
use crate::infrastructure::ProviderError;
use crate::value_objects::{InputError, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operator actions on the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum WorkspaceCommand {
    /// Resolve an image manifest and place a container node
    AddContainer {
        /// `<domain>/<path>[:<version>]`
        image: String,
    },

    /// Place a disk node
    AddDisk {
        /// Name of an existing persistent disk
        name: String,
    },

    /// Place an ingress node
    AddIngress {
        /// External port; must be in `1..=65535`
        port: i64,
    },

    /// Compile the current graph and deploy it
    Commit,

    /// Remove every node and edge
    Reset,
}

/// Pointer input from the host surface, in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pointer", rename_all = "lowercase")]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

impl PointerEvent {
    pub fn point(&self) -> Point {
        match self {
            PointerEvent::Down(pt) | PointerEvent::Move(pt) | PointerEvent::Up(pt) => *pt,
        }
    }
}

/// One entry of the workspace input queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkspaceInput {
    Command(WorkspaceCommand),
    Pointer(PointerEvent),
}

impl From<WorkspaceCommand> for WorkspaceInput {
    fn from(command: WorkspaceCommand) -> Self {
        WorkspaceInput::Command(command)
    }
}

impl From<PointerEvent> for WorkspaceInput {
    fn from(event: PointerEvent) -> Self {
        WorkspaceInput::Pointer(event)
    }
}

/// Why an add command was rejected
#[derive(Debug, Error)]
pub enum WorkspaceCommandError {
    #[error("Rejected input: {0}")]
    Input(#[from] InputError),

    #[error("Image metadata lookup failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Graph rejected the node: {0}")]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     WI[WorkspaceInput] --> C[command JSON]
    ///     WI --> P[pointer JSON]
    /// ```

    #[test]
    fn test_inputs_decode_from_script_json() {
        let inputs: Vec<WorkspaceInput> = serde_json::from_str(
            r#"[
                {"command": "add-container", "image": "quay.io/acme/web"},
                {"command": "add-ingress", "port": 80},
                {"pointer": "down", "x": 60, "y": 110},
                {"pointer": "up", "x": 5, "y": 6},
                {"command": "commit"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            inputs,
            vec![
                WorkspaceCommand::AddContainer { image: "quay.io/acme/web".into() }.into(),
                WorkspaceCommand::AddIngress { port: 80 }.into(),
                PointerEvent::Down(Point::new(60, 110)).into(),
                PointerEvent::Up(Point::new(5, 6)).into(),
                WorkspaceCommand::Commit.into(),
            ]
        );
    }

    #[test]
    fn test_pointer_event_point() {
        assert_eq!(PointerEvent::Move(Point::new(3, 4)).point(), Point::new(3, 4));
    }
}
