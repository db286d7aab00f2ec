//! Workspace event types

use crate::aggregate::AnchorRef;
use crate::deployment::CommitReport;
use crate::projections::Scene;
use crate::value_objects::{EdgeId, NodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// A user-visible message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Events emitted while processing workspace input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkspaceEvent {
    /// A node was placed on the canvas
    NodeAdded { node: NodeId, label: String },

    /// A node moved to the front of the paint order
    NodePromoted { node: NodeId },

    /// A pending edge was completed and stored
    EdgeConnected {
        edge: EdgeId,
        source: AnchorRef,
        destination: AnchorRef,
    },

    /// A pending edge was dropped without being stored
    EdgeDiscarded { source: AnchorRef },

    /// All nodes and edges were removed
    GraphReset,

    Notification(Notification),

    /// A commit ran to completion, possibly with per-node failures
    CommitFinished(CommitReport),

    /// A commit could not build a single object
    CommitFailed { reason: String },

    /// The graph changed or may have changed; draw this scene
    Redraw(Scene),
}
