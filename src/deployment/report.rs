//! Commit results
//!
//! A commit never stops at the first failure. Each node's outcome is a value in the
//! report; the presentation layer turns the report into notifications.

use crate::events::Notification;
use crate::value_objects::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Service,
    ReplicationController,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Service => f.write_str("service"),
            ObjectKind::ReplicationController => f.write_str("replication controller"),
        }
    }
}

/// An object the executor accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedObject {
    pub node: NodeId,
    pub label: String,
    pub kind: ObjectKind,
    pub name: String,
    /// Raw executor reply
    pub output: String,
}

/// Why a node's object was not created
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FailureCause {
    #[error("rejected by executor: {reply}")]
    Rejected { reply: String },

    #[error("executor error: {0}")]
    Executor(String),

    #[error("lookup of service {service} failed: {reason}")]
    Lookup { service: String, reason: String },

    #[error("service {service} was not created")]
    DependencyFailed { service: String },
}

/// One node's failure in one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeFailure {
    pub node: NodeId,
    pub label: String,
    pub kind: ObjectKind,
    pub name: String,
    pub cause: FailureCause,
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: failed to create {} {}: {}", self.label, self.kind, self.name, self.cause)
    }
}

/// Outcome of a whole commit, services first, each phase in node order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReport {
    pub created: Vec<CreatedObject>,
    pub failures: Vec<NodeFailure>,
}

impl CommitReport {
    /// Whether every planned object was created
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn created_of(&self, kind: ObjectKind) -> impl Iterator<Item = &CreatedObject> {
        self.created.iter().filter(move |c| c.kind == kind)
    }

    pub fn failures_of(&self, kind: ObjectKind) -> impl Iterator<Item = &NodeFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    pub fn failure_for(&self, node: NodeId, kind: ObjectKind) -> Option<&NodeFailure> {
        self.failures.iter().find(|f| f.node == node && f.kind == kind)
    }

    /// One success notification per created object and one error per failure
    pub fn notifications(&self) -> Vec<Notification> {
        self.created
            .iter()
            .map(|c| {
                Notification::success(format!(
                    "created {} {}: {}",
                    c.kind,
                    c.name,
                    c.output.trim_end()
                ))
            })
            .chain(self.failures.iter().map(|f| Notification::error(f.to_string())))
            .collect()
    }
}

/// Whole-batch commit failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("Nothing to deploy: the graph has no container nodes")]
    NothingConstructed,
}
