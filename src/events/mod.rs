//! Workspace events
//!
//! Everything a workspace reports back to its host surface: graph changes, redraw
//! requests, notifications, and commit outcomes.

mod workspace_events;

pub use workspace_events::*;
