//! Workspace input handlers
//!
//! The interaction controller turns pointer events into graph edits; the session
//! routes every input, runs commits, and reports back as events.

pub mod interaction;
pub mod session;

pub use interaction::{InteractionController, InteractionState};
pub use session::WorkspaceSession;
