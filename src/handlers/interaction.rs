//! Pointer interaction state machine
//!
//! Turns pointer gestures into graph mutations: pressing on an anchor starts an edge,
//! pressing on a node body starts a drag. Each event is handled to completion and
//! always ends with a redraw.

use crate::aggregate::{GraphError, WorkspaceGraph};
use crate::commands::PointerEvent;
use crate::events::WorkspaceEvent;
use crate::projections::Scene;
use crate::value_objects::{NodeId, Point};
use tracing::debug;

/// What the current gesture is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// A node follows the pointer
    DraggingNode {
        node: NodeId,
        /// Pointer position when the drag started
        drag_origin: Point,
        /// Node position when the drag started
        placement_origin: Point,
    },
    /// The graph holds a pending edge that follows the pointer
    ConnectingEdge,
}

/// Single-threaded controller that owns the gesture state
#[derive(Debug, Default)]
pub struct InteractionController {
    state: InteractionState,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Forget any gesture in progress without touching the graph
    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Process one pointer event. The last returned event is always a redraw.
    pub fn handle(
        &mut self,
        graph: &mut WorkspaceGraph,
        event: PointerEvent,
    ) -> Vec<WorkspaceEvent> {
        let mut events = Vec::new();
        let outcome = match event {
            PointerEvent::Down(pt) => self.pointer_down(graph, pt, &mut events),
            PointerEvent::Move(pt) => self.pointer_move(graph, pt),
            PointerEvent::Up(pt) => self.pointer_up(graph, pt, &mut events),
        };
        if let Err(err) = outcome {
            // The gesture's node is gone; give up on the gesture.
            debug!(error = %err, "abandoning gesture");
            graph.take_pending();
            graph.clear_selection();
            self.state = InteractionState::Idle;
        }
        events.push(WorkspaceEvent::Redraw(Scene::project(graph)));
        events
    }

    fn pointer_down(
        &mut self,
        graph: &mut WorkspaceGraph,
        pt: Point,
        events: &mut Vec<WorkspaceEvent>,
    ) -> Result<(), GraphError> {
        self.abandon(graph, events);

        if let Some(anchor) = graph.hit_anchor(pt) {
            graph.begin_edge(anchor, pt)?;
            self.state = InteractionState::ConnectingEdge;
            debug!(node = %anchor.node, index = anchor.index, "connecting edge");
            return Ok(());
        }

        if let Some(node) = graph.hit_node(pt) {
            let placement_origin = graph
                .node(node)
                .map(|n| n.position())
                .ok_or(GraphError::NodeNotFound(node))?;
            if graph.nodes().first().map(|n| n.id()) != Some(node) {
                graph.promote_to_front(node)?;
                events.push(WorkspaceEvent::NodePromoted { node });
            }
            graph.select(node)?;
            self.state = InteractionState::DraggingNode {
                node,
                drag_origin: pt,
                placement_origin,
            };
            debug!(node = %node, "dragging node");
        }
        Ok(())
    }

    fn pointer_move(&mut self, graph: &mut WorkspaceGraph, pt: Point) -> Result<(), GraphError> {
        match self.state {
            InteractionState::Idle => Ok(()),
            InteractionState::DraggingNode {
                node,
                drag_origin,
                placement_origin,
            } => graph.move_node(node, placement_origin + (pt - drag_origin)),
            InteractionState::ConnectingEdge => {
                graph.track_pending(pt);
                Ok(())
            }
        }
    }

    fn pointer_up(
        &mut self,
        graph: &mut WorkspaceGraph,
        pt: Point,
        events: &mut Vec<WorkspaceEvent>,
    ) -> Result<(), GraphError> {
        let state = std::mem::take(&mut self.state);
        match state {
            InteractionState::Idle => Ok(()),
            InteractionState::DraggingNode {
                node,
                drag_origin,
                placement_origin,
            } => {
                graph.clear_selection();
                graph.move_node(node, placement_origin + (pt - drag_origin))
            }
            InteractionState::ConnectingEdge => {
                let Some(pending) = graph.take_pending() else {
                    return Ok(());
                };
                let target = graph.hit_anchor(pt);
                let connected = target.and_then(|destination| {
                    graph
                        .connect(pending.source, destination)
                        .ok()
                        .map(|edge| (edge, destination))
                });
                match connected {
                    Some((edge, destination)) => events.push(WorkspaceEvent::EdgeConnected {
                        edge,
                        source: pending.source,
                        destination,
                    }),
                    None => {
                        debug!(node = %pending.source.node, "edge discarded");
                        events.push(WorkspaceEvent::EdgeDiscarded { source: pending.source });
                    }
                }
                Ok(())
            }
        }
    }

    /// A press while a gesture is still open ends that gesture first
    fn abandon(&mut self, graph: &mut WorkspaceGraph, events: &mut Vec<WorkspaceEvent>) {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => {}
            InteractionState::DraggingNode { .. } => graph.clear_selection(),
            InteractionState::ConnectingEdge => {
                if let Some(pending) = graph.take_pending() {
                    events.push(WorkspaceEvent::EdgeDiscarded { source: pending.source });
                }
            }
        }
    }
}
