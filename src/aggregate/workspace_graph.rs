//! Workspace graph aggregate
//!
//! Owns the nodes on the canvas, the completed edges between their anchors, and at most
//! one edge still being drawn. Node order is paint and hit-test priority: index 0 is the
//! front-most node, wins every hit test, and is painted last.

use super::node::{Anchor, MonospaceMeasure, Node, TextMeasure};
use crate::anchors::{compatible, AnchorRole};
use crate::manifest::{ConstructionWarning, ImageManifest, ManifestError};
use crate::value_objects::{DiskName, EdgeId, IngressPort, NodeId, Point};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Squared pixel radius within which a point hits an anchor
pub const ANCHOR_HIT_RADIUS_SQUARED: i64 = 100;

/// Errors from graph mutations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Anchor not found: node {node} index {index}")]
    AnchorNotFound { node: NodeId, index: usize },

    #[error("Anchors cannot be connected: {source_role:?} -> {destination_role:?}")]
    IncompatibleAnchors {
        source_role: AnchorRole,
        destination_role: AnchorRole,
    },
}

/// Stable reference to an anchor: its node plus its declaration index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnchorRef {
    pub node: NodeId,
    pub index: usize,
}

/// A completed, type-checked connection between two anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: AnchorRef,
    pub destination: AnchorRef,
}

/// An edge still being drawn: fixed source, live cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEdge {
    pub source: AnchorRef,
    pub cursor: Point,
}

/// A completed edge with both anchors resolved
#[derive(Debug, Clone, Copy)]
pub struct Connection<'a> {
    pub edge: &'a Edge,
    pub source: &'a Anchor,
    pub destination: &'a Anchor,
}

/// Immutable view of nodes and completed edges.
///
/// This is what the deployment compiler reads; pending edges are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Nodes, front-most first
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn anchor(&self, anchor: AnchorRef) -> Option<&Anchor> {
        self.node(anchor.node)?.anchors().get(anchor.index)
    }

    /// Every completed edge with its anchors resolved
    pub fn connections(&self) -> impl Iterator<Item = Connection<'_>> {
        self.edges.iter().filter_map(move |edge| {
            Some(Connection {
                edge,
                source: self.anchor(edge.source)?,
                destination: self.anchor(edge.destination)?,
            })
        })
    }

    /// Connections whose destination anchor belongs to `node`
    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = Connection<'_>> {
        self.connections().filter(move |c| c.edge.destination.node == node)
    }

    /// Connections whose source anchor belongs to `node`
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = Connection<'_>> {
        self.connections().filter(move |c| c.edge.source.node == node)
    }

    /// First anchor, scanning nodes front to back and anchors in declaration order,
    /// whose edge point lies strictly within the hit radius of `pt`
    pub fn hit_anchor(&self, pt: Point) -> Option<AnchorRef> {
        self.nodes.iter().find_map(|node| {
            node.anchors()
                .iter()
                .position(|a| {
                    node.anchor_position(a).distance_squared_to(&pt) < ANCHOR_HIT_RADIUS_SQUARED
                })
                .map(|index| AnchorRef { node: node.id(), index })
        })
    }

    /// Front-most node whose bounding box contains `pt`
    pub fn hit_node(&self, pt: Point) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.contains(pt)).map(Node::id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The mutable graph store behind the canvas
#[derive(Debug, Clone)]
pub struct WorkspaceGraph {
    state: GraphSnapshot,
    pending: Option<PendingEdge>,
    measure: Arc<dyn TextMeasure>,
}

impl Default for WorkspaceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceGraph {
    /// Create an empty graph measuring labels in a monospace font
    pub fn new() -> Self {
        Self::with_measure(Arc::new(MonospaceMeasure::default()))
    }

    /// Create an empty graph using the rendering surface's text measure
    pub fn with_measure(measure: Arc<dyn TextMeasure>) -> Self {
        Self {
            state: GraphSnapshot::default(),
            pending: None,
            measure,
        }
    }

    /// Add a container node built from `manifest`.
    ///
    /// Fails without touching the graph when the manifest has no app section.
    pub fn add_container(
        &mut self,
        manifest: ImageManifest,
    ) -> Result<(NodeId, Vec<ConstructionWarning>), GraphError> {
        let (node, warnings) = Node::container(manifest, self.measure.as_ref())?;
        Ok((self.push(node), warnings))
    }

    pub fn add_disk(&mut self, name: DiskName) -> NodeId {
        self.push(Node::disk(name))
    }

    pub fn add_ingress(&mut self, port: IngressPort) -> NodeId {
        self.push(Node::ingress(port))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = node.id();
        debug!(node = %id, label = %node.label(), "node added");
        self.state.nodes.push(node);
        id
    }

    /// Nodes, front-most first
    pub fn nodes(&self) -> &[Node] {
        &self.state.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.state.edges
    }

    pub fn pending(&self) -> Option<&PendingEdge> {
        self.pending.as_ref()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.state.node(id)
    }

    pub fn anchor(&self, anchor: AnchorRef) -> Option<&Anchor> {
        self.state.anchor(anchor)
    }

    pub fn hit_anchor(&self, pt: Point) -> Option<AnchorRef> {
        self.state.hit_anchor(pt)
    }

    pub fn hit_node(&self, pt: Point) -> Option<NodeId> {
        self.state.hit_node(pt)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.state
            .nodes
            .iter_mut()
            .find(|n| n.id() == id)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Move `id` to the front of the paint and hit-test order
    pub fn promote_to_front(&mut self, id: NodeId) -> Result<(), GraphError> {
        let index = self
            .state
            .nodes
            .iter()
            .position(|n| n.id() == id)
            .ok_or(GraphError::NodeNotFound(id))?;
        let node = self.state.nodes.remove(index);
        self.state.nodes.insert(0, node);
        Ok(())
    }

    /// Set the node's top-left corner
    pub fn move_node(&mut self, id: NodeId, position: Point) -> Result<(), GraphError> {
        self.node_mut(id)?.set_position(position);
        Ok(())
    }

    /// Select `id`, clearing every other selection
    pub fn select(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_mut(id)?;
        for node in &mut self.state.nodes {
            node.set_selected(node.id() == id);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        for node in &mut self.state.nodes {
            node.set_selected(false);
        }
    }

    /// The selected node, if any
    pub fn selected(&self) -> Option<NodeId> {
        self.state.nodes.iter().find(|n| n.is_selected()).map(Node::id)
    }

    /// Start drawing an edge from `source`, replacing any edge already being drawn
    pub fn begin_edge(&mut self, source: AnchorRef, cursor: Point) -> Result<(), GraphError> {
        if self.anchor(source).is_none() {
            return Err(GraphError::AnchorNotFound {
                node: source.node,
                index: source.index,
            });
        }
        self.pending = Some(PendingEdge { source, cursor });
        Ok(())
    }

    /// Update the live cursor of the edge being drawn
    pub fn track_pending(&mut self, cursor: Point) {
        if let Some(pending) = self.pending.as_mut() {
            pending.cursor = cursor;
        }
    }

    /// Remove and return the edge being drawn
    pub fn take_pending(&mut self) -> Option<PendingEdge> {
        self.pending.take()
    }

    /// Store a completed edge if the anchor roles are compatible
    pub fn connect(
        &mut self,
        source: AnchorRef,
        destination: AnchorRef,
    ) -> Result<EdgeId, GraphError> {
        let missing = |a: AnchorRef| GraphError::AnchorNotFound { node: a.node, index: a.index };
        let src = self.anchor(source).ok_or_else(|| missing(source))?;
        let dst = self.anchor(destination).ok_or_else(|| missing(destination))?;
        if !compatible(&src.role, &dst.role) {
            return Err(GraphError::IncompatibleAnchors {
                source_role: src.role.clone(),
                destination_role: dst.role.clone(),
            });
        }

        let id = EdgeId::new();
        self.state.edges.push(Edge { id, source, destination });
        debug!(edge = %id, "edge connected");
        Ok(id)
    }

    /// Remove every node, edge, and pending edge
    pub fn reset(&mut self) {
        self.state = GraphSnapshot::default();
        self.pending = None;
    }

    /// Immutable copy of nodes and completed edges
    pub fn snapshot(&self) -> GraphSnapshot {
        self.state.clone()
    }
}
