//! Scene projection
//!
//! Flattens the workspace graph into canvas coordinates for a rendering surface. Nodes
//! are listed in paint order, back-most first, so the front-most node is drawn last.

use crate::aggregate::WorkspaceGraph;
use crate::value_objects::{NodeId, Point, Size};
use serde::{Deserialize, Serialize};

/// Everything a rendering surface needs to draw one frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Nodes in paint order
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneLine>,
    /// The edge being drawn, from its source anchor to the cursor
    pub pending: Option<SceneLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub label: String,
    pub position: Point,
    pub size: Size,
    pub selected: bool,
    pub anchors: Vec<SceneAnchor>,
}

/// An anchor in canvas coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneAnchor {
    pub label: String,
    pub edge_point: Point,
    pub label_point: Point,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneLine {
    pub from: Point,
    pub to: Point,
}

impl Scene {
    /// Project the graph's current state
    pub fn project(graph: &WorkspaceGraph) -> Self {
        let anchor_point = |node: NodeId, index: usize| {
            let node = graph.node(node)?;
            let anchor = node.anchors().get(index)?;
            Some(node.anchor_position(anchor))
        };

        let nodes = graph
            .nodes()
            .iter()
            .rev()
            .map(|node| SceneNode {
                id: node.id(),
                label: node.label(),
                position: node.position(),
                size: node.size(),
                selected: node.is_selected(),
                anchors: node
                    .anchors()
                    .iter()
                    .map(|a| SceneAnchor {
                        label: a.label.clone(),
                        edge_point: node.anchor_position(a),
                        label_point: node.position() + a.label_point,
                    })
                    .collect(),
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .filter_map(|e| {
                Some(SceneLine {
                    from: anchor_point(e.source.node, e.source.index)?,
                    to: anchor_point(e.destination.node, e.destination.index)?,
                })
            })
            .collect();

        let pending = graph.pending().and_then(|p| {
            Some(SceneLine {
                from: anchor_point(p.source.node, p.source.index)?,
                to: p.cursor,
            })
        });

        Self { nodes, edges, pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AnchorRef;
    use crate::value_objects::{DiskName, IngressPort};

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     S[Scene::project] --> O[paint order]
    ///     S --> A[anchors in canvas space]
    ///     S --> P[pending line]
    /// ```

    #[test]
    fn test_scene_paints_front_node_last() {
        let mut graph = WorkspaceGraph::new();
        let disk = graph.add_disk(DiskName::new("pd-1").unwrap());
        let ingress = graph.add_ingress(IngressPort::new(80).unwrap());
        let scene = Scene::project(&graph);
        assert_eq!(scene.nodes[0].id, ingress);
        assert_eq!(scene.nodes[1].id, disk);
        assert_eq!(scene.nodes[1].anchors[0].edge_point, Point::new(60, 10));
        assert_eq!(scene.nodes[1].anchors[0].label_point, Point::new(60, 22));
    }

    #[test]
    fn test_scene_pending_line_follows_cursor() {
        let mut graph = WorkspaceGraph::new();
        let ingress = graph.add_ingress(IngressPort::new(80).unwrap());
        graph
            .begin_edge(AnchorRef { node: ingress, index: 0 }, Point::new(300, 300))
            .unwrap();
        let scene = Scene::project(&graph);
        assert_eq!(
            scene.pending,
            Some(SceneLine { from: Point::new(60, 110), to: Point::new(300, 300) })
        );
        assert!(scene.edges.is_empty());
    }
}
