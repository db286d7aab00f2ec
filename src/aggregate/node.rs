//! Canvas nodes and their anchors
//!
//! A node is a container, a disk, or an ingress endpoint. Its anchors are laid out
//! when the node is built and never move relative to the node afterwards.

use crate::anchors::AnchorRole;
use crate::manifest::{ConstructionWarning, ImageManifest, ManifestError};
use crate::value_objects::{DiskName, IngressPort, NodeId, Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Horizontal padding added before the first anchor label and after each one
pub const ANCHOR_PADDING: i32 = 75;
/// Height of a container node
pub const CONTAINER_HEIGHT: i32 = 75;
/// Width and height of disk and ingress nodes
pub const FIXED_NODE_EXTENT: i32 = 100;
/// Distance from the node edge to an anchor's label
pub const LABEL_INSET: i32 = 12;
/// Where every new node is placed
pub const PLACEMENT: Point = Point { x: 10, y: 10 };

/// Measures rendered text, supplied by the rendering surface
pub trait TextMeasure: Debug + Send + Sync {
    /// Rendered width of `text` in pixels
    fn text_width(&self, text: &str) -> i32;
}

/// Fixed-pitch measure: every character is the same width
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub char_width: i32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { char_width: 12 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn text_width(&self, text: &str) -> i32 {
        let chars = i32::try_from(text.chars().count()).unwrap_or(i32::MAX);
        chars.saturating_mul(self.char_width)
    }
}

/// Exactly one payload per node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodePayload {
    Container { manifest: ImageManifest },
    Disk { name: DiskName },
    Ingress { port: IngressPort },
}

/// A typed connection point owned by a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Owning node; the node owns the anchor, not the other way round
    pub node: NodeId,
    /// Where edges attach, relative to the node's position
    pub edge_point: Point,
    /// Where the label is drawn, relative to the node's position
    pub label_point: Point,
    pub label: String,
    pub role: AnchorRole,
}

/// A placeable element of the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    payload: NodePayload,
    position: Point,
    size: Size,
    selected: bool,
    anchors: Vec<Anchor>,
}

impl Node {
    /// Build a container node from a manifest.
    ///
    /// Port anchors sit on the top edge; mount and required-flag anchors on the bottom
    /// edge. The node is wide enough for its name and for either anchor row, so labels
    /// never overlap.
    pub fn container(
        manifest: ImageManifest,
        measure: &dyn TextMeasure,
    ) -> Result<(Self, Vec<ConstructionWarning>), ManifestError> {
        let id = NodeId::new();
        let app = manifest.app()?;
        let (flags, warnings) = manifest.required_flags();

        let top: Vec<(String, AnchorRole)> = app
            .ports
            .iter()
            .map(|p| {
                (
                    format!("{}:{}", p.name, p.port),
                    AnchorRole::PortExport { name: p.name.clone(), port: p.port },
                )
            })
            .collect();

        let bottom: Vec<(String, AnchorRole)> = app
            .mount_points
            .iter()
            .map(|m| {
                (
                    m.name.clone(),
                    AnchorRole::MountPoint { name: m.name.clone(), path: m.path.clone() },
                )
            })
            .chain(flags.into_iter().map(|f| {
                (f.name, AnchorRole::RequiredFlag { flag: f.flag, kind: f.kind })
            }))
            .collect();

        let row_width = |row: &[(String, AnchorRole)]| {
            row.iter().fold(ANCHOR_PADDING, |acc, (label, _)| {
                acc.saturating_add(measure.text_width(label)).saturating_add(ANCHOR_PADDING)
            })
        };
        let width = measure
            .text_width(&manifest.name)
            .max(row_width(&top))
            .max(row_width(&bottom));

        let mut anchors = distribute(id, &top, width, 0, LABEL_INSET);
        anchors.extend(distribute(
            id,
            &bottom,
            width,
            CONTAINER_HEIGHT,
            CONTAINER_HEIGHT - LABEL_INSET,
        ));

        let node = Self {
            id,
            payload: NodePayload::Container { manifest },
            position: PLACEMENT,
            size: Size { width, height: CONTAINER_HEIGHT },
            selected: false,
            anchors,
        };
        Ok((node, warnings))
    }

    /// Build a disk node; its anchor sits mid-way along the top edge
    pub fn disk(name: DiskName) -> Self {
        let id = NodeId::new();
        let anchor = Anchor {
            node: id,
            edge_point: Point::new(FIXED_NODE_EXTENT / 2, 0),
            label_point: Point::new(FIXED_NODE_EXTENT / 2, LABEL_INSET),
            label: String::new(),
            role: AnchorRole::DiskAttachment { disk: name.as_str().to_string() },
        };
        Self::fixed(id, NodePayload::Disk { name }, anchor)
    }

    /// Build an ingress node; its anchor sits mid-way along the bottom edge
    pub fn ingress(port: IngressPort) -> Self {
        let id = NodeId::new();
        let anchor = Anchor {
            node: id,
            edge_point: Point::new(FIXED_NODE_EXTENT / 2, FIXED_NODE_EXTENT),
            label_point: Point::new(FIXED_NODE_EXTENT / 2, FIXED_NODE_EXTENT - LABEL_INSET),
            label: String::new(),
            role: AnchorRole::IngressAttachment { port: port.get() },
        };
        Self::fixed(id, NodePayload::Ingress { port }, anchor)
    }

    fn fixed(id: NodeId, payload: NodePayload, anchor: Anchor) -> Self {
        Self {
            id,
            payload,
            position: PLACEMENT,
            size: Size { width: FIXED_NODE_EXTENT, height: FIXED_NODE_EXTENT },
            selected: false,
            anchors: vec![anchor],
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// The manifest, for container nodes
    pub fn manifest(&self) -> Option<&ImageManifest> {
        match &self.payload {
            NodePayload::Container { manifest } => Some(manifest),
            _ => None,
        }
    }

    /// Top-left corner on the canvas
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Text shown in the middle of the node, also used to name it in notifications
    pub fn label(&self) -> String {
        match &self.payload {
            NodePayload::Container { manifest } => manifest.name.clone(),
            NodePayload::Disk { name } => name.to_string(),
            NodePayload::Ingress { port } => format!("port {port}"),
        }
    }

    /// Whether the node's bounding box contains `pt`
    pub fn contains(&self, pt: Point) -> bool {
        self.size.contains(self.position, pt)
    }

    /// Canvas position of an anchor's edge point
    pub fn anchor_position(&self, anchor: &Anchor) -> Point {
        self.position + anchor.edge_point
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub(crate) fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

/// Spread a row of anchors evenly across `width`: anchor `i` of `n` sits at
/// `(i + 1) * width / (n + 1)`.
fn distribute(
    node: NodeId,
    row: &[(String, AnchorRole)],
    width: i32,
    edge_y: i32,
    label_y: i32,
) -> Vec<Anchor> {
    let slots = i64::try_from(row.len()).unwrap_or(i64::MAX).saturating_add(1);
    row.iter()
        .enumerate()
        .map(|(i, (label, role))| {
            let i = i64::try_from(i).unwrap_or(i64::MAX);
            let x = (i + 1) * i64::from(width) / slots;
            let x = i32::try_from(x).unwrap_or(width);
            Anchor {
                node,
                edge_point: Point::new(x, edge_y),
                label_point: Point::new(x, label_y),
                label: label.clone(),
                role: role.clone(),
            }
        })
        .collect()
}
