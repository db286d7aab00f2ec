//! Topology value objects
//!
//! Value objects are immutable types that represent concepts in the topology domain.
//! They are compared by value rather than identity and encapsulate input validation:
//! an invalid image reference, ingress port, or disk name never reaches the graph.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when operator input is rejected at the point of entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Malformed image reference: {0:?}")]
    MalformedImageReference(String),

    #[error("Ingress port must be between 1 and 65535, got {0}")]
    InvalidIngressPort(i64),

    #[error("Disk name must not be empty")]
    EmptyDiskName,
}

/// Unique identifier for a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a completed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Create a new random edge ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point on the canvas in whole pixels
///
/// Used both for absolute canvas coordinates and for offsets local to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another point
    pub fn distance_squared_to(&self, other: &Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x.wrapping_add(rhs.x), self.y.wrapping_add(rhs.y))
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x.wrapping_sub(rhs.x), self.y.wrapping_sub(rhs.y))
    }
}

/// Represents the size of a node's bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    /// Create a new size
    pub fn new(width: i32, height: i32) -> Result<Self, String> {
        if width <= 0 || height <= 0 {
            return Err("Size dimensions must be positive".to_string());
        }
        Ok(Self { width, height })
    }

    /// Whether a box of this size placed at `origin` contains `pt`.
    ///
    /// Left and top edges are inside, right and bottom edges are outside.
    pub fn contains(&self, origin: Point, pt: Point) -> bool {
        let (px, py) = (i64::from(pt.x), i64::from(pt.y));
        let (ox, oy) = (i64::from(origin.x), i64::from(origin.y));
        px >= ox
            && px < ox + i64::from(self.width)
            && py >= oy
            && py < oy + i64::from(self.height)
    }
}

/// A fully-qualified container image reference: `<domain>/<path>[:<version>]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    domain: String,
    path: String,
    version: String,
}

fn image_reference_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([^/:\s]+)/([^:\s]+)(?::(\S+))?$").ok())
        .as_ref()
}

impl ImageReference {
    /// Version used when the reference omits one
    pub const DEFAULT_VERSION: &'static str = "latest";

    /// Parse an image reference, defaulting the version to `latest`
    pub fn parse(input: &str) -> Result<Self, InputError> {
        let malformed = || InputError::MalformedImageReference(input.to_string());
        let caps = image_reference_pattern()
            .and_then(|re| re.captures(input))
            .ok_or_else(malformed)?;
        let path = &caps[2];
        if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
            return Err(malformed());
        }
        Ok(Self {
            domain: caps[1].to_string(),
            path: path.to_string(),
            version: caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| Self::DEFAULT_VERSION.to_string()),
        })
    }

    /// The registry domain, e.g. `quay.io`
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The image path within the domain, e.g. `acme/worker`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The image version or tag
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The reference without its version: `<domain>/<path>`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.domain, self.path, self.version)
    }
}

/// The externally exposed port chosen for an ingress node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngressPort(u16);

impl IngressPort {
    /// Validate a raw port number; ports must lie in `1..=65535`
    pub fn new(port: i64) -> Result<Self, InputError> {
        match u16::try_from(port) {
            Ok(p) if p > 0 => Ok(Self(p)),
            _ => Err(InputError::InvalidIngressPort(port)),
        }
    }

    /// The port number
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for IngressPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of a persistent disk known to the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiskName(String);

impl DiskName {
    /// Validate a disk name; surrounding whitespace is trimmed and empty names rejected
    pub fn new(name: impl AsRef<str>) -> Result<Self, InputError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyDiskName);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The disk name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
