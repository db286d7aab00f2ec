//! Container image manifests
//!
//! The image metadata provider answers with an app-container style manifest: the image
//! name, the ports the app exposes, the volumes it mounts, and free-form annotations.
//! One annotation family declares a *required flag*: a startup argument that must be
//! wired to another container's exposed port.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors produced while decoding or validating a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Unparsable image manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Image {name} has no app section")]
    MissingApp { name: String },
}

/// An image manifest as served by the metadata provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<ImageApp>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// The runnable part of a manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageApp {
    #[serde(default)]
    pub ports: Vec<PortDecl>,
    #[serde(default)]
    pub mount_points: Vec<MountDecl>,
}

/// A network port exposed by the app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDecl {
    pub name: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A named volume mount the app expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountDecl {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// A free-form name/value annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

/// The kind of value a required flag expects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagKind {
    /// `<address>:<port>` of another container's service
    HostPort,
    /// Any kind this system does not know how to satisfy
    Other(String),
}

impl FlagKind {
    /// Parse the `type=` field of a required-flag annotation
    pub fn parse(kind: &str) -> Self {
        match kind {
            "host-port" => FlagKind::HostPort,
            other => FlagKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FlagKind::HostPort => "host-port",
            FlagKind::Other(kind) => kind,
        }
    }
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A startup argument the container declares it must receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredFlag {
    /// Suffix of the annotation name, used as the anchor label
    pub name: String,
    /// Command-line flag to pass, as declared
    pub flag: String,
    pub kind: FlagKind,
}

/// Non-fatal problems noticed while turning a manifest into a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionWarning {
    /// The flag kind is unknown; its anchor exists but can never be connected
    UnsupportedFlagKind { annotation: String, kind: String },
    /// The annotation name claims a required flag but the value does not parse
    MalformedRequiredFlag { annotation: String, value: String },
}

impl fmt::Display for ConstructionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructionWarning::UnsupportedFlagKind { annotation, kind } => {
                write!(f, "Unknown required-flag type {kind:?} on annotation {annotation}")
            }
            ConstructionWarning::MalformedRequiredFlag { annotation, value } => {
                write!(f, "Malformed required-flag annotation {annotation}: {value:?}")
            }
        }
    }
}

struct FlagPatterns {
    name: Regex,
    value: Regex,
}

fn flag_patterns() -> Option<&'static FlagPatterns> {
    static PATTERNS: OnceLock<Option<FlagPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(FlagPatterns {
                name: Regex::new(r"^required-flag/(.+)$").ok()?,
                value: Regex::new(r"^name=([^;]*);type=(.*)$").ok()?,
            })
        })
        .as_ref()
}

impl ImageManifest {
    /// Decode a manifest from the provider's JSON body
    pub fn from_json(body: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(body)?)
    }

    /// The app section, which every placeable container must have
    pub fn app(&self) -> Result<&ImageApp, ManifestError> {
        self.app.as_ref().ok_or_else(|| ManifestError::MissingApp {
            name: self.name.clone(),
        })
    }

    /// Extract declared required flags in annotation order.
    ///
    /// Flags of unknown kind are still returned, each paired with a warning. Annotations
    /// that look like required flags but cannot be parsed are skipped with a warning.
    pub fn required_flags(&self) -> (Vec<RequiredFlag>, Vec<ConstructionWarning>) {
        let mut flags = Vec::new();
        let mut warnings = Vec::new();
        let Some(patterns) = flag_patterns() else {
            return (flags, warnings);
        };

        for ann in &self.annotations {
            let Some(name) = patterns.name.captures(&ann.name) else {
                continue;
            };
            let Some(value) = patterns.value.captures(&ann.value) else {
                warnings.push(ConstructionWarning::MalformedRequiredFlag {
                    annotation: ann.name.clone(),
                    value: ann.value.clone(),
                });
                continue;
            };

            let kind = FlagKind::parse(&value[2]);
            if let FlagKind::Other(other) = &kind {
                warnings.push(ConstructionWarning::UnsupportedFlagKind {
                    annotation: ann.name.clone(),
                    kind: other.clone(),
                });
            }
            flags.push(RequiredFlag {
                name: name[1].to_string(),
                flag: value[1].to_string(),
                kind,
            });
        }

        (flags, warnings)
    }
}
