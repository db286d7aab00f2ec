//! Workspace configuration
//!
//! Built-in defaults, overlaid by an optional JSON file, then by `TOPOLOGY_*`
//! environment variables. The CLI applies its own flags last.

use crate::bridge::DEFAULT_CHANNEL_CAPACITY;
use crate::deployment::{CompilerOptions, DeploymentCompiler, DEFAULT_DISK_FS_TYPE};
use crate::infrastructure::{
    DeploymentExecutor, DryRunExecutor, HttpImageProvider, HttpKubectlExecutor,
    ImageMetadataProvider, LocalKubectlExecutor, DEFAULT_FAILURE_MARKER,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const ENV_PROVIDER_URL: &str = "TOPOLOGY_PROVIDER_URL";
pub const ENV_EXECUTOR: &str = "TOPOLOGY_EXECUTOR";
pub const ENV_EXECUTOR_URL: &str = "TOPOLOGY_EXECUTOR_URL";
pub const ENV_KUBECTL: &str = "TOPOLOGY_KUBECTL";
pub const ENV_FAILURE_MARKER: &str = "TOPOLOGY_FAILURE_MARKER";

const DEFAULT_URL: &str = "http://localhost:9090";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown executor kind: {0}")]
    UnknownExecutor(String),

    #[error("Invalid config: {0}")]
    Validation(String),
}

/// Which deployment executor a workspace submits through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// Multipart HTTP bridge in front of kubectl
    #[default]
    Http,
    /// A kubectl binary on this machine
    Kubectl,
    /// Record requests without deploying
    DryRun,
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutorKind::Http => "http",
            ExecutorKind::Kubectl => "kubectl",
            ExecutorKind::DryRun => "dry-run",
        })
    }
}

impl FromStr for ExecutorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ExecutorKind::Http),
            "kubectl" => Ok(ExecutorKind::Kubectl),
            "dry-run" | "dryrun" => Ok(ExecutorKind::DryRun),
            other => Err(ConfigError::UnknownExecutor(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Base URL of the image metadata provider
    #[serde(default = "default_url")]
    pub provider_url: String,

    #[serde(default)]
    pub executor: ExecutorKind,

    /// Base URL of the HTTP executor bridge
    #[serde(default = "default_url")]
    pub executor_url: String,

    #[serde(default = "default_kubectl_path")]
    pub kubectl_path: String,

    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,

    /// Filesystem of persistent-disk volumes
    #[serde(default = "default_disk_fs_type")]
    pub disk_fs_type: String,

    /// Inputs queued before senders wait
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_kubectl_path() -> String {
    "kubectl".to_string()
}

fn default_failure_marker() -> String {
    DEFAULT_FAILURE_MARKER.to_string()
}

fn default_disk_fs_type() -> String {
    DEFAULT_DISK_FS_TYPE.to_string()
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            provider_url: default_url(),
            executor: ExecutorKind::default(),
            executor_url: default_url(),
            kubectl_path: default_kubectl_path(),
            failure_marker: default_failure_marker(),
            disk_fs_type: default_disk_fs_type(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl WorkspaceConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by the `TOPOLOGY_*` names
    pub fn apply_vars(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_PROVIDER_URL) {
            self.provider_url = url;
        }
        if let Some(kind) = lookup(ENV_EXECUTOR) {
            self.executor = kind.parse()?;
        }
        if let Some(url) = lookup(ENV_EXECUTOR_URL) {
            self.executor_url = url;
        }
        if let Some(path) = lookup(ENV_KUBECTL) {
            self.kubectl_path = path;
        }
        if let Some(marker) = lookup(ENV_FAILURE_MARKER) {
            self.failure_marker = marker;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_marker.is_empty() {
            return Err(ConfigError::Validation("failure_marker must not be empty".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Validation("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            failure_marker: self.failure_marker.clone(),
            disk_fs_type: self.disk_fs_type.clone(),
        }
    }

    pub fn build_provider(&self) -> Arc<dyn ImageMetadataProvider> {
        Arc::new(HttpImageProvider::new(&self.provider_url))
    }

    pub fn build_executor(&self) -> Arc<dyn DeploymentExecutor> {
        match self.executor {
            ExecutorKind::Http => Arc::new(HttpKubectlExecutor::new(&self.executor_url)),
            ExecutorKind::Kubectl => Arc::new(LocalKubectlExecutor::new(
                self.kubectl_path.clone(),
                self.failure_marker.clone(),
            )),
            ExecutorKind::DryRun => Arc::new(DryRunExecutor::new(self.failure_marker.clone())),
        }
    }

    /// Compiler submitting through the configured executor
    pub fn build_compiler(&self) -> DeploymentCompiler {
        DeploymentCompiler::with_executor(self.build_executor(), self.compiler_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     C[WorkspaceConfig] --> D[defaults]
    ///     C --> F[partial JSON file]
    ///     C --> E[environment overlay]
    ///     E --> K[executor kind parsing]
    ///     C --> V[validation]
    /// ```

    #[test]
    fn test_defaults() {
        let config = WorkspaceConfig::default();
        assert_eq!(config.provider_url, "http://localhost:9090");
        assert_eq!(config.executor, ExecutorKind::Http);
        assert_eq!(config.kubectl_path, "kubectl");
        assert_eq!(config.failure_marker, "FAIL");
        assert_eq!(config.disk_fs_type, "ext4");
        assert_eq!(config.channel_capacity, 256);
        assert_eq!(WorkspaceConfig::from_json("{}").unwrap(), config);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let config =
            WorkspaceConfig::from_json(r#"{"executor": "dry-run", "disk_fs_type": "xfs"}"#)
                .unwrap();
        assert_eq!(config.executor, ExecutorKind::DryRun);
        assert_eq!(config.disk_fs_type, "xfs");
        assert_eq!(config.executor_url, "http://localhost:9090");
        assert_eq!(config.compiler_options().disk_fs_type, "xfs");
    }

    #[test]
    fn test_environment_overlay() {
        let vars: HashMap<&str, &str> = [
            (ENV_PROVIDER_URL, "http://registry:1"),
            (ENV_EXECUTOR, "Kubectl"),
            (ENV_KUBECTL, "/usr/local/bin/kubectl"),
            (ENV_FAILURE_MARKER, "ERR"),
        ]
        .into_iter()
        .collect();
        let mut config = WorkspaceConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.provider_url, "http://registry:1");
        assert_eq!(config.executor, ExecutorKind::Kubectl);
        assert_eq!(config.kubectl_path, "/usr/local/bin/kubectl");
        assert_eq!(config.failure_marker, "ERR");
        assert_eq!(config.executor_url, "http://localhost:9090");
    }

    #[test]
    fn test_rejections() {
        let mut config = WorkspaceConfig::default();
        assert!(matches!(
            config.apply_vars(|key| (key == ENV_EXECUTOR).then(|| "ftp".to_string())),
            Err(ConfigError::UnknownExecutor(_))
        ));
        assert!(matches!(
            WorkspaceConfig::from_json(r#"{"channel_capacity": 0}"#),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            WorkspaceConfig::from_json(r#"{"failure_marker": ""}"#),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(WorkspaceConfig::from_json("[1]"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_executor_kind_round_trips_through_display() {
        for kind in [ExecutorKind::Http, ExecutorKind::Kubectl, ExecutorKind::DryRun] {
            assert_eq!(kind.to_string().parse::<ExecutorKind>().unwrap(), kind);
        }
    }
}
