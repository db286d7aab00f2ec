//! Image metadata providers
//!
//! Resolve an image reference to its manifest. A manifest without an app section is
//! a provider failure: no container node can be built from it.

use crate::manifest::{ImageManifest, ManifestError};
use crate::value_objects::ImageReference;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Image metadata provider unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Image metadata provider answered {status} for {image}: {body}")]
    Status { image: String, status: u16, body: String },

    #[error("No manifest known for {0}")]
    NotFound(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Resolves image references to manifests
#[async_trait]
pub trait ImageMetadataProvider: Send + Sync {
    /// Fetch and validate the manifest for `image`
    async fn fetch(&self, image: &ImageReference) -> Result<ImageManifest, ProviderError>;
}

/// Fetches manifests from `GET <base>/container/<domain>/<path>:<version>`
#[derive(Debug, Clone)]
pub struct HttpImageProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Provider URL for `image`
    pub fn url_for(&self, image: &ImageReference) -> String {
        format!("{}/container/{}", self.base_url, image)
    }
}

#[async_trait]
impl ImageMetadataProvider for HttpImageProvider {
    #[instrument(level = "trace", skip(self), fields(image = %image))]
    async fn fetch(&self, image: &ImageReference) -> Result<ImageManifest, ProviderError> {
        let response = self.client.get(self.url_for(image)).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                image: image.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        let manifest = ImageManifest::from_json(&body)?;
        manifest.app()?;
        debug!(name = %manifest.name, "manifest fetched");
        Ok(manifest)
    }
}

/// Serves manifests from memory, keyed by full reference or by repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageProvider {
    manifests: HashMap<String, ImageManifest>,
}

impl InMemoryImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `manifest` under `key`, either `<domain>/<path>` or `<domain>/<path>:<version>`
    pub fn insert(&mut self, key: impl Into<String>, manifest: ImageManifest) {
        self.manifests.insert(key.into(), manifest);
    }

    pub fn with(mut self, key: impl Into<String>, manifest: ImageManifest) -> Self {
        self.insert(key, manifest);
        self
    }
}

#[async_trait]
impl ImageMetadataProvider for InMemoryImageProvider {
    async fn fetch(&self, image: &ImageReference) -> Result<ImageManifest, ProviderError> {
        let manifest = self
            .manifests
            .get(&image.to_string())
            .or_else(|| self.manifests.get(&image.repository()))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(image.to_string()))?;
        manifest.app()?;
        Ok(manifest)
    }
}
