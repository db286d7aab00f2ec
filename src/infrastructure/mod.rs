//! Infrastructure layer implementations
//!
//! Concrete adapters for the collaborators the topology domain talks to: the image
//! metadata provider and the deployment executor.

mod executor;
mod provider;

pub use executor::{
    check_reply, DeploymentExecutor, DryRunExecutor, ExecutorError, ExecutorRequest,
    HttpKubectlExecutor, LocalKubectlExecutor, DEFAULT_FAILURE_MARKER,
};
pub use provider::{HttpImageProvider, ImageMetadataProvider, InMemoryImageProvider, ProviderError};
