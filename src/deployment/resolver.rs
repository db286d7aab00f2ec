//! Service address resolution
//!
//! Workloads with host-port flags need the address the orchestrator assigned to another
//! node's service. The compiler asks a [`ServiceResolver`] for it, so tests can swap in
//! a fake.

use crate::infrastructure::{check_reply, DeploymentExecutor, ExecutorError, ExecutorRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Where a service can be reached
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceAddress {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Lookup of service {service} rejected: {reply}")]
    Rejected { service: String, reply: String },

    #[error("Unparsable reply for service {service}: {source}")]
    Parse {
        service: String,
        source: serde_json::Error,
    },

    #[error("Service {0} has no cluster address yet")]
    NoAddress(String),

    #[error("Service {0} exposes no ports")]
    NoPorts(String),
}

/// Looks up an already-created service by name
#[async_trait]
pub trait ServiceResolver: Send + Sync {
    async fn resolve(&self, service: &str) -> Result<ServiceAddress, ResolveError>;
}

/// Resolves services by querying the deployment executor:
/// `get service <name> -o json`, then `spec.clusterIP` and the first `spec.ports[].port`
#[derive(Clone)]
pub struct ExecutorServiceResolver {
    executor: Arc<dyn DeploymentExecutor>,
    failure_marker: String,
}

impl ExecutorServiceResolver {
    pub fn new(executor: Arc<dyn DeploymentExecutor>, failure_marker: impl Into<String>) -> Self {
        Self {
            executor,
            failure_marker: failure_marker.into(),
        }
    }
}

#[derive(Deserialize)]
struct LookupReply {
    #[serde(default)]
    spec: LookupSpec,
}

#[derive(Default, Deserialize)]
struct LookupSpec {
    #[serde(rename = "clusterIP", default)]
    cluster_ip: Option<String>,
    #[serde(default)]
    ports: Vec<LookupPort>,
}

#[derive(Deserialize)]
struct LookupPort {
    port: u16,
}

/// Pull the address out of a `get service -o json` reply
pub fn parse_lookup(service: &str, reply: &str) -> Result<ServiceAddress, ResolveError> {
    let parsed: LookupReply = serde_json::from_str(reply).map_err(|source| ResolveError::Parse {
        service: service.to_string(),
        source,
    })?;
    let host = parsed
        .spec
        .cluster_ip
        .filter(|ip| !ip.is_empty() && ip != "None")
        .ok_or_else(|| ResolveError::NoAddress(service.to_string()))?;
    let port = parsed
        .spec
        .ports
        .first()
        .map(|p| p.port)
        .ok_or_else(|| ResolveError::NoPorts(service.to_string()))?;
    Ok(ServiceAddress { host, port })
}

#[async_trait]
impl ServiceResolver for ExecutorServiceResolver {
    #[instrument(level = "trace", skip(self))]
    async fn resolve(&self, service: &str) -> Result<ServiceAddress, ResolveError> {
        let request = ExecutorRequest::query(format!("get service {service} -o json"));
        let reply = self.executor.execute(&request).await?;
        let reply = check_reply(reply, &self.failure_marker)
            .map_err(|reply| ResolveError::Rejected { service: service.to_string(), reply })?;
        parse_lookup(service, &reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::DryRunExecutor;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     R[ExecutorServiceResolver] --> P[parse_lookup]
    ///     P --> OK[address + first port]
    ///     P --> NA[no address]
    ///     P --> NP[no ports]
    ///     R --> RJ[rejected reply]
    /// ```

    #[test]
    fn test_parse_lookup_uses_first_port() {
        let reply = r#"{
            "spec": {
                "clusterIP": "10.0.0.5",
                "ports": [{"port": 9000, "targetPort": "http"}, {"port": 9001}]
            }
        }"#;
        assert_eq!(
            parse_lookup("b", reply).unwrap(),
            ServiceAddress { host: "10.0.0.5".into(), port: 9000 }
        );
    }

    #[test]
    fn test_parse_lookup_failures() {
        assert!(matches!(
            parse_lookup("b", r#"{"spec": {"ports": [{"port": 9000}]}}"#),
            Err(ResolveError::NoAddress(_))
        ));
        assert!(matches!(
            parse_lookup("b", r#"{"spec": {"clusterIP": "10.0.0.5"}}"#),
            Err(ResolveError::NoPorts(_))
        ));
        assert!(matches!(parse_lookup("b", "nope"), Err(ResolveError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_rejected_lookup() {
        let executor = Arc::new(DryRunExecutor::new("FAIL"));
        let resolver = ExecutorServiceResolver::new(executor, "FAIL");
        assert!(matches!(
            resolver.resolve("missing").await,
            Err(ResolveError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn test_answered_lookup() {
        let executor = Arc::new(DryRunExecutor::new("FAIL").with_answer(
            "get service b -o json",
            r#"{"spec": {"clusterIP": "10.0.0.5", "ports": [{"port": 9000}]}}"#,
        ));
        let resolver = ExecutorServiceResolver::new(executor, "FAIL");
        assert_eq!(
            resolver.resolve("b").await.unwrap(),
            ServiceAddress { host: "10.0.0.5".into(), port: 9000 }
        );
    }
}
