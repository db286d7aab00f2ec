//! Deployment executors
//!
//! An executor either creates an orchestration object or runs an administrative query,
//! and answers with raw text. Whether that text means success is decided by the caller
//! through [`check_reply`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Default reply prefix that marks a failed request
pub const DEFAULT_FAILURE_MARKER: &str = "FAIL";

/// Transport-level executor failures; rejected requests are `Ok` replies with the marker
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Executor unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to serialize object: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One call to the executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutorRequest {
    /// Create the serialized object
    Create { object: serde_json::Value },
    /// Run an administrative query such as `get service NAME -o json`
    Query { command: String },
}

impl ExecutorRequest {
    pub fn create<T: Serialize>(object: &T) -> Result<Self, ExecutorError> {
        Ok(ExecutorRequest::Create {
            object: serde_json::to_value(object)?,
        })
    }

    pub fn query(command: impl Into<String>) -> Self {
        ExecutorRequest::Query {
            command: command.into(),
        }
    }
}

/// Cluster-facing collaborator; every call is independently fallible
#[async_trait]
pub trait DeploymentExecutor: Send + Sync {
    async fn execute(&self, request: &ExecutorRequest) -> Result<String, ExecutorError>;
}

/// `Err(reply)` if the reply starts with the failure marker, `Ok(reply)` otherwise
pub fn check_reply(reply: String, failure_marker: &str) -> Result<String, String> {
    if !failure_marker.is_empty() && reply.starts_with(failure_marker) {
        Err(reply)
    } else {
        Ok(reply)
    }
}

/// Remote kubectl bridge speaking multipart over HTTP: `POST <base>/kubectl/`
#[derive(Debug, Clone)]
pub struct HttpKubectlExecutor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpKubectlExecutor {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/kubectl/", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DeploymentExecutor for HttpKubectlExecutor {
    #[instrument(level = "trace", skip(self, request))]
    async fn execute(&self, request: &ExecutorRequest) -> Result<String, ExecutorError> {
        let form = match request {
            ExecutorRequest::Create { object } => {
                let file = reqwest::multipart::Part::bytes(serde_json::to_vec(object)?)
                    .file_name("file.json");
                reqwest::multipart::Form::new()
                    .part("file", file)
                    .text("cmd", "create -f file.json")
            }
            ExecutorRequest::Query { command } => {
                reqwest::multipart::Form::new().text("cmd", command.clone())
            }
        };
        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let body = response.text().await?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), "executor replied");
        Ok(body)
    }
}

/// Runs a local `kubectl`, feeding created objects on stdin.
///
/// A non-zero exit is reported the way the HTTP bridge reports it: the output prefixed
/// with the failure marker.
#[derive(Debug, Clone)]
pub struct LocalKubectlExecutor {
    program: String,
    failure_marker: String,
}

impl LocalKubectlExecutor {
    pub fn new(program: impl Into<String>, failure_marker: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            failure_marker: failure_marker.into(),
        }
    }
}

#[async_trait]
impl DeploymentExecutor for LocalKubectlExecutor {
    #[instrument(level = "trace", skip(self, request), fields(program = %self.program))]
    async fn execute(&self, request: &ExecutorRequest) -> Result<String, ExecutorError> {
        let spawn_error = |source: std::io::Error| ExecutorError::Spawn {
            program: self.program.clone(),
            source,
        };

        let (args, stdin): (Vec<String>, Option<Vec<u8>>) = match request {
            ExecutorRequest::Create { object } => (
                vec!["create".into(), "-f".into(), "-".into()],
                Some(serde_json::to_vec(object)?),
            ),
            ExecutorRequest::Query { command } => {
                (command.split_whitespace().map(str::to_string).collect(), None)
            }
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(&bytes).await.map_err(spawn_error)?;
        }

        let output = child.wait_with_output().await.map_err(spawn_error)?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(text)
        } else {
            Ok(format!("{}: {}", self.failure_marker, text))
        }
    }
}

/// Records requests instead of sending them.
///
/// Created services get a synthetic cluster address so that service lookups made later
/// in the same run succeed; other queries fail unless answered from the query table.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    failure_marker: String,
    answers: HashMap<String, String>,
    log: Mutex<Vec<ExecutorRequest>>,
}

impl DryRunExecutor {
    pub fn new(failure_marker: impl Into<String>) -> Self {
        Self {
            failure_marker: failure_marker.into(),
            ..Self::default()
        }
    }

    /// Answer `command` with `reply` instead of looking at created objects
    pub fn with_answer(mut self, command: impl Into<String>, reply: impl Into<String>) -> Self {
        self.answers.insert(command.into(), reply.into());
        self
    }

    /// Every request seen so far, in order
    pub async fn requests(&self) -> Vec<ExecutorRequest> {
        self.log.lock().await.clone()
    }

    fn created_service(log: &[ExecutorRequest], name: &str) -> Option<serde_json::Value> {
        let services = log.iter().filter_map(|r| match r {
            ExecutorRequest::Create { object } if object["kind"] == "Service" => Some(object),
            _ => None,
        });
        services.enumerate().find_map(|(i, object)| {
            if object["metadata"]["name"] != name {
                return None;
            }
            let mut object = object.clone();
            object["spec"]["clusterIP"] = serde_json::Value::String(format!("10.0.0.{}", i + 1));
            Some(object)
        })
    }
}

#[async_trait]
impl DeploymentExecutor for DryRunExecutor {
    async fn execute(&self, request: &ExecutorRequest) -> Result<String, ExecutorError> {
        let mut log = self.log.lock().await;
        let reply = match request {
            ExecutorRequest::Create { object } => {
                let kind = object["kind"].as_str().unwrap_or("object").to_lowercase();
                let name = object["metadata"]["name"].as_str().unwrap_or_default();
                format!("{kind} \"{name}\" created (dry run)")
            }
            ExecutorRequest::Query { command } => {
                if let Some(answer) = self.answers.get(command) {
                    answer.clone()
                } else {
                    let words: Vec<&str> = command.split_whitespace().collect();
                    match words.as_slice() {
                        ["get", "service", name, "-o", "json"] => Self::created_service(&log, name)
                            .map(|svc| svc.to_string())
                            .unwrap_or_else(|| {
                                format!("{}: service \"{name}\" not found", self.failure_marker)
                            }),
                        _ => format!("{}: unsupported query {command:?}", self.failure_marker),
                    }
                }
            }
        };
        log.push(request.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     E[Executors] --> M[failure marker check]
    ///     E --> D[dry run]
    ///     D --> DC[create recorded]
    ///     D --> DQ[service lookup answered]
    ///     E --> H[http endpoint]
    /// ```

    #[test]
    fn test_check_reply_marker() {
        assert_eq!(check_reply("FAIL: nope".into(), "FAIL"), Err("FAIL: nope".into()));
        assert_eq!(check_reply("service created".into(), "FAIL"), Ok("service created".into()));
        assert_eq!(check_reply(String::new(), "FAIL"), Ok(String::new()));
        assert_eq!(check_reply("xFAIL".into(), "FAIL"), Ok("xFAIL".into()));
    }

    #[test]
    fn test_http_endpoint_normalized() {
        for base in ["http://bridge:9090/", "http://bridge:9090"] {
            assert_eq!(HttpKubectlExecutor::new(base).endpoint(), "http://bridge:9090/kubectl/");
        }
    }

    #[tokio::test]
    async fn test_dry_run_answers_lookup_for_created_service() {
        let executor = DryRunExecutor::new("FAIL");
        let svc = json!({
            "kind": "Service",
            "metadata": {"name": "b"},
            "spec": {"ports": [{"port": 9000}]}
        });
        let reply = executor
            .execute(&ExecutorRequest::Create { object: svc })
            .await
            .unwrap();
        assert_eq!(reply, "service \"b\" created (dry run)");

        let found = executor
            .execute(&ExecutorRequest::query("get service b -o json"))
            .await
            .unwrap();
        let found: serde_json::Value = serde_json::from_str(&found).unwrap();
        assert_eq!(found["spec"]["clusterIP"], "10.0.0.1");

        let missing = executor
            .execute(&ExecutorRequest::query("get service c -o json"))
            .await
            .unwrap();
        assert!(missing.starts_with("FAIL"));
        assert_eq!(executor.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_answer_table() {
        let executor = DryRunExecutor::new("FAIL").with_answer("version", "v1.2.3");
        let reply = executor.execute(&ExecutorRequest::query("version")).await.unwrap();
        assert_eq!(reply, "v1.2.3");
    }
}
