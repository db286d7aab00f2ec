//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use cim_domain_topology::deployment::{CompilerOptions, DeploymentCompiler};
use cim_domain_topology::infrastructure::{
    DeploymentExecutor, DryRunExecutor, ExecutorError, ExecutorRequest, InMemoryImageProvider,
};
use cim_domain_topology::manifest::{Annotation, ImageApp, ImageManifest, MountDecl, PortDecl};
use cim_domain_topology::{
    NodeId, Point, PointerEvent, WorkspaceCommand, WorkspaceEvent, WorkspaceInput,
    WorkspaceSession, PLACEMENT,
};
use std::sync::Arc;

pub const WEB: &str = "quay.io/acme/web";
pub const PEER_A: &str = "example.com/peer-a";
pub const PEER_B: &str = "example.com/peer-b";
pub const STORE: &str = "example.com/store";

/// Offset from a freshly placed node's corner to a body point clear of its anchors
const GRAB: Point = Point { x: 5, y: 35 };

pub fn manifest(
    name: &str,
    ports: &[(&str, u16)],
    mounts: &[(&str, &str)],
    flags: &[(&str, &str, &str)],
) -> ImageManifest {
    ImageManifest {
        name: name.into(),
        app: Some(ImageApp {
            ports: ports
                .iter()
                .map(|(n, p)| PortDecl { name: n.to_string(), port: *p, protocol: None })
                .collect(),
            mount_points: mounts
                .iter()
                .map(|(n, p)| MountDecl {
                    name: n.to_string(),
                    path: p.to_string(),
                    read_only: false,
                })
                .collect(),
        }),
        annotations: flags
            .iter()
            .map(|(suffix, flag, kind)| Annotation {
                name: format!("required-flag/{suffix}"),
                value: format!("name={flag};type={kind}"),
            })
            .collect(),
    }
}

pub fn provider() -> InMemoryImageProvider {
    InMemoryImageProvider::new()
        .with(WEB, manifest(WEB, &[("http", 8080)], &[], &[]))
        .with(PEER_A, manifest(PEER_A, &[], &[], &[("peer", "--peer", "host-port")]))
        .with(PEER_B, manifest(PEER_B, &[("rpc", 9000)], &[], &[]))
        .with(STORE, manifest(STORE, &[], &[("data", "/var/lib/store")], &[]))
}

pub fn session_with(executor: Arc<dyn DeploymentExecutor>) -> WorkspaceSession {
    let compiler = DeploymentCompiler::with_executor(executor, CompilerOptions::default());
    WorkspaceSession::new(Arc::new(provider()), compiler)
}

/// Run one input and return its events
pub async fn input(
    session: &mut WorkspaceSession,
    input: impl Into<WorkspaceInput>,
) -> Vec<WorkspaceEvent> {
    session.process(input.into()).await
}

/// Apply `command` and drag the node it adds from the placement point to `to`
pub async fn add_at(
    session: &mut WorkspaceSession,
    command: WorkspaceCommand,
    to: Point,
) -> NodeId {
    let events = input(session, command).await;
    let node = events
        .iter()
        .find_map(|e| match e {
            WorkspaceEvent::NodeAdded { node, .. } => Some(*node),
            _ => None,
        })
        .unwrap_or_else(|| panic!("node not added: {events:?}"));
    let grab = PLACEMENT + GRAB;
    input(session, PointerEvent::Down(grab)).await;
    input(session, PointerEvent::Move(to + GRAB)).await;
    input(session, PointerEvent::Up(to + GRAB)).await;
    assert_eq!(session.graph().node(node).map(|n| n.position()), Some(to));
    node
}

/// Canvas position of anchor `index` of `node`
pub fn anchor_at(session: &WorkspaceSession, node: NodeId, index: usize) -> Point {
    let node = session.graph().node(node).expect("node present");
    node.anchor_position(&node.anchors()[index])
}

/// Draw an edge between two anchors with a press, one move and a release
pub async fn draw_edge(
    session: &mut WorkspaceSession,
    from: (NodeId, usize),
    to: (NodeId, usize),
) -> Vec<WorkspaceEvent> {
    let start = anchor_at(session, from.0, from.1);
    let end = anchor_at(session, to.0, to.1);
    input(session, PointerEvent::Down(start)).await;
    input(session, PointerEvent::Move(end)).await;
    input(session, PointerEvent::Up(end)).await
}

pub fn commit_report(events: &[WorkspaceEvent]) -> &cim_domain_topology::CommitReport {
    events
        .iter()
        .find_map(|e| match e {
            WorkspaceEvent::CommitFinished(report) => Some(report),
            _ => None,
        })
        .unwrap_or_else(|| panic!("commit did not finish: {events:?}"))
}

/// Dry run that rejects creation of services, and optionally workloads, with the given names
#[derive(Debug)]
pub struct RejectingExecutor {
    pub inner: DryRunExecutor,
    pub reject: Vec<String>,
    pub kinds: Vec<&'static str>,
}

impl RejectingExecutor {
    pub fn new(reject: &[&str]) -> Self {
        Self {
            inner: DryRunExecutor::new("FAIL"),
            reject: reject.iter().map(|s| s.to_string()).collect(),
            kinds: vec!["Service"],
        }
    }

    pub fn with_workloads(mut self) -> Self {
        self.kinds.push("ReplicationController");
        self
    }
}

#[async_trait]
impl DeploymentExecutor for RejectingExecutor {
    async fn execute(&self, request: &ExecutorRequest) -> Result<String, ExecutorError> {
        if let ExecutorRequest::Create { object } = request {
            let name = object["metadata"]["name"].as_str().unwrap_or_default();
            let kind = object["kind"].as_str().unwrap_or_default();
            if self.kinds.contains(&kind) && self.reject.iter().any(|r| r == name) {
                return Ok(format!("FAIL: {kind} \"{name}\" refused"));
            }
        }
        self.inner.execute(request).await
    }
}
