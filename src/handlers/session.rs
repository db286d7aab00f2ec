//! Workspace session
//!
//! Owns the graph and the interaction controller and applies inputs one at a time.
//! Commit takes a snapshot and runs the compiler to completion before returning, so no
//! later input can observe or change the graph mid-commit.

use super::interaction::InteractionController;
use crate::aggregate::WorkspaceGraph;
use crate::commands::{WorkspaceCommand, WorkspaceCommandError, WorkspaceInput};
use crate::deployment::DeploymentCompiler;
use crate::events::{Notification, WorkspaceEvent};
use crate::infrastructure::ImageMetadataProvider;
use crate::projections::Scene;
use crate::value_objects::{DiskName, ImageReference, IngressPort, NodeId};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct WorkspaceSession {
    graph: WorkspaceGraph,
    controller: InteractionController,
    provider: Arc<dyn ImageMetadataProvider>,
    compiler: DeploymentCompiler,
}

impl WorkspaceSession {
    pub fn new(provider: Arc<dyn ImageMetadataProvider>, compiler: DeploymentCompiler) -> Self {
        Self::with_graph(WorkspaceGraph::new(), provider, compiler)
    }

    pub fn with_graph(
        graph: WorkspaceGraph,
        provider: Arc<dyn ImageMetadataProvider>,
        compiler: DeploymentCompiler,
    ) -> Self {
        Self {
            graph,
            controller: InteractionController::new(),
            provider,
            compiler,
        }
    }

    pub fn graph(&self) -> &WorkspaceGraph {
        &self.graph
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn into_graph(self) -> WorkspaceGraph {
        self.graph
    }

    /// Apply one input. Rejections become error notifications; the last event is
    /// always a redraw.
    pub async fn process(&mut self, input: WorkspaceInput) -> Vec<WorkspaceEvent> {
        match input {
            WorkspaceInput::Pointer(event) => self.controller.handle(&mut self.graph, event),
            WorkspaceInput::Command(command) => {
                let mut events = match self.apply(command).await {
                    Ok(events) => events,
                    Err(err) => {
                        warn!(error = %err, "command rejected");
                        vec![WorkspaceEvent::Notification(Notification::error(err.to_string()))]
                    }
                };
                events.push(WorkspaceEvent::Redraw(Scene::project(&self.graph)));
                events
            }
        }
    }

    /// Apply one command, failing without mutating the graph when its input is invalid
    #[instrument(level = "trace", skip(self))]
    pub async fn apply(
        &mut self,
        command: WorkspaceCommand,
    ) -> Result<Vec<WorkspaceEvent>, WorkspaceCommandError> {
        match command {
            WorkspaceCommand::AddContainer { image } => {
                let reference = ImageReference::parse(&image)?;
                let manifest = self.provider.fetch(&reference).await?;
                let (node, warnings) = self.graph.add_container(manifest)?;
                let mut events = vec![self.node_added(node)];
                events.extend(warnings.into_iter().map(|w| {
                    warn!(node = %node, warning = %w, "construction warning");
                    WorkspaceEvent::Notification(Notification::warning(w.to_string()))
                }));
                Ok(events)
            }
            WorkspaceCommand::AddDisk { name } => {
                let node = self.graph.add_disk(DiskName::new(name)?);
                Ok(vec![self.node_added(node)])
            }
            WorkspaceCommand::AddIngress { port } => {
                let node = self.graph.add_ingress(IngressPort::new(port)?);
                Ok(vec![self.node_added(node)])
            }
            WorkspaceCommand::Reset => {
                self.graph.reset();
                self.controller.reset();
                Ok(vec![WorkspaceEvent::GraphReset])
            }
            WorkspaceCommand::Commit => Ok(self.commit().await),
        }
    }

    async fn commit(&mut self) -> Vec<WorkspaceEvent> {
        let snapshot = self.graph.snapshot();
        match self.compiler.commit(&snapshot).await {
            Ok(report) => {
                info!(clean = report.is_clean(), "commit complete");
                let mut events: Vec<WorkspaceEvent> = report
                    .notifications()
                    .into_iter()
                    .map(WorkspaceEvent::Notification)
                    .collect();
                events.push(WorkspaceEvent::CommitFinished(report));
                events
            }
            Err(err) => vec![
                WorkspaceEvent::Notification(Notification::error(format!(
                    "Failed to bring everything up: {err}"
                ))),
                WorkspaceEvent::CommitFailed { reason: err.to_string() },
            ],
        }
    }

    fn node_added(&self, node: NodeId) -> WorkspaceEvent {
        let label = self.graph.node(node).map(|n| n.label()).unwrap_or_default();
        WorkspaceEvent::NodeAdded { node, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::PointerEvent;
    use crate::events::Severity;
    use crate::infrastructure::{DryRunExecutor, InMemoryImageProvider};
    use crate::manifest::{Annotation, ImageApp, ImageManifest, PortDecl};
    use crate::deployment::CompilerOptions;
    use crate::value_objects::Point;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     WS[WorkspaceSession] --> AC[add container]
    ///     AC --> W[warning notification]
    ///     AC --> PF[provider failure]
    ///     AC --> BR[bad reference]
    ///     WS --> AD[add disk / ingress validation]
    ///     WS --> R[reset]
    ///     WS --> C[commit]
    ///     C --> CF[nothing constructed]
    ///     WS --> RD[redraw after every input]
    /// ```

    fn provider() -> InMemoryImageProvider {
        InMemoryImageProvider::new()
            .with(
                "quay.io/acme/web",
                ImageManifest {
                    name: "quay.io/acme/web".into(),
                    app: Some(ImageApp {
                        ports: vec![PortDecl { name: "http".into(), port: 8080, protocol: None }],
                        mount_points: vec![],
                    }),
                    annotations: vec![Annotation {
                        name: "required-flag/db".into(),
                        value: "name=--db;type=sql".into(),
                    }],
                },
            )
            .with(
                "example.com/bare",
                ImageManifest { name: "example.com/bare".into(), app: None, annotations: vec![] },
            )
    }

    fn session() -> WorkspaceSession {
        let compiler = DeploymentCompiler::with_executor(
            Arc::new(DryRunExecutor::new("FAIL")),
            CompilerOptions::default(),
        );
        WorkspaceSession::new(Arc::new(provider()), compiler)
    }

    fn notifications(events: &[WorkspaceEvent]) -> Vec<&Notification> {
        events
            .iter()
            .filter_map(|e| match e {
                WorkspaceEvent::Notification(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_add_container_with_unknown_flag_kind_warns() {
        let mut session = session();
        let events = session
            .process(WorkspaceCommand::AddContainer { image: "quay.io/acme/web".into() }.into())
            .await;
        assert!(matches!(
            events[0],
            WorkspaceEvent::NodeAdded { ref label, .. } if label == "quay.io/acme/web"
        ));
        let notes = notifications(&events);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
        assert!(matches!(events.last(), Some(WorkspaceEvent::Redraw(_))));
        assert_eq!(session.graph().nodes().len(), 1);
        assert_eq!(session.graph().nodes()[0].anchors().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_adds_leave_graph_unchanged() {
        let mut session = session();
        for command in [
            WorkspaceCommand::AddContainer { image: "not a reference".into() },
            WorkspaceCommand::AddContainer { image: "example.com/unknown".into() },
            WorkspaceCommand::AddContainer { image: "example.com/bare".into() },
            WorkspaceCommand::AddDisk { name: "  ".into() },
            WorkspaceCommand::AddIngress { port: 0 },
            WorkspaceCommand::AddIngress { port: -1 },
            WorkspaceCommand::AddIngress { port: 70000 },
        ] {
            let events = session.process(command.clone().into()).await;
            let notes = notifications(&events);
            assert_eq!(notes.len(), 1, "{command:?}");
            assert_eq!(notes[0].severity, Severity::Error);
            assert!(matches!(events.last(), Some(WorkspaceEvent::Redraw(_))));
        }
        assert!(session.graph().nodes().is_empty());
    }

    #[tokio::test]
    async fn test_commit_with_only_disk_and_ingress_fails_as_whole() {
        let mut session = session();
        session.process(WorkspaceCommand::AddDisk { name: "pd-1".into() }.into()).await;
        session.process(WorkspaceCommand::AddIngress { port: 80 }.into()).await;
        let events = session.process(WorkspaceCommand::Commit.into()).await;
        assert!(events.iter().any(|e| matches!(e, WorkspaceEvent::CommitFailed { .. })));
    }

    #[tokio::test]
    async fn test_commit_reports_created_objects() {
        let mut session = session();
        session
            .process(WorkspaceCommand::AddContainer { image: "quay.io/acme/web".into() }.into())
            .await;
        let events = session.process(WorkspaceCommand::Commit.into()).await;
        let report = events
            .iter()
            .find_map(|e| match e {
                WorkspaceEvent::CommitFinished(report) => Some(report),
                _ => None,
            })
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.created.len(), 1);
        assert_eq!(notifications(&events)[0].severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_reset_mid_gesture() {
        let mut session = session();
        session.process(WorkspaceCommand::AddIngress { port: 80 }.into()).await;
        session.process(PointerEvent::Down(Point::new(60, 110)).into()).await;
        assert!(session.graph().pending().is_some());
        let events = session.process(WorkspaceCommand::Reset.into()).await;
        assert!(matches!(events[0], WorkspaceEvent::GraphReset));
        assert!(session.graph().nodes().is_empty());
        assert!(session.graph().pending().is_none());
        let events = session.process(PointerEvent::Up(Point::new(60, 110)).into()).await;
        assert_eq!(events.len(), 1);
    }
}
