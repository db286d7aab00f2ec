//! Two-phase deployment compiler
//!
//! Phase one submits every service. Phase two resolves each workload's flag bindings
//! against those services and submits the workloads. Nodes within a phase are handled
//! concurrently, each writing only its own result slot.

use super::objects::ReplicationController;
use super::planner::{flag_argument, plan_services, plan_workloads, WorkloadPlan};
use super::report::{
    CommitError, CommitReport, CreatedObject, FailureCause, NodeFailure, ObjectKind,
};
use super::resolver::{ExecutorServiceResolver, ServiceResolver};
use crate::aggregate::GraphSnapshot;
use crate::infrastructure::{
    check_reply, DeploymentExecutor, ExecutorRequest, DEFAULT_FAILURE_MARKER,
};
use crate::value_objects::NodeId;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Filesystem type of disk-backed volumes unless configured otherwise
pub const DEFAULT_DISK_FS_TYPE: &str = "ext4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Executor replies starting with this are failures
    pub failure_marker: String,
    pub disk_fs_type: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            failure_marker: DEFAULT_FAILURE_MARKER.to_string(),
            disk_fs_type: DEFAULT_DISK_FS_TYPE.to_string(),
        }
    }
}

/// Turns a graph snapshot into created services and workloads
#[derive(Clone)]
pub struct DeploymentCompiler {
    executor: Arc<dyn DeploymentExecutor>,
    resolver: Arc<dyn ServiceResolver>,
    options: CompilerOptions,
}

impl DeploymentCompiler {
    pub fn new(executor: Arc<dyn DeploymentExecutor>, resolver: Arc<dyn ServiceResolver>) -> Self {
        Self {
            executor,
            resolver,
            options: CompilerOptions::default(),
        }
    }

    /// Compiler whose service lookups go through the same executor
    pub fn with_executor(executor: Arc<dyn DeploymentExecutor>, options: CompilerOptions) -> Self {
        let resolver = Arc::new(ExecutorServiceResolver::new(
            executor.clone(),
            options.failure_marker.clone(),
        ));
        Self {
            executor,
            resolver,
            options,
        }
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile and deploy `snapshot`.
    ///
    /// Fails as a whole only when the snapshot calls for no objects at all; every other
    /// problem is a per-node failure in the report.
    #[instrument(level = "trace", skip_all, fields(nodes = snapshot.nodes().len()))]
    pub async fn commit(&self, snapshot: &GraphSnapshot) -> Result<CommitReport, CommitError> {
        let services = plan_services(snapshot);
        let workloads = plan_workloads(snapshot, &self.options.disk_fs_type);
        if services.is_empty() && workloads.is_empty() {
            return Err(CommitError::NothingConstructed);
        }

        let mut report = CommitReport::default();

        info!(count = services.len(), "submitting services");
        let service_results = join_all(services.iter().map(|plan| {
            self.submit(plan.node, &plan.label, ObjectKind::Service, plan.name(), &plan.service)
        }))
        .await;

        let mut failed_services: HashSet<NodeId> = HashSet::new();
        for result in service_results {
            match result {
                Ok(created) => report.created.push(created),
                Err(failure) => {
                    failed_services.insert(failure.node);
                    report.failures.push(failure);
                }
            }
        }

        info!(count = workloads.len(), "submitting workloads");
        let workload_results = join_all(
            workloads
                .into_iter()
                .map(|plan| self.deploy_workload(plan, &failed_services)),
        )
        .await;

        for result in workload_results {
            match result {
                Ok(created) => report.created.push(created),
                Err(failure) => report.failures.push(failure),
            }
        }

        info!(
            created = report.created.len(),
            failed = report.failures.len(),
            "commit finished"
        );
        Ok(report)
    }

    async fn deploy_workload(
        &self,
        plan: WorkloadPlan,
        failed_services: &HashSet<NodeId>,
    ) -> Result<CreatedObject, NodeFailure> {
        let WorkloadPlan {
            node,
            label,
            mut controller,
            bindings,
        } = plan;
        let name = controller.metadata.name.clone();
        let fail = |cause: FailureCause| {
            warn!(node = %node, name = %name, cause = %cause, "workload not built");
            NodeFailure {
                node,
                label: label.clone(),
                kind: ObjectKind::ReplicationController,
                name: name.clone(),
                cause,
            }
        };

        let mut args = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            if failed_services.contains(&binding.target) {
                return Err(fail(FailureCause::DependencyFailed {
                    service: binding.service.clone(),
                }));
            }
            let address = self.resolver.resolve(&binding.service).await.map_err(|err| {
                fail(FailureCause::Lookup {
                    service: binding.service.clone(),
                    reason: err.to_string(),
                })
            })?;
            args.push(flag_argument(&binding.flag, &address));
        }
        append_args(&mut controller, args);

        self.submit(node, &label, ObjectKind::ReplicationController, &name, &controller)
            .await
    }

    async fn submit<T: Serialize + Sync>(
        &self,
        node: NodeId,
        label: &str,
        kind: ObjectKind,
        name: &str,
        object: &T,
    ) -> Result<CreatedObject, NodeFailure> {
        let fail = |cause: FailureCause| {
            warn!(node = %node, %kind, name, cause = %cause, "submission failed");
            NodeFailure {
                node,
                label: label.to_string(),
                kind,
                name: name.to_string(),
                cause,
            }
        };

        let request = ExecutorRequest::create(object)
            .map_err(|err| fail(FailureCause::Executor(err.to_string())))?;
        let reply = self
            .executor
            .execute(&request)
            .await
            .map_err(|err| fail(FailureCause::Executor(err.to_string())))?;
        let output = check_reply(reply, &self.options.failure_marker)
            .map_err(|reply| fail(FailureCause::Rejected { reply }))?;

        Ok(CreatedObject {
            node,
            label: label.to_string(),
            kind,
            name: name.to_string(),
            output,
        })
    }
}

fn append_args(controller: &mut ReplicationController, args: Vec<String>) {
    if let Some(container) = controller.container_mut() {
        container.args.extend(args);
    }
}
