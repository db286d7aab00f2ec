//! Graph to orchestrator deployment
//!
//! Compiles a finished workspace graph into services and replication controllers,
//! submitting them through a deployment executor.

pub mod compiler;
pub mod naming;
pub mod objects;
pub mod planner;
pub mod report;
pub mod resolver;

pub use compiler::{CompilerOptions, DeploymentCompiler, DEFAULT_DISK_FS_TYPE};
pub use naming::{derive_name, MAX_NAME_LEN};
pub use objects::{ReplicationController, Service, ServicePort};
pub use planner::{
    flag_argument, plan_services, plan_workloads, FlagBinding, ServicePlan, WorkloadPlan,
};
pub use report::{CommitError, CommitReport, CreatedObject, FailureCause, NodeFailure, ObjectKind};
pub use resolver::{ExecutorServiceResolver, ResolveError, ServiceAddress, ServiceResolver};
