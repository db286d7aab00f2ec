//! Pure object planning
//!
//! Decides which objects a graph snapshot calls for without talking to anything.
//! Cross-node references are left as [`FlagBinding`]s for the compiler to resolve.

use super::naming::derive_name;
use super::objects::{
    GcePersistentDisk, ReplicationController, Service, ServicePort, Volume, VolumeMount,
    PROTOCOL_TCP,
};
use super::resolver::ServiceAddress;
use crate::aggregate::GraphSnapshot;
use crate::anchors::AnchorRole;
use crate::manifest::FlagKind;
use crate::value_objects::NodeId;
use serde::{Deserialize, Serialize};

/// A service one container node needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub node: NodeId,
    /// Node label, for reporting
    pub label: String,
    pub service: Service,
}

impl ServicePlan {
    pub fn name(&self) -> &str {
        &self.service.metadata.name
    }
}

/// A required flag to be filled with another node's service address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagBinding {
    /// Flag as declared by the manifest
    pub flag: String,
    /// Node exposing the port the flag points at
    pub target: NodeId,
    /// Derived service name of `target`
    pub service: String,
}

/// A workload one container node needs, before its flags are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadPlan {
    pub node: NodeId,
    pub label: String,
    pub controller: ReplicationController,
    pub bindings: Vec<FlagBinding>,
}

impl WorkloadPlan {
    pub fn name(&self) -> &str {
        &self.controller.metadata.name
    }
}

/// One service per container node that has at least one ingress edge onto its ports
pub fn plan_services(snapshot: &GraphSnapshot) -> Vec<ServicePlan> {
    snapshot
        .nodes()
        .iter()
        .filter_map(|node| {
            let manifest = node.manifest()?;
            let ports: Vec<ServicePort> = snapshot
                .incoming(node.id())
                .filter_map(|c| match (&c.source.role, &c.destination.role) {
                    (
                        AnchorRole::IngressAttachment { port },
                        AnchorRole::PortExport { port: target, .. },
                    ) => Some(ServicePort {
                        port: *port,
                        target_port: *target,
                        protocol: PROTOCOL_TCP.to_string(),
                    }),
                    _ => None,
                })
                .collect();
            if ports.is_empty() {
                return None;
            }
            Some(ServicePlan {
                node: node.id(),
                label: node.label(),
                service: Service::load_balanced(&derive_name(&manifest.name), ports),
            })
        })
        .collect()
}

/// One workload per container node, with volumes attached and flags left unresolved
pub fn plan_workloads(snapshot: &GraphSnapshot, fs_type: &str) -> Vec<WorkloadPlan> {
    snapshot
        .nodes()
        .iter()
        .filter_map(|node| {
            let manifest = node.manifest()?;
            let name = derive_name(&manifest.name);
            let mut controller = ReplicationController::single(&name, &manifest.name);
            let mut volumes: Vec<Volume> = Vec::new();
            let mut mounts: Vec<VolumeMount> = Vec::new();
            let mut bindings = Vec::new();

            for c in snapshot.outgoing(node.id()) {
                match (&c.source.role, &c.destination.role) {
                    (
                        AnchorRole::RequiredFlag { flag, kind: FlagKind::HostPort },
                        AnchorRole::PortExport { .. },
                    ) => {
                        let target = snapshot.node(c.destination.node).and_then(|n| n.manifest());
                        let Some(target) = target else {
                            continue;
                        };
                        bindings.push(FlagBinding {
                            flag: flag.clone(),
                            target: c.destination.node,
                            service: derive_name(&target.name),
                        });
                    }
                    (AnchorRole::MountPoint { path, .. }, AnchorRole::DiskAttachment { disk }) => {
                        if !volumes.iter().any(|v| &v.name == disk) {
                            volumes.push(Volume {
                                name: disk.clone(),
                                gce_persistent_disk: GcePersistentDisk {
                                    pd_name: disk.clone(),
                                    fs_type: fs_type.to_string(),
                                },
                            });
                        }
                        mounts.push(VolumeMount {
                            name: disk.clone(),
                            mount_path: path.clone(),
                            read_only: false,
                        });
                    }
                    _ => {}
                }
            }

            controller.spec.template.spec.volumes = volumes;
            if let Some(container) = controller.container_mut() {
                container.volume_mounts = mounts;
            }
            Some(WorkloadPlan {
                node: node.id(),
                label: node.label(),
                controller,
                bindings,
            })
        })
        .collect()
}

/// `--<flag>=<host>:<port>`; leading dashes on the declared flag are not doubled
pub fn flag_argument(flag: &str, address: &ServiceAddress) -> String {
    format!("--{}={}:{}", flag.trim_start_matches('-'), address.host, address.port)
}
