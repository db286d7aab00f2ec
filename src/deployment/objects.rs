//! Orchestration objects
//!
//! The subset of the Kubernetes v1 object model the compiler emits: load-balanced
//! services and single-replica replication controllers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "v1";
/// Label tying a workload's pods to the service that fronts them
pub const SELECTOR_LABEL: &str = "flow-id";
pub const PROTOCOL_TCP: &str = "TCP";
pub const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata carrying the selector label for `name`, optionally named after it
    pub fn flow(name: &str, named: bool) -> Self {
        Self {
            name: if named { name.to_string() } else { String::new() },
            labels: flow_selector(name),
        }
    }
}

/// `{flow-id: <name>}`
pub fn flow_selector(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(SELECTOR_LABEL.to_string(), name.to_string())])
}

/// A network service in front of a workload's pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    /// Assigned by the orchestrator; absent on creation
    #[serde(rename = "clusterIP", default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePort {
    pub port: u16,
    #[serde(default)]
    pub target_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    PROTOCOL_TCP.to_string()
}

/// Keeps a fixed number of pod replicas running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationController {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: ReplicationControllerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationControllerSpec {
    pub replicas: u32,
    pub selector: BTreeMap<String, String>,
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplateSpec {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    pub host_network: bool,
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub gce_persistent_disk: GcePersistentDisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GcePersistentDisk {
    pub pd_name: String,
    pub fs_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
}

impl Service {
    /// A load-balanced service selecting pods labelled `flow-id=<name>`
    pub fn load_balanced(name: &str, ports: Vec<ServicePort>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta::flow(name, true),
            spec: ServiceSpec {
                service_type: Some(SERVICE_TYPE_LOAD_BALANCER.to_string()),
                selector: flow_selector(name),
                ports,
                cluster_ip: None,
            },
        }
    }
}

impl ReplicationController {
    /// One host-networked replica of `image`, labelled for `name`'s service
    pub fn single(name: &str, image: &str) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: "ReplicationController".to_string(),
            metadata: ObjectMeta::flow(name, true),
            spec: ReplicationControllerSpec {
                replicas: 1,
                selector: flow_selector(name),
                template: PodTemplateSpec {
                    metadata: ObjectMeta::flow(name, false),
                    spec: PodSpec {
                        host_network: true,
                        containers: vec![Container {
                            name: name.to_string(),
                            image: image.to_string(),
                            args: Vec::new(),
                            volume_mounts: Vec::new(),
                        }],
                        volumes: Vec::new(),
                    },
                },
            },
        }
    }

    /// The pod's only container
    pub fn container_mut(&mut self) -> Option<&mut Container> {
        self.spec.template.spec.containers.first_mut()
    }

    pub fn container(&self) -> Option<&Container> {
        self.spec.template.spec.containers.first()
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
    ///     O[Objects] --> S[Service JSON shape]
    ///     O --> RC[ReplicationController JSON shape]
    ///     O --> L[lookup reply decoding]
    /// ```

    #[test]
    fn test_service_json_shape() {
        let svc = Service::load_balanced(
            "quay-io-acme-web",
            vec![ServicePort { port: 80, target_port: 8080, protocol: PROTOCOL_TCP.into() }],
        );
        assert_eq!(
            serde_json::to_value(&svc).unwrap(),
            json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {"name": "quay-io-acme-web", "labels": {"flow-id": "quay-io-acme-web"}},
                "spec": {
                    "type": "LoadBalancer",
                    "selector": {"flow-id": "quay-io-acme-web"},
                    "ports": [{"port": 80, "targetPort": 8080, "protocol": "TCP"}]
                }
            })
        );
    }

    #[test]
    fn test_replication_controller_json_shape() {
        let mut rc = ReplicationController::single("quay-io-acme-web", "quay.io/acme/web");
        rc.spec.template.spec.volumes.push(Volume {
            name: "pd-1".into(),
            gce_persistent_disk: GcePersistentDisk {
                pd_name: "pd-1".into(),
                fs_type: "ext4".into(),
            },
        });
        if let Some(c) = rc.container_mut() {
            c.volume_mounts.push(VolumeMount {
                name: "pd-1".into(),
                mount_path: "/data".into(),
                read_only: false,
            });
        }
        assert_eq!(
            serde_json::to_value(&rc).unwrap(),
            json!({
                "apiVersion": "v1",
                "kind": "ReplicationController",
                "metadata": {"name": "quay-io-acme-web", "labels": {"flow-id": "quay-io-acme-web"}},
                "spec": {
                    "replicas": 1,
                    "selector": {"flow-id": "quay-io-acme-web"},
                    "template": {
                        "metadata": {"labels": {"flow-id": "quay-io-acme-web"}},
                        "spec": {
                            "hostNetwork": true,
                            "containers": [{
                                "name": "quay-io-acme-web",
                                "image": "quay.io/acme/web",
                                "volumeMounts": [{"name": "pd-1", "mountPath": "/data"}]
                            }],
                            "volumes": [{
                                "name": "pd-1",
                                "gcePersistentDisk": {"pdName": "pd-1", "fsType": "ext4"}
                            }]
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_lookup_reply_decodes_cluster_ip() {
        let reply = r#"{
            "kind": "Service",
            "apiVersion": "v1",
            "metadata": {"name": "b", "uid": "123"},
            "spec": {
                "ports": [{"port": 9000, "targetPort": 9000, "protocol": "TCP"}],
                "clusterIP": "10.0.0.5"
            },
            "status": {}
        }"#;
        let svc: Service = serde_json::from_str(reply).unwrap();
        assert_eq!(svc.spec.cluster_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(svc.spec.ports[0].port, 9000);
    }
}
