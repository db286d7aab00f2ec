//! Anchor roles and connection rules
//!
//! Every anchor carries a role that says what it stands for. Whether two anchors may be
//! joined by an edge depends only on the pair of roles, in source → destination order.

use crate::manifest::FlagKind;
use serde::{Deserialize, Serialize};

/// What an anchor represents on its owning node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorRole {
    /// A network port exposed by a container
    PortExport { name: String, port: u16 },
    /// A named volume mount of a container
    MountPoint { name: String, path: String },
    /// A startup argument the container must receive
    RequiredFlag { flag: String, kind: FlagKind },
    /// The single anchor of a disk node
    DiskAttachment { disk: String },
    /// The single anchor of an ingress node, carrying the external port
    IngressAttachment { port: u16 },
}

/// Whether an edge from `src` to `dst` is a legal connection.
///
/// Rules are tried in order and the first rule whose source matches decides:
/// a host-port flag or an ingress must land on an exposed port, and a mount point
/// must land on a disk. Every other pairing is rejected.
pub fn compatible(src: &AnchorRole, dst: &AnchorRole) -> bool {
    match src {
        AnchorRole::RequiredFlag {
            kind: FlagKind::HostPort,
            ..
        } => matches!(dst, AnchorRole::PortExport { .. }),
        AnchorRole::IngressAttachment { .. } => matches!(dst, AnchorRole::PortExport { .. }),
        AnchorRole::MountPoint { .. } => matches!(dst, AnchorRole::DiskAttachment { .. }),
        _ => false,
    }
}

/// `compatible` for an edge whose destination may not be fixed yet
pub fn compatible_with(src: &AnchorRole, dst: Option<&AnchorRole>) -> bool {
    dst.is_some_and(|dst| compatible(src, dst))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test Coverage
    ///
    /// ```mermaid
    /// graph TD
    ///     C[compatible] --> R1[host-port flag -> port]
    ///     C --> R2[ingress -> port]
    ///     C --> R3[mount -> disk]
    ///     C --> R4[everything else rejected]
    ///     C --> AS[asymmetry]
    /// ```

    fn all_roles() -> Vec<AnchorRole> {
        vec![
            AnchorRole::PortExport { name: "http".into(), port: 8080 },
            AnchorRole::MountPoint { name: "data".into(), path: "/data".into() },
            AnchorRole::RequiredFlag { flag: "--peer".into(), kind: FlagKind::HostPort },
            AnchorRole::RequiredFlag { flag: "--db".into(), kind: FlagKind::Other("sql".into()) },
            AnchorRole::DiskAttachment { disk: "pd-1".into() },
            AnchorRole::IngressAttachment { port: 80 },
        ]
    }

    fn expected(src: &AnchorRole, dst: &AnchorRole) -> bool {
        use AnchorRole::*;
        matches!(
            (src, dst),
            (RequiredFlag { kind: FlagKind::HostPort, .. }, PortExport { .. })
                | (IngressAttachment { .. }, PortExport { .. })
                | (MountPoint { .. }, DiskAttachment { .. })
        )
    }

    #[test]
    fn test_compatibility_table_is_exact() {
        for src in all_roles() {
            for dst in all_roles() {
                assert_eq!(
                    compatible(&src, &dst),
                    expected(&src, &dst),
                    "{src:?} -> {dst:?}"
                );
            }
        }
    }

    #[test]
    fn test_mount_point_rules() {
        let mount = AnchorRole::MountPoint { name: "data".into(), path: "/data".into() };
        let disk = AnchorRole::DiskAttachment { disk: "pd-1".into() };
        let port = AnchorRole::PortExport { name: "http".into(), port: 8080 };
        assert!(compatible(&mount, &disk));
        assert!(!compatible(&mount, &port));
        assert!(!compatible(&port, &mount));
        assert!(!compatible(&disk, &mount));
    }

    #[test]
    fn test_unknown_flag_kind_never_connects() {
        let flag =
            AnchorRole::RequiredFlag { flag: "--db".into(), kind: FlagKind::Other("sql".into()) };
        for dst in all_roles() {
            assert!(!compatible(&flag, &dst));
        }
    }

    #[test]
    fn test_missing_destination_is_rejected() {
        let ingress = AnchorRole::IngressAttachment { port: 80 };
        assert!(!compatible_with(&ingress, None));
        let port = AnchorRole::PortExport { name: "http".into(), port: 8080 };
        assert!(compatible_with(&ingress, Some(&port)));
    }
}
