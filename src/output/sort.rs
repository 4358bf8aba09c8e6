//! Install-order sorting.

use super::aggregate::OutputSet;
use std::cmp::Ordering;

/// Kinds in the order a cluster should receive them.
pub const INSTALL_ORDER: &[&str] = &[
    "Namespace",
    "NetworkPolicy",
    "ResourceQuota",
    "LimitRange",
    "PodSecurityPolicy",
    "PodDisruptionBudget",
    "ServiceAccount",
    "Secret",
    "SecretList",
    "ConfigMap",
    "StorageClass",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "CustomResourceDefinition",
    "ClusterRole",
    "ClusterRoleList",
    "ClusterRoleBinding",
    "ClusterRoleBindingList",
    "Role",
    "RoleList",
    "RoleBinding",
    "RoleBindingList",
    "Service",
    "DaemonSet",
    "Pod",
    "ReplicationController",
    "ReplicaSet",
    "Deployment",
    "HorizontalPodAutoscaler",
    "StatefulSet",
    "Job",
    "CronJob",
    "IngressClass",
    "Ingress",
    "APIService",
];

fn rank(kind: &str) -> Option<usize> {
    INSTALL_ORDER.iter().position(|k| *k == kind)
}

/// Known kinds first in install order, then unknown kinds alphabetically.
pub fn compare_kinds(a: &str, b: &str) -> Ordering {
    match (rank(a), rank(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Stable: documents of equal rank keep their relative order.
pub fn sort_by_kind(set: &mut OutputSet) {
    set.docs_mut()
        .sort_by(|_, a, _, b| compare_kinds(&a.identity.kind, &b.identity.kind));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ResourceIdentity;
    use crate::output::NamedDocument;
    use pretty_assertions::assert_eq;

    fn set_of(entries: &[(&str, &str)]) -> OutputSet {
        let mut set = OutputSet::new();
        for (filename, kind) in entries {
            set.insert(NamedDocument {
                filename: filename.to_string(),
                identity: ResourceIdentity {
                    kind: kind.to_string(),
                    ..Default::default()
                },
                content: Vec::new(),
            });
        }
        set
    }

    fn filenames(set: &OutputSet) -> Vec<&str> {
        set.iter().map(|d| d.filename.as_str()).collect()
    }

    #[test]
    fn follows_install_order() {
        let mut set = set_of(&[("d", "Deployment"), ("n", "Namespace"), ("s", "Service")]);
        sort_by_kind(&mut set);
        assert_eq!(filenames(&set), vec!["n", "s", "d"]);
    }

    #[test]
    fn unknown_kinds_go_last_alphabetically() {
        let mut set = set_of(&[
            ("z", "Zebra"),
            ("cm", "ConfigMap"),
            ("a", "Alpha"),
            ("ns", "Namespace"),
        ]);
        sort_by_kind(&mut set);
        assert_eq!(filenames(&set), vec!["ns", "cm", "a", "z"]);
    }

    #[test]
    fn equal_kinds_keep_input_order() {
        let mut set = set_of(&[
            ("pod-b", "Pod"),
            ("ns", "Namespace"),
            ("pod-a", "Pod"),
            ("x-2", "Widget"),
            ("x-1", "Widget"),
        ]);
        sort_by_kind(&mut set);
        assert_eq!(filenames(&set), vec!["ns", "pod-b", "pod-a", "x-2", "x-1"]);
    }

    #[test]
    fn kind_comparison_is_case_sensitive() {
        assert_eq!(compare_kinds("Pod", "pod"), Ordering::Less);
        assert_eq!(compare_kinds("Ingress", "IngressClass"), Ordering::Greater);
    }
}
