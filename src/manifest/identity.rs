use crate::manifest::Value;
use std::fmt;

/// Kubernetes identity of a document. Every field may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

impl ResourceIdentity {
    /// Read `apiVersion`, `kind`, `metadata.name` and `metadata.namespace`.
    /// Missing or non-string fields are left empty.
    pub fn from_manifest(manifest: &Value) -> Self {
        let metadata = manifest.get("metadata");
        let meta_field = |key: &str| {
            metadata
                .map(|m| m.str_field(key))
                .unwrap_or_default()
                .to_string()
        };

        Self {
            api_version: manifest.str_field("apiVersion").to_string(),
            kind: manifest.str_field("kind").to_string(),
            name: meta_field("name"),
            namespace: meta_field("namespace"),
        }
    }

    /// API group derived from `apiVersion`; empty for the core group.
    pub fn group(&self) -> String {
        match self.api_version.split('/').collect::<Vec<_>>().as_slice() {
            [group, _version] => group.to_lowercase(),
            _ => String::new(),
        }
    }

    /// True when nothing identifies this as a Kubernetes object.
    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty()
            && self.kind.is_empty()
            && self.name.is_empty()
            && self.namespace.is_empty()
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kind {}, name {}, apiVersion {}",
            self.kind, self.name, self.api_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Map;
    use pretty_assertions::assert_eq;

    fn manifest(pairs: &[(&str, Value)]) -> Value {
        Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<Map>(),
        )
    }

    #[test]
    fn extracts_all_fields() {
        let m = manifest(&[
            ("apiVersion", "apps/v1".into()),
            ("kind", "Deployment".into()),
            (
                "metadata",
                manifest(&[("name", "web".into()), ("namespace", "prod".into())]),
            ),
        ]);
        let id = ResourceIdentity::from_manifest(&m);
        assert_eq!(
            id,
            ResourceIdentity {
                api_version: "apps/v1".into(),
                kind: "Deployment".into(),
                name: "web".into(),
                namespace: "prod".into(),
            }
        );
        assert_eq!(id.group(), "apps");
    }

    #[test]
    fn tolerates_wrong_types() {
        let m = manifest(&[
            ("kind", Value::Bool(true)),
            ("metadata", "not-a-map".into()),
        ]);
        let id = ResourceIdentity::from_manifest(&m);
        assert!(id.is_empty());
    }

    #[test]
    fn top_level_name_is_not_metadata_name() {
        let m = manifest(&[("kind", "foo".into()), ("name", "bar".into())]);
        let id = ResourceIdentity::from_manifest(&m);
        assert_eq!(id.kind, "foo");
        assert_eq!(id.name, "");
        assert!(!id.is_empty());
    }

    #[test]
    fn group_derivation() {
        let group = |v: &str| {
            ResourceIdentity {
                api_version: v.into(),
                ..Default::default()
            }
            .group()
        };
        assert_eq!(group("v1"), "");
        assert_eq!(group("Networking.K8s.io/v1"), "networking.k8s.io");
        assert_eq!(group("a/b/c"), "");
        assert_eq!(group(""), "");
    }

    #[test]
    fn namespace_alone_is_not_empty() {
        let id = ResourceIdentity {
            namespace: "default".into(),
            ..Default::default()
        };
        assert!(!id.is_empty());
    }
}
