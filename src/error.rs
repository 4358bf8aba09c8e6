//! Fatal errors raised while slicing a YAML stream.
//!
//! Skips (strict mode, include/exclude rules) are not errors: they travel as
//! [`crate::filter::Verdict::Skip`] and the driving loop keeps going.

use crate::manifest::ResourceIdentity;
use crate::render::TemplateError;

/// Hint appended when a document carries no Kubernetes metadata at all.
pub const NON_K8S_HELPER: &str = "the file has no Kubernetes metadata: it is most likely a non-Kubernetes YAML file, you can skip it with --skip-non-k8s";

#[derive(Debug, thiserror::Error)]
pub enum SliceError {
    /// Conflicting or malformed options, detected before any input is read.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file name template parse failed: {0}")]
    Template(#[source] TemplateError),

    #[error("unable to read YAML document number {ordinal}: {source}")]
    Read {
        ordinal: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse YAML document number {ordinal}: {message}")]
    Parse { ordinal: usize, message: String },

    #[error("unable to render file name for YAML document number {ordinal}: {source}")]
    Render {
        ordinal: usize,
        #[source]
        source: TemplateError,
    },

    #[error(
        "file name rendered will yield no file name for YAML document number {ordinal}: {}",
        describe(.identity)
    )]
    EmptyName {
        ordinal: usize,
        identity: ResourceIdentity,
    },

    /// A field needed by an active filter is absent and was not allowed empty.
    #[error(
        "unable to find Kubernetes {field:?} field in document number {ordinal}: {}",
        describe(.identity)
    )]
    MissingField {
        field: &'static str,
        ordinal: usize,
        identity: ResourceIdentity,
    },
}

impl SliceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

fn describe(identity: &ResourceIdentity) -> String {
    if identity.is_empty() {
        NON_K8S_HELPER.to_string()
    } else {
        identity.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_on_empty_identity_suggests_strict_mode() {
        let err = SliceError::MissingField {
            field: "kind",
            ordinal: 3,
            identity: ResourceIdentity::default(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"kind\""), "{msg}");
        assert!(msg.contains("document number 3"), "{msg}");
        assert!(msg.contains("--skip-non-k8s"), "{msg}");
    }

    #[test]
    fn empty_name_describes_identity() {
        let identity = ResourceIdentity {
            api_version: "v1".into(),
            kind: "Pod".into(),
            ..Default::default()
        };
        let msg = SliceError::EmptyName {
            ordinal: 1,
            identity,
        }
        .to_string();
        assert!(msg.ends_with("kind Pod, name , apiVersion v1"), "{msg}");
    }
}
