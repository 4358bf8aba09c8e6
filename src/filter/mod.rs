//! Keep/skip decisions for individual documents.

pub mod spec;
pub mod wildcard;

pub use spec::{FilterRules, FilterSpec, Pattern, PatternSource};

use crate::error::SliceError;
use crate::manifest::ResourceIdentity;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Skip(SkipReason),
}

/// Why a document was left out. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Strict mode and `field` is missing.
    Strict { field: &'static str },
    /// An include/exclude rule decided against the document.
    Filter {
        kind: String,
        name: String,
        reason: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Strict { field } => write!(
                f,
                "resource does not have a Kubernetes {field:?} field or the field is invalid or empty"
            ),
            SkipReason::Filter { kind, name, reason } => {
                write!(f, "resource {kind} {name:?} is configured to be skipped: {reason}")
            }
        }
    }
}

impl FilterRules {
    /// Decide what to do with one document. Checks run in a fixed order:
    /// strict mode, field presence, kind/name patterns, API groups.
    pub fn evaluate(
        &self,
        identity: &ResourceIdentity,
        ordinal: usize,
    ) -> Result<Verdict, SliceError> {
        if self.strict_kubernetes {
            let required = [
                ("apiVersion", &identity.api_version),
                ("kind", &identity.kind),
                ("metadata.name", &identity.name),
            ];
            if let Some((field, _)) = required.iter().find(|(_, v)| v.is_empty()) {
                return Ok(Verdict::Skip(SkipReason::Strict { field: *field }));
            }
        }

        let missing = |field| SliceError::MissingField {
            field,
            ordinal,
            identity: identity.clone(),
        };

        if !self.included.is_empty() || !self.excluded.is_empty() {
            if identity.kind.is_empty() && !self.allow_empty_kinds {
                return Err(missing("kind"));
            }
            if identity.name.is_empty() && !self.allow_empty_names {
                return Err(missing("metadata.name"));
            }

            let key = format!("{}/{}", identity.kind, identity.name);
            if let Some(reason) = self.check_patterns(&key) {
                return Ok(Verdict::Skip(filter_skip(identity, reason)));
            }
        }

        if !self.included_groups.is_empty() || !self.excluded_groups.is_empty() {
            if identity.api_version.is_empty() {
                return Err(missing("apiVersion"));
            }
            if let Some(reason) = self.check_group(&identity.group()) {
                return Ok(Verdict::Skip(filter_skip(identity, reason)));
            }
        }

        Ok(Verdict::Keep)
    }

    fn check_patterns(&self, key: &str) -> Option<String> {
        if !self.included.is_empty() {
            if self.included.iter().any(|p| p.matcher.matches(key)) {
                return None;
            }
            return Some(format!(
                "does not match any included {}",
                describe_sources(&self.included)
            ));
        }

        self.excluded
            .iter()
            .find(|p| p.matcher.matches(key))
            .map(|p| format!("matches excluded {} {:?}", p.source.label(), p.original))
    }

    fn check_group(&self, group: &str) -> Option<String> {
        if !self.included_groups.is_empty() {
            if wildcard::any_matches(&self.included_groups, group) {
                return None;
            }
            let groups: Vec<&str> = self.included_groups.iter().map(|g| g.as_str()).collect();
            return Some(format!(
                "group {group:?} does not match any included groups {groups:?}"
            ));
        }

        self.excluded_groups
            .iter()
            .find(|g| g.matches(group))
            .map(|g| format!("group {group:?} matches excluded group {:?}", g.as_str()))
    }
}

fn filter_skip(identity: &ResourceIdentity, reason: String) -> SkipReason {
    SkipReason::Filter {
        kind: identity.kind.clone(),
        name: identity.name.clone(),
        reason,
    }
}

/// "kinds", "kinds or names", ... depending on what produced the patterns.
fn describe_sources(patterns: &[Pattern]) -> String {
    let mut labels: Vec<&str> = Vec::new();
    for source in [PatternSource::Kind, PatternSource::Name, PatternSource::Pair] {
        if patterns.iter().any(|p| p.source == source) {
            labels.push(source.label());
        }
    }
    labels.join(" or ")
}
