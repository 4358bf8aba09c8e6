//! Filter configuration and validation.
//!
//! We keep two representations:
//! - FilterSpec: the options as the user supplied them
//! - FilterRules: validated, with kind and name filters folded into
//!   `<kind>/<name>` patterns

use super::wildcard::Wildcard;
use crate::error::SliceError;
use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub included_kinds: Vec<String>,
    pub excluded_kinds: Vec<String>,
    pub included_names: Vec<String>,
    pub excluded_names: Vec<String>,
    /// `<kind>/<name>` patterns.
    pub included: Vec<String>,
    pub excluded: Vec<String>,
    pub included_groups: Vec<String>,
    pub excluded_groups: Vec<String>,

    pub allow_empty_kinds: bool,
    pub allow_empty_names: bool,
    /// Skip anything lacking apiVersion, kind or metadata.name.
    pub strict_kubernetes: bool,
}

/// Where a kind/name pattern came from; only used to explain skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSource {
    Kind,
    Name,
    Pair,
}

impl PatternSource {
    pub fn label(self) -> &'static str {
        match self {
            PatternSource::Kind => "kinds",
            PatternSource::Name => "names",
            PatternSource::Pair => "kind/name patterns",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Normalized `<kind>/<name>` pattern.
    pub matcher: Wildcard,
    /// The value as the user wrote it, before normalization.
    pub original: String,
    pub source: PatternSource,
}

/// Validated filter rules, ready to evaluate documents.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    pub included: Vec<Pattern>,
    pub excluded: Vec<Pattern>,
    pub included_groups: Vec<Wildcard>,
    pub excluded_groups: Vec<Wildcard>,
    pub allow_empty_kinds: bool,
    pub allow_empty_names: bool,
    pub strict_kubernetes: bool,
}

impl FilterSpec {
    /// Check for conflicting options and build the normalized rules:
    /// - include and exclude are exclusive per dimension
    /// - an empty-field allowance cannot be combined with a filter on that field
    /// - every pattern has the `<kind>/<name>` shape
    pub fn validate_and_build(&self) -> Result<FilterRules, SliceError> {
        let conflicts = [
            (
                !self.included_kinds.is_empty() && self.allow_empty_kinds,
                "cannot specify both included kinds and allow empty kinds",
            ),
            (
                !self.excluded_kinds.is_empty() && self.allow_empty_kinds,
                "cannot specify both excluded kinds and allow empty kinds",
            ),
            (
                !self.included_names.is_empty() && self.allow_empty_names,
                "cannot specify both included names and allow empty names",
            ),
            (
                !self.excluded_names.is_empty() && self.allow_empty_names,
                "cannot specify both excluded names and allow empty names",
            ),
            (
                !self.included_kinds.is_empty() && !self.excluded_kinds.is_empty(),
                "cannot specify both included and excluded kinds",
            ),
            (
                !self.included_names.is_empty() && !self.excluded_names.is_empty(),
                "cannot specify both included and excluded names",
            ),
            (
                !self.included.is_empty() && !self.excluded.is_empty(),
                "cannot specify both included and excluded",
            ),
            (
                !self.included_groups.is_empty() && !self.excluded_groups.is_empty(),
                "cannot specify both included and excluded groups",
            ),
        ];
        if let Some((_, msg)) = conflicts.iter().find(|(conflict, _)| *conflict) {
            return Err(SliceError::config(*msg));
        }

        let shape = Regex::new(r"^[^/]+/[^/]+$")
            .map_err(|e| SliceError::config(format!("pattern validator: {e}")))?;
        let included = build_patterns(
            "included",
            &shape,
            normalize(&self.included_kinds, &self.included_names, &self.included),
        )?;
        let excluded = build_patterns(
            "excluded",
            &shape,
            normalize(&self.excluded_kinds, &self.excluded_names, &self.excluded),
        )?;

        Ok(FilterRules {
            included,
            excluded,
            included_groups: build_groups("included", &self.included_groups)?,
            excluded_groups: build_groups("excluded", &self.excluded_groups)?,
            allow_empty_kinds: self.allow_empty_kinds,
            allow_empty_names: self.allow_empty_names,
            strict_kubernetes: self.strict_kubernetes,
        })
    }
}

/// Candidate patterns as (pattern, original, source), pairs first.
fn normalize<'a>(
    kinds: &'a [String],
    names: &'a [String],
    pairs: &'a [String],
) -> Vec<(String, &'a str, PatternSource)> {
    let kinds = kinds
        .iter()
        .map(|k| (format!("{k}/*"), k.as_str(), PatternSource::Kind));
    let names = names
        .iter()
        .map(|n| (format!("*/{n}"), n.as_str(), PatternSource::Name));
    let pairs = pairs
        .iter()
        .map(|p| (p.clone(), p.as_str(), PatternSource::Pair));
    pairs.chain(kinds).chain(names).collect()
}

fn build_patterns(
    direction: &str,
    shape: &Regex,
    candidates: Vec<(String, &str, PatternSource)>,
) -> Result<Vec<Pattern>, SliceError> {
    candidates
        .into_iter()
        .map(|(text, original, source)| {
            if !shape.is_match(&text) {
                return Err(SliceError::config(format!(
                    "invalid {direction} pattern {original:?} should be <kind>/<name>"
                )));
            }
            let matcher = Wildcard::new(&text).map_err(|e| {
                SliceError::config(format!("invalid {direction} pattern {original:?}: {e}"))
            })?;
            Ok(Pattern {
                matcher,
                original: original.to_string(),
                source,
            })
        })
        .collect()
}

fn build_groups(direction: &str, groups: &[String]) -> Result<Vec<Wildcard>, SliceError> {
    groups
        .iter()
        .map(|g| {
            Wildcard::new(g).map_err(|e| {
                SliceError::config(format!("invalid {direction} group pattern {g:?}: {e}"))
            })
        })
        .collect()
}
