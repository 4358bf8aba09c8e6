//! Case-insensitive wildcard matching for filter patterns.
//!
//! Patterns use `glob` syntax with a literal separator: `*` and `?` never
//! match `/`, so `pod/*` matches every pod but `*` alone never reaches across
//! the kind/name separator. `[...]` classes are supported.

use glob::{MatchOptions, Pattern, PatternError};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A filter pattern compiled once at validation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    text: String,
    pattern: Pattern,
}

impl Wildcard {
    pub fn new(text: &str) -> Result<Self, PatternError> {
        Ok(Self {
            text: text.to_string(),
            pattern: Pattern::new(&text.to_lowercase())?,
        })
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.pattern.matches_with(&candidate.to_lowercase(), OPTIONS)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// True if any pattern in `patterns` matches `candidate`.
pub fn any_matches(patterns: &[Wildcard], candidate: &str) -> bool {
    patterns.iter().any(|p| p.matches(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, candidate: &str) -> bool {
        Wildcard::new(pattern).unwrap().matches(candidate)
    }

    #[test]
    fn literal_and_wildcards() {
        assert!(matches("foo", "foo"));
        assert!(!matches("foo", "foobar"));
        assert!(matches("fo*", "foo"));
        assert!(matches("*", "foo"));
        assert!(matches("*", ""));
        assert!(matches("f?o", "foo"));
        assert!(!matches("f?o", "fo"));
        assert!(matches("*-svc", "web-svc"));
        assert!(matches("a*b*c", "aXXbYYc"));
        assert!(!matches("a*b*c", "aXXbYY"));
    }

    #[test]
    fn case_insensitive() {
        assert!(matches("Pod/*", "pod/nginx"));
        assert!(matches("pod/NGINX", "POD/nginx"));
        for (p, s) in [("Pod/*", "POD/x"), ("*.K8S.io", "networking.k8s.io"), ("X?", "xy")] {
            assert_eq!(matches(p, s), matches(&p.to_lowercase(), &s.to_lowercase()));
        }
    }

    #[test]
    fn star_does_not_cross_separator() {
        assert!(matches("kubernetes.io/*", "kubernetes.io/ingress.class"));
        assert!(matches("*/nginx", "pod/nginx"));
        assert!(!matches("*", "pod/nginx"));
        assert!(!matches("pod*", "pod/nginx"));
        assert!(!matches("pod?nginx", "pod/nginx"));
        assert!(matches("*/*", "pod/nginx"));
    }

    #[test]
    fn character_classes() {
        assert!(matches("pod/web-[ab]", "pod/web-a"));
        assert!(matches("pod/web-[ab]", "POD/WEB-B"));
        assert!(!matches("pod/web-[ab]", "pod/web-c"));
        assert!(matches("pod/web-[0-9]", "pod/web-7"));
    }

    #[test]
    fn malformed_pattern_is_rejected() {
        assert!(Wildcard::new("pod/[a").is_err());
        assert!(Wildcard::new("pod/[]").is_err());
    }

    #[test]
    fn keeps_the_pattern_as_written() {
        assert_eq!(Wildcard::new("Pod/*").unwrap().as_str(), "Pod/*");
    }

    #[test]
    fn any_of_list() {
        let list = [Wildcard::new("service/*").unwrap(), Wildcard::new("pod/*").unwrap()];
        assert!(any_matches(&list, "pod/a"));
        assert!(!any_matches(&[], "pod/a"));
    }
}
