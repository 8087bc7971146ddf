//! String patterns for `=~` / `!~` comparisons.

use crate::error::Result;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    ExactIgnoreCase(String),
    Regex(Regex),
}

/// Syntax a [`Pattern`] was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Glob,
    GlobIgnoreCase,
    Regex,
}

/// Compiled string pattern.
///
/// Glob patterns support `*` (any run of characters) and `?` (one character)
/// and are anchored at both ends, so `*docker*` matches any string containing
/// `docker`. Globs without wildcards compile to a plain equality check.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    kind: PatternKind,
    matcher: Matcher,
}

impl Pattern {
    pub fn glob(source: &str) -> Result<Self> {
        Self::compile_glob(source, false)
    }

    /// Case-insensitive glob.
    pub fn glob_ignore_case(source: &str) -> Result<Self> {
        Self::compile_glob(source, true)
    }

    /// Raw regular expression, unanchored.
    pub fn regex(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            kind: PatternKind::Regex,
            matcher: Matcher::Regex(Regex::new(source)?),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn is_match(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(expected) => value == expected,
            Matcher::ExactIgnoreCase(expected) => value.eq_ignore_ascii_case(expected),
            Matcher::Regex(regex) => regex.is_match(value),
        }
    }

    fn compile_glob(source: &str, ignore_case: bool) -> Result<Self> {
        let matcher = if !source.contains(['*', '?']) {
            if ignore_case {
                Matcher::ExactIgnoreCase(source.to_string())
            } else {
                Matcher::Exact(source.to_string())
            }
        } else {
            Matcher::Regex(Regex::new(&glob_to_regex(source, ignore_case))?)
        };
        let kind = if ignore_case {
            PatternKind::GlobIgnoreCase
        } else {
            PatternKind::Glob
        };
        Ok(Self {
            source: source.to_string(),
            kind,
            matcher,
        })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PatternKind::Glob => write!(f, "{:?}", self.source),
            PatternKind::GlobIgnoreCase => write!(f, "~{:?}", self.source),
            PatternKind::Regex => write!(f, "/{}/", self.source),
        }
    }
}

fn glob_to_regex(glob: &str, ignore_case: bool) -> String {
    let mut pattern = String::with_capacity(glob.len() + 8);
    if ignore_case {
        pattern.push_str("(?i)");
    }
    pattern.push('^');

    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                pattern.push_str(&regex::escape(&literal));
                literal.clear();
                pattern.push_str(if c == '*' { ".*" } else { "." });
            }
            other => literal.push(other),
        }
    }
    pattern.push_str(&regex::escape(&literal));
    pattern.push('$');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_glob_contains() {
        let pattern = Pattern::glob("*docker*").unwrap();
        assert!(pattern.is_match("/docker/abc123"));
        assert!(pattern.is_match("docker"));
        assert!(!pattern.is_match("/podman/abc123"));
    }

    #[test]
    fn test_glob_is_anchored() {
        let pattern = Pattern::glob("/etc/*.conf").unwrap();
        assert!(pattern.is_match("/etc/resolv.conf"));
        assert!(!pattern.is_match("/etc/resolv.conf.bak"));
        assert!(!pattern.is_match("/tmp/etc/resolv.conf"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let pattern = Pattern::glob("/usr/bin/python3.?").unwrap();
        assert!(pattern.is_match("/usr/bin/python3.9"));
        assert!(!pattern.is_match("/usr/bin/python3x9"));

        let pattern = Pattern::glob("a+b*").unwrap();
        assert!(pattern.is_match("a+bc"));
        assert!(!pattern.is_match("aab"));
    }

    #[test]
    fn test_plain_glob_is_exact() {
        let pattern = Pattern::glob("/bin/sh").unwrap();
        assert!(pattern.is_match("/bin/sh"));
        assert!(!pattern.is_match("/bin/shell"));
    }

    #[test]
    fn test_ignore_case() {
        assert!(Pattern::glob_ignore_case("*DOCKER*").unwrap().is_match("docker-proxy"));
        assert!(Pattern::glob_ignore_case("Bash").unwrap().is_match("bash"));
        assert!(!Pattern::glob("Bash").unwrap().is_match("bash"));
    }

    #[test]
    fn test_regex_pattern() {
        let pattern = Pattern::regex(r"^/proc/\d+/mem$").unwrap();
        assert!(pattern.is_match("/proc/42/mem"));
        assert!(!pattern.is_match("/proc/self/mem"));

        assert!(matches!(
            Pattern::regex("(unclosed"),
            Err(EvalError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_display_and_equality() {
        assert_eq!(Pattern::glob("*docker*").unwrap().to_string(), "\"*docker*\"");
        assert_eq!(Pattern::regex("^a+$").unwrap().to_string(), "/^a+$/");
        assert_eq!(Pattern::glob_ignore_case("x").unwrap().to_string(), "~\"x\"");
        assert_eq!(Pattern::glob("a*").unwrap(), Pattern::glob("a*").unwrap());
        assert_ne!(Pattern::glob("a*").unwrap(), Pattern::regex("a*").unwrap());
    }
}
