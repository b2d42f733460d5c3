//! Root-anchored JSON paths and wildcard pattern matching
//!
//! A path renders as `$.field.0.other`. Patterns use the same dotted form where
//! a `*` segment matches exactly one path segment.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    /// Child path addressing a mapping entry
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Child path addressing a sequence element
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// `other` appended below this path
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Same path with every key segment rewritten by `rename`
    pub fn map_keys(&self, rename: impl Fn(&str) -> String) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Key(key) => Segment::Key(rename(key)),
                Segment::Index(index) => Segment::Index(*index),
            })
            .collect();
        Self { segments }
    }

    pub fn matches(&self, pattern: &str) -> bool {
        let rendered: Vec<String> = std::iter::once("$".to_string())
            .chain(self.segments.iter().map(Segment::to_string))
            .collect();
        segments_match(rendered.iter().map(String::as_str), pattern)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Match a dotted path against a dotted pattern
///
/// Comparison is per segment and case-insensitive. `*` matches any single
/// segment; there is no multi-level wildcard, so paths and patterns with a
/// different number of segments never match.
pub fn matches(path: &str, pattern: &str) -> bool {
    segments_match(path.split('.'), pattern)
}

fn segments_match<'a>(path: impl Iterator<Item = &'a str>, pattern: &str) -> bool {
    let path: Vec<&str> = path.collect();
    let pattern: Vec<&str> = pattern.split('.').collect();
    if path.len() != pattern.len() {
        return false;
    }
    path.iter()
        .zip(pattern.iter())
        .all(|(segment, expected)| *expected == "*" || segment.to_lowercase() == expected.to_lowercase())
}
