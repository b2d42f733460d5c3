//! Structural diff between the remote and the declared definition
//!
//! Both sides are expected to come out of the same codec encode path, so key
//! casing and ordering already agree and only real value changes remain.

use crate::path::Path;
use acrun_cloud::{CloudError, Result};
use colored::Colorize;
use json_patch::PatchOperation;
use serde_json::{Map, Value};

/// A single difference, addressed by JSON pointer
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Replaced { path: String, old: Value, new: Value },
}

impl Change {
    pub fn path(&self) -> &str {
        match self {
            Change::Added { path, .. } | Change::Removed { path, .. } | Change::Replaced { path, .. } => {
                path
            }
        }
    }
}

/// Paths to leave out of the comparison, written as jq paths
///
/// Supported forms, comma separated: `.a.b`, `.a[]`, `.a[0]`, `.a["key"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreQuery {
    patterns: Vec<String>,
}

impl IgnoreQuery {
    pub fn parse(query: &str) -> Result<Self> {
        let patterns = query
            .split(',')
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
            .map(compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Remove every node the query selects
    pub fn apply(&self, value: Value) -> Value {
        if self.selects(&Path::root()) {
            return Value::Null;
        }
        self.prune(value, &Path::root())
    }

    fn selects(&self, path: &Path) -> bool {
        self.patterns.iter().any(|pattern| path.matches(pattern))
    }

    fn prune(&self, value: Value, path: &Path) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .filter_map(|(key, child)| {
                        let child_path = path.key(&key);
                        (!self.selects(&child_path))
                            .then(|| (key, self.prune(child, &child_path)))
                    })
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .filter_map(|(index, child)| {
                        let child_path = path.index(index);
                        (!self.selects(&child_path)).then(|| self.prune(child, &child_path))
                    })
                    .collect(),
            ),
            other => other,
        }
    }
}

/// Compile one jq path expression to a dotted path pattern
fn compile(expr: &str) -> Result<String> {
    let invalid = |reason: &str| {
        CloudError::Validation(format!("failed to parse ignore query {:?}: {}", expr, reason))
    };
    if !expr.starts_with('.') {
        return Err(invalid("path must start with '.'"));
    }

    let mut segments: Vec<String> = Vec::new();
    let mut rest = expr;
    if rest == "." {
        return Ok("$".to_string());
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']').ok_or_else(|| invalid("unclosed '['"))?;
            let inner = after[..end].trim();
            let segment = if inner.is_empty() {
                "*".to_string()
            } else if let Some(key) = inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                key.to_string()
            } else if inner.parse::<usize>().is_ok() {
                inner.to_string()
            } else {
                return Err(invalid("only [], [N] and [\"key\"] are supported"));
            };
            segments.push(segment);
            rest = &after[end + 1..];
        } else if let Some(after) = rest.strip_prefix('.') {
            if after.starts_with('[') {
                rest = after;
                continue;
            }
            let end = after.find(['.', '[']).unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid("invalid field name"));
            }
            segments.push(name.to_string());
            rest = &after[end..];
        } else {
            return Err(invalid("unexpected character"));
        }
    }

    if let Some(segment) = segments.iter().find(|s| s.contains('.')) {
        return Err(invalid(&format!("key {:?} cannot contain '.'", segment)));
    }
    Ok(std::iter::once("$".to_string()).chain(segments).collect::<Vec<_>>().join("."))
}

/// Compare two trees, after removing what `ignore` selects from both
pub fn diff(remote: &Value, local: &Value, ignore: Option<&IgnoreQuery>) -> Vec<Change> {
    let (remote, local) = match ignore {
        Some(query) => (query.apply(remote.clone()), query.apply(local.clone())),
        None => (remote.clone(), local.clone()),
    };

    json_patch::diff(&remote, &local)
        .0
        .into_iter()
        .filter_map(|operation| {
            let old = |path: &str| remote.pointer(path).cloned().unwrap_or(Value::Null);
            match operation {
                PatchOperation::Add(op) => Some(Change::Added {
                    path: op.path.to_string(),
                    value: op.value,
                }),
                PatchOperation::Remove(op) => Some(Change::Removed {
                    value: old(op.path.as_str()),
                    path: op.path.to_string(),
                }),
                PatchOperation::Replace(op) => Some(Change::Replaced {
                    old: old(op.path.as_str()),
                    path: op.path.to_string(),
                    new: op.value,
                }),
                // diff only produces add, remove and replace
                _ => None,
            }
        })
        .collect()
}

/// Render changes as text with `---`/`+++` headers
///
/// Returns an empty string when there are no changes.
pub fn render(changes: &[Change], remote_label: &str, local_label: &str) -> String {
    if changes.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("--- {}\n", remote_label));
    out.push_str(&format!("+++ {}\n", local_label));
    for change in changes {
        let path = match change.path() {
            "" => "/",
            path => path,
        };
        out.push_str(&format!("@@ {} @@\n", path));
        match change {
            Change::Added { value, .. } => push_lines(&mut out, '+', value),
            Change::Removed { value, .. } => push_lines(&mut out, '-', value),
            Change::Replaced { old, new, .. } => {
                push_lines(&mut out, '-', old);
                push_lines(&mut out, '+', new);
            }
        }
    }
    out
}

fn push_lines(out: &mut String, sign: char, value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    for line in text.lines() {
        out.push_str(&format!("{}{}\n", sign, line));
    }
}

/// Color removed lines red and added lines green
pub fn colorize(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else {
                line.to_string()
            }
        })
        .map(|line| line + "\n")
        .collect()
}
