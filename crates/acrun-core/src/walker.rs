//! Key-case tree walker
//!
//! The local definition file and the typed definition use different key-casing
//! conventions. Rather than mapping every field by hand, the whole tree is
//! walked and each mapping key has its first character flipped. Free-form maps
//! opt out by path pattern, and hooks can rename, replace or drop entries.

use crate::path::Path;
use acrun_cloud::Result;
use serde_json::{Map, Value};

/// Walk a tree depth-first, offering every mapping entry to `transform`
///
/// The transform receives the entry's path, its key and its value, and returns
/// the entry to keep (possibly renamed or replaced) or `None` to drop it. Kept
/// values are walked in turn. Sequence elements are recursed into but never
/// offered to the transform. The first transform error aborts the walk.
pub fn walk<F>(value: Value, transform: &mut F) -> Result<Value>
where
    F: FnMut(&Path, &str, Value) -> Result<Option<(String, Value)>>,
{
    walk_at(value, &Path::root(), transform)
}

fn walk_at<F>(value: Value, path: &Path, transform: &mut F) -> Result<Value>
where
    F: FnMut(&Path, &str, Value) -> Result<Option<(String, Value)>>,
{
    match value {
        Value::Object(map) => {
            let mut walked = Map::with_capacity(map.len());
            for (key, child) in map {
                let child_path = path.key(&key);
                if let Some((new_key, new_child)) = transform(&child_path, &key, child)? {
                    let new_child = walk_at(new_child, &child_path, transform)?;
                    walked.insert(new_key, new_child);
                }
            }
            Ok(Value::Object(walked))
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| walk_at(item, &path.index(index), transform))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other),
    }
}

/// Direction of the first-character case flip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCase {
    /// `agentRuntimeName` -> `AgentRuntimeName`
    Upper,
    /// `AgentRuntimeName` -> `agentRuntimeName`
    Lower,
}

impl KeyCase {
    pub fn apply(&self, key: &str) -> String {
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => match self {
                KeyCase::Upper => first.to_uppercase().chain(chars).collect(),
                KeyCase::Lower => first.to_lowercase().chain(chars).collect(),
            },
            None => String::new(),
        }
    }
}

type Hook<'a> = Box<dyn FnMut(&Path, String, Value) -> Result<Option<(String, Value)>> + 'a>;

/// Case-flipping walk with ignore patterns and hooks
///
/// Ignore patterns are matched against the path of the entry (as found in the
/// input tree) and only suppress the case flip. Hooks run on every entry after
/// the flip, in registration order; a hook returning `None` drops the entry and
/// later hooks do not see it.
pub struct CaseWalker<'a> {
    case: KeyCase,
    ignore: Vec<String>,
    hooks: Vec<Hook<'a>>,
}

impl<'a> CaseWalker<'a> {
    pub fn new(case: KeyCase) -> Self {
        Self {
            case,
            ignore: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Path, String, Value) -> Result<Option<(String, Value)>> + 'a,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn walk(mut self, value: Value) -> Result<Value> {
        let case = self.case;
        let ignore = std::mem::take(&mut self.ignore);
        let hooks = &mut self.hooks;

        walk(value, &mut |path: &Path, key: &str, value: Value| {
            let key = if ignore.iter().any(|pattern| path.matches(pattern)) {
                key.to_string()
            } else {
                case.apply(key)
            };

            let mut entry = (key, value);
            for hook in hooks.iter_mut() {
                match hook(path, entry.0, entry.1)? {
                    Some(next) => entry = next,
                    None => return Ok(None),
                }
            }
            Ok(Some(entry))
        })
    }
}

/// Find the first key of `original` that did not survive into `known`
///
/// `known` is what a typed model re-serialized after reading `original`; a key
/// it lost is one the model does not know. Null values are skipped because an
/// absent optional and an explicit null are equivalent. Returns the path of the
/// unknown entry.
pub fn first_unknown_key(original: &Value, known: &Value) -> Option<Path> {
    unknown_at(original, known, &Path::root())
}

fn unknown_at(original: &Value, known: &Value, path: &Path) -> Option<Path> {
    match (original, known) {
        (Value::Object(original), Value::Object(known)) => {
            original.iter().find_map(|(key, value)| match known.get(key) {
                Some(known_value) => unknown_at(value, known_value, &path.key(key)),
                // empty values may be absent from the re-serialized model
                None if is_empty(value) => None,
                None => Some(path.key(key)),
            })
        }
        (Value::Array(original), Value::Array(known)) => original
            .iter()
            .zip(known.iter())
            .enumerate()
            .find_map(|(index, (value, known_value))| {
                unknown_at(value, known_value, &path.index(index))
            }),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
