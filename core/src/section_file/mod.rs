//! In-memory section store: ordered dotted paths to typed values.
//!
//! Paths look like `player3.c12.x`. The first segment names the section;
//! the rest is the entry key inside it. Callers build paths with
//! `format!` at the call site.

mod text;

use crate::error::{SaveError, SaveResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(String),
    StrVec(Vec<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::StrVec(_) => "string vector",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionFile {
    entries: Vec<(String, Value)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SectionFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// True if any entry lives under `section.`.
    pub fn has_section(&self, section: &str) -> bool {
        self.entries.iter().any(|(k, _)| in_section(k, section))
    }

    /// Number of entries under `section.`.
    pub fn section_len(&self, section: &str) -> usize {
        self.entries.iter().filter(|(k, _)| in_section(k, section)).count()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    // ── Insertion ─────────────────────────────────────────────

    /// Insert or overwrite. An overwritten path keeps its original position.
    pub fn insert(&mut self, path: impl Into<String>, value: Value) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => {
                log::trace!("section path '{path}' written twice, last write wins");
                self.entries[i].1 = value;
            }
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, value));
            }
        }
    }

    pub fn insert_int(&mut self, path: impl Into<String>, value: i64) {
        self.insert(path, Value::Int(value));
    }

    pub fn insert_bool(&mut self, path: impl Into<String>, value: bool) {
        self.insert(path, Value::Bool(value));
    }

    pub fn insert_str(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.insert(path, Value::Str(value.into()));
    }

    pub fn insert_str_vec<S: AsRef<str>>(&mut self, path: impl Into<String>, values: &[S]) {
        let values = values.iter().map(|s| s.as_ref().to_string()).collect();
        self.insert(path, Value::StrVec(values));
    }

    /// Same as [`insert_str`](Self::insert_str); kept separate to mark
    /// fields that are rewritten while a save is in progress.
    pub fn replace_str(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.insert_str(path, value);
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let i = self.index.remove(path)?;
        let (_, value) = self.entries.remove(i);
        self.rebuild_index();
        Some(value)
    }

    /// Move the value at `from` to `to`, keeping its position.
    /// Does nothing and returns false if `from` is absent or `to` exists.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if self.contains(to) {
            return false;
        }
        let Some(i) = self.index.remove(from) else {
            return false;
        };
        self.entries[i].0 = to.to_string();
        self.index.insert(to.to_string(), i);
        true
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, (k, _))| (k.clone(), i))
            .collect();
    }

    // ── Lookup ────────────────────────────────────────────────

    pub fn lookup_int(&self, path: &str) -> Option<i64> {
        match self.get(path)? {
            Value::Int(v) => Some(*v),
            other => {
                log::debug!("'{path}' is a {}, expected integer", other.kind());
                None
            }
        }
    }

    pub fn lookup_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            Value::Bool(v) => Some(*v),
            other => {
                log::debug!("'{path}' is a {}, expected boolean", other.kind());
                None
            }
        }
    }

    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            Value::Str(v) => Some(v.as_str()),
            other => {
                log::debug!("'{path}' is a {}, expected string", other.kind());
                None
            }
        }
    }

    /// A lone string is accepted as a one-element vector.
    pub fn lookup_str_vec(&self, path: &str) -> Option<Vec<String>> {
        match self.get(path)? {
            Value::StrVec(v) => Some(v.clone()),
            Value::Str(s) => Some(vec![s.clone()]),
            other => {
                log::debug!("'{path}' is a {}, expected string vector", other.kind());
                None
            }
        }
    }

    pub fn lookup_int_or(&self, path: &str, default: i64) -> i64 {
        self.lookup_int(path).unwrap_or(default)
    }

    pub fn lookup_bool_or(&self, path: &str, default: bool) -> bool {
        self.lookup_bool(path).unwrap_or(default)
    }

    pub fn lookup_str_or<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.lookup_str(path).unwrap_or(default)
    }

    pub fn require_int(&self, path: &str) -> SaveResult<i64> {
        self.lookup_int(path)
            .ok_or_else(|| SaveError::structural(path, "missing or not an integer"))
    }

    pub fn require_bool(&self, path: &str) -> SaveResult<bool> {
        self.lookup_bool(path)
            .ok_or_else(|| SaveError::structural(path, "missing or not a boolean"))
    }

    pub fn require_str(&self, path: &str) -> SaveResult<&str> {
        self.lookup_str(path)
            .ok_or_else(|| SaveError::structural(path, "missing or not a string"))
    }

    /// Like [`lookup_int_or`](Self::lookup_int_or) for fields held as `i32`.
    /// A stored value outside the `i32` range is structural.
    pub fn lookup_i32_or(&self, path: &str, default: i32) -> SaveResult<i32> {
        match self.lookup_int(path) {
            Some(v) => narrow_i32(path, v),
            None => Ok(default),
        }
    }

    pub fn require_i32(&self, path: &str) -> SaveResult<i32> {
        narrow_i32(path, self.require_int(path)?)
    }

    /// An entry count, absent meaning zero. A negative count or one above
    /// `limit` is structural.
    pub fn lookup_count(&self, path: &str, limit: usize) -> SaveResult<usize> {
        let count = self.lookup_int_or(path, 0);
        usize::try_from(count)
            .ok()
            .filter(|n| *n <= limit)
            .ok_or_else(|| {
                SaveError::structural(path, format!("count {count} outside 0..={limit}"))
            })
    }
}

fn in_section(path: &str, section: &str) -> bool {
    path.len() > section.len()
        && path.starts_with(section)
        && path.as_bytes()[section.len()] == b'.'
}

fn narrow_i32(path: &str, v: i64) -> SaveResult<i32> {
    i32::try_from(v)
        .map_err(|_| SaveError::structural(path, format!("{v} does not fit in 32 bits")))
}
