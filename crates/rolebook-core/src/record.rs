//! Flat key/value records and the line-oriented parser that produces them.
//!
//! Definition files use a deliberately small subset of YAML. Each line,
//! after trimming, is one of:
//!
//! - blank, which is skipped;
//! - a full-line comment starting with `#`, which is skipped;
//! - `key: value`, split on the first `:` with both sides trimmed;
//! - anything else, which is dropped without failing the parse.
//!
//! Values are plain strings. There is no quoting, escaping, type coercion,
//! nesting or list syntax, and a `#` after the first column is kept as part
//! of the value.

use std::collections::BTreeMap;
use std::ops::Index;

use serde::Serialize;

/// Error returned when definition content cannot be treated as text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("content is not valid UTF-8 (invalid byte sequence at offset {valid_up_to})")]
pub struct ParseError {
    valid_up_to: usize,
}

impl ParseError {
    /// Byte offset up to which the input was valid UTF-8.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

/// A flat string-to-string mapping parsed from one definition file.
///
/// Records are created fresh on every lookup and owned by the caller.
/// Keys are kept in sorted order so that debug and JSON output is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConfigRecord {
    entries: BTreeMap<String, String>,
}

impl ConfigRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the record has an entry for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert an entry, replacing any previous value for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume the record, returning the underlying map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}

impl Index<&str> for ConfigRecord {
    type Output = str;

    /// Panics when `key` is absent, like indexing a map.
    fn index(&self, key: &str) -> &str {
        match self.entries.get(key) {
            Some(value) => value,
            None => panic!("no entry for key {key:?} in config record"),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for ConfigRecord {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Parse already-decoded text into a [`ConfigRecord`].
///
/// Never fails: lines that are not `key: value` pairs are skipped. When a
/// key appears more than once the last occurrence wins.
pub fn parse_str(content: &str) -> ConfigRecord {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut record = ConfigRecord::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            record.insert(key.trim(), value.trim());
        }
    }

    record
}

/// Parse raw file bytes into a [`ConfigRecord`].
///
/// Fails only when the bytes are not UTF-8 text.
pub fn parse_bytes(bytes: &[u8]) -> Result<ConfigRecord, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError {
        valid_up_to: e.valid_up_to(),
    })?;
    Ok(parse_str(text))
}
