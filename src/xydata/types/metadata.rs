//! Insertion-ordered string map attached to data sets and blocks.

use super::error::{Result, XyError};

/// Metadata describing a data set or a block: date of the experiment,
/// wavelength, instrument settings and so on.
///
/// Keys are unique and iteration follows insertion order. When a key is
/// set twice the first value is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaData {
    entries: Vec<(String, String)>,
}

impl MetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    pub fn value(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| XyError::MissingKey(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key at position `index` in insertion order.
    pub fn get_key(&self, index: usize) -> Result<&str> {
        self.entries
            .get(index)
            .map(|(k, _)| k.as_str())
            .ok_or(XyError::IndexOutOfRange {
                what: "metadata",
                index,
                len: self.entries.len(),
            })
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stores `value` under `key` unless the key is empty or already present.
    ///
    /// Returns `true` if the value was stored.
    pub(crate) fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if key.is_empty() || self.has_key(&key) {
            return false;
        }
        self.entries.push((key, value.into()));
        true
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}
