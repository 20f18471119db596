//! Variable and capture tables.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::CaptureKey;

/// Variable names in slot order; a name keeps the index it was declared at.
#[derive(Clone, Debug, Default)]
pub struct SlotTable {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Index of `name`, declaring it at the next free slot if absent.
    pub fn insert(&mut self, name: &str) -> usize {
        if let Some(idx) = self.get(name) {
            return idx;
        }
        let idx = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in slot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Ordered set of capture keys. Nesting rarely goes deep, so this stays
/// inline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureTable {
    keys: SmallVec<[CaptureKey; 4]>,
}

impl CaptureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `key`, appending it if absent.
    pub fn insert(&mut self, key: CaptureKey) -> usize {
        match self.position(key) {
            Some(pos) => pos,
            None => {
                self.keys.push(key);
                self.keys.len() - 1
            }
        }
    }

    pub fn position(&self, key: CaptureKey) -> Option<usize> {
        self.keys.iter().position(|&k| k == key)
    }

    pub fn contains(&self, key: CaptureKey) -> bool {
        self.position(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CaptureKey> + '_ {
        self.keys.iter().copied()
    }
}
