//! Session-wide unique identifiers.

use rustc_hash::FxHashSet;

use crate::c_text::mangle;

/// Allocator for C identifiers that are unique within one session.
///
/// The first request for a base name returns it unchanged; every repeat gets
/// a suffix from a counter shared by all bases. Candidates that were already
/// issued (e.g. a base that itself looks like `foo_3`) are skipped.
#[derive(Debug, Default)]
pub struct UniqueNames {
    issued: FxHashSet<String>,
    counter: u32,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh identifier derived from `base`.
    pub fn get(&mut self, base: &str) -> String {
        let base = mangle(base);
        if !self.issued.contains(&base) {
            self.issued.insert(base.clone());
            return base;
        }
        loop {
            self.counter += 1;
            let candidate = format!("{base}_{}", self.counter);
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Whether `name` has been handed out.
    pub fn contains(&self, name: &str) -> bool {
        self.issued.contains(name)
    }

    /// Number of identifiers handed out so far.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
