//! Named counters for tracking per-frame events (draw calls, binds, dispatches)

use std::collections::HashMap;

/// Keys are static labels so incrementing never allocates once a name has
/// been seen.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    counters: HashMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: u64) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn set(&mut self, name: &'static str, value: u64) {
        self.counters.insert(name, value);
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// Zeroes every counter but keeps the names (and the map's storage).
    pub fn reset_all(&mut self) {
        for value in self.counters.values_mut() {
            *value = 0;
        }
    }

    /// Overwrites `self` with `other`, reusing the existing allocation.
    pub fn copy_from(&mut self, other: &Counter) {
        self.counters.clone_from(&other.counters);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counters.iter().map(|(name, value)| (*name, *value))
    }
}
