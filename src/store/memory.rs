//! In-memory ephemeral store.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::warn;

use super::EphemeralStore;
use crate::primitives::Reducer;
use crate::types::{Action, State, StateKey};

struct Entry {
    reducer: Reducer,
    value: State,
}

/// Keyed entries, each holding its reducer and current value.
///
/// A reducer that returns its input `Rc` leaves the entry's identity
/// unchanged, which is what dirty tracking keys off.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<StateKey, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All occupied keys, sorted.
    pub fn keys(&self) -> Vec<StateKey> {
        let mut keys: Vec<StateKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl EphemeralStore for MemoryStore {
    fn create(&mut self, key: &StateKey, reducer: Reducer, initial: State) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(
            key.clone(),
            Entry {
                reducer,
                value: initial,
            },
        );
        true
    }

    fn read(&self, key: &StateKey) -> Option<State> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    fn update(&mut self, key: &StateKey, action: &Action) -> Option<State> {
        let Some(entry) = self.entries.get_mut(key) else {
            warn!(%key, action = %action.kind, "update for key with no store entry");
            return None;
        };
        let next = (entry.reducer)(&entry.value, action);
        entry.value = next;
        Some(Rc::clone(&entry.value))
    }

    fn destroy(&mut self, key: &StateKey) -> Option<State> {
        self.entries.remove(key).map(|entry| entry.value)
    }
}
