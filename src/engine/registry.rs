//! Instance Registry - Persistent records for mounted component instances.
//!
//! The renderer rebuilds its nodes every pass; what must survive between
//! passes (state snapshot, refs, curried actions, the ref callback) lives
//! here instead, in a table keyed by state key:
//! - StateKey → Instance record
//! - Path → StateKey index, for ancestor lookups
//!
//! Records are created on CREATE, carried over on UPDATE, and handed back to
//! the caller on DESTROY.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::key::parent_path;
use crate::pipeline::LocalDispatch;
use crate::primitives::{BoundActions, Component};
use crate::state::Refs;
use crate::types::{RefCallback, State, StateKey};

// =============================================================================
// Instance
// =============================================================================

/// Lifecycle phase of a live (or just destroyed) instance.
///
/// `Unmounted` is represented by absence from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Updated,
    Destroyed,
}

/// Persistent record for one logical component instance.
#[derive(Clone)]
pub struct Instance {
    pub(crate) key: StateKey,
    pub(crate) path: String,
    pub(crate) kind: Rc<Component>,
    pub(crate) phase: Phase,
    pub(crate) state: Option<State>,
    pub(crate) refs: Refs,
    pub(crate) actions: Option<BoundActions>,
    pub(crate) local: Option<LocalDispatch>,
    pub(crate) on_ref: Option<RefCallback>,
    pub(crate) renders: u64,
}

impl Instance {
    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// Path the instance was last rendered at.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> &Rc<Component> {
        &self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// State snapshot as of the last real render. `None` for stateless kinds.
    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn actions(&self) -> Option<&BoundActions> {
        self.actions.as_ref()
    }

    pub fn local(&self) -> Option<&LocalDispatch> {
        self.local.as_ref()
    }

    /// The ref callback captured at CREATE.
    pub fn on_ref(&self) -> Option<&RefCallback> {
        self.on_ref.as_ref()
    }

    /// Number of UPDATE events seen since CREATE, cached replays included.
    pub fn renders(&self) -> u64 {
        self.renders
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("kind", &self.kind.name())
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("renders", &self.renders)
            .finish()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Table of live instances.
#[derive(Default)]
pub struct Registry {
    instances: HashMap<StateKey, Instance>,
    paths: HashMap<String, StateKey>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record under the same key.
    pub fn insert(&mut self, instance: Instance) -> &mut Instance {
        self.paths
            .insert(instance.path.clone(), instance.key.clone());
        match self.instances.entry(instance.key.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(instance);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(instance),
        }
    }

    /// Remove a record and its path index entry.
    pub fn remove(&mut self, key: &StateKey) -> Option<Instance> {
        let instance = self.instances.remove(key)?;
        if self.paths.get(&instance.path) == Some(key) {
            self.paths.remove(&instance.path);
        }
        Some(instance)
    }

    pub fn get(&self, key: &StateKey) -> Option<&Instance> {
        self.instances.get(key)
    }

    pub fn contains(&self, key: &StateKey) -> bool {
        self.instances.contains_key(key)
    }

    /// Instance last rendered at `path`.
    pub fn get_by_path(&self, path: &str) -> Option<&Instance> {
        self.paths.get(path).and_then(|key| self.instances.get(key))
    }

    /// Closest mounted instance above `path`.
    pub fn nearest_ancestor(&self, path: &str) -> Option<&Instance> {
        let mut current = parent_path(path);
        while let Some(path) = current {
            if let Some(instance) = self.get_by_path(path) {
                return Some(instance);
            }
            current = parent_path(path);
        }
        None
    }

    /// All live keys, sorted.
    pub fn keys(&self) -> Vec<StateKey> {
        let mut keys: Vec<StateKey> = self.instances.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
        self.paths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, key: &str) -> Instance {
        Instance {
            key: StateKey::from(key),
            path: path.to_string(),
            kind: Rc::new(Component::stateless("leaf")),
            phase: Phase::Created,
            state: None,
            refs: Refs::new(),
            actions: None,
            local: None,
            on_ref: None,
            renders: 0,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = Registry::new();
        registry.insert(record("0.1", "0.1"));
        let inserted = registry.insert(record("0.2.0", "0.2.a"));
        assert_eq!(inserted.key(), &StateKey::from("0.2.a"));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&StateKey::from("0.2.a")));
        assert_eq!(
            registry.get_by_path("0.2.0").map(|i| i.key().clone()),
            Some(StateKey::from("0.2.a"))
        );
        assert_eq!(
            registry.keys(),
            vec![StateKey::from("0.1"), StateKey::from("0.2.a")]
        );
    }

    #[test]
    fn test_remove_keeps_newer_path_owner() {
        let mut registry = Registry::new();
        registry.insert(record("0.0", "0.a"));
        // A different instance now renders at the same position.
        registry.insert(record("0.0", "0.b"));

        registry.remove(&StateKey::from("0.a"));
        assert_eq!(
            registry.get_by_path("0.0").map(|i| i.key().clone()),
            Some(StateKey::from("0.b"))
        );
    }

    #[test]
    fn test_nearest_ancestor_skips_gaps() {
        let mut registry = Registry::new();
        registry.insert(record("0", "0"));
        registry.insert(record("0.1.2", "0.1.2"));

        let ancestor = registry.nearest_ancestor("0.1.2.3").map(|i| i.key().clone());
        assert_eq!(ancestor, Some(StateKey::from("0.1.2")));

        let ancestor = registry.nearest_ancestor("0.5.1").map(|i| i.key().clone());
        assert_eq!(ancestor, Some(StateKey::from("0")));

        assert!(registry.nearest_ancestor("0").is_none());
    }

    #[test]
    fn test_clear() {
        let mut registry = Registry::new();
        registry.insert(record("0", "0"));
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get_by_path("0").is_none());
    }
}
