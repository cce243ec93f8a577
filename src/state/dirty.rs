//! Dirty Set - Which instances had a real state change since their last render.
//!
//! A key is marked when a dispatch actually replaced the value in the store
//! (no-op dispatches never mark), and cleared when the instance is created,
//! freshly rendered, or destroyed. A scheduler reads the set to decide which
//! subtrees need a render pass.
//!
//! Membership changes bump a `spark-signals` revision, so a scheduler effect
//! that reads [`DirtySet::revision`] re-runs exactly when the set changes.
//!
//! Each [`LocalState`](crate::LocalState) owns its own set; independent
//! dispatchers never share one.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::types::StateKey;

struct DirtyInner {
    keys: RefCell<BTreeSet<StateKey>>,
    counter: Cell<u64>,
    revision: Signal<u64>,
}

/// Pending-render markers by state key. Clones share the same set.
#[derive(Clone)]
pub struct DirtySet(Rc<DirtyInner>);

impl DirtySet {
    pub fn new() -> Self {
        Self(Rc::new(DirtyInner {
            keys: RefCell::new(BTreeSet::new()),
            counter: Cell::new(0),
            revision: signal(0),
        }))
    }

    fn bump(&self) {
        let next = self.0.counter.get() + 1;
        self.0.counter.set(next);
        self.0.revision.set(next);
    }

    /// Mark `key` dirty. Returns `true` if it was clean.
    pub fn mark(&self, key: &StateKey) -> bool {
        let inserted = self.0.keys.borrow_mut().insert(key.clone());
        if inserted {
            self.bump();
        }
        inserted
    }

    /// Clear the marker for `key`. Returns `true` if it was dirty.
    pub fn clear(&self, key: &StateKey) -> bool {
        let removed = self.0.keys.borrow_mut().remove(key);
        if removed {
            self.bump();
        }
        removed
    }

    pub fn is_dirty(&self, key: &StateKey) -> bool {
        self.0.keys.borrow().contains(key)
    }

    /// Dirty keys, sorted.
    pub fn keys(&self) -> Vec<StateKey> {
        self.0.keys.borrow().iter().cloned().collect()
    }

    /// Take every dirty key, sorted, leaving the set empty.
    pub fn drain(&self) -> Vec<StateKey> {
        let drained: Vec<StateKey> = std::mem::take(&mut *self.0.keys.borrow_mut())
            .into_iter()
            .collect();
        if !drained.is_empty() {
            self.bump();
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.0.keys.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.keys.borrow().is_empty()
    }

    /// Current revision. Creates a reactive dependency inside effects/deriveds.
    pub fn revision(&self) -> u64 {
        self.0.revision.get()
    }

    pub fn revision_signal(&self) -> Signal<u64> {
        self.0.revision.clone()
    }
}

impl Default for DirtySet {
    fn default() -> Self {
        Self::new()
    }
}
