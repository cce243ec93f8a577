//! Ephemeral store adapter.
//!
//! The contract this crate consumes from a keyed state store. One entry per
//! mounted stateful instance; the store owns the canonical value, instances
//! only hold snapshots.
//!
//! Every operation is synchronous: a `read` right after `create` or `update`
//! in the same turn must observe the new value. Dirty tracking relies on it.
//!
//! [`MemoryStore`] is the reference implementation.

mod memory;

pub use memory::MemoryStore;

use crate::primitives::Reducer;
use crate::types::{Action, State, StateKey};

/// Keyed slots of private component state.
pub trait EphemeralStore {
    /// Register a new entry.
    ///
    /// Returns `false` and leaves the existing entry untouched if `key` is
    /// already occupied.
    fn create(&mut self, key: &StateKey, reducer: Reducer, initial: State) -> bool;

    /// Latest committed value at `key`.
    fn read(&self, key: &StateKey) -> Option<State>;

    /// Run the entry's reducer over `action`, returning the resulting value.
    ///
    /// `None` if there is no entry at `key`.
    fn update(&mut self, key: &StateKey, action: &Action) -> Option<State>;

    /// Remove the entry, returning its final value.
    fn destroy(&mut self, key: &StateKey) -> Option<State>;

    fn contains(&self, key: &StateKey) -> bool {
        self.read(key).is_some()
    }
}
