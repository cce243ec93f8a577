//! # spark-local
//!
//! Keyed local state for components in a reactive render tree.
//!
//! The renderer recomputes its tree every pass. This crate gives each logical
//! component instance private state that survives those passes, held in an
//! external keyed store and bound to the instance exactly once per real
//! lifecycle transition.
//!
//! ## Architecture
//!
//! ```text
//! Node{path, key} → StateKey → Instance (registry) ⇄ EphemeralStore
//!                                   │
//!                                   ├─ Refs          (late-bound handles)
//!                                   ├─ BoundActions  (curried to the key)
//!                                   └─ DirtySet      (real changes only)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Node, Props, StateKey, Action, Message
//! - [`engine`] - State key resolution and the instance registry
//! - [`store`] - Ephemeral store contract and in-memory store
//! - [`primitives`] - Component descriptors, change detection, action currying
//! - [`state`] - Ref registries and the dirty set
//! - [`pipeline`] - Dispatch chain and the lifecycle dispatcher

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::{Hydration, LocalConfig, RefMode, RefScope};
pub use error::{LocalError, Result};

pub use engine::{child_path, parent_path, resolve, Instance, Phase, Registry};

pub use store::{EphemeralStore, MemoryStore};

pub use primitives::{
    action, changes, should_update, ActionCreator, ActionCreators, Binding, BoundAction,
    BoundActions, Changes, Component, Frame, InitialState, Reducer, ShouldUpdate, Stateful,
};

pub use state::{DirtySet, Handle, Refs};

pub use pipeline::{
    Dispatcher, Lifecycle, LocalDispatch, LocalState, Next, RefHandle, Render, SharedStore,
};
