//! Component Primitives - What a component type declares.
//!
//! - [`Component`] - Stateless vs stateful descriptor, shared by all instances
//! - [`should_update`] - Default change-detection predicate
//! - [`BoundActions`] - Declared action creators curried to one instance
//!
//! # Declaring once, binding per instance
//!
//! ```text
//! Stateful { reducer, initial_state, actions }      (one per component type)
//!        │
//!        ├── instance "0.1.a" → BoundActions(key "0.1.a")
//!        └── instance "0.1.b" → BoundActions(key "0.1.b")
//! ```

mod actions;
mod component;
mod should_update;

pub use actions::*;
pub use component::*;
pub use should_update::*;
