//! Identity engine - State keys and the instance registry.
//!
//! - Key: derives a stable state key from a node's path and explicit key
//! - Registry: persistent instance records, keyed by state key
//!
//! # Architecture
//!
//! Renderer nodes are throwaway. Instances are not:
//!
//! ```text
//! pass 1: Node{path "0.1.0", key "a"} ─┐
//!                                      ├─ resolve → "0.1.a" → Instance (state, refs, actions)
//! pass 2: Node{path "0.1.3", key "a"} ─┘
//! ```

mod key;
mod registry;

pub use key::*;
pub use registry::*;
