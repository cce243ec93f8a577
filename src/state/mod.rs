//! State Module - Per-instance runtime state that outlives a render pass
//!
//! - **Refs** - Named imperative handles with late-bound lookup
//! - **Dirty** - Which state keys changed since their last real render

mod dirty;
mod refs;

pub use dirty::*;
pub use refs::*;
