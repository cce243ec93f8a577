//! Lifecycle Pipeline
//!
//! Connects renderer lifecycle events to the keyed store.
//!
//! # Pipeline Architecture
//!
//! ```text
//! renderer event → LocalState → resolve key → store create/read/destroy
//!                                           → install should_update (once)
//!                                           → refs + bound actions
//! bound action   → Dispatcher → store.update → next → dirty set
//! ```
//!
//! ## Key Design Principles
//!
//! - **Store is the source of truth**: fresh renders always re-read state
//! - **Stable handles**: refs, bound actions, and the ref callback are built
//!   once per instance and carried over, never rebuilt per render
//! - **Real changes only**: a key is dirty only if its value was replaced

pub mod dispatch;
pub mod lifecycle;

// Re-exports
pub use dispatch::{Dispatcher, LocalDispatch, Next, RefHandle, SharedStore};
pub use lifecycle::{Lifecycle, LocalState, Render};
