//! State key resolution.
//!
//! A node's state key is a pure function of its tree path and optional
//! explicit key:
//!
//! ```text
//! path "0.1",   key None      → "0.1"     (position is identity)
//! path "0.1.2", key Some("a") → "0.1.a"   (parent prefix + explicit key)
//! path "2",     key Some("a") → "a"       (root: empty prefix)
//! ```
//!
//! Keyed siblings keep their key when they move, so their state survives
//! reorder, insertion, and removal.

use crate::types::StateKey;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

/// Derive the state key for a node.
pub fn resolve(path: &str, key: Option<&str>) -> StateKey {
    match key {
        None => StateKey::from(path),
        Some(key) => {
            let prefix = match path.rfind(SEPARATOR) {
                Some(at) => &path[..=at],
                None => "",
            };
            StateKey::from(format!("{prefix}{key}"))
        }
    }
}

/// Path of the parent position, or `None` at the root.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|at| &path[..at])
}

/// Path of the `index`-th child under `parent`.
pub fn child_path(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        index.to_string()
    } else {
        format!("{parent}{SEPARATOR}{index}")
    }
}
