//! Local state configuration.
//!
//! Construct with struct literal syntax, the builder methods, or from a JSON
//! document:
//!
//! ```ignore
//! let config = LocalConfig::default()
//!     .hydration(Hydration::Overwrite)
//!     .ref_scope(RefScope::Subtree);
//!
//! let config = LocalConfig::from_json(r#"{ "ref_mode": "local" }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What CREATE does when the store already holds a value at the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hydration {
    /// Seed the instance from the live value; `initial_state` is not called.
    #[default]
    Reuse,
    /// Drop the live value and register a fresh `initial_state(props)`.
    Overwrite,
}

/// What a props ref callback receives when its instance mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefMode {
    /// The curried action mapping.
    #[default]
    Actions,
    /// The raw local dispatch helper.
    Local,
}

/// Which instances share a ref registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefScope {
    /// Every instance owns its registry.
    #[default]
    Node,
    /// Stateful instances root a registry; stateless descendants share the
    /// registry of their nearest mounted ancestor.
    Subtree,
}

/// Configuration for one [`LocalState`](crate::LocalState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub hydration: Hydration,
    pub ref_mode: RefMode,
    pub ref_scope: RefScope,
}

impl LocalConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn hydration(mut self, hydration: Hydration) -> Self {
        self.hydration = hydration;
        self
    }

    pub fn ref_mode(mut self, ref_mode: RefMode) -> Self {
        self.ref_mode = ref_mode;
        self
    }

    pub fn ref_scope(mut self, ref_scope: RefScope) -> Self {
        self.ref_scope = ref_scope;
        self
    }
}
