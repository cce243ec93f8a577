//! Error types.
//!
//! Missing state is never an error: reads of an absent key return `None`.
//! Everything here is either programmer misuse (fail fast) or a lifecycle
//! event the renderer should never have sent.

use thiserror::Error;

use crate::types::StateKey;

/// Errors raised by the local state layer.
#[derive(Debug, Error)]
pub enum LocalError {
    /// A name handed to `local_action` or a curried action lookup does not
    /// resolve to an action creator on the component.
    #[error("`{name}` is not a callable action on the component at `{key}`")]
    NotCallable { key: StateKey, name: String },

    /// A late-bound ref was called while nothing is registered under its name.
    #[error("no ref registered under `{0}`")]
    UnboundRef(String),

    /// The registered handle is not of the requested type.
    #[error("ref `{name}` is not a `{expected}`")]
    RefType { name: String, expected: &'static str },

    /// UPDATE or DESTROY for a key with no live instance.
    #[error("no mounted instance at `{0}`")]
    NotMounted(StateKey),

    /// Malformed configuration document.
    #[error("invalid local state config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = LocalError> = std::result::Result<T, E>;
