//! Core types for spark-local.
//!
//! These describe what the renderer hands us each pass ([`Node`], [`Props`],
//! [`Child`]) and what flows to the store ([`Action`], [`LocalAction`],
//! [`Message`]). Nodes are read-only input: everything that must survive
//! between passes lives in the instance registry, keyed by [`StateKey`].

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::resolve;
use crate::pipeline::RefHandle;
use crate::primitives::Component;

// =============================================================================
// State
// =============================================================================

/// A snapshot of one instance's private state.
///
/// Shared, never mutated in place. Reducers return the same `Rc` for a
/// no-op, so "did it change" is `!Rc::ptr_eq(before, after)`.
pub type State = Rc<Value>;

/// Stable identity of a logical component instance across render passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for StateKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for StateKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Actions
// =============================================================================

/// An action as a reducer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type, e.g. `"increment"`.
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// An action addressed to one instance's slot in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalAction {
    pub key: StateKey,
    pub action: Action,
}

impl LocalAction {
    pub fn new(key: StateKey, action: Action) -> Self {
        Self { key, action }
    }
}

/// Everything that travels through the dispatch chain.
///
/// Only `Local` messages touch the store and the dirty set. `Other` is
/// passed through to the downstream handler untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Local(LocalAction),
    Other(Action),
}

impl Message {
    /// The state key this message is addressed to, if any.
    pub fn key(&self) -> Option<&StateKey> {
        match self {
            Message::Local(local) => Some(&local.key),
            Message::Other(_) => None,
        }
    }

    pub fn action(&self) -> &Action {
        match self {
            Message::Local(local) => &local.action,
            Message::Other(action) => action,
        }
    }
}

impl From<LocalAction> for Message {
    fn from(local: LocalAction) -> Self {
        Message::Local(local)
    }
}

impl From<Action> for Message {
    fn from(action: Action) -> Self {
        Message::Other(action)
    }
}

// =============================================================================
// Props
// =============================================================================

/// Callback handed an imperative handle when a stateful instance mounts.
pub type RefCallback = Rc<dyn Fn(RefHandle)>;

/// Input data for one render pass.
#[derive(Clone, Default)]
pub struct Props {
    values: Map<String, Value>,
    on_ref: Option<RefCallback>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a prop value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder: attach a ref callback.
    pub fn with_ref(mut self, callback: impl Fn(RefHandle) + 'static) -> Self {
        self.on_ref = Some(Rc::new(callback));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn on_ref(&self) -> Option<&RefCallback> {
        self.on_ref.as_ref()
    }

    /// Shallow equality: same prop names, each top-level value equal, and
    /// the same ref callback (by identity).
    pub fn shallow_eq(&self, other: &Props) -> bool {
        let same_ref = match (&self.on_ref, &other.on_ref) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        same_ref
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .all(|(name, value)| other.values.get(name) == Some(value))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("values", &self.values)
            .field("on_ref", &self.on_ref.is_some())
            .finish()
    }
}

impl From<Map<String, Value>> for Props {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            on_ref: None,
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// One entry in a node's rendered children.
#[derive(Clone, Debug)]
pub enum Child {
    Text(String),
    Node(Rc<Node>),
}

/// Text compares by value, nodes by identity.
impl PartialEq for Child {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Child::Text(a), Child::Text(b)) => a == b,
            (Child::Node(a), Child::Node(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<Rc<Node>> for Child {
    fn from(node: Rc<Node>) -> Self {
        Child::Node(node)
    }
}

/// One position in the rendered tree for one render pass.
///
/// Recreated by the renderer every pass. Never mutated by this crate.
#[derive(Clone)]
pub struct Node {
    /// Dot-separated position, e.g. `"0.2.1"`.
    pub path: String,
    /// Explicit key disambiguating shifting siblings.
    pub key: Option<String>,
    pub kind: Rc<Component>,
    pub props: Props,
    pub children: Vec<Child>,
}

impl Node {
    pub fn new(path: impl Into<String>, kind: Rc<Component>) -> Self {
        Self {
            path: path.into(),
            key: None,
            kind,
            props: Props::default(),
            children: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn with_children(mut self, children: Vec<Child>) -> Self {
        self.children = children;
        self
    }

    /// The identity this node's private state lives under.
    pub fn state_key(&self) -> StateKey {
        resolve(&self.path, self.key.as_deref())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("key", &self.key)
            .field("kind", &self.kind.name())
            .field("props", &self.props)
            .field("children", &self.children.len())
            .finish()
    }
}
