//! Action currying.
//!
//! A component declares its action creators once. Each instance receives the
//! same creators pre-bound to its own [`Binding`], so calling
//! `actions.call("increment", payload)` is exactly
//! `dispatch(creator(&binding, payload, None))`.
//!
//! # Example
//!
//! ```ignore
//! let counter = Stateful::new("counter", reducer)
//!     .with_action("increment", action("increment"))
//!     .with_action("reset", |binding, _payload, meta| {
//!         binding.address(Action { kind: "set".into(), payload: json!(0), meta })
//!     });
//!
//! // Later, on a mounted instance:
//! let actions = instance.actions().unwrap();
//! actions.call("increment", json!(1))?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{LocalError, Result};
use crate::pipeline::Dispatcher;
use crate::state::Refs;
use crate::types::{Action, LocalAction, StateKey};

/// Raw action creator: `(identity, payload, meta) -> addressed action`.
pub type ActionCreator = Rc<dyn Fn(&Binding, Value, Option<Value>) -> LocalAction>;

// =============================================================================
// Binding
// =============================================================================

/// The identity an instance's actions are bound to.
#[derive(Clone)]
pub struct Binding {
    key: StateKey,
    refs: Refs,
}

impl Binding {
    pub fn new(key: StateKey, refs: Refs) -> Self {
        Self { key, refs }
    }

    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// The instance's ref registry.
    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    /// Address `action` to this instance's slot.
    pub fn address(&self, action: Action) -> LocalAction {
        LocalAction::new(self.key.clone(), action)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("refs", &self.refs.names())
            .finish()
    }
}

/// Creator that sends `kind` with the call's payload and meta.
pub fn action(
    kind: &'static str,
) -> impl Fn(&Binding, Value, Option<Value>) -> LocalAction + 'static {
    move |binding: &Binding, payload: Value, meta: Option<Value>| {
        binding.address(Action {
            kind: kind.to_string(),
            payload,
            meta,
        })
    }
}

// =============================================================================
// ActionCreators
// =============================================================================

/// A component's declared actions, by name.
#[derive(Clone, Default)]
pub struct ActionCreators {
    creators: BTreeMap<String, ActionCreator>,
}

impl ActionCreators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        creator: impl Fn(&Binding, Value, Option<Value>) -> LocalAction + 'static,
    ) {
        self.creators.insert(name.into(), Rc::new(creator));
    }

    pub fn get(&self, name: &str) -> Option<&ActionCreator> {
        self.creators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Declared names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.creators.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

// =============================================================================
// Bound actions
// =============================================================================

/// One action creator bound to an instance.
#[derive(Clone)]
pub struct BoundAction {
    creator: ActionCreator,
    binding: Binding,
    dispatcher: Dispatcher,
}

impl BoundAction {
    /// The addressed action this call would dispatch.
    pub fn prepare(&self, payload: Value, meta: Option<Value>) -> LocalAction {
        (self.creator)(&self.binding, payload, meta)
    }

    /// Dispatch with a payload. Returns whether the instance's state changed.
    pub fn call(&self, payload: Value) -> bool {
        self.call_with_meta(payload, None)
    }

    pub fn call_with_meta(&self, payload: Value, meta: Option<Value>) -> bool {
        self.dispatcher.dispatch(self.prepare(payload, meta))
    }
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("key", self.binding.key())
            .finish()
    }
}

struct BoundInner {
    binding: Binding,
    creators: ActionCreators,
    dispatcher: Dispatcher,
}

/// Every declared action of a component, bound to one instance.
///
/// Built once per instance at CREATE and carried over on every UPDATE, so
/// clones handed out earlier stay valid and compare equal with
/// [`BoundActions::ptr_eq`].
#[derive(Clone)]
pub struct BoundActions(Rc<BoundInner>);

impl BoundActions {
    pub(crate) fn new(binding: Binding, creators: ActionCreators, dispatcher: Dispatcher) -> Self {
        Self(Rc::new(BoundInner {
            binding,
            creators,
            dispatcher,
        }))
    }

    pub fn key(&self) -> &StateKey {
        self.0.binding.key()
    }

    pub fn binding(&self) -> &Binding {
        &self.0.binding
    }

    /// Look up one bound action.
    pub fn get(&self, name: &str) -> Result<BoundAction> {
        let creator = self.0.creators.get(name).ok_or_else(|| LocalError::NotCallable {
            key: self.key().clone(),
            name: name.to_string(),
        })?;
        Ok(BoundAction {
            creator: creator.clone(),
            binding: self.0.binding.clone(),
            dispatcher: self.0.dispatcher.clone(),
        })
    }

    /// Dispatch the named action with a payload.
    pub fn call(&self, name: &str, payload: Value) -> Result<bool> {
        Ok(self.get(name)?.call(payload))
    }

    pub fn call_with_meta(&self, name: &str, payload: Value, meta: Value) -> Result<bool> {
        Ok(self.get(name)?.call_with_meta(payload, Some(meta)))
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.creators.names()
    }

    pub fn ptr_eq(&self, other: &BoundActions) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BoundActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundActions")
            .field("key", self.key())
            .field("names", &self.names())
            .finish()
    }
}
