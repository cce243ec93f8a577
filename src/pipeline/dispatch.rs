//! Dispatch chain - store-addressed updates with dirty tracking.
//!
//! ```text
//! Message::Local ─→ read before ─→ store.update ─→ next ─→ read after ─→ mark dirty if ≠
//! Message::Other ─────────────────────────────────→ next
//! ```
//!
//! "Changed" means the value at the key is a different `Rc` afterwards. A
//! reducer that returns its input leaves the key clean.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::trace;

use crate::error::Result;
use crate::primitives::{ActionCreators, Binding, BoundAction, BoundActions};
use crate::state::DirtySet;
use crate::store::EphemeralStore;
use crate::types::{Action, LocalAction, Message, State, StateKey};

/// Downstream handler; sees every message after the store has applied it.
pub type Next = Rc<dyn Fn(&Message)>;

/// Shared store handle.
pub type SharedStore = Rc<RefCell<dyn EphemeralStore>>;

// =============================================================================
// Dispatcher
// =============================================================================

/// Entry point for every dispatch. Cheap to clone; clones share the store,
/// the dirty set, and the downstream handler.
#[derive(Clone)]
pub struct Dispatcher {
    store: SharedStore,
    dirty: DirtySet,
    next: Option<Next>,
}

impl Dispatcher {
    pub fn new(store: SharedStore, dirty: DirtySet) -> Self {
        Self {
            store,
            dirty,
            next: None,
        }
    }

    pub fn with_next(mut self, next: Next) -> Self {
        self.next = Some(next);
        self
    }

    /// Dispatch a message. Returns `true` if it changed a store value (and so
    /// marked its key dirty).
    pub fn dispatch(&self, message: impl Into<Message>) -> bool {
        match message.into() {
            Message::Local(local) => self.dispatch_local(local),
            Message::Other(action) => {
                self.forward(&Message::Other(action));
                false
            }
        }
    }

    fn dispatch_local(&self, local: LocalAction) -> bool {
        let key = local.key.clone();
        let before = self.store.borrow().read(&key);
        self.store.borrow_mut().update(&key, &local.action);

        let kind = local.action.kind.clone();
        self.forward(&Message::Local(local));

        let after = self.store.borrow().read(&key);
        let changed = match (&before, &after) {
            (Some(before), Some(after)) => !Rc::ptr_eq(before, after),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.dirty.mark(&key);
        }
        trace!(%key, action = %kind, changed, "local dispatch");
        changed
    }

    fn forward(&self, message: &Message) {
        if let Some(next) = &self.next {
            next(message);
        }
    }

    /// Latest committed value at `key`.
    pub fn read(&self, key: &StateKey) -> Option<State> {
        self.store.borrow().read(key)
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("dirty", &self.dirty.keys())
            .field("next", &self.next.is_some())
            .finish()
    }
}

// =============================================================================
// Local dispatch helper
// =============================================================================

struct LocalInner {
    binding: Binding,
    creators: ActionCreators,
    dispatcher: Dispatcher,
}

/// The raw dispatch helper of one stateful instance.
///
/// Everything dispatched through it is addressed to the instance's key.
#[derive(Clone)]
pub struct LocalDispatch(Rc<LocalInner>);

impl LocalDispatch {
    pub(crate) fn new(binding: Binding, creators: ActionCreators, dispatcher: Dispatcher) -> Self {
        Self(Rc::new(LocalInner {
            binding,
            creators,
            dispatcher,
        }))
    }

    pub fn key(&self) -> &StateKey {
        self.0.binding.key()
    }

    /// Dispatch `action` to this instance's slot.
    pub fn dispatch(&self, action: Action) -> bool {
        self.0.dispatcher.dispatch(self.0.binding.address(action))
    }

    /// Wrap an action-producing function into a dispatching callable.
    ///
    /// Anything captured by `produce` plays the role of arguments fixed now;
    /// the payload is supplied at call time.
    ///
    /// ```ignore
    /// let step = 5;
    /// let add = local.local(move |n: Value| Action::new("add", json!(n.as_i64().unwrap_or(0) * step)));
    /// add(json!(2)); // dispatches add(10) to this instance
    /// ```
    pub fn local(&self, produce: impl Fn(Value) -> Action + 'static) -> Rc<dyn Fn(Value) -> bool> {
        let this = self.clone();
        Rc::new(move |payload: Value| this.dispatch(produce(payload)))
    }

    /// Same as [`local`](Self::local) for a declared action creator.
    ///
    /// Fails with [`NotCallable`](crate::LocalError::NotCallable) if `name`
    /// is not declared on the component.
    pub fn local_action(&self, name: &str) -> Result<BoundAction> {
        BoundActions::new(
            self.0.binding.clone(),
            self.0.creators.clone(),
            self.0.dispatcher.clone(),
        )
        .get(name)
    }

    pub fn ptr_eq(&self, other: &LocalDispatch) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LocalDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalDispatch").field(self.key()).finish()
    }
}

// =============================================================================
// Ref handle
// =============================================================================

/// What a ref callback receives, per [`RefMode`](crate::RefMode).
#[derive(Clone, Debug)]
pub enum RefHandle {
    Actions(BoundActions),
    Local(LocalDispatch),
}

impl RefHandle {
    pub fn key(&self) -> &StateKey {
        match self {
            RefHandle::Actions(actions) => actions.key(),
            RefHandle::Local(local) => local.key(),
        }
    }

    pub fn actions(&self) -> Option<&BoundActions> {
        match self {
            RefHandle::Actions(actions) => Some(actions),
            RefHandle::Local(_) => None,
        }
    }

    pub fn local(&self) -> Option<&LocalDispatch> {
        match self {
            RefHandle::Local(local) => Some(local),
            RefHandle::Actions(_) => None,
        }
    }
}
