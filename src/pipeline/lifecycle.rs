//! Lifecycle Dispatcher - Binds component instances to keyed store state.
//!
//! The renderer reports three events per node and this layer does the rest:
//!
//! ```text
//! UNMOUNTED ──CREATE──→ CREATED ──UPDATE──→ UPDATED ──UPDATE──→ ...
//!                           │                   │
//!                           └──────DESTROY──────┴──→ DESTROYED
//! ```
//!
//! # Example
//!
//! ```ignore
//! use spark_local::{LocalState, MemoryStore, Node, Render};
//!
//! let mut local = LocalState::new(MemoryStore::new());
//!
//! // First pass
//! let node = Node::new("0.1", counter.clone());
//! local.create(&node);
//!
//! // A bound action changes state; the key is now dirty.
//! local.instance(&node.state_key()).unwrap().actions().unwrap().call("increment", json!(1))?;
//!
//! // Next pass: fresh render refreshes the snapshot and clears the marker.
//! let next = Node::new("0.1", counter.clone());
//! local.update(&next, &node, Render::Fresh)?;
//!
//! // Teardown hands back the final record.
//! let last = local.destroy(&next)?;
//! ```
//!
//! The renderer is trusted to order events correctly. UPDATE or DESTROY for
//! an unknown key returns [`LocalError::NotMounted`] and changes nothing.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::dispatch::{Dispatcher, LocalDispatch, RefHandle, SharedStore};
use crate::config::{Hydration, LocalConfig, RefMode, RefScope};
use crate::engine::{Instance, Phase, Registry};
use crate::error::{LocalError, Result};
use crate::primitives::{Binding, BoundActions, Frame, Stateful};
use crate::state::{DirtySet, Refs};
use crate::store::EphemeralStore;
use crate::types::{Message, Node, Props, State, StateKey};

// =============================================================================
// Events
// =============================================================================

/// How an UPDATE was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Render {
    /// The node was freshly computed this pass.
    #[default]
    Fresh,
    /// The node is a replay from a memoized subtree. Neither the dirty
    /// marker nor the state snapshot is touched, so updates that landed
    /// since the last real render are not lost.
    Cached,
}

/// One lifecycle event from the renderer.
#[derive(Debug, Clone, Copy)]
pub enum Lifecycle<'a> {
    Create(&'a Node),
    Update {
        node: &'a Node,
        prev: &'a Node,
        render: Render,
    },
    Destroy(&'a Node),
}

// =============================================================================
// LocalState
// =============================================================================

/// The lifecycle-binding layer between a renderer and a keyed store.
///
/// Owns the instance registry and (through its [`Dispatcher`]) the dirty
/// set. Independent `LocalState`s never share either.
pub struct LocalState {
    config: LocalConfig,
    dispatcher: Dispatcher,
    registry: Registry,
}

impl LocalState {
    pub fn new(store: impl EphemeralStore + 'static) -> Self {
        Self::with_config(store, LocalConfig::default())
    }

    pub fn with_config(store: impl EphemeralStore + 'static, config: LocalConfig) -> Self {
        Self::with_store(Rc::new(RefCell::new(store)), config)
    }

    /// Use a store the caller keeps a handle to.
    pub fn with_store(store: SharedStore, config: LocalConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(store, DirtySet::new()),
            registry: Registry::new(),
        }
    }

    /// Install the downstream handler. Call before the first CREATE: bound
    /// actions capture the dispatcher as it is when their instance mounts.
    pub fn with_next(mut self, next: impl Fn(&Message) + 'static) -> Self {
        self.dispatcher = self.dispatcher.with_next(Rc::new(next));
        self
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dirty(&self) -> &DirtySet {
        self.dispatcher.dirty()
    }

    /// Dispatch through the chain. See [`Dispatcher::dispatch`].
    pub fn dispatch(&self, message: impl Into<Message>) -> bool {
        self.dispatcher.dispatch(message)
    }

    /// Route one renderer event. Returns a copy of the affected record.
    pub fn handle(&mut self, event: Lifecycle<'_>) -> Result<Instance> {
        match event {
            Lifecycle::Create(node) => Ok(self.create(node).clone()),
            Lifecycle::Update { node, prev, render } => {
                self.update(node, prev, render).map(Instance::clone)
            }
            Lifecycle::Destroy(node) => self.destroy(node),
        }
    }

    // -------------------------------------------------------------------------
    // CREATE
    // -------------------------------------------------------------------------

    /// Mount `node`.
    ///
    /// Every instance gets a ref registry. Stateful instances additionally
    /// get a store entry, a state snapshot, bound actions, and a local
    /// dispatch helper, and their props ref callback (if any) is invoked.
    pub fn create(&mut self, node: &Node) -> &Instance {
        let key = node.state_key();
        if self.registry.contains(&key) {
            warn!(%key, "create for a key that is already mounted");
        }

        // Cleared before anything below can dispatch, so a mount-time
        // dispatch from the ref callback stays marked.
        self.dispatcher.dirty().clear(&key);

        let instance = match node.kind.as_stateful() {
            None => Instance {
                key: key.clone(),
                path: node.path.clone(),
                kind: node.kind.clone(),
                phase: Phase::Created,
                state: None,
                refs: self.refs_for(node, false),
                actions: None,
                local: None,
                on_ref: None,
                renders: 0,
            },
            Some(component) => {
                let state = self.register(&key, component, &node.props);
                if component.install_should_update() {
                    trace!(component = component.name(), "installed default should_update");
                }

                let refs = self.refs_for(node, true);
                let binding = Binding::new(key.clone(), refs.clone());
                let actions = BoundActions::new(
                    binding.clone(),
                    component.actions().clone(),
                    self.dispatcher.clone(),
                );
                let local =
                    LocalDispatch::new(binding, component.actions().clone(), self.dispatcher.clone());

                let on_ref = node.props.on_ref().cloned();
                if let Some(callback) = &on_ref {
                    callback(match self.config.ref_mode {
                        RefMode::Actions => RefHandle::Actions(actions.clone()),
                        RefMode::Local => RefHandle::Local(local.clone()),
                    });
                }

                Instance {
                    key: key.clone(),
                    path: node.path.clone(),
                    kind: node.kind.clone(),
                    phase: Phase::Created,
                    state: Some(state),
                    refs,
                    actions: Some(actions),
                    local: Some(local),
                    on_ref,
                    renders: 0,
                }
            }
        };

        debug!(%key, component = node.kind.name(), "create");
        self.registry.insert(instance)
    }

    /// Register the instance's store entry and return its first snapshot.
    fn register(&self, key: &StateKey, component: &Stateful, props: &Props) -> State {
        let store = self.dispatcher.store();
        let live = store.borrow().read(key);

        match (self.config.hydration, live) {
            (Hydration::Reuse, Some(live)) => {
                debug!(%key, "hydrating from live store value");
                live
            }
            (hydration, live) => {
                let seed: State = Rc::new(component.initial_state(props));
                let mut store = store.borrow_mut();
                if hydration == Hydration::Overwrite && live.is_some() {
                    debug!(%key, "overwriting live store value");
                    store.destroy(key);
                }
                store.create(key, component.reducer().clone(), seed.clone());
                store.read(key).unwrap_or(seed)
            }
        }
    }

    fn refs_for(&self, node: &Node, stateful: bool) -> Refs {
        match self.config.ref_scope {
            RefScope::Node => Refs::new(),
            RefScope::Subtree if stateful => Refs::new(),
            RefScope::Subtree => self
                .registry
                .nearest_ancestor(&node.path)
                .map(|ancestor| ancestor.refs.clone())
                .unwrap_or_default(),
        }
    }

    // -------------------------------------------------------------------------
    // UPDATE
    // -------------------------------------------------------------------------

    /// Carry the instance rendered as `prev` over to `node`.
    ///
    /// Refs, bound actions, the local helper, and the ref callback are kept
    /// as-is. A [`Render::Fresh`] update clears the dirty marker and
    /// re-reads state from the store; a [`Render::Cached`] one does neither.
    pub fn update(&mut self, node: &Node, prev: &Node, render: Render) -> Result<&Instance> {
        let key = prev.state_key();
        if node.state_key() != key {
            warn!(%key, next = %node.state_key(), "update changed the state key; keeping the original");
        }

        let Some(mut instance) = self.registry.remove(&key) else {
            warn!(%key, "update for an instance that is not mounted");
            return Err(LocalError::NotMounted(key));
        };

        match render {
            Render::Fresh => {
                self.dispatcher.dirty().clear(&key);
                if instance.kind.is_stateful() {
                    instance.state = self.dispatcher.read(&key);
                }
            }
            Render::Cached => {}
        }

        instance.path = node.path.clone();
        instance.phase = Phase::Updated;
        instance.renders += 1;

        let cached = render == Render::Cached;
        debug!(%key, component = node.kind.name(), cached, "update");
        Ok(self.registry.insert(instance))
    }

    /// Run the component's change-detection predicate for `prev` → `node`.
    ///
    /// Compares the snapshot taken at the last real render with the store's
    /// current value. Call before [`update`](Self::update).
    pub fn should_update(&self, prev: &Node, node: &Node) -> bool {
        let prev_state = self
            .registry
            .get(&prev.state_key())
            .and_then(|instance| instance.state.clone());
        let next_state = if node.kind.is_stateful() {
            self.dispatcher.read(&node.state_key())
        } else {
            None
        };
        node.kind.should_update(
            &Frame::new(prev, prev_state.as_ref()),
            &Frame::new(node, next_state.as_ref()),
        )
    }

    // -------------------------------------------------------------------------
    // DESTROY
    // -------------------------------------------------------------------------

    /// Unmount `node` and return its final record.
    ///
    /// For stateful instances the record carries the last store value, read
    /// just before the entry is destroyed.
    pub fn destroy(&mut self, node: &Node) -> Result<Instance> {
        let key = node.state_key();
        let Some(mut instance) = self.registry.remove(&key) else {
            warn!(%key, "destroy for an instance that is not mounted");
            return Err(LocalError::NotMounted(key));
        };

        self.dispatcher.dirty().clear(&key);
        if instance.kind.is_stateful() {
            instance.state = self.dispatcher.read(&key);
            self.dispatcher.store().borrow_mut().destroy(&key);
        }
        instance.phase = Phase::Destroyed;

        debug!(%key, component = node.kind.name(), "destroy");
        Ok(instance)
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    pub fn instance(&self, key: &StateKey) -> Option<&Instance> {
        self.registry.get(key)
    }

    /// Current store value at `key` (not the render snapshot).
    pub fn state(&self, key: &StateKey) -> Option<State> {
        self.dispatcher.read(key)
    }

    /// Mounted keys, sorted.
    pub fn keys(&self) -> Vec<StateKey> {
        self.registry.keys()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{action, Component};
    use crate::store::MemoryStore;
    use crate::types::Action;
    use serde_json::{json, Value};
    use std::cell::Cell;

    fn counter() -> Rc<Component> {
        Rc::new(Component::from(
            Stateful::new("counter", |state, action| match action.kind.as_str() {
                "increment" => {
                    let count = state["count"].as_i64().unwrap_or(0);
                    let by = action.payload.as_i64().unwrap_or(1);
                    Rc::new(json!({ "count": count + by }))
                }
                _ => state.clone(),
            })
            .with_initial_state(|props| {
                json!({ "count": props.get("start").and_then(Value::as_i64).unwrap_or(0) })
            })
            .with_action("increment", action("increment"))
            .with_action("noop", action("noop")),
        ))
    }

    fn shared_store() -> Rc<RefCell<MemoryStore>> {
        Rc::new(RefCell::new(MemoryStore::new()))
    }

    #[test]
    fn test_stateless_gets_refs_but_no_store_entry() {
        let store = shared_store();
        let mut local = LocalState::with_store(store.clone(), LocalConfig::default());
        let node = Node::new("0", Rc::new(Component::stateless("label")));

        let instance = local.create(&node);
        assert!(instance.state().is_none());
        assert!(instance.actions().is_none());
        assert!(instance.local().is_none());
        assert!(instance.refs().is_empty());
        assert!(store.borrow().is_empty());

        let last = local.destroy(&node).unwrap();
        assert_eq!(last.phase(), Phase::Destroyed);
        assert!(store.borrow().is_empty());
        assert!(local.is_empty());
    }

    #[test]
    fn test_create_registers_initial_state() {
        let store = shared_store();
        let mut local = LocalState::with_store(store.clone(), LocalConfig::default());
        let node = Node::new("0.1", counter()).with_props(Props::new().with("start", 4));

        let instance = local.create(&node);
        assert_eq!(instance.state().map(|s| (**s).clone()), Some(json!({ "count": 4 })));
        assert_eq!(instance.phase(), Phase::Created);

        let key = StateKey::from("0.1");
        assert_eq!(store.borrow().read(&key).as_deref(), Some(&json!({ "count": 4 })));
        // Default predicate installed on first stateful create.
        assert!(node.kind.as_stateful().unwrap().predicate().is_some());
    }

    #[test]
    fn test_create_reuses_live_value() {
        let store = shared_store();
        let key = StateKey::from("0.1");
        let reducer = counter().as_stateful().unwrap().reducer().clone();
        store
            .borrow_mut()
            .create(&key, reducer, Rc::new(json!({ "count": 42 })));

        let mut local = LocalState::with_store(store.clone(), LocalConfig::default());
        let instance = local.create(&Node::new("0.1", counter()));
        assert_eq!(instance.state().map(|s| (**s).clone()), Some(json!({ "count": 42 })));
    }

    #[test]
    fn test_create_overwrite_policy() {
        let store = shared_store();
        let key = StateKey::from("0.1");
        let reducer = counter().as_stateful().unwrap().reducer().clone();
        store
            .borrow_mut()
            .create(&key, reducer, Rc::new(json!({ "count": 42 })));

        let config = LocalConfig::default().hydration(Hydration::Overwrite);
        let mut local = LocalState::with_store(store.clone(), config);
        local.create(&Node::new("0.1", counter()));
        assert_eq!(store.borrow().read(&key).as_deref(), Some(&json!({ "count": 0 })));
    }

    #[test]
    fn test_fresh_update_refreshes_and_clears() {
        let mut local = LocalState::new(MemoryStore::new());
        let kind = counter();
        let first = Node::new("0", kind.clone());
        let key = first.state_key();
        local.create(&first);

        let actions = local.instance(&key).unwrap().actions().unwrap().clone();
        assert!(actions.call("increment", json!(2)).unwrap());
        assert!(local.dirty().is_dirty(&key));
        // Snapshot is still the one from the last render.
        assert_eq!(
            local.instance(&key).unwrap().state().map(|s| (**s).clone()),
            Some(json!({ "count": 0 }))
        );

        let second = Node::new("0", kind);
        let instance = local.update(&second, &first, Render::Fresh).unwrap();
        assert_eq!(instance.state().map(|s| (**s).clone()), Some(json!({ "count": 2 })));
        assert_eq!(instance.renders(), 1);
        assert!(!local.dirty().is_dirty(&key));
    }

    #[test]
    fn test_cached_update_keeps_marker_and_snapshot() {
        let mut local = LocalState::new(MemoryStore::new());
        let kind = counter();
        let first = Node::new("0", kind.clone());
        let key = first.state_key();
        local.create(&first);

        local
            .instance(&key)
            .unwrap()
            .actions()
            .unwrap()
            .call("increment", json!(1))
            .unwrap();

        let replay = Node::new("0", kind);
        let instance = local.update(&replay, &first, Render::Cached).unwrap();
        assert_eq!(instance.state().map(|s| (**s).clone()), Some(json!({ "count": 0 })));
        assert_eq!(instance.phase(), Phase::Updated);
        assert!(local.dirty().is_dirty(&key));
    }

    #[test]
    fn test_update_carries_over_bindings() {
        let mut local = LocalState::new(MemoryStore::new());
        let kind = counter();
        let first = Node::new("0", kind.clone()).with_props(Props::new().with_ref(|_| {}));
        let key = first.state_key();

        let (refs, actions, local_fn, on_ref) = {
            let created = local.create(&first);
            (
                created.refs().clone(),
                created.actions().unwrap().clone(),
                created.local().unwrap().clone(),
                created.on_ref().unwrap().clone(),
            )
        };

        // The next pass brings a new callback; the original one is kept.
        let second = Node::new("0", kind).with_props(Props::new().with_ref(|_| {}));
        let updated = local.update(&second, &first, Render::Fresh).unwrap();
        assert!(updated.refs().ptr_eq(&refs));
        assert!(updated.actions().unwrap().ptr_eq(&actions));
        assert!(updated.local().unwrap().ptr_eq(&local_fn));
        assert!(Rc::ptr_eq(updated.on_ref().unwrap(), &on_ref));
        assert_eq!(updated.key(), &key);
    }

    #[test]
    fn test_ref_callback_receives_actions() {
        let mut local = LocalState::new(MemoryStore::new());
        let received: Rc<RefCell<Option<RefHandle>>> = Rc::new(RefCell::new(None));
        let sink = received.clone();
        let node = Node::new("0.2", counter())
            .with_props(Props::new().with_ref(move |handle| *sink.borrow_mut() = Some(handle)));
        local.create(&node);

        let handle = received.borrow_mut().take().unwrap();
        assert_eq!(handle.key(), &StateKey::from("0.2"));
        let actions = handle.actions().unwrap();
        assert!(actions.ptr_eq(local.instance(&node.state_key()).unwrap().actions().unwrap()));

        // The handle stays live after the render that produced it.
        assert!(actions.call("increment", json!(3)).unwrap());
        assert_eq!(
            local.state(&node.state_key()).as_deref(),
            Some(&json!({ "count": 3 }))
        );
    }

    #[test]
    fn test_ref_callback_local_mode() {
        let config = LocalConfig::default().ref_mode(RefMode::Local);
        let mut local = LocalState::with_config(MemoryStore::new(), config);
        let received: Rc<RefCell<Option<RefHandle>>> = Rc::new(RefCell::new(None));
        let sink = received.clone();
        let node = Node::new("0", counter())
            .with_props(Props::new().with_ref(move |handle| *sink.borrow_mut() = Some(handle)));
        local.create(&node);

        let handle = received.borrow_mut().take().unwrap();
        let dispatch = handle.local().unwrap();
        assert!(dispatch.dispatch(Action::new("increment", json!(5))));
        assert_eq!(local.state(&node.state_key()).as_deref(), Some(&json!({ "count": 5 })));
    }

    #[test]
    fn test_mount_time_dispatch_stays_dirty() {
        let mut local = LocalState::new(MemoryStore::new());
        let node = Node::new("0", counter()).with_props(Props::new().with_ref(|handle| {
            if let Some(actions) = handle.actions() {
                let _ = actions.call("increment", json!(1));
            }
        }));
        local.create(&node);
        assert!(local.dirty().is_dirty(&node.state_key()));
    }

    #[test]
    fn test_noop_action_leaves_key_clean() {
        let mut local = LocalState::new(MemoryStore::new());
        let node = Node::new("0", counter());
        local.create(&node);

        let actions = local.instance(&node.state_key()).unwrap().actions().unwrap().clone();
        assert!(!actions.call("noop", Value::Null).unwrap());
        assert!(local.dirty().is_empty());

        assert!(actions.call("increment", json!(1)).unwrap());
        assert_eq!(local.dirty().keys(), vec![node.state_key()]);
    }

    #[test]
    fn test_destroy_returns_final_state() {
        let store = shared_store();
        let mut local = LocalState::with_store(store.clone(), LocalConfig::default());
        let node = Node::new("0.3", counter());
        local.create(&node);
        local
            .instance(&node.state_key())
            .unwrap()
            .actions()
            .unwrap()
            .call("increment", json!(7))
            .unwrap();

        let last = local.destroy(&node).unwrap();
        assert_eq!(last.phase(), Phase::Destroyed);
        assert_eq!(last.state().map(|s| (**s).clone()), Some(json!({ "count": 7 })));
        assert!(store.borrow().read(&node.state_key()).is_none());
        assert!(!local.dirty().is_dirty(&node.state_key()));
        assert!(local.instance(&node.state_key()).is_none());
    }

    #[test]
    fn test_unmounted_events_are_errors() {
        let mut local = LocalState::new(MemoryStore::new());
        let node = Node::new("0", counter());

        let err = local.update(&node, &node, Render::Fresh).unwrap_err();
        assert!(matches!(err, LocalError::NotMounted(_)));
        let err = local.destroy(&node).unwrap_err();
        assert!(matches!(err, LocalError::NotMounted(_)));
    }

    #[test]
    fn test_should_update_tracks_store() {
        let mut local = LocalState::new(MemoryStore::new());
        let kind = counter();
        let props = Props::new().with("label", "a");
        let first = Node::new("0", kind.clone()).with_props(props.clone());
        local.create(&first);

        let same = Node::new("0", kind.clone()).with_props(props.clone());
        assert!(!local.should_update(&first, &same));

        local
            .instance(&first.state_key())
            .unwrap()
            .actions()
            .unwrap()
            .call("increment", json!(1))
            .unwrap();
        assert!(local.should_update(&first, &same));

        local.update(&same, &first, Render::Fresh).unwrap();
        let again = Node::new("0", kind).with_props(props);
        assert!(!local.should_update(&same, &again));
    }

    #[test]
    fn test_subtree_scope_shares_registry() {
        let config = LocalConfig::default().ref_scope(RefScope::Subtree);
        let mut local = LocalState::with_config(MemoryStore::new(), config);
        let label = Rc::new(Component::stateless("label"));

        let root = Node::new("0", counter());
        let child = Node::new("0.0", label.clone());
        let grandchild = Node::new("0.0.1", label.clone());
        let nested = Node::new("0.1", counter());

        let root_refs = local.create(&root).refs().clone();
        let child_refs = local.create(&child).refs().clone();
        let grandchild_refs = local.create(&grandchild).refs().clone();
        let nested_refs = local.create(&nested).refs().clone();

        assert!(child_refs.ptr_eq(&root_refs));
        assert!(grandchild_refs.ptr_eq(&root_refs));
        // Stateful instances root their own registry.
        assert!(!nested_refs.ptr_eq(&root_refs));
    }

    #[test]
    fn test_node_scope_isolates_registries() {
        let mut local = LocalState::new(MemoryStore::new());
        let label = Rc::new(Component::stateless("label"));
        let parent = local.create(&Node::new("0", label.clone())).refs().clone();
        let child = local.create(&Node::new("0.0", label)).refs().clone();
        assert!(!parent.ptr_eq(&child));
    }

    #[test]
    fn test_next_handler_and_handle() {
        let forwarded = Rc::new(Cell::new(0));
        let count = forwarded.clone();
        let mut local = LocalState::new(MemoryStore::new())
            .with_next(move |_| count.set(count.get() + 1));

        let node = Node::new("0", counter());
        let created = local.handle(Lifecycle::Create(&node)).unwrap();
        created.actions().unwrap().call("increment", json!(1)).unwrap();
        local.dispatch(Action::new("route", json!("/")));
        assert_eq!(forwarded.get(), 2);

        let updated = local
            .handle(Lifecycle::Update {
                node: &node,
                prev: &node,
                render: Render::Fresh,
            })
            .unwrap();
        assert_eq!(updated.phase(), Phase::Updated);

        let destroyed = local.handle(Lifecycle::Destroy(&node)).unwrap();
        assert_eq!(destroyed.phase(), Phase::Destroyed);
    }

    #[test]
    fn test_independent_dispatchers_do_not_share_dirty_sets() {
        let mut a = LocalState::new(MemoryStore::new());
        let mut b = LocalState::new(MemoryStore::new());
        let node = Node::new("0", counter());
        a.create(&node);
        b.create(&node);

        a.instance(&node.state_key())
            .unwrap()
            .actions()
            .unwrap()
            .call("increment", json!(1))
            .unwrap();
        assert!(a.dirty().is_dirty(&node.state_key()));
        assert!(!b.dirty().is_dirty(&node.state_key()));
    }
}
