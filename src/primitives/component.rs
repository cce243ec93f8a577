//! Component descriptors.
//!
//! One descriptor per component type, shared by every instance through
//! `Rc<Component>`. Whether a component has private state is decided by the
//! variant, not by probing for a reducer:
//!
//! ```ignore
//! let label = Rc::new(Component::stateless("label"));
//!
//! let counter = Rc::new(Component::from(
//!     Stateful::new("counter", |state, action| match action.kind.as_str() {
//!         "increment" => Rc::new(json!({ "count": state["count"].as_i64().unwrap_or(0) + 1 })),
//!         _ => state.clone(),
//!     })
//!     .with_initial_state(|props| json!({ "count": props.get("start").cloned().unwrap_or(json!(0)) }))
//!     .with_action("increment", action("increment")),
//! ));
//! ```

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use serde_json::{json, Value};

use super::actions::{ActionCreators, Binding};
use super::should_update::{should_update, Frame};
use crate::types::{Action, LocalAction, Props, State};

/// Pure `(state, action) -> state`. Return the input `Rc` for a no-op.
pub type Reducer = Rc<dyn Fn(&State, &Action) -> State>;

/// Produces the first state value from props.
pub type InitialState = Rc<dyn Fn(&Props) -> Value>;

/// Decides whether a re-render is needed between two frames.
pub type ShouldUpdate = Rc<dyn Fn(&Frame<'_>, &Frame<'_>) -> bool>;

// =============================================================================
// Stateful
// =============================================================================

/// Descriptor for a component with private state.
pub struct Stateful {
    name: String,
    reducer: Reducer,
    initial_state: InitialState,
    actions: ActionCreators,
    should_update: OnceCell<ShouldUpdate>,
}

impl Stateful {
    /// Initial state defaults to an empty object.
    pub fn new(
        name: impl Into<String>,
        reducer: impl Fn(&State, &Action) -> State + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            reducer: Rc::new(reducer),
            initial_state: Rc::new(|_: &Props| json!({})),
            actions: ActionCreators::new(),
            should_update: OnceCell::new(),
        }
    }

    pub fn with_initial_state(mut self, initial_state: impl Fn(&Props) -> Value + 'static) -> Self {
        self.initial_state = Rc::new(initial_state);
        self
    }

    pub fn with_action(
        mut self,
        name: impl Into<String>,
        creator: impl Fn(&Binding, Value, Option<Value>) -> LocalAction + 'static,
    ) -> Self {
        self.actions.insert(name, creator);
        self
    }

    pub fn with_actions(mut self, actions: ActionCreators) -> Self {
        self.actions = actions;
        self
    }

    /// Declare a predicate. The default is then never installed.
    pub fn with_should_update(
        self,
        predicate: impl Fn(&Frame<'_>, &Frame<'_>) -> bool + 'static,
    ) -> Self {
        let predicate: ShouldUpdate = Rc::new(predicate);
        Self {
            should_update: OnceCell::from(predicate),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    pub fn initial_state(&self, props: &Props) -> Value {
        (self.initial_state)(props)
    }

    pub fn actions(&self) -> &ActionCreators {
        &self.actions
    }

    /// The declared or installed predicate, if any yet.
    pub fn predicate(&self) -> Option<&ShouldUpdate> {
        self.should_update.get()
    }

    /// Install the default predicate unless one is already present.
    ///
    /// Returns `true` only on the call that installed it.
    pub fn install_should_update(&self) -> bool {
        if self.should_update.get().is_some() {
            return false;
        }
        self.should_update.set(Rc::new(should_update)).is_ok()
    }
}

// =============================================================================
// Component
// =============================================================================

/// A component type.
pub enum Component {
    /// No private state: never registers with the store.
    Stateless { name: String },
    Stateful(Stateful),
}

impl Component {
    pub fn stateless(name: impl Into<String>) -> Self {
        Component::Stateless { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Component::Stateless { name } => name,
            Component::Stateful(stateful) => stateful.name(),
        }
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self, Component::Stateful(_))
    }

    pub fn as_stateful(&self) -> Option<&Stateful> {
        match self {
            Component::Stateful(stateful) => Some(stateful),
            Component::Stateless { .. } => None,
        }
    }

    /// See [`Stateful::install_should_update`]. Always `false` for stateless kinds.
    pub fn install_should_update(&self) -> bool {
        self.as_stateful()
            .is_some_and(Stateful::install_should_update)
    }

    /// Run the component's predicate. Components without one always update.
    pub fn should_update(&self, prev: &Frame<'_>, next: &Frame<'_>) -> bool {
        match self.as_stateful().and_then(Stateful::predicate) {
            Some(predicate) => predicate(prev, next),
            None => true,
        }
    }
}

impl From<Stateful> for Component {
    fn from(stateful: Stateful) -> Self {
        Component::Stateful(stateful)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Stateless { name } => f.debug_tuple("Stateless").field(name).finish(),
            Component::Stateful(stateful) => f
                .debug_struct("Stateful")
                .field("name", &stateful.name)
                .field("actions", &stateful.actions.names())
                .field("should_update", &stateful.should_update.get().is_some())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Node;

    fn toggle() -> Stateful {
        Stateful::new("toggle", |state, action| match action.kind.as_str() {
            "flip" => Rc::new(json!({ "on": !state["on"].as_bool().unwrap_or(false) })),
            _ => state.clone(),
        })
    }

    #[test]
    fn test_default_initial_state_is_empty_object() {
        let component = toggle();
        assert_eq!(component.initial_state(&Props::new()), json!({}));

        let component = toggle().with_initial_state(|props| {
            json!({ "on": props.get("on").cloned().unwrap_or(Value::Bool(false)) })
        });
        assert_eq!(
            component.initial_state(&Props::new().with("on", true)),
            json!({ "on": true })
        );
    }

    #[test]
    fn test_install_is_idempotent() {
        let component = Component::from(toggle());
        assert!(component.as_stateful().unwrap().predicate().is_none());

        assert!(component.install_should_update());
        let first = component.as_stateful().unwrap().predicate().unwrap().clone();

        assert!(!component.install_should_update());
        let second = component.as_stateful().unwrap().predicate().unwrap().clone();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_declared_predicate_is_kept() {
        let component = Component::from(toggle().with_should_update(|_, _| false));
        assert!(!component.install_should_update());

        let n = Node::new("0", Rc::new(Component::stateless("x")));
        let a: State = Rc::new(json!({}));
        let b: State = Rc::new(json!({}));
        // Declared predicate wins even though state changed.
        assert!(!component.should_update(&Frame::new(&n, Some(&a)), &Frame::new(&n, Some(&b))));
    }

    #[test]
    fn test_stateless_never_installs() {
        let component = Component::stateless("label");
        assert!(!component.is_stateful());
        assert!(!component.install_should_update());

        let n = Node::new("0", Rc::new(Component::stateless("x")));
        assert!(component.should_update(&Frame::new(&n, None), &Frame::new(&n, None)));
    }
}
