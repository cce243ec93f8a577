//! Ref Registry - Named imperative handles with call-time lookup.
//!
//! Registration (`bind`) and use (`to`) may happen in either order within a
//! render pass. `to` resolves the name when the returned callable runs, not
//! when it is built, so a caller created before the handle exists still
//! reaches it later.
//!
//! # Example
//!
//! ```ignore
//! let focus = refs.to("input", |input: &TextInput, ()| input.focus());
//!
//! // ...the child renders and registers itself:
//! refs.bind("input")(Rc::new(TextInput::new()));
//!
//! focus(())?;
//! ```

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{LocalError, Result};

/// A registered handle.
pub type Handle = Rc<dyn Any>;

/// Shared name → handle table.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct Refs {
    handles: Rc<RefCell<HashMap<String, Handle>>>,
}

impl Refs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registrar for `name`: calling it with a handle stores the handle.
    pub fn bind(&self, name: impl Into<String>) -> Rc<dyn Fn(Handle)> {
        let refs = self.clone();
        let name = name.into();
        Rc::new(move |handle: Handle| {
            refs.set(name.clone(), handle);
        })
    }

    /// Store a handle, returning the one it replaced.
    pub fn set(&self, name: impl Into<String>, handle: Handle) -> Option<Handle> {
        self.handles.borrow_mut().insert(name.into(), handle)
    }

    pub fn remove(&self, name: &str) -> Option<Handle> {
        self.handles.borrow_mut().remove(name)
    }

    /// Typed lookup.
    pub fn get<H: Any>(&self, name: &str) -> Result<Rc<H>> {
        let handle = self
            .handles
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| LocalError::UnboundRef(name.to_string()))?;
        handle.downcast::<H>().map_err(|_| LocalError::RefType {
            name: name.to_string(),
            expected: type_name::<H>(),
        })
    }

    /// Late-bound forwarder: each call looks `name` up, then runs `f` on it.
    pub fn to<H, A, R>(
        &self,
        name: impl Into<String>,
        f: impl Fn(&H, A) -> R + 'static,
    ) -> Rc<dyn Fn(A) -> Result<R>>
    where
        H: Any,
        A: 'static,
        R: 'static,
    {
        let refs = self.clone();
        let name = name.into();
        Rc::new(move |args: A| {
            let handle = refs.get::<H>(&name)?;
            Ok(f(&*handle, args))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.borrow().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handles.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.borrow().is_empty()
    }

    /// Whether both refer to the same table.
    pub fn ptr_eq(&self, other: &Refs) -> bool {
        Rc::ptr_eq(&self.handles, &other.handles)
    }
}
