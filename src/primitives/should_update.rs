//! Change detection - the default "should re-render" predicate.
//!
//! A stateful component re-renders when any of these changed since the last
//! render:
//! - its state reference (not its contents)
//! - its children, element-wise
//! - its props, shallowly
//!
//! No deep comparison anywhere. The reducer returning a fresh `Rc` is what
//! marks state as changed.

use std::rc::Rc;

use crate::types::{Child, Node, Props, State};

/// What the predicate sees of one render.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub state: Option<&'a State>,
    pub props: &'a Props,
    pub children: &'a [Child],
}

impl<'a> Frame<'a> {
    pub fn new(node: &'a Node, state: Option<&'a State>) -> Self {
        Self {
            state,
            props: &node.props,
            children: &node.children,
        }
    }
}

bitflags::bitflags! {
    /// Which inputs differ between two frames.
    ///
    /// Combine with bitwise OR: `Changes::STATE | Changes::PROPS`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Changes: u8 {
        const STATE = 1 << 0;
        const CHILDREN = 1 << 1;
        const PROPS = 1 << 2;
    }
}

fn same_state(prev: Option<&State>, next: Option<&State>) -> bool {
    match (prev, next) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Report every input that differs between `prev` and `next`.
pub fn changes(prev: &Frame<'_>, next: &Frame<'_>) -> Changes {
    let mut changes = Changes::empty();
    if !same_state(prev.state, next.state) {
        changes |= Changes::STATE;
    }
    if prev.children != next.children {
        changes |= Changes::CHILDREN;
    }
    if !prev.props.shallow_eq(next.props) {
        changes |= Changes::PROPS;
    }
    changes
}

/// Default predicate installed on stateful components.
pub fn should_update(prev: &Frame<'_>, next: &Frame<'_>) -> bool {
    !same_state(prev.state, next.state)
        || prev.children != next.children
        || !prev.props.shallow_eq(next.props)
}
