//! `NodeIterator`/`TreeWalker` (spec.md §4.6): both walk the same document
//! tree shape `dom_tree::node` already gives us, so there's no teacher file
//! to ground this on directly — it's built from the DOM traversal spec
//! itself, using the same `Rc`/`Weak` handles as the rest of this crate.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::node::{self, Handle};

pub type NodeFilterFn = std::rc::Rc<dyn Fn(&Handle) -> bool>;

fn accept(filter: &Option<NodeFilterFn>, node: &Handle) -> bool {
    filter.as_ref().is_none_or(|f| f(node))
}

fn first_child(node: &Handle) -> Option<Handle> {
    node.children.borrow().first().cloned()
}

fn last_child(node: &Handle) -> Option<Handle> {
    node.children.borrow().last().cloned()
}

fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = node.parent_handle()?;
    let siblings = parent.children.borrow();
    let i = siblings.iter().position(|n| std::rc::Rc::ptr_eq(n, node))?;
    siblings.get(i + 1).cloned()
}

fn previous_sibling(node: &Handle) -> Option<Handle> {
    let parent = node.parent_handle()?;
    let siblings = parent.children.borrow();
    let i = siblings.iter().position(|n| std::rc::Rc::ptr_eq(n, node))?;
    if i == 0 {
        None
    } else {
        siblings.get(i - 1).cloned()
    }
}

/// The mutable part of a `NodeIterator` that must be reachable from outside
/// the iterator itself: [`crate::mutation::remove`] looks these up through
/// the owning document's `live_iterators` list and adjusts them in place
/// before a removal actually happens.
pub struct IterRef {
    root: Handle,
    reference_node: RefCell<Handle>,
    pointer_before_reference: Cell<bool>,
}

/// <https://dom.spec.whatwg.org/#nodeiterator-pre-removing-steps>, run for
/// every live iterator before `to_be_removed` is detached.
pub(crate) fn adjust_for_removal(state: &IterRef, to_be_removed: &Handle) {
    let reference = state.reference_node.borrow().clone();
    if std::rc::Rc::ptr_eq(to_be_removed, &state.root) || !is_inclusive_ancestor(to_be_removed, &reference) {
        return;
    }
    if state.pointer_before_reference.get() {
        if let Some(next) = first_following_outside(&state.root, to_be_removed) {
            *state.reference_node.borrow_mut() = next;
            return;
        }
        state.pointer_before_reference.set(false);
    }
    if let Some(prev) = previous_sibling(to_be_removed) {
        *state.reference_node.borrow_mut() = prev;
    } else if let Some(parent) = to_be_removed.parent_handle() {
        *state.reference_node.borrow_mut() = parent;
    }
}

fn is_inclusive_ancestor(ancestor: &Handle, of: &Handle) -> bool {
    let mut cur = Some(of.clone());
    while let Some(node) = cur {
        if std::rc::Rc::ptr_eq(&node, ancestor) {
            return true;
        }
        cur = node.parent_handle();
    }
    false
}

/// `to_be_removed`'s first following node, bounded by `root`, that is not
/// itself inside `to_be_removed`'s subtree — i.e. the same climb
/// `first_following` does, minus the initial descent into children.
fn first_following_outside(root: &Handle, to_be_removed: &Handle) -> Option<Handle> {
    let mut cur = to_be_removed.clone();
    loop {
        if Rc::ptr_eq(&cur, root) {
            return None;
        }
        if let Some(sibling) = next_sibling(&cur) {
            return Some(sibling);
        }
        cur = cur.parent_handle()?;
    }
}

/// Pre-order document-tree walk bounded by `root`, filtered by `filter`
/// (spec.md §4.6 "NodeIterator"). Registers its live, shared reference state
/// with the owning document so a later `mutation::remove` can run the
/// pre-removal adjustment on it even while this `NodeIterator` is parked
/// between calls.
pub struct NodeIterator {
    state: Rc<IterRef>,
    filter: Option<NodeFilterFn>,
}

impl NodeIterator {
    pub fn new(root: Handle, filter: Option<NodeFilterFn>) -> Self {
        let state = Rc::new(IterRef { reference_node: RefCell::new(root.clone()), pointer_before_reference: Cell::new(true), root: root.clone() });
        node::document_root(&root).register_iterator(Rc::downgrade(&state));
        NodeIterator { state, filter }
    }

    fn root(&self) -> Handle {
        self.state.root.clone()
    }

    fn reference_node(&self) -> Handle {
        self.state.reference_node.borrow().clone()
    }

    /// <https://dom.spec.whatwg.org/#concept-nodeiterator-traverse>
    fn traverse(&mut self, forward: bool) -> Option<Handle> {
        let mut node = self.reference_node();
        let mut before = self.state.pointer_before_reference.get();
        loop {
            if forward {
                if !before {
                    node = self.first_following(&node)?;
                } else {
                    before = false;
                }
            } else if before {
                node = self.last_preceding(&node)?;
            } else {
                before = true;
            }
            if accept(&self.filter, &node) {
                break;
            }
        }
        *self.state.reference_node.borrow_mut() = node.clone();
        self.state.pointer_before_reference.set(before);
        Some(node)
    }

    fn first_following(&self, node: &Handle) -> Option<Handle> {
        if let Some(child) = first_child(node) {
            return Some(child);
        }
        let mut cur = node.clone();
        loop {
            if std::rc::Rc::ptr_eq(&cur, &self.root()) {
                return None;
            }
            if let Some(sibling) = next_sibling(&cur) {
                return Some(sibling);
            }
            cur = cur.parent_handle()?;
        }
    }

    fn last_preceding(&self, node: &Handle) -> Option<Handle> {
        if std::rc::Rc::ptr_eq(node, &self.root()) {
            return None;
        }
        if let Some(sibling) = previous_sibling(node) {
            let mut deepest = sibling;
            while let Some(child) = last_child(&deepest) {
                deepest = child;
            }
            return Some(deepest);
        }
        node.parent_handle()
    }

    pub fn next_node(&mut self) -> Option<Handle> {
        self.traverse(true)
    }

    pub fn previous_node(&mut self) -> Option<Handle> {
        self.traverse(false)
    }
}

/// spec.md §4.6 "TreeWalker": like `NodeIterator` but can also move to
/// parent/sibling/child directly instead of only stepping through the flat
/// filtered sequence.
pub struct TreeWalker {
    root: Handle,
    current: Handle,
    filter: Option<NodeFilterFn>,
}

impl TreeWalker {
    pub fn new(root: Handle, filter: Option<NodeFilterFn>) -> Self {
        TreeWalker { current: root.clone(), root, filter }
    }

    pub fn current_node(&self) -> Handle {
        self.current.clone()
    }

    pub fn parent_node(&mut self) -> Option<Handle> {
        let mut node = self.current.parent_handle()?;
        loop {
            if std::rc::Rc::ptr_eq(&node, &self.root) || accept(&self.filter, &node) {
                if accept(&self.filter, &node) {
                    self.current = node.clone();
                    return Some(node);
                }
                return None;
            }
            node = node.parent_handle()?;
        }
    }

    pub fn first_child(&mut self) -> Option<Handle> {
        self.traverse_children(true)
    }

    pub fn last_child(&mut self) -> Option<Handle> {
        self.traverse_children(false)
    }

    fn traverse_children(&mut self, forward: bool) -> Option<Handle> {
        let children = self.current.children.borrow().clone();
        let ordered: Box<dyn Iterator<Item = Handle>> =
            if forward { Box::new(children.into_iter()) } else { Box::new(children.into_iter().rev()) };
        for child in ordered {
            if accept(&self.filter, &child) {
                self.current = child.clone();
                return Some(child);
            }
        }
        None
    }

    pub fn next_sibling(&mut self) -> Option<Handle> {
        self.traverse_siblings(true)
    }

    pub fn previous_sibling(&mut self) -> Option<Handle> {
        self.traverse_siblings(false)
    }

    fn traverse_siblings(&mut self, forward: bool) -> Option<Handle> {
        // <https://dom.spec.whatwg.org/#concept-traverse-siblings>, simplified
        // to a boolean filter (no FILTER_SKIP/FILTER_REJECT distinction): a
        // rejected node is treated like a skipped one and its subtree is
        // still searched depth-first before falling back to its sibling.
        let mut node = self.current.clone();
        if std::rc::Rc::ptr_eq(&node, &self.root) {
            return None;
        }
        loop {
            let mut sibling = if forward { next_sibling(&node) } else { previous_sibling(&node) };
            while let Some(candidate) = sibling {
                node = candidate;
                if accept(&self.filter, &node) {
                    self.current = node.clone();
                    return Some(node);
                }
                sibling = if forward { first_child(&node) } else { last_child(&node) };
                if sibling.is_none() {
                    sibling = if forward { next_sibling(&node) } else { previous_sibling(&node) };
                }
            }
            node = node.parent_handle()?;
            if std::rc::Rc::ptr_eq(&node, &self.root) {
                return None;
            }
        }
    }
}
