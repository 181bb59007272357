//! DOM core mutation algorithms (spec.md §4.5): `pre_insert`, `insert`,
//! `remove`, `adopt`, `clone_node`, `normalize`, plus the low-level splice
//! helpers [`crate::sink::DomSink`]'s `TreeSink` impl reuses directly for
//! parser-driven insertion (the parser has already validated tree shape via
//! the HTML parsing algorithm, so it skips straight to `append_attached`
//! instead of going through the validating `pre_insert`).

use crate::error::{DomError, DomResult};
use crate::node::{Handle, Node, NodeData};
use crate::registry;

fn is_ancestor_or_self(candidate: &Handle, of: &Handle) -> bool {
    let mut cur = Some(of.clone());
    while let Some(node) = cur {
        if std::rc::Rc::ptr_eq(&node, candidate) {
            return true;
        }
        cur = node.parent_handle();
    }
    false
}

fn can_have_children(parent: &Handle) -> bool {
    matches!(parent.data, NodeData::Document | NodeData::DocumentFragment | NodeData::Element { .. })
}

fn index_of(parent: &Handle, child: &Handle) -> Option<usize> {
    parent.children.borrow().iter().position(|c| std::rc::Rc::ptr_eq(c, child))
}

fn append_to_existing_text(prev: &Handle, text: &str) -> bool {
    match &prev.data {
        NodeData::Text { contents } => {
            contents.borrow_mut().push_slice(text);
            true
        },
        _ => false,
    }
}

/// Detach `node` from its current parent, if any. No-op otherwise.
pub fn remove_from_parent(node: &Handle) {
    if let Some(parent) = node.parent_handle() {
        if let Some(i) = index_of(&parent, node) {
            parent.children.borrow_mut().remove(i);
        }
        node.parent.set(None);
    }
}

/// Low-level "insert `child` as the last child of `parent`", skipping the
/// `pre_insert` validation a parser run has already performed by construction.
/// Coalesces onto a trailing text node the way the teacher's `RcDom::append`
/// does. Runs insertion steps (spec.md §4.5 step 4) before returning.
pub fn append_attached(parent: &Handle, child: Handle) {
    remove_from_parent(&child);
    child.parent.set(Some(std::rc::Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
    registry::run_insertion_steps(&child);
}

/// Low-level "insert `child` immediately before `sibling`", coalescing onto a
/// preceding text node where possible.
pub fn insert_before_attached(parent: &Handle, sibling: &Handle, child: Handle) {
    let Some(i) = index_of(parent, sibling) else {
        return;
    };
    if let NodeData::Text { contents } = &child.data {
        if i > 0 {
            let siblings = parent.children.borrow();
            if append_to_existing_text(&siblings[i - 1], &contents.borrow()) {
                return;
            }
        }
    }
    remove_from_parent(&child);
    child.parent.set(Some(std::rc::Rc::downgrade(parent)));
    parent.children.borrow_mut().insert(i, child.clone());
    registry::run_insertion_steps(&child);
}

/// <https://dom.spec.whatwg.org/#concept-node-pre-insert>
pub fn pre_insert(node: &Handle, parent: &Handle, child: Option<&Handle>) -> DomResult<Handle> {
    if !can_have_children(parent) {
        return Err(DomError::HierarchyRequest(format!("{} cannot have children", parent.data.kind_name())));
    }
    if is_ancestor_or_self(node, parent) {
        return Err(DomError::HierarchyRequest("node is an ancestor of, or is, the parent".into()));
    }
    if let Some(child) = child {
        match child.parent_handle() {
            Some(ref p) if std::rc::Rc::ptr_eq(p, parent) => {},
            _ => {
                return Err(DomError::NotFound {
                    parent: parent.data.kind_name().into(),
                    reference: child.data.kind_name().into(),
                })
            },
        }
    }
    if matches!(parent.data, NodeData::Document) {
        match &node.data {
            NodeData::Doctype { .. } => {
                if parent.children.borrow().iter().any(|c| matches!(c.data, NodeData::Doctype { .. })) {
                    return Err(DomError::HierarchyRequest("document already has a doctype".into()));
                }
            },
            NodeData::Element { .. } => {
                if parent.children.borrow().iter().any(|c| c.is_element()) {
                    return Err(DomError::HierarchyRequest("document already has a root element".into()));
                }
            },
            NodeData::DocumentFragment => {
                let elem_count = node.children.borrow().iter().filter(|c| c.is_element()).count();
                if elem_count > 1 {
                    return Err(DomError::HierarchyRequest("fragment has more than one element child".into()));
                }
            },
            _ => {},
        }
    }
    insert(node, parent, child)
}

/// <https://dom.spec.whatwg.org/#concept-node-insert>
pub fn insert(node: &Handle, parent: &Handle, child: Option<&Handle>) -> DomResult<Handle> {
    let moving: Vec<Handle> = match &node.data {
        NodeData::DocumentFragment => node.children.borrow().clone(),
        _ => vec![node.clone()],
    };
    for moved in &moving {
        match child {
            Some(before) => insert_before_attached(parent, before, moved.clone()),
            None => append_attached(parent, moved.clone()),
        }
    }
    Ok(node.clone())
}

/// <https://dom.spec.whatwg.org/#concept-node-remove>
pub fn remove(node: &Handle) {
    crate::node::document_root(node).notify_iterators_before_removal(node);
    registry::run_removing_steps(node);
    remove_from_parent(node);
}

/// <https://dom.spec.whatwg.org/#concept-node-adopt>: re-homes `node` and
/// every shadow-including inclusive descendant (here, that also means a
/// `<template>`'s content fragment) into `new_document`.
pub fn adopt(node: &Handle, new_document: &Handle) -> DomResult<()> {
    if matches!(node.data, NodeData::Document) {
        return Err(DomError::NotSupported("cannot adopt a Document node".into()));
    }
    remove_from_parent(node);
    fn walk(node: &Handle, new_document: &Handle) {
        node.set_owner_document(new_document);
        registry::run_adopting_steps(node);
        for child in node.children.borrow().iter() {
            walk(child, new_document);
        }
        if let NodeData::Element { template_contents, .. } = &node.data {
            if let Some(contents) = template_contents.borrow().as_ref() {
                walk(contents, new_document);
            }
        }
    }
    walk(node, new_document);
    Ok(())
}

/// <https://dom.spec.whatwg.org/#concept-node-clone>. `target_document`
/// overrides the clone's owner document (used by `Document::import_node`,
/// which clones into the importing document); `None` keeps `node`'s own
/// owner document, matching plain `cloneNode()`.
pub fn clone_node(node: &Handle, deep: bool, target_document: Option<&Handle>) -> Handle {
    let data = node.data.clone();
    let cloned = Node::new(data);
    let owner = target_document.cloned().or_else(|| node.owner_document());
    if let Some(doc) = owner {
        cloned.set_owner_document(&doc);
    }
    registry::run_cloning_steps(node, &cloned);
    if deep {
        for child in node.children.borrow().iter() {
            let child_clone = clone_node(child, true, target_document);
            append_attached(&cloned, child_clone);
        }
    }
    cloned
}

/// <https://dom.spec.whatwg.org/#dom-node-normalize>: merges adjacent Text
/// children and drops empty ones, recursively.
pub fn normalize(node: &Handle) {
    let mut children = node.children.borrow_mut();
    let mut i = 0;
    while i < children.len() {
        let is_text = matches!(children[i].data, NodeData::Text { .. });
        if !is_text {
            i += 1;
            continue;
        }
        // Merge any immediately following text nodes into this one.
        let mut j = i + 1;
        while j < children.len() && matches!(children[j].data, NodeData::Text { .. }) {
            let (NodeData::Text { contents: into }, NodeData::Text { contents: from }) =
                (&children[i].data, &children[j].data)
            else {
                unreachable!()
            };
            let appended = from.borrow().clone();
            into.borrow_mut().push_slice(&appended);
            children[j].parent.set(None);
            j += 1;
        }
        children.drain(i + 1..j);

        let empty = matches!(&children[i].data, NodeData::Text { contents } if contents.borrow().is_empty());
        if empty {
            children[i].parent.set(None);
            children.remove(i);
            continue;
        }
        i += 1;
    }
    drop(children);
    for child in node.children.borrow().iter() {
        normalize(child);
    }
}
