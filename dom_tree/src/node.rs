//! The node representation (spec.md §3 "Node"/"Element"/...): a
//! reference-counted tree where children are owned (`Rc`) and parent links
//! are weak, so a held child ref can outlive the rest of the document.
//!
//! Grounded on the teacher's `markup5ever_rcdom::Node`/`NodeData`; adapted to
//! this workspace's `QualName`/`Attribute` types and extended with the
//! `DocumentFragment` variant spec.md §3 names (the teacher's `RcDom` never
//! needed one as its own node kind because it only ever parses full
//! documents).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use markup_core::{Attribute, LocalName, QualName};
use tendril::StrTendril;

use crate::iterator::IterRef;

pub type Handle = Rc<Node>;
pub type WeakHandle = Weak<Node>;

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    DocumentFragment,
    Doctype {
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    },
    Text {
        contents: RefCell<StrTendril>,
    },
    Comment {
        contents: StrTendril,
    },
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
        /// The `content` document fragment of a `<template>` element
        /// (spec.md §4.4 "Template elements").
        template_contents: RefCell<Option<Handle>>,
        mathml_annotation_xml_integration_point: bool,
    },
    ProcessingInstruction {
        target: StrTendril,
        contents: StrTendril,
    },
}

impl NodeData {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::Document => "document",
            NodeData::DocumentFragment => "document-fragment",
            NodeData::Doctype { .. } => "document-type",
            NodeData::Text { .. } => "text",
            NodeData::Comment { .. } => "comment",
            NodeData::Element { .. } => "element",
            NodeData::ProcessingInstruction { .. } => "processing-instruction",
        }
    }

    pub fn as_element(&self) -> Option<(&QualName, &RefCell<Vec<Attribute>>)> {
        match self {
            NodeData::Element { name, attrs, .. } => Some((name, attrs)),
            _ => None,
        }
    }
}

pub struct Node {
    pub parent: Cell<Option<WeakHandle>>,
    pub children: RefCell<Vec<Handle>>,
    pub data: NodeData,
    /// This node's document (spec.md §3 `ownerDocument`): `None` only for a
    /// node that is itself a document root. A weak link, like `parent` —
    /// the document's strong ownership already flows downward through
    /// `children`.
    owner_document: Cell<Option<WeakHandle>>,
    /// `NodeIterator`s currently rooted anywhere under this node, kept only
    /// on a document root so [`crate::mutation::remove`] has somewhere to
    /// run the pre-removal reference-node adjustment
    /// (<https://dom.spec.whatwg.org/#nodeiterator-pre-removing-steps>).
    live_iterators: RefCell<Vec<Weak<IterRef>>>,
}

impl Node {
    pub fn new(data: NodeData) -> Handle {
        Rc::new(Node {
            data,
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            owner_document: Cell::new(None),
            live_iterators: RefCell::new(Vec::new()),
        })
    }

    pub fn parent(&self) -> Option<WeakHandle> {
        let parent = self.parent.take();
        self.parent.set(parent.clone());
        parent
    }

    pub fn parent_handle(&self) -> Option<Handle> {
        self.parent().and_then(|p| p.upgrade())
    }

    /// <https://dom.spec.whatwg.org/#concept-node-document>
    pub fn owner_document(&self) -> Option<Handle> {
        let owner = self.owner_document.take();
        self.owner_document.set(owner.clone());
        owner.and_then(|w| w.upgrade())
    }

    pub fn set_owner_document(&self, document: &Handle) {
        self.owner_document.set(Some(Rc::downgrade(document)));
    }

    pub(crate) fn register_iterator(&self, state: Weak<IterRef>) {
        self.live_iterators.borrow_mut().push(state);
    }

    /// Runs the pre-removal adjustment on every still-live `NodeIterator`
    /// rooted in this node's document before `to_be_removed` is detached.
    pub(crate) fn notify_iterators_before_removal(&self, to_be_removed: &Handle) {
        let mut iterators = self.live_iterators.borrow_mut();
        iterators.retain(|w| w.strong_count() > 0);
        for weak in iterators.iter() {
            if let Some(state) = weak.upgrade() {
                crate::iterator::adjust_for_removal(&state, to_be_removed);
            }
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn element_name(&self) -> Option<&QualName> {
        match &self.data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn local_name(&self) -> Option<&LocalName> {
        self.element_name().map(|n| &n.local)
    }

    pub fn attr(&self, local: &str) -> Option<StrTendril> {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs
                .borrow()
                .iter()
                .find(|a| a.name.local.as_str() == local)
                .map(|a| a.value.clone()),
            _ => None,
        }
    }

    pub fn has_attr(&self, local: &str) -> bool {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs.borrow().iter().any(|a| a.name.local.as_str() == local),
            _ => false,
        }
    }

    /// <https://html.spec.whatwg.org/#option-element-nearest-ancestor-select>
    pub fn option_nearest_ancestor_select(&self) -> Option<Handle> {
        let mut saw_optgroup = false;
        let mut current = self.parent_handle()?;
        loop {
            if let Some(local) = current.local_name() {
                match local.as_str() {
                    "datalist" | "hr" | "option" => return None,
                    "optgroup" => {
                        if saw_optgroup {
                            return None;
                        }
                        saw_optgroup = true;
                    },
                    "select" => return Some(current),
                    _ => {},
                }
            }
            current = current.parent_handle()?;
        }
    }

    /// <https://html.spec.whatwg.org/#select-enabled-selectedcontent>
    pub fn select_enabled_selectedcontent(&self) -> Option<Handle> {
        if self.has_attr("multiple") {
            return None;
        }
        let mut queue: std::collections::VecDeque<Handle> = self.children.borrow().iter().cloned().collect();
        while let Some(node) = queue.pop_front() {
            queue.extend(node.children.borrow().iter().cloned());
            if node.local_name().is_some_and(|n| n.as_str() == "selectedcontent") {
                return Some(node);
            }
        }
        None
    }

    /// <https://html.spec.whatwg.org/#clone-an-option-into-a-selectedcontent>
    pub fn clone_option_into_selectedcontent(&self, selectedcontent: &Handle) {
        let cloned: Vec<Handle> = self.children.borrow().iter().map(|c| c.clone_subtree()).collect();
        *selectedcontent.children.borrow_mut() = cloned;
    }

    /// Deep-clones this node and its descendants. Does not guard against
    /// cycles — the tree invariant that a node has at most one parent rules
    /// them out.
    pub fn clone_subtree(&self) -> Handle {
        let children = self.children.borrow().iter().map(|c| c.clone_subtree()).collect();
        let cloned = Rc::new(Node {
            parent: Cell::new(None),
            data: self.data.clone(),
            children: RefCell::new(children),
            owner_document: Cell::new(None),
            live_iterators: RefCell::new(Vec::new()),
        });
        if let Some(doc) = self.owner_document() {
            cloned.set_owner_document(&doc);
        }
        cloned
    }
}

/// The document root of `node`'s tree: `node.owner_document()` if set,
/// otherwise the topmost ancestor (covers nodes built directly through
/// [`Node::new`] rather than a [`crate::document::Document`]).
pub fn document_root(node: &Handle) -> Handle {
    if let Some(doc) = node.owner_document() {
        return doc;
    }
    let mut cur = node.clone();
    while let Some(parent) = cur.parent_handle() {
        cur = parent;
    }
    cur
}

impl Drop for Node {
    fn drop(&mut self) {
        // Iterative drop: the recursive `Rc` drop glue would blow the stack
        // on a deep subtree (e.g. a flat list of thousands of <li>s). Each
        // node's children are flattened into `stack` before the node itself
        // is dropped, so by the time its own glue runs there's nothing left
        // to recurse into.
        let mut stack = mem::take(&mut *self.children.borrow_mut());
        while let Some(node) = stack.pop() {
            let children = mem::take(&mut *node.children.borrow_mut());
            stack.extend(children);
            if let NodeData::Element { ref template_contents, .. } = node.data {
                if let Some(contents) = template_contents.borrow_mut().take() {
                    stack.push(contents);
                }
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("data", &self.data).field("children", &self.children).finish()
    }
}
