//! Live `HTMLCollection`/`NodeList` (spec.md §4.5): "live" means a
//! collection never snapshots its contents at creation. Rather than keep a
//! cached `Vec` next to a generation counter checked on every access (what a
//! DOM shipping to a JS engine needs, since script can hold a collection
//! object across many turns), this implementation just recomputes the
//! filtered walk from `root` each time `items()` is called — there is no
//! long-lived collection object for a mutation to invalidate, so the
//! recompute-on-access approach gets the same "always current" semantics for
//! free. See DESIGN.md for why this was chosen over the generation-counter
//! design.

use crate::node::Handle;

/// A lazily-filtered, always-current view over `root`'s descendant elements.
pub struct HtmlCollection<F> {
    root: Handle,
    predicate: F,
}

impl<F: Fn(&Handle) -> bool> HtmlCollection<F> {
    pub fn new(root: Handle, predicate: F) -> Self {
        HtmlCollection { root, predicate }
    }

    /// Depth-first, pre-order walk of `root`'s descendants matching the
    /// predicate — the collection's contents "as of now".
    pub fn items(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        // Stack-based pre-order: push children in reverse so they pop in
        // document order.
        let mut stack: Vec<Handle> = self.root.children.borrow().iter().rev().cloned().collect();
        while let Some(node) = stack.pop() {
            if node.is_element() && (self.predicate)(&node) {
                out.push(node.clone());
            }
            let mut children: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
            stack.append(&mut children);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item(&self, index: usize) -> Option<Handle> {
        self.items().into_iter().nth(index)
    }

    pub fn named_item(&self, name: &str) -> Option<Handle> {
        self.items().into_iter().find(|n| {
            n.attr("id").is_some_and(|v| &*v == name) || n.attr("name").is_some_and(|v| &*v == name)
        })
    }
}

/// `getElementsByTagName`: matches by qualified local name (spec.md treats
/// HTML documents as ASCII-case-insensitive here).
pub fn by_tag_name(root: Handle, qualified_name: &str) -> HtmlCollection<impl Fn(&Handle) -> bool> {
    let wildcard = qualified_name == "*";
    let want = qualified_name.to_ascii_lowercase();
    HtmlCollection::new(root, move |node| {
        wildcard || node.local_name().is_some_and(|n| n.as_str() == want)
    })
}

/// `getElementsByClassName`: matches if every space-separated token in
/// `names` appears in the element's `class` attribute.
pub fn by_class_name(root: Handle, names: &str) -> HtmlCollection<impl Fn(&Handle) -> bool> {
    let wanted: Vec<String> = names.split_ascii_whitespace().map(|s| s.to_owned()).collect();
    HtmlCollection::new(root, move |node| {
        let Some(class_attr) = node.attr("class") else { return false };
        let present: std::collections::HashSet<&str> = class_attr.split_ascii_whitespace().collect();
        !wanted.is_empty() && wanted.iter().all(|w| present.contains(w.as_str()))
    })
}

/// `getElementById`: not a live collection, but the same document-order
/// descendant walk (spec.md defines it as "first element in tree order").
pub fn by_id(root: &Handle, id: &str) -> Option<Handle> {
    let mut stack: Vec<Handle> = root.children.borrow().iter().rev().cloned().collect();
    while let Some(node) = stack.pop() {
        if node.is_element() && node.attr("id").is_some_and(|v| &*v == id) {
            return Some(node);
        }
        let mut children: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
        stack.append(&mut children);
    }
    None
}
