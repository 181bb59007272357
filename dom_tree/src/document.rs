//! The public DOM surface (spec.md §6): document-level factories plus
//! Node/Element-level operations, built on top of [`crate::mutation`] and
//! [`crate::collections`]. No teacher file plays quite this role — `rcdom`
//! is a parse *result*, not an API a caller mutates afterwards — so this
//! module is original, grounded in the DOM spec's own method contracts
//! rather than in a specific file from the pack.

use std::cell::RefCell;
use std::rc::Rc;

use markup_core::{ns, Attribute, LocalName, QualName};
use tendril::StrTendril;

use crate::collections::{self, HtmlCollection};
use crate::error::{DomError, DomResult};
use crate::mutation;
use crate::node::{Handle, Node, NodeData};
use crate::registry;

/// Thin wrapper around the document root handle, exposing the document
/// factory methods (spec.md §6 `createElement`, `createTextNode`, ...).
pub struct Document {
    pub root: Handle,
}

impl Document {
    pub fn new() -> Self {
        Document { root: Node::new(NodeData::Document) }
    }

    pub fn from_root(root: Handle) -> Self {
        Document { root }
    }

    pub fn create_element(&self, local_name: &str) -> Handle {
        self.create_element_ns(ns!(html), local_name)
    }

    pub fn create_element_ns(&self, namespace: markup_core::Namespace, local_name: &str) -> Handle {
        let node = Node::new(NodeData::Element {
            name: QualName::new(None, namespace, LocalName::from(local_name)),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        });
        node.set_owner_document(&self.root);
        node
    }

    pub fn create_text_node(&self, data: &str) -> Handle {
        let node = Node::new(NodeData::Text { contents: RefCell::new(StrTendril::from(data)) });
        node.set_owner_document(&self.root);
        node
    }

    pub fn create_comment(&self, data: &str) -> Handle {
        let node = Node::new(NodeData::Comment { contents: StrTendril::from(data) });
        node.set_owner_document(&self.root);
        node
    }

    pub fn create_document_fragment(&self) -> Handle {
        let node = Node::new(NodeData::DocumentFragment);
        node.set_owner_document(&self.root);
        node
    }

    pub fn create_processing_instruction(&self, target: &str, data: &str) -> Handle {
        let node = Node::new(NodeData::ProcessingInstruction { target: StrTendril::from(target), contents: StrTendril::from(data) });
        node.set_owner_document(&self.root);
        node
    }

    pub fn create_attribute(&self, local_name: &str, value: &str) -> Attribute {
        Attribute { name: QualName::html(LocalName::from(local_name)), value: StrTendril::from(value) }
    }

    /// <https://dom.spec.whatwg.org/#dom-document-importnode>: clones `node`
    /// (optionally deep) without attaching it anywhere.
    pub fn import_node(&self, node: &Handle, deep: bool) -> DomResult<Handle> {
        if matches!(node.data, NodeData::Document) {
            return Err(DomError::NotSupported("cannot import a Document node".into()));
        }
        Ok(mutation::clone_node(node, deep, Some(&self.root)))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-adoptnode>
    pub fn adopt_node(&self, node: &Handle) -> DomResult<Handle> {
        mutation::adopt(node, &self.root)?;
        Ok(node.clone())
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Handle> {
        collections::by_id(&self.root, id)
    }

    pub fn get_elements_by_tag_name(&self, qualified_name: &str) -> HtmlCollection<impl Fn(&Handle) -> bool> {
        collections::by_tag_name(self.root.clone(), qualified_name)
    }

    pub fn get_elements_by_class_name(&self, names: &str) -> HtmlCollection<impl Fn(&Handle) -> bool> {
        collections::by_class_name(self.root.clone(), names)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Node-level operations (spec.md §6): implemented as an extension trait
/// over [`Handle`] rather than a wrapper type, since every node kind (not
/// just `Document`) needs `appendChild`/`parentNode`/etc.
pub trait NodeExt {
    fn parent_node(&self) -> Option<Handle>;
    fn child_nodes(&self) -> Vec<Handle>;
    fn first_child(&self) -> Option<Handle>;
    fn last_child(&self) -> Option<Handle>;
    fn next_sibling(&self) -> Option<Handle>;
    fn previous_sibling(&self) -> Option<Handle>;
    fn append_child(&self, child: Handle) -> DomResult<Handle>;
    fn insert_before(&self, child: Handle, before: Option<&Handle>) -> DomResult<Handle>;
    fn remove_child(&self, child: &Handle) -> DomResult<Handle>;
    fn replace_child(&self, child: Handle, old: &Handle) -> DomResult<Handle>;
    fn clone_node(&self, deep: bool) -> Handle;
    fn normalize(&self);
    fn contains(&self, other: &Handle) -> bool;
    fn text_content(&self) -> String;
    fn set_text_content(&self, text: &str);
}

impl NodeExt for Handle {
    fn parent_node(&self) -> Option<Handle> {
        self.parent_handle()
    }

    fn child_nodes(&self) -> Vec<Handle> {
        self.children.borrow().clone()
    }

    fn first_child(&self) -> Option<Handle> {
        self.children.borrow().first().cloned()
    }

    fn last_child(&self) -> Option<Handle> {
        self.children.borrow().last().cloned()
    }

    fn next_sibling(&self) -> Option<Handle> {
        let parent = self.parent_handle()?;
        let siblings = parent.children.borrow();
        let i = siblings.iter().position(|n| Rc::ptr_eq(n, self))?;
        siblings.get(i + 1).cloned()
    }

    fn previous_sibling(&self) -> Option<Handle> {
        let parent = self.parent_handle()?;
        let siblings = parent.children.borrow();
        let i = siblings.iter().position(|n| Rc::ptr_eq(n, self))?;
        if i == 0 {
            None
        } else {
            siblings.get(i - 1).cloned()
        }
    }

    fn append_child(&self, child: Handle) -> DomResult<Handle> {
        mutation::pre_insert(&child, self, None)
    }

    fn insert_before(&self, child: Handle, before: Option<&Handle>) -> DomResult<Handle> {
        mutation::pre_insert(&child, self, before)
    }

    fn remove_child(&self, child: &Handle) -> DomResult<Handle> {
        match child.parent_handle() {
            Some(ref p) if Rc::ptr_eq(p, self) => {
                mutation::remove(child);
                Ok(child.clone())
            },
            _ => Err(DomError::NotFound { parent: self.data.kind_name().into(), reference: child.data.kind_name().into() }),
        }
    }

    fn replace_child(&self, child: Handle, old: &Handle) -> DomResult<Handle> {
        match old.parent_handle() {
            Some(ref p) if Rc::ptr_eq(p, self) => {},
            _ => return Err(DomError::NotFound { parent: self.data.kind_name().into(), reference: old.data.kind_name().into() }),
        }
        let next = old.next_sibling();
        mutation::remove(old);
        match next {
            Some(ref before) => mutation::pre_insert(&child, self, Some(before))?,
            None => mutation::pre_insert(&child, self, None)?,
        };
        Ok(old.clone())
    }

    fn clone_node(&self, deep: bool) -> Handle {
        mutation::clone_node(self, deep, None)
    }

    fn normalize(&self) {
        mutation::normalize(self)
    }

    fn contains(&self, other: &Handle) -> bool {
        let mut cur = Some(other.clone());
        while let Some(node) = cur {
            if Rc::ptr_eq(&node, self) {
                return true;
            }
            cur = node.parent_handle();
        }
        false
    }

    fn text_content(&self) -> String {
        fn walk(node: &Handle, out: &mut String) {
            match &node.data {
                NodeData::Text { contents } => out.push_str(&contents.borrow()),
                NodeData::Document | NodeData::DocumentFragment | NodeData::Element { .. } => {
                    for child in node.children.borrow().iter() {
                        walk(child, out);
                    }
                },
                _ => {},
            }
        }
        let mut out = String::new();
        walk(self, &mut out);
        out
    }

    fn set_text_content(&self, text: &str) {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in children {
            child.parent.set(None);
        }
        if !text.is_empty() {
            let text_node = Node::new(NodeData::Text { contents: RefCell::new(StrTendril::from(text)) });
            text_node.set_owner_document(&crate::node::document_root(self));
            mutation::append_attached(self, text_node);
        }
    }
}

/// Element-level operations (spec.md §6): attribute access plus the
/// `<option selected>` → `selectedcontent` sync hook on attribute mutation.
pub trait ElementExt {
    fn get_attribute(&self, local_name: &str) -> Option<String>;
    fn set_attribute(&self, local_name: &str, value: &str) -> DomResult<()>;
    fn remove_attribute(&self, local_name: &str);
    fn has_attribute(&self, local_name: &str) -> bool;
    fn attributes(&self) -> Vec<Attribute>;
    fn id(&self) -> Option<String>;
    fn class_list(&self) -> Vec<String>;
    fn children(&self) -> Vec<Handle>;
}

impl ElementExt for Handle {
    fn get_attribute(&self, local_name: &str) -> Option<String> {
        self.attr(local_name).map(|v| v.to_string())
    }

    fn set_attribute(&self, local_name: &str, value: &str) -> DomResult<()> {
        let NodeData::Element { attrs, .. } = &self.data else {
            return Err(DomError::InvalidNodeType("setAttribute on a non-element node".into()));
        };
        let mut attrs = attrs.borrow_mut();
        match attrs.iter_mut().find(|a| a.name.local.as_str() == local_name) {
            Some(attr) => attr.value = StrTendril::from(value),
            None => attrs.push(Attribute { name: QualName::html(LocalName::from(local_name)), value: StrTendril::from(value) }),
        }
        drop(attrs);
        registry::run_attribute_changed_steps(self, local_name);
        Ok(())
    }

    fn remove_attribute(&self, local_name: &str) {
        if let NodeData::Element { attrs, .. } = &self.data {
            attrs.borrow_mut().retain(|a| a.name.local.as_str() != local_name);
        }
        registry::run_attribute_changed_steps(self, local_name);
    }

    fn has_attribute(&self, local_name: &str) -> bool {
        self.has_attr(local_name)
    }

    fn attributes(&self) -> Vec<Attribute> {
        match &self.data {
            NodeData::Element { attrs, .. } => attrs.borrow().clone(),
            _ => Vec::new(),
        }
    }

    fn id(&self) -> Option<String> {
        self.get_attribute("id")
    }

    fn class_list(&self) -> Vec<String> {
        self.attr("class").map(|v| v.split_ascii_whitespace().map(String::from).collect()).unwrap_or_default()
    }

    fn children(&self) -> Vec<Handle> {
        self.children.borrow().iter().filter(|c| c.is_element()).cloned().collect()
    }
}
