//! The `TreeSink` implementation `html_engine`'s tokenizer/tree-constructor
//! pair builds against. Grounded directly on the teacher's
//! `markup5ever_rcdom::RcDom` — same struct shape (`document`, `errors`,
//! `quirks_mode`), same per-method bodies, adapted to `markup_core`'s trait
//! (which additionally requires `create_document_fragment`, has no
//! `xml5ever` dependency, and calls the registry hooks this workspace adds
//! for DOM-mutation-API parity) and to this crate's `Node`/`NodeData`.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::mem;
use std::rc::Rc;

use log::warn;
use markup_core::{Attribute, ElementFlags, ExpandedName, NodeOrText, QualName, QuirksMode, TreeSink};
use tendril::StrTendril;

use crate::mutation;
use crate::node::{Handle, Node, NodeData};
use crate::registry;

/// The result of a parse: the document tree plus the soft parse errors and
/// quirks mode the parser settled on.
pub struct DomSink {
    pub document: Handle,
    pub errors: RefCell<Vec<Cow<'static, str>>>,
    pub quirks_mode: Cell<QuirksMode>,
}

impl Default for DomSink {
    fn default() -> Self {
        DomSink {
            document: Node::new(NodeData::Document),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
        }
    }
}

fn as_element(target: &Handle) -> (&QualName, &RefCell<Vec<Attribute>>) {
    target.data.as_element().expect("not an element")
}

impl TreeSink for DomSink {
    type Handle = Handle;
    type Output = Self;
    type ElemName<'a> = ExpandedName<'a>;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        warn!("parse error: {msg}");
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Handle {
        self.document.clone()
    }

    fn create_document_fragment(&self) -> Handle {
        let node = Node::new(NodeData::DocumentFragment);
        node.set_owner_document(&self.document);
        node
    }

    fn get_template_contents(&self, target: &Handle) -> Handle {
        match &target.data {
            NodeData::Element { template_contents, .. } => {
                template_contents.borrow().as_ref().expect("not a template element").clone()
            },
            _ => panic!("not a template element"),
        }
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn elem_name<'a>(&'a self, target: &'a Handle) -> ExpandedName<'a> {
        as_element(target).0.expanded()
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, flags: ElementFlags) -> Handle {
        let template_contents = if flags.template {
            let contents = Node::new(NodeData::DocumentFragment);
            contents.set_owner_document(&self.document);
            Some(contents)
        } else {
            None
        };
        let node = Node::new(NodeData::Element {
            name,
            attrs: RefCell::new(attrs),
            template_contents: RefCell::new(template_contents),
            mathml_annotation_xml_integration_point: flags.mathml_annotation_xml_integration_point,
        });
        node.set_owner_document(&self.document);
        node
    }

    fn create_comment(&self, text: StrTendril) -> Handle {
        let node = Node::new(NodeData::Comment { contents: text });
        node.set_owner_document(&self.document);
        node
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Handle {
        let node = Node::new(NodeData::ProcessingInstruction { target, contents: data });
        node.set_owner_document(&self.document);
        node
    }

    fn append(&self, parent: &Handle, child: NodeOrText<Handle>) {
        match child {
            NodeOrText::AppendText(text) => {
                if let Some(last) = parent.children.borrow().last() {
                    if let NodeData::Text { contents } = &last.data {
                        contents.borrow_mut().push_slice(&text);
                        return;
                    }
                }
                let node = Node::new(NodeData::Text { contents: RefCell::new(text) });
                node.set_owner_document(&self.document);
                mutation::append_attached(parent, node);
            },
            NodeOrText::AppendNode(node) => mutation::append_attached(parent, node),
        }
    }

    fn append_before_sibling(&self, sibling: &Handle, child: NodeOrText<Handle>) {
        let parent = sibling.parent_handle().expect("append_before_sibling called on node without parent");
        match child {
            NodeOrText::AppendText(text) => {
                let node = Node::new(NodeData::Text { contents: RefCell::new(text) });
                node.set_owner_document(&self.document);
                mutation::insert_before_attached(&parent, sibling, node);
            },
            NodeOrText::AppendNode(node) => mutation::insert_before_attached(&parent, sibling, node),
        }
    }

    fn append_based_on_parent_node(&self, element: &Handle, prev_element: &Handle, child: NodeOrText<Handle>) {
        if element.parent_handle().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(&self, name: StrTendril, public_id: StrTendril, system_id: StrTendril) {
        let node = Node::new(NodeData::Doctype { name, public_id, system_id });
        node.set_owner_document(&self.document);
        mutation::append_attached(&self.document, node);
    }

    fn add_attrs_if_missing(&self, target: &Handle, attrs: Vec<Attribute>) {
        let (_, existing) = as_element(target);
        let mut existing = existing.borrow_mut();
        let existing_names: HashSet<QualName> = existing.iter().map(|a| a.name.clone()).collect();
        existing.extend(attrs.into_iter().filter(|a| !existing_names.contains(&a.name)));
    }

    fn remove_from_parent(&self, target: &Handle) {
        mutation::remove_from_parent(target);
    }

    fn reparent_children(&self, node: &Handle, new_parent: &Handle) {
        let moving = mem::take(&mut *node.children.borrow_mut());
        for child in moving {
            mutation::append_attached(new_parent, child);
        }
    }

    fn is_mathml_annotation_xml_integration_point(&self, target: &Handle) -> bool {
        match &target.data {
            NodeData::Element { mathml_annotation_xml_integration_point, .. } => *mathml_annotation_xml_integration_point,
            _ => panic!("not an element"),
        }
    }

    fn maybe_clone_an_option_into_selectedcontent(&self, option: &Handle) {
        registry::run_attribute_changed_steps(option, "selected");
    }
}
