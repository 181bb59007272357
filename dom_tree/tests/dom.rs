use dom_tree::document::{Document, ElementExt, NodeExt};
use dom_tree::error::DomError;
use dom_tree::NodeIterator;

#[test]
fn append_child_sets_parent_and_order() {
    let doc = Document::new();
    let div = doc.create_element("div");
    let span = doc.create_element("span");
    div.append_child(span.clone()).unwrap();
    assert_eq!(div.child_nodes().len(), 1);
    assert!(span.parent_node().is_some());
}

#[test]
fn append_child_rejects_cycles() {
    let doc = Document::new();
    let div = doc.create_element("div");
    let child = doc.create_element("span");
    div.append_child(child.clone()).unwrap();
    let err = child.append_child(div.clone()).unwrap_err();
    assert!(matches!(err, DomError::HierarchyRequest(_)));
}

#[test]
fn remove_child_detaches_node() {
    let doc = Document::new();
    let div = doc.create_element("div");
    let span = doc.create_element("span");
    div.append_child(span.clone()).unwrap();
    div.remove_child(&span).unwrap();
    assert!(span.parent_node().is_none());
    assert!(div.child_nodes().is_empty());
}

#[test]
fn remove_child_not_a_child_is_not_found() {
    let doc = Document::new();
    let a = doc.create_element("div");
    let b = doc.create_element("div");
    let stray = doc.create_element("span");
    let _ = a.append_child(b.clone());
    let err = b.remove_child(&stray).unwrap_err();
    assert!(matches!(err, DomError::NotFound { .. }));
}

#[test]
fn append_child_does_not_coalesce_text_nodes() {
    // `appendChild` is the public DOM mutation API (spec.md §4.5) and, unlike
    // the parser's internal fast path in `TreeSink::append`, never merges
    // adjacent text nodes on its own — only an explicit `normalize()` does.
    let doc = Document::new();
    let div = doc.create_element("div");
    div.append_child(doc.create_text_node("foo")).unwrap();
    div.append_child(doc.create_text_node("bar")).unwrap();
    assert_eq!(div.text_content(), "foobar");
    assert_eq!(div.child_nodes().len(), 2);
}

#[test]
fn normalize_merges_and_drops_empty_text() {
    let doc = Document::new();
    let div = doc.create_element("div");
    div.children.borrow_mut().extend([
        doc.create_text_node("a"),
        doc.create_text_node(""),
        doc.create_text_node("b"),
    ]);
    for child in div.children.borrow().iter() {
        child.parent.set(Some(std::rc::Rc::downgrade(&div)));
    }
    div.normalize();
    assert_eq!(div.child_nodes().len(), 1);
    assert_eq!(div.text_content(), "ab");
}

#[test]
fn clone_node_deep_copies_subtree() {
    let doc = Document::new();
    let div = doc.create_element("div");
    div.set_attribute("id", "x").unwrap();
    div.append_child(doc.create_text_node("hi")).unwrap();
    let clone = div.clone_node(true);
    assert_eq!(clone.get_attribute("id").as_deref(), Some("x"));
    assert_eq!(clone.text_content(), "hi");
    assert!(clone.parent_node().is_none());
    assert!(!std::rc::Rc::ptr_eq(&clone, &div));
}

#[test]
fn attribute_mutation_round_trips() {
    let doc = Document::new();
    let div = doc.create_element("div");
    assert!(!div.has_attribute("class"));
    div.set_attribute("class", "a b").unwrap();
    assert_eq!(div.get_attribute("class").as_deref(), Some("a b"));
    assert_eq!(div.class_list(), vec!["a".to_string(), "b".to_string()]);
    div.remove_attribute("class");
    assert!(!div.has_attribute("class"));
}

#[test]
fn get_elements_by_tag_name_is_live() {
    let doc = Document::new();
    let root = doc.create_element("div");
    root.append_child(doc.create_element("span")).unwrap();
    let collection = doc.get_elements_by_tag_name("span");
    assert_eq!(collection.len(), 0); // collection is rooted at doc, not at `root`
    let collection = dom_tree::collections::by_tag_name(root.clone(), "span");
    assert_eq!(collection.len(), 1);
    root.append_child(doc.create_element("span")).unwrap();
    assert_eq!(collection.len(), 2);
}

#[test]
fn get_elements_by_class_name_requires_all_tokens() {
    let doc = Document::new();
    let root = doc.create_element("div");
    let a = doc.create_element("span");
    a.set_attribute("class", "foo bar").unwrap();
    root.append_child(a).unwrap();
    let b = doc.create_element("span");
    b.set_attribute("class", "foo").unwrap();
    root.append_child(b).unwrap();
    let collection = dom_tree::collections::by_class_name(root, "foo bar");
    assert_eq!(collection.len(), 1);
}

#[test]
fn every_created_node_reports_its_owner_document() {
    let doc = Document::new();
    let div = doc.create_element("div");
    let text = doc.create_text_node("hi");
    div.append_child(text.clone()).unwrap();
    assert!(std::rc::Rc::ptr_eq(&div.owner_document().unwrap(), &doc.root));
    assert!(std::rc::Rc::ptr_eq(&text.owner_document().unwrap(), &doc.root));
}

#[test]
fn adopt_node_rehomes_the_whole_subtree() {
    let source = Document::new();
    let target = Document::new();
    let div = source.create_element("div");
    let span = source.create_element("span");
    div.append_child(span.clone()).unwrap();
    target.adopt_node(&div).unwrap();
    assert!(std::rc::Rc::ptr_eq(&div.owner_document().unwrap(), &target.root));
    assert!(std::rc::Rc::ptr_eq(&span.owner_document().unwrap(), &target.root));
    assert!(div.parent_node().is_none());
}

#[test]
fn clone_node_keeps_source_document_but_import_node_switches_it() {
    let source = Document::new();
    let other = Document::new();
    let div = source.create_element("div");
    let cloned = div.clone_node(false);
    assert!(std::rc::Rc::ptr_eq(&cloned.owner_document().unwrap(), &source.root));
    let imported = other.import_node(&div, false).unwrap();
    assert!(std::rc::Rc::ptr_eq(&imported.owner_document().unwrap(), &other.root));
}

#[test]
fn removing_a_node_adjusts_a_live_node_iterator() {
    let doc = Document::new();
    let root = doc.create_element("div");
    let a = doc.create_element("a");
    let b = doc.create_element("b");
    root.append_child(a.clone()).unwrap();
    root.append_child(b.clone()).unwrap();

    let mut iter = NodeIterator::new(root.clone(), None);
    assert!(std::rc::Rc::ptr_eq(&iter.next_node().unwrap(), &root));
    assert!(std::rc::Rc::ptr_eq(&iter.next_node().unwrap(), &a));

    // `a` is the iterator's current reference; removing it must move the
    // reference to its previous sibling's/parent's neighborhood instead of
    // leaving it dangling on a detached node.
    root.remove_child(&a).unwrap();
    let next = iter.next_node().unwrap();
    assert!(std::rc::Rc::ptr_eq(&next, &b));
}
