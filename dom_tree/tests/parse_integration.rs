use dom_tree::document::{ElementExt, NodeExt};
use dom_tree::{parse_document, parse_fragment};
use markup_core::{ns, LocalName, QualName};

fn local(node: &dom_tree::Handle) -> Option<String> {
    node.local_name().map(|n| n.as_str().to_owned())
}

#[test]
fn parses_minimal_document_into_html_head_body() {
    let sink = parse_document("<!DOCTYPE html><title>hi</title><p>text</p>");
    let html = sink.document.first_child().unwrap();
    assert_eq!(local(&html).as_deref(), Some("html"));
    let children: Vec<_> = html.child_nodes().iter().filter_map(local).collect();
    assert_eq!(children, vec!["head".to_string(), "body".to_string()]);
    assert!(sink.errors.borrow().is_empty());
}

#[test]
fn quirks_mode_set_without_doctype() {
    let sink = parse_document("<p>no doctype</p>");
    assert_eq!(sink.quirks_mode.get(), markup_core::QuirksMode::Quirks);
}

#[test]
fn no_quirks_mode_with_html5_doctype() {
    let sink = parse_document("<!DOCTYPE html><p>hi</p>");
    assert_eq!(sink.quirks_mode.get(), markup_core::QuirksMode::NoQuirks);
}

#[test]
fn fragment_parsing_produces_a_document_fragment() {
    let context = QualName::html(LocalName::from("div"));
    let (_, fragment) = parse_fragment(context, "<p>one</p><p>two</p>");
    let children: Vec<_> = fragment.child_nodes().iter().filter_map(local).collect();
    assert_eq!(children, vec!["p".to_string(), "p".to_string()]);
}

#[test]
fn fragment_context_seeds_rcdata_tokenizer_state() {
    // A <title> context means the fragment content is tokenized as RCDATA,
    // so a literal "<b>" inside stays text instead of becoming an element.
    let context = QualName::html(LocalName::from("title"));
    let (_, fragment) = parse_fragment(context, "<b>not a tag</b>");
    assert!(fragment.children.borrow().iter().all(|c| !c.is_element()));
    assert_eq!(fragment.text_content(), "<b>not a tag</b>");
}

#[test]
fn select_option_selectedcontent_sync() {
    let html = "<select><selectedcontent></selectedcontent>\
                <option selected>First</option><option>Second</option></select>";
    let sink = parse_document(html);
    let html_elem = sink.document.first_child().unwrap();
    let body = html_elem.child_nodes().into_iter().find(|n| local(n).as_deref() == Some("body")).unwrap();
    let select = find_descendant(&body, "select").unwrap();
    let selectedcontent = find_descendant(&select, "selectedcontent").unwrap();
    assert_eq!(selectedcontent.text_content(), "First");
}

fn find_descendant(root: &dom_tree::Handle, name: &str) -> Option<dom_tree::Handle> {
    for child in root.children.borrow().iter() {
        if local(child).as_deref() == Some(name) {
            return Some(child.clone());
        }
        if let Some(found) = find_descendant(child, name) {
            return Some(found);
        }
    }
    None
}

#[test]
fn ns_macro_reexported_and_usable() {
    assert_eq!(ns!(html).as_str(), markup_core::atom::HTML_NS);
}
