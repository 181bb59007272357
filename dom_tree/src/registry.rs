//! Element-kind dispatch (spec.md §4.7): insertion/removing/adopting/cloning
//! steps that vary per HTML local name.
//!
//! `dom_tree` has no per-tag Rust type (`HTMLAnchorElement`,
//! `HTMLTableElement`, ...) — every element is the same `NodeData::Element`
//! node (grounded on the teacher's `markup5ever_rcdom::Node`, which takes the
//! same approach). Behavior that the DOM spec attaches to specific elements
//! is dispatched here by local name instead of by type, the way a
//! from-scratch implementation grows before it earns a full IDL binding
//! layer. Void-element and raw-text-element tables are *not* duplicated
//! here: `html_engine::tree_builder` already enforces void-element insertion
//! behavior during parsing, and `html_engine::serialize` already has its own
//! table for output — this module only covers behavior reachable from the
//! DOM mutation API itself.

use crate::node::Handle;

/// <https://dom.spec.whatwg.org/#concept-node-insert> step "for each inclusive
/// descendant... run the insertion steps". The teacher's `rcdom` has no
/// equivalent hook (it only ever builds a tree once, during parsing, and
/// never needs to react to a later `appendChild`); this dispatch point is a
/// genuine addition for the DOM mutation API described in spec.md §4.5/§4.7.
pub fn run_insertion_steps(node: &Handle) {
    let Some(local) = node.local_name() else { return };
    match local.as_str() {
        // <https://html.spec.whatwg.org/#the-option-element:concept-node-insert>
        "option" => sync_selectedcontent_for_option(node),
        // A full base-URL recompute needs a URL parser this workspace
        // doesn't have (spec.md §4.7 leaves "per-document URL parsing" as a
        // pluggable concern); recording that the element exists is as far
        // as insertion steps go here.
        "base" => {},
        _ => {},
    }
}

/// <https://dom.spec.whatwg.org/#concept-node-remove> step "for each removed
/// node... run the removing steps". No HTML element in this workspace's
/// scope needs removing steps yet; kept as a named hook so adding one later
/// doesn't require touching `mutation.rs`.
pub fn run_removing_steps(_node: &Handle) {}

/// <https://dom.spec.whatwg.org/#concept-node-adopt> step "for each
/// inclusive descendant... run the adopting steps".
pub fn run_adopting_steps(_node: &Handle) {}

/// <https://dom.spec.whatwg.org/#concept-node-clone> step "run any cloning
/// steps". `NodeData::clone()` (a plain `derive(Clone)`) already copies an
/// element's attributes and name; template contents need their own fragment
/// rather than sharing the original's, which `mutation::clone_node` doesn't
/// do on its own since `template_contents` is cloned by `Rc` pointer by
/// `NodeData`'s derive.
pub fn run_cloning_steps(original: &Handle, copy: &Handle) {
    use crate::node::NodeData;
    if let (NodeData::Element { template_contents: orig, .. }, NodeData::Element { template_contents: new, .. }) =
        (&original.data, &copy.data)
    {
        if let Some(contents) = orig.borrow().as_ref() {
            *new.borrow_mut() = Some(contents.clone_subtree());
        }
    }
}

/// <https://html.spec.whatwg.org/#concept-option-selectedness>'s sync to a
/// `<selectedcontent>`, run whenever an `<option>` is inserted into a tree
/// that already has it marked selected. The attribute-change half of this
/// same sync lives in [`sync_selectedcontent_for_attribute_change`].
fn sync_selectedcontent_for_option(option: &Handle) {
    if !option.has_attr("selected") {
        return;
    }
    let Some(select) = option.option_nearest_ancestor_select() else { return };
    let Some(target) = select.select_enabled_selectedcontent() else { return };
    option.clone_option_into_selectedcontent(&target);
}

/// Run after `setAttribute`/`removeAttribute` touches `selected` on an
/// `<option>` (spec.md §4.7's named example of element-kind-specific
/// behavior, grounded on `rcdom`'s
/// `maybe_clone_an_option_into_selectedcontent`).
pub fn run_attribute_changed_steps(node: &Handle, local_name: &str) {
    if local_name != "selected" || node.local_name().map(|n| n.as_str()) != Some("option") {
        return;
    }
    sync_selectedcontent_for_option(node);
}
