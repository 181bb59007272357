//! The interface the tree constructor drives to build (or otherwise react
//! to) a document. spec.md §6 calls this the "element factory" plus the
//! mutation operations the tree constructor performs; `html_engine` is
//! generic over any `TreeSink`, and `dom_tree` is the one real implementation
//! in this workspace.

use std::borrow::Cow;

use tendril::StrTendril;

use crate::atom::LocalName;
use crate::qualname::{Attribute, ExpandedName, QualName};

/// <https://dom.spec.whatwg.org/#concept-document-quirks>
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum QuirksMode {
    Quirks,
    LimitedQuirks,
    #[default]
    NoQuirks,
}

/// Something to be appended to a node: either raw text (which the sink may
/// coalesce onto an existing trailing text node) or an already-created
/// handle.
pub enum NodeOrText<Handle> {
    AppendNode(Handle),
    AppendText(StrTendril),
}

/// Flags describing how an element was created, passed to
/// [`TreeSink::create_element`] so the sink can set up per-kind state (a
/// `<template>`'s content document fragment, a MathML integration point)
/// without the tree constructor knowing sink internals.
#[derive(Copy, Clone, Debug, Default)]
pub struct ElementFlags {
    pub template: bool,
    pub mathml_annotation_xml_integration_point: bool,
}

/// Returned by the tree constructor to tell the driver whether it may keep
/// feeding tokens, or must pause (e.g. a blocking script in a full
/// scripting-enabled host — this specification doesn't execute scripts, so
/// `Suspend` is only ever requested, never acted on beyond returning control
/// to the caller, per spec.md §5).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NextParserState {
    Continue,
    Suspend,
}

/// Callback used by [`TreeSink::trace_handles`]-style GC integration. Not
/// needed by an owned-tree implementation like `dom_tree`, but kept as part
/// of the interface so a future arena/GC-backed sink can participate without
/// changing this trait's shape.
pub trait Tracer {
    type Handle;
    fn trace_handle(&self, node: &Self::Handle);
}

/// Trait a document-tree implementation provides so `html_engine`'s
/// tokenizer/tree-constructor pair can build it without knowing the concrete
/// node representation.
pub trait TreeSink {
    /// Handle to a node. Cheap to clone (a reference-counted pointer or
    /// index), since the tree constructor carries handles around constantly.
    type Handle: Clone;

    /// What `finish()` (end of parsing) hands back to the caller.
    type Output;

    /// Borrowed view of an element's expanded name, returned by
    /// [`TreeSink::elem_name`]. Usually `ExpandedName<'a>`.
    type ElemName<'a>: Into<ExpandedName<'a>>
    where
        Self: 'a;

    fn finish(self) -> Self::Output;

    /// Report a parse error. Soft failure — never aborts parsing
    /// (spec.md §7 "Parse error (soft)").
    fn parse_error(&self, msg: Cow<'static, str>);

    fn get_document(&self) -> Self::Handle;

    /// A standalone `DocumentFragment`, used as the result container for
    /// fragment parsing (spec.md §6 `parseHTMLFragment`).
    fn create_document_fragment(&self) -> Self::Handle;

    /// The `content` document fragment of a `<template>` element.
    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle;

    fn set_quirks_mode(&self, mode: QuirksMode);

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool;

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a>;

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle;

    fn create_comment(&self, text: StrTendril) -> Self::Handle;

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle;

    /// Append `child` as the last child of `parent`.
    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// Append `child` immediately before `sibling` in its parent's child list.
    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>);

    /// Foster-parenting dispatch: append to `element`'s parent before
    /// `element` if it has one, else append to `prev_element` (the fallback
    /// target the foster-parent algorithm computed). See spec.md §4.4
    /// "Insertion of an element", step 1.
    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    );

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    );

    /// Add attributes to `target` that it doesn't already have one of —
    /// used for the `<html>`/`<body>` attribute-merging steps that run when
    /// a second start tag for an already-open root/body element is seen.
    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>);

    fn remove_from_parent(&self, target: &Self::Handle);

    /// Move all children of `node` to the end of `new_parent`'s children,
    /// in order. Used by the adoption-agency algorithm.
    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle);

    fn is_mathml_annotation_xml_integration_point(&self, target: &Self::Handle) -> bool {
        let _ = target;
        false
    }

    fn mark_script_already_started(&self, _node: &Self::Handle) {}

    fn complete_script(&self, _node: &Self::Handle) -> NextParserState {
        NextParserState::Continue
    }

    /// Hook for `<option selected>` → enclosing `<select>`'s
    /// `selectedcontent` sync, run after attribute mutation on an `<option>`.
    /// Default no-op; `dom_tree` overrides it. See SPEC_FULL.md supplemented
    /// features.
    fn maybe_clone_an_option_into_selectedcontent(&self, _option: &Self::Handle) {}

    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        false
    }
}

/// Shared helper for `ExpandedName` construction so `TreeSink` impls don't
/// each re-derive it.
pub fn local_name_of(handle_name: &QualName) -> LocalName {
    handle_name.local.clone()
}
