//! The tree constructor (spec.md §4.4): consumes [`Token`](crate::token::Token)s
//! from the tokenizer and drives a [`TreeSink`] through the ~23 insertion
//! modes of the HTML tree construction algorithm.

pub mod stack;
pub mod types;

use std::cell::{Cell, RefCell};

use markup_core::{ns, ElementFlags, LocalName, NodeOrText, QualName, QuirksMode, TreeSink};
use tendril::StrTendril;

use crate::token::{Doctype, EndTag, StartTag, Tag, Token as TokToken, TokenSink, TokenSinkResult};
use crate::tokenizer::states::RawKind;
use stack::ElemStack;
use types::{FormatEntry, InsertionMode};

const IMPLIED_END_TAGS: &[&str] = &[
    "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc",
];

/// Where to reinsert the adoption agency's formatting-element clone into the
/// active formatting list once the inner loop is done moving entries around.
enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}

#[derive(Clone)]
pub struct TreeBuilderOpts {
    pub scripting_enabled: bool,
    pub iframe_srcdoc: bool,
}

impl Default for TreeBuilderOpts {
    fn default() -> Self {
        TreeBuilderOpts {
            scripting_enabled: false,
            iframe_srcdoc: false,
        }
    }
}

pub struct TreeBuilder<Handle, Sink> {
    sink: Sink,
    opts: TreeBuilderOpts,
    mode: Cell<InsertionMode>,
    orig_mode: Cell<Option<InsertionMode>>,
    open_elems: RefCell<ElemStack<Handle, Sink>>,
    active_formatting: RefCell<Vec<FormatEntry<Handle>>>,
    head_elem: RefCell<Option<Handle>>,
    form_elem: RefCell<Option<Handle>>,
    frameset_ok: Cell<bool>,
    foster_parenting: Cell<bool>,
    ignore_lf: Cell<bool>,
    pending_table_text: RefCell<Vec<(bool, StrTendril)>>,
    quirks_mode: Cell<QuirksMode>,
    template_modes: RefCell<Vec<InsertionMode>>,
    pending_raw_state: Cell<Option<RawKind>>,
    pending_plaintext: Cell<bool>,
    done: Cell<bool>,
    /// Set by [`TreeBuilder::new_for_fragment`]; substituted for the stack's
    /// bottom node in [`TreeBuilder::reset_insertion_mode`] per the "fragment
    /// case" branch of <https://html.spec.whatwg.org/#reset-the-insertion-mode-appropriately>.
    context_elem: Option<QualName>,
}

impl<Handle: Clone, Sink: TreeSink<Handle = Handle>> TreeBuilder<Handle, Sink> {
    pub fn new(sink: Sink, opts: TreeBuilderOpts) -> Self {
        TreeBuilder {
            sink,
            opts,
            mode: Cell::new(InsertionMode::Initial),
            orig_mode: Cell::new(None),
            open_elems: RefCell::new(ElemStack::new()),
            active_formatting: RefCell::new(Vec::new()),
            head_elem: RefCell::new(None),
            form_elem: RefCell::new(None),
            frameset_ok: Cell::new(true),
            foster_parenting: Cell::new(false),
            ignore_lf: Cell::new(false),
            pending_table_text: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
            template_modes: RefCell::new(Vec::new()),
            pending_raw_state: Cell::new(None),
            pending_plaintext: Cell::new(false),
            done: Cell::new(false),
            context_elem: None,
        }
    }

    /// Set up for the HTML fragment parsing algorithm
    /// (<https://html.spec.whatwg.org/#html-fragment-parsing-algorithm>):
    /// `root` is a freshly created, unattached `<html>` element already
    /// pushed onto the stack of open elements by the caller, and `context`
    /// is the name of the element fragment parsing was asked to parse
    /// relative to.
    pub fn new_for_fragment(sink: Sink, opts: TreeBuilderOpts, root: Handle, context: QualName) -> Self {
        let mut tb = TreeBuilder::new(sink, opts);
        tb.open_elems.borrow_mut().push(root, QualName::html(LocalName::from("html")));
        if context.ns == ns!(html) && context.local.as_str() == "template" {
            tb.template_modes.borrow_mut().push(InsertionMode::InTemplate);
        }
        tb.context_elem = Some(context);
        tb.reset_insertion_mode();
        tb
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn into_sink(self) -> Sink {
        self.sink
    }

    fn same_node(&self, a: &Handle, b: &Handle) -> bool {
        self.sink.same_node(a, b)
    }

    fn current_node(&self) -> Option<Handle> {
        self.open_elems.borrow().top().cloned()
    }

    fn current_node_name_is(&self, name: &str) -> bool {
        matches!(self.open_elems.borrow().top_name(), Some(n) if n.ns == ns!(html) && n.local.as_str() == name)
    }

    fn insert_at_current(&self, child: NodeOrText<Handle>) {
        if self.foster_parenting.get() && self.current_node_name_is_one_of(&["table", "tbody", "tfoot", "thead", "tr"]) {
            self.foster_parent(child);
            return;
        }
        if let Some(parent) = self.current_node() {
            self.sink.append(&parent, child);
        }
    }

    fn current_node_name_is_one_of(&self, names: &[&str]) -> bool {
        matches!(self.open_elems.borrow().top_name(), Some(n) if n.ns == ns!(html) && names.contains(&n.local.as_str()))
    }

    /// <https://html.spec.whatwg.org/#foster-parent>. `open.iter()` walks
    /// top-to-bottom, so the first "table"/"template" hit while scanning is
    /// the most recently opened one — exactly the "last table element"/"last
    /// template element" the algorithm means.
    fn foster_parent(&self, child: NodeOrText<Handle>) {
        let open = self.open_elems.borrow();
        let mut table_idx = None;
        let mut template_idx = None;
        for (i, (_, name)) in open.iter().enumerate() {
            if name.ns != ns!(html) {
                continue;
            }
            let raw = open.len() - 1 - i;
            match name.local.as_str() {
                "table" if table_idx.is_none() => table_idx = Some(raw),
                "template" if template_idx.is_none() => template_idx = Some(raw),
                _ => {},
            }
            if table_idx.is_some() && template_idx.is_some() {
                break;
            }
        }
        // A template lower in the stack than the last table (i.e. opened
        // more recently — a larger raw index) wins even if a table exists.
        if let Some(t_idx) = template_idx {
            if table_idx.is_none_or(|table_idx| t_idx > table_idx) {
                let template = open.get(t_idx).unwrap().0.clone();
                drop(open);
                let contents = self.sink.get_template_contents(&template);
                self.sink.append(&contents, child);
                return;
            }
        }
        match table_idx {
            Some(idx) if idx > 0 => {
                let table = open.get(idx).unwrap().0.clone();
                let prev = open.get(idx - 1).unwrap().0.clone();
                drop(open);
                self.sink.append_based_on_parent_node(&table, &prev, child);
            },
            _ => {
                let target = open.get(0).map(|(h, _)| h.clone());
                drop(open);
                if let Some(target) = target {
                    self.sink.append(&target, child);
                }
            },
        }
    }

    fn insert_element(&self, tag: &Tag, flags: ElementFlags) -> Handle {
        let name = QualName::html(tag.name.clone());
        let handle = self.sink.create_element(name.clone(), tag.attrs.clone(), flags);
        self.insert_at_current(NodeOrText::AppendNode(handle.clone()));
        self.open_elems.borrow_mut().push(handle.clone(), name);
        handle
    }

    fn insert_html_element(&self, tag: &Tag) -> Handle {
        self.insert_element(tag, ElementFlags::default())
    }

    fn insert_char(&self, c: char) {
        let mut t = StrTendril::new();
        t.push_char(c);
        self.insert_at_current(NodeOrText::AppendText(t));
    }

    fn insert_chars(&self, s: StrTendril) {
        if !s.is_empty() {
            self.insert_at_current(NodeOrText::AppendText(s));
        }
    }

    fn insert_comment(&self, data: StrTendril) {
        let handle = self.sink.create_comment(data);
        self.insert_at_current(NodeOrText::AppendNode(handle));
    }

    fn pop(&self) -> Option<Handle> {
        self.open_elems.borrow_mut().pop()
    }

    fn generate_implied_end_tags(&self, except: Option<&str>) {
        loop {
            let top = self.open_elems.borrow().top_name().cloned();
            match top {
                Some(n) if n.ns == ns!(html) && IMPLIED_END_TAGS.contains(&n.local.as_str()) && Some(n.local.as_str()) != except => {
                    self.pop();
                },
                _ => break,
            }
        }
    }

    fn push_active_formatting(&self, handle: Handle, tag: Tag) {
        let mut list = self.active_formatting.borrow_mut();
        let mut matches = 0;
        let mut first_match = None;
        for (i, entry) in list.iter().enumerate().rev() {
            match entry {
                FormatEntry::Marker => break,
                FormatEntry::Element(_, t) => {
                    if t.equiv_modulo_attr_order(&tag) {
                        matches += 1;
                        if first_match.is_none() {
                            first_match = Some(i);
                        }
                    }
                },
            }
        }
        if matches >= 3 {
            list.remove(first_match.unwrap());
        }
        list.push(FormatEntry::Element(handle, tag));
    }

    fn reconstruct_active_formatting(&self) {
        let needs_work = {
            let list = self.active_formatting.borrow();
            !matches!(list.last(), None | Some(FormatEntry::Marker))
        };
        if !needs_work {
            return;
        }
        // Simplified reconstruction: walk forward from the first marker (or
        // the start) re-inserting each formatting element that isn't
        // currently open, in order.
        let entries: Vec<(Handle, Tag)> = {
            let list = self.active_formatting.borrow();
            let mut start = 0;
            for (i, e) in list.iter().enumerate().rev() {
                if let FormatEntry::Marker = e {
                    start = i + 1;
                    break;
                }
            }
            list[start..]
                .iter()
                .filter_map(|e| match e {
                    FormatEntry::Element(h, t) => Some((h.clone(), t.clone())),
                    FormatEntry::Marker => None,
                })
                .collect()
        };
        for (handle, tag) in entries {
            let open = self.open_elems.borrow().position(&handle, |a, b| self.same_node(a, b));
            if open.is_none() {
                let new_handle = self.insert_html_element(&tag);
                let mut list = self.active_formatting.borrow_mut();
                if let Some(slot) = list.iter_mut().find(|e| matches!(e, FormatEntry::Element(h, _) if self.same_node(h, &handle))) {
                    *slot = FormatEntry::Element(new_handle, tag);
                }
            }
        }
    }

    fn clear_active_formatting_to_marker(&self) {
        let mut list = self.active_formatting.borrow_mut();
        while let Some(entry) = list.pop() {
            if matches!(entry, FormatEntry::Marker) {
                break;
            }
        }
    }

    /// "Insert a node at the appropriate place", minus the foster-parenting
    /// dance already done for `target`: used by the adoption agency
    /// algorithm's step 14, which inserts relative to the *common ancestor*
    /// rather than the current node (so [`Self::insert_at_current`] doesn't
    /// apply here).
    fn insert_at_node(&self, target: &Handle, child: NodeOrText<Handle>) {
        let name = self.sink.elem_name(target).into();
        let is_foster_target = *name.ns == ns!(html) && matches!(name.local.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr");
        if self.foster_parenting.get() && is_foster_target {
            self.foster_parent(child);
            return;
        }
        if *name.ns == ns!(html) && name.local.as_str() == "template" {
            let contents = self.sink.get_template_contents(target);
            self.sink.append(&contents, child);
            return;
        }
        self.sink.append(target, child);
    }

    fn position_in_active_formatting(&self, handle: &Handle) -> Option<usize> {
        self.active_formatting.borrow().iter().position(|e| matches!(e, FormatEntry::Element(h, _) if self.same_node(h, handle)))
    }

    /// <https://html.spec.whatwg.org/#adoption-agency-algorithm>
    fn adoption_agency(&self, tag_name: &str) {
        // 1. If the current node is an HTML element whose tag name is
        // `tag_name` and it isn't in the list of active formatting elements,
        // this is the common, trivially-nested case: pop it and return.
        if self.current_node_name_is(tag_name) {
            let current = self.current_node();
            let listed = current.as_ref().is_some_and(|h| self.position_in_active_formatting(h).is_some());
            if !listed {
                self.pop();
                return;
            }
        }

        for _ in 0..8 {
            // 5. The last formatting element named `tag_name` between the
            // end of the list and the last marker (or the start of the list).
            let found = {
                let list = self.active_formatting.borrow();
                let mut marker_boundary = 0;
                for (i, e) in list.iter().enumerate().rev() {
                    if let FormatEntry::Marker = e {
                        marker_boundary = i + 1;
                        break;
                    }
                }
                list[marker_boundary..].iter().enumerate().rev().find_map(|(off, e)| match e {
                    FormatEntry::Element(h, t) if t.name.as_str() == tag_name => Some((marker_boundary + off, h.clone(), t.clone())),
                    _ => None,
                })
            };
            let Some((fmt_list_index, fmt_elem, fmt_tag)) = found else {
                // 6. No such node: act as "any other end tag" and stop.
                self.in_body_any_other_end_tag(&LocalName::from(tag_name));
                return;
            };

            // 7. Not on the stack of open elements: drop it from the list
            // and stop (a parse error in the spec's terms).
            let Some(fmt_stack_index) = self.open_elems.borrow().position(&fmt_elem, |a, b| self.same_node(a, b)) else {
                self.active_formatting.borrow_mut().remove(fmt_list_index);
                return;
            };

            // 8. Not in scope: stop, leaving everything as-is.
            if !self.open_elems.borrow().has_index_in_scope(fmt_stack_index) {
                return;
            }

            // 9. (A mismatch between formatting element and current node is
            // only a parse error here, with no further recovery needed.)

            // 10. The furthest block: the topmost special-category element
            // above the formatting element on the stack of open elements.
            let furthest = {
                let open = self.open_elems.borrow();
                (fmt_stack_index + 1..open.len())
                    .find(|&i| stack::is_special(&open.get(i).unwrap().1))
                    .map(|i| (i, open.get(i).unwrap().0.clone()))
            };
            let Some((furthest_block_index, furthest_block)) = furthest else {
                // 11. No furthest block: pop through and including the
                // formatting element and drop it from the list.
                self.open_elems.borrow_mut().truncate(fmt_stack_index);
                self.active_formatting.borrow_mut().remove(fmt_list_index);
                return;
            };

            // 12. The common ancestor sits directly below the formatting
            // element on the stack.
            let common_ancestor = self.open_elems.borrow().get(fmt_stack_index - 1).unwrap().0.clone();

            // 13. Bookmark, initially at the formatting element's own slot.
            let mut bookmark = Bookmark::Replace(fmt_elem.clone());

            // 14. Inner loop, up to 3 iterations, walking down from the
            // furthest block towards the formatting element.
            let mut node_index = furthest_block_index;
            let mut last_node = furthest_block.clone();
            let mut inner = 0;
            loop {
                inner += 1;
                node_index -= 1;
                let node = self.open_elems.borrow().get(node_index).unwrap().0.clone();
                if self.same_node(&node, &fmt_elem) {
                    break;
                }
                let node_list_index = self.position_in_active_formatting(&node);
                if inner > 3 {
                    if let Some(pos) = node_list_index {
                        self.active_formatting.borrow_mut().remove(pos);
                    }
                    self.open_elems.borrow_mut().remove(node_index);
                    continue;
                }
                let Some(node_list_index) = node_list_index else {
                    self.open_elems.borrow_mut().remove(node_index);
                    continue;
                };
                let node_tag = {
                    let list = self.active_formatting.borrow();
                    match &list[node_list_index] {
                        FormatEntry::Element(_, t) => t.clone(),
                        FormatEntry::Marker => unreachable!("markers never sit at a formatting-element index"),
                    }
                };
                let new_name = QualName::html(node_tag.name.clone());
                let new_element = self.sink.create_element(new_name.clone(), node_tag.attrs.clone(), ElementFlags::default());
                self.open_elems.borrow_mut().replace_at(node_index, new_element.clone(), new_name);
                self.active_formatting.borrow_mut()[node_list_index] = FormatEntry::Element(new_element.clone(), node_tag);
                let node = new_element;

                if self.same_node(&last_node, &furthest_block) {
                    bookmark = Bookmark::InsertAfter(node.clone());
                }
                self.sink.remove_from_parent(&last_node);
                self.sink.append(&node, NodeOrText::AppendNode(last_node.clone()));
                last_node = node;
            }

            // 15. Detach the accumulated chain from wherever it last sat and
            // move it under the common ancestor.
            self.sink.remove_from_parent(&last_node);
            self.insert_at_node(&common_ancestor, NodeOrText::AppendNode(last_node));

            // 16.-17. Clone the formatting element, move the furthest
            // block's children under the clone, then put the clone back as
            // the furthest block's only child so far.
            let new_name = QualName::html(fmt_tag.name.clone());
            let new_element = self.sink.create_element(new_name, fmt_tag.attrs.clone(), ElementFlags::default());
            let new_entry = FormatEntry::Element(new_element.clone(), fmt_tag.clone());
            self.sink.reparent_children(&furthest_block, &new_element);
            self.sink.append(&furthest_block, NodeOrText::AppendNode(new_element.clone()));

            // 18. Move the bookmark's clone into the active formatting list,
            // dropping the old formatting-element entry.
            match bookmark {
                Bookmark::Replace(to_replace) => {
                    let index = self.position_in_active_formatting(&to_replace).expect("bookmark missing from active formatting list");
                    self.active_formatting.borrow_mut()[index] = new_entry;
                },
                Bookmark::InsertAfter(previous) => {
                    let index = self.position_in_active_formatting(&previous).expect("bookmark missing from active formatting list") + 1;
                    self.active_formatting.borrow_mut().insert(index, new_entry);
                    let old_index = self
                        .position_in_active_formatting(&fmt_elem)
                        .expect("formatting element missing from active formatting list");
                    self.active_formatting.borrow_mut().remove(old_index);
                },
            }

            // 19. Remove the formatting element from the stack of open
            // elements and reinsert its clone right above the furthest block.
            self.open_elems.borrow_mut().remove_first(&fmt_elem, |a, b| self.same_node(a, b));
            let new_furthest_block_index = self
                .open_elems
                .borrow()
                .position(&furthest_block, |a, b| self.same_node(a, b))
                .expect("furthest block missing from stack of open elements");
            self.open_elems
                .borrow_mut()
                .insert_at(new_furthest_block_index + 1, new_element.clone(), QualName::html(fmt_tag.name.clone()));

            // 20. Loop again.
        }
    }

    fn close_p_element(&self) {
        self.generate_implied_end_tags(Some("p"));
        while !self.current_node_name_is("p") {
            if self.pop().is_none() {
                break;
            }
        }
        if self.current_node_name_is("p") {
            self.pop();
        }
    }

    // ---- entry point -----------------------------------------------------

    pub fn process_raw(&self, token: TokToken, line: u64) -> TokenSinkResult<Handle> {
        let _ = line;
        match token {
            TokToken::DoctypeToken(dt) => self.process(types::Token::Doctype(dt)),
            TokToken::TagToken(tag) => self.process(types::Token::Tag(tag)),
            TokToken::CommentToken(data) => self.process(types::Token::Comment(data)),
            TokToken::CharacterTokens(s) => self.process(types::Token::Characters(s)),
            TokToken::NullCharacterToken => self.process(types::Token::NullCharacter),
            TokToken::EofToken => self.process(types::Token::Eof),
            TokToken::ParseError(_) => {},
        }
        if self.pending_plaintext.take() {
            return TokenSinkResult::Plaintext;
        }
        if let Some(kind) = self.take_pending_raw_state() {
            return TokenSinkResult::RawData(kind);
        }
        TokenSinkResult::Continue
    }

    fn process(&self, token: types::Token) {
        let mode = self.mode.get();
        match mode {
            InsertionMode::Initial => self.step_initial(token),
            InsertionMode::BeforeHtml => self.step_before_html(token),
            InsertionMode::BeforeHead => self.step_before_head(token),
            InsertionMode::InHead => self.step_in_head(token),
            InsertionMode::InHeadNoscript => self.step_in_head_noscript(token),
            InsertionMode::AfterHead => self.step_after_head(token),
            InsertionMode::InBody | InsertionMode::InTemplate => self.step_in_body(token),
            InsertionMode::Text => self.step_text(token),
            InsertionMode::InTable
            | InsertionMode::InCaption
            | InsertionMode::InColumnGroup
            | InsertionMode::InTableBody
            | InsertionMode::InRow
            | InsertionMode::InCell => self.step_in_table_family(mode, token),
            InsertionMode::InTableText => self.step_in_table_text(token),
            InsertionMode::InSelect | InsertionMode::InSelectInTable => self.step_in_select(token),
            InsertionMode::AfterBody => self.step_after_body(token),
            InsertionMode::InFrameset => self.step_in_frameset(token),
            InsertionMode::AfterFrameset => self.step_after_frameset(token),
            InsertionMode::AfterAfterBody => self.step_after_after_body(token),
            InsertionMode::AfterAfterFrameset => {},
        }
    }

    fn is_whitespace_text(s: &str) -> bool {
        s.chars().all(|c| matches!(c, '\t' | '\n' | '\x0C' | '\r' | ' '))
    }

    // ---- Initial / before-html / before-head ------------------------------

    fn step_initial(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => {},
            types::Token::Comment(data) => {
                let doc = self.sink.get_document();
                self.sink.append(&doc, NodeOrText::AppendNode(self.sink.create_comment(data)));
            },
            types::Token::Doctype(dt) => {
                let quirks = doctype_quirks_mode(&dt);
                self.quirks_mode.set(quirks);
                self.sink.set_quirks_mode(quirks);
                let doc = self.sink.get_document();
                self.sink.append_doctype_to_document(
                    dt.name.unwrap_or_default(),
                    dt.public_id.unwrap_or_default(),
                    dt.system_id.unwrap_or_default(),
                );
                let _ = doc;
                self.mode.set(InsertionMode::BeforeHtml);
            },
            other => {
                self.mode.set(InsertionMode::BeforeHtml);
                self.process(other);
            },
        }
    }

    fn step_before_html(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => {},
            types::Token::Comment(data) => {
                let doc = self.sink.get_document();
                self.sink.append(&doc, NodeOrText::AppendNode(self.sink.create_comment(data)));
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => {
                let doc = self.sink.get_document();
                let name = QualName::html(tag.name.clone());
                let handle = self.sink.create_element(name.clone(), tag.attrs, ElementFlags::default());
                self.sink.append(&doc, NodeOrText::AppendNode(handle.clone()));
                self.open_elems.borrow_mut().push(handle, name);
                self.mode.set(InsertionMode::BeforeHead);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {},
            other => {
                self.insert_implicit_html();
                self.mode.set(InsertionMode::BeforeHead);
                self.process(other);
            },
        }
    }

    fn insert_implicit_html(&self) {
        let doc = self.sink.get_document();
        let name = QualName::html(LocalName::from("html"));
        let handle = self.sink.create_element(name.clone(), Vec::new(), ElementFlags::default());
        self.sink.append(&doc, NodeOrText::AppendNode(handle.clone()));
        self.open_elems.borrow_mut().push(handle, name);
    }

    fn step_before_head(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => {},
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => self.step_in_body(types::Token::Tag(tag)),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "head" => {
                let handle = self.insert_html_element(&tag);
                *self.head_elem.borrow_mut() = Some(handle);
                self.mode.set(InsertionMode::InHead);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && !matches!(tag.name.as_str(), "head" | "body" | "html" | "br") => {},
            other => {
                let head_tag = Tag {
                    kind: StartTag,
                    name: LocalName::from("head"),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                let handle = self.insert_html_element(&head_tag);
                *self.head_elem.borrow_mut() = Some(handle);
                self.mode.set(InsertionMode::InHead);
                self.process(other);
            },
        }
    }

    // ---- In head ---------------------------------------------------------

    fn step_in_head(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.insert_chars(s),
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => self.step_in_body(types::Token::Tag(tag)),
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(tag.name.as_str(), "base" | "basefont" | "bgsound" | "link" | "meta") =>
            {
                self.insert_html_element(&tag);
                self.pop();
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "title" => {
                self.insert_html_element(&tag);
                self.switch_to_text_mode(RawKind::Rcdata);
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag && matches!(tag.name.as_str(), "noframes" | "style") =>
            {
                self.insert_html_element(&tag);
                self.switch_to_text_mode(RawKind::Rawtext);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "noscript" => {
                self.insert_html_element(&tag);
                self.mode.set(InsertionMode::InHeadNoscript);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "script" => {
                self.insert_html_element(&tag);
                self.switch_to_text_mode(RawKind::ScriptData);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "head" => {
                self.pop();
                self.mode.set(InsertionMode::AfterHead);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "template" => {
                self.insert_html_element(&tag);
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTemplate);
                self.template_modes.borrow_mut().push(InsertionMode::InTemplate);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "template" => {
                self.pop();
                self.clear_active_formatting_to_marker();
                self.template_modes.borrow_mut().pop();
                self.mode.set(InsertionMode::InHead);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && !matches!(tag.name.as_str(), "body" | "html" | "br") => {},
            other => {
                self.pop();
                self.mode.set(InsertionMode::AfterHead);
                self.process(other);
            },
        }
    }

    fn step_in_head_noscript(&self, token: types::Token) {
        match token {
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "noscript" => {
                self.pop();
                self.mode.set(InsertionMode::InHead);
            },
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.step_in_head(types::Token::Characters(s)),
            types::Token::Comment(_) => {
                if let types::Token::Comment(data) = token {
                    self.insert_comment(data);
                }
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(tag.name.as_str(), "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style") =>
            {
                self.step_in_head(types::Token::Tag(tag));
            },
            other => {
                self.pop();
                self.mode.set(InsertionMode::InHead);
                self.process(other);
            },
        }
    }

    fn switch_to_text_mode(&self, kind: RawKind) {
        self.orig_mode.set(Some(self.mode.get()));
        self.mode.set(InsertionMode::Text);
        self.pending_raw_state.set(Some(kind));
    }

    fn step_after_head(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.insert_chars(s),
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => self.step_in_body(types::Token::Tag(tag)),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "body" => {
                self.insert_html_element(&tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InBody);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "frameset" => {
                self.insert_html_element(&tag);
                self.mode.set(InsertionMode::InFrameset);
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(
                        tag.name.as_str(),
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style" | "template" | "title"
                    ) =>
            {
                if let Some(head) = self.head_elem.borrow().clone() {
                    self.open_elems.borrow_mut().push(head, QualName::html(LocalName::from("head")));
                    self.step_in_head(types::Token::Tag(tag));
                    self.open_elems.borrow_mut().pop();
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "template" => self.step_in_head(types::Token::Tag(tag)),
            types::Token::Tag(tag) if tag.kind == EndTag && !matches!(tag.name.as_str(), "body" | "html" | "br") => {},
            other => {
                let body_tag = Tag {
                    kind: StartTag,
                    name: LocalName::from("body"),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_html_element(&body_tag);
                self.mode.set(InsertionMode::InBody);
                self.process(other);
            },
        }
    }

    // ---- Text mode (RCDATA/RAWTEXT/script data) ---------------------------

    fn step_text(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) => self.insert_chars(s),
            types::Token::NullCharacter => self.insert_char('\u{FFFD}'),
            types::Token::Eof => {
                self.pop();
                self.mode.set(self.orig_mode.take().unwrap_or(InsertionMode::InBody));
                self.process(types::Token::Eof);
            },
            types::Token::Tag(tag) if tag.kind == EndTag => {
                self.pop();
                self.mode.set(self.orig_mode.take().unwrap_or(InsertionMode::InBody));
            },
            _ => {},
        }
    }

    // ---- In body (the big one) --------------------------------------------

    fn step_in_body(&self, token: types::Token) {
        match token {
            types::Token::NullCharacter => {},
            types::Token::Characters(s) => {
                self.reconstruct_active_formatting();
                if !Self::is_whitespace_text(&s) {
                    self.frameset_ok.set(false);
                }
                self.insert_chars(s);
            },
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Doctype(_) => {},
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => {
                if let Some(top) = self.open_elems.borrow().get(0) {
                    self.sink.add_attrs_if_missing(&top.0, tag.attrs);
                }
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(
                        tag.name.as_str(),
                        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style" | "template" | "title"
                    ) =>
            {
                self.step_in_head(types::Token::Tag(tag));
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "template" => self.step_in_head(types::Token::Tag(tag)),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "body" => {
                if let Some(body) = self.open_elems.borrow().get(1) {
                    self.sink.add_attrs_if_missing(&body.0, tag.attrs);
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "frameset" => {
                if self.frameset_ok.get() {
                    self.insert_html_element(&tag);
                    self.mode.set(InsertionMode::InFrameset);
                }
            },
            types::Token::Eof => {
                self.stop_parsing();
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "body" => {
                if self.open_elems.borrow().contains_html_elem("body") {
                    self.mode.set(InsertionMode::AfterBody);
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "html" => {
                if self.open_elems.borrow().contains_html_elem("body") {
                    self.mode.set(InsertionMode::AfterBody);
                    self.process(types::Token::Tag(tag));
                }
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(
                        tag.name.as_str(),
                        "address" | "article" | "aside" | "blockquote" | "center" | "details" | "dialog" | "dir" | "div" | "dl"
                            | "fieldset" | "figcaption" | "figure" | "footer" | "header" | "hgroup" | "main" | "menu" | "nav"
                            | "ol" | "p" | "section" | "summary" | "ul"
                    ) =>
            {
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag && matches!(tag.name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") =>
            {
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                if matches!(self.open_elems.borrow().top_name(), Some(n) if n.ns == ns!(html) && matches!(n.local.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
                {
                    self.pop();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "pre" | "listing") => {
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                self.ignore_lf.set(true);
                self.frameset_ok.set(false);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "form" => {
                let has_template = self.template_modes.borrow().len() > 0;
                if self.form_elem.borrow().is_none() || has_template {
                    if self.open_elems.borrow().has_in_button_scope("p") {
                        self.close_p_element();
                    }
                    let handle = self.insert_html_element(&tag);
                    if !has_template {
                        *self.form_elem.borrow_mut() = Some(handle);
                    }
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "li" => {
                self.frameset_ok.set(false);
                if self.open_elems.borrow().has_in_list_item_scope("li") {
                    self.generate_implied_end_tags(Some("li"));
                    while !self.current_node_name_is("li") {
                        if self.pop().is_none() {
                            break;
                        }
                    }
                    if self.current_node_name_is("li") {
                        self.pop();
                    }
                }
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "dd" | "dt") => {
                self.frameset_ok.set(false);
                let target = tag.name.as_str();
                if self.open_elems.borrow().has_in_scope(target) {
                    self.generate_implied_end_tags(Some(target));
                    while !self.current_node_name_is(target) {
                        if self.pop().is_none() {
                            break;
                        }
                    }
                    if self.current_node_name_is(target) {
                        self.pop();
                    }
                }
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "a" | "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike" | "strong" | "tt" | "u") => {
                self.reconstruct_active_formatting();
                let handle = self.insert_html_element(&tag);
                self.push_active_formatting(handle, tag);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "nobr") => {
                self.reconstruct_active_formatting();
                if self.open_elems.borrow().has_in_scope("nobr") {
                    self.adoption_agency("nobr");
                    self.reconstruct_active_formatting();
                }
                let handle = self.insert_html_element(&tag);
                self.push_active_formatting(handle, tag);
            },
            types::Token::Tag(tag)
                if tag.kind == EndTag
                    && matches!(
                        tag.name.as_str(),
                        "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small" | "strike" | "strong" | "tt" | "u"
                    ) =>
            {
                self.adoption_agency(tag.name.as_str());
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(tag.name.as_str(), "applet" | "marquee" | "object") =>
            {
                self.reconstruct_active_formatting();
                self.insert_html_element(&tag);
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.frameset_ok.set(false);
            },
            types::Token::Tag(tag)
                if tag.kind == EndTag
                    && matches!(tag.name.as_str(), "applet" | "marquee" | "object") =>
            {
                let target = tag.name.as_str();
                if self.open_elems.borrow().has_in_scope(target) {
                    self.generate_implied_end_tags(None);
                    while !self.current_node_name_is(target) {
                        if self.pop().is_none() {
                            break;
                        }
                    }
                    self.pop();
                    self.clear_active_formatting_to_marker();
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "table" => {
                if !matches!(self.quirks_mode.get(), QuirksMode::Quirks) && self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTable);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "br" => {
                self.reconstruct_active_formatting();
                let start = Tag {
                    kind: StartTag,
                    name: tag.name,
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_html_element(&start);
                self.pop();
                self.frameset_ok.set(false);
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(
                        tag.name.as_str(),
                        "area" | "br" | "embed" | "img" | "keygen" | "wbr" | "input"
                    ) =>
            {
                self.reconstruct_active_formatting();
                self.insert_html_element(&tag);
                self.pop();
                if !(tag.name.as_str() == "input"
                    && tag
                        .get_attribute(&LocalName::from("type"))
                        .map(|v| v.as_ref().eq_ignore_ascii_case("hidden"))
                        .unwrap_or(false))
                {
                    self.frameset_ok.set(false);
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "textarea") => {
                self.insert_html_element(&tag);
                self.ignore_lf.set(true);
                self.frameset_ok.set(false);
                self.switch_to_text_mode(RawKind::Rcdata);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "xmp" => {
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.reconstruct_active_formatting();
                self.frameset_ok.set(false);
                self.insert_html_element(&tag);
                self.switch_to_text_mode(RawKind::Rawtext);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "plaintext" => {
                if self.open_elems.borrow().has_in_button_scope("p") {
                    self.close_p_element();
                }
                self.insert_html_element(&tag);
                // PLAINTEXT never returns to a tokenizing state that looks
                // for markup again, so unlike the RCDATA/RAWTEXT excursions
                // above it isn't routed through `switch_to_text_mode` (that
                // helper also stashes `orig_mode` for the end tag that will
                // never come, and drives the tree builder's own mode to
                // `Text`, which this doesn't need — insertion stays In Body).
                self.pending_plaintext.set(true);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "iframe" | "noembed") => {
                self.frameset_ok.set(false);
                self.insert_html_element(&tag);
                self.switch_to_text_mode(RawKind::Rawtext);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "select") => {
                self.reconstruct_active_formatting();
                self.insert_html_element(&tag);
                self.frameset_ok.set(false);
                self.mode.set(match self.mode.get() {
                    InsertionMode::InTable | InsertionMode::InCaption | InsertionMode::InTableBody | InsertionMode::InRow | InsertionMode::InCell => {
                        InsertionMode::InSelectInTable
                    },
                    _ => InsertionMode::InSelect,
                });
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "optgroup" | "option") => {
                if self.current_node_name_is("option") {
                    self.pop();
                }
                self.reconstruct_active_formatting();
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == EndTag => {
                self.in_body_any_other_end_tag(&tag.name);
            },
            other => self.in_body_default(other),
        }
    }

    fn in_body_default(&self, token: types::Token) {
        match token {
            types::Token::Tag(tag) if tag.kind == StartTag => {
                self.reconstruct_active_formatting();
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == EndTag => {
                self.in_body_any_other_end_tag(&tag.name);
            },
            _ => {},
        }
    }

    /// <https://html.spec.whatwg.org/#an-end-tag-whose-tag-name-is-one-of-the-following...>
    /// "any other end tag" clause: pop up to and including the matching
    /// open element, or ignore the token if no such element is in scope.
    fn in_body_any_other_end_tag(&self, name: &LocalName) {
        let target = name.as_str();
        let open = self.open_elems.borrow();
        let found = open
            .iter()
            .find(|(_, n)| n.ns == ns!(html) && n.local.as_str() == target)
            .is_some();
        drop(open);
        if !found {
            return;
        }
        self.generate_implied_end_tags(Some(target));
        loop {
            let is_target = self.current_node_name_is(target);
            match self.pop() {
                Some(_) if is_target => break,
                Some(_) => continue,
                None => break,
            }
        }
    }

    fn stop_parsing(&self) {
        self.done.set(true);
    }

    // ---- Table family (condensed) ------------------------------------------

    fn step_in_table_family(&self, mode: InsertionMode, token: types::Token) {
        match &token {
            types::Token::Characters(_) if matches!(mode, InsertionMode::InTable | InsertionMode::InTableBody | InsertionMode::InRow) => {
                self.pending_table_text.borrow_mut().clear();
                self.orig_mode.set(Some(mode));
                self.mode.set(InsertionMode::InTableText);
                self.process(token);
                return;
            },
            _ => {},
        }
        match token {
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "caption" => {
                self.clear_stack_back_to_table_context();
                self.active_formatting.borrow_mut().push(FormatEntry::Marker);
                self.insert_html_element(&tag);
                self.mode.set(InsertionMode::InCaption);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "colgroup" => {
                self.clear_stack_back_to_table_context();
                self.insert_html_element(&tag);
                self.mode.set(InsertionMode::InColumnGroup);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "col" => {
                self.clear_stack_back_to_table_context();
                let colgroup = Tag {
                    kind: StartTag,
                    name: LocalName::from("colgroup"),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_html_element(&colgroup);
                self.mode.set(InsertionMode::InColumnGroup);
                self.process(types::Token::Tag(tag));
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag && matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                self.clear_stack_back_to_table_context();
                self.insert_html_element(&tag);
                self.mode.set(InsertionMode::InTableBody);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && matches!(tag.name.as_str(), "td" | "th" | "tr") => {
                self.clear_stack_back_to_table_body_context();
                let tbody = Tag {
                    kind: StartTag,
                    name: LocalName::from("tbody"),
                    self_closing: false,
                    attrs: Vec::new(),
                };
                self.insert_html_element(&tbody);
                self.mode.set(InsertionMode::InTableBody);
                self.process(types::Token::Tag(tag));
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "table" => {
                if self.open_elems.borrow().has_in_table_scope("table") {
                    self.pop_back_to_table();
                    self.reset_insertion_mode();
                    self.process(types::Token::Tag(tag));
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "table" => {
                if self.open_elems.borrow().has_in_table_scope("table") {
                    self.pop_back_to_table();
                    self.pop();
                    self.reset_insertion_mode();
                }
            },
            types::Token::Tag(tag)
                if tag.kind == EndTag
                    && matches!(tag.name.as_str(), "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr") =>
            {},
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "tr" && matches!(mode, InsertionMode::InRow) => {
                if self.open_elems.borrow().has_in_table_scope("tr") {
                    self.pop_back_to("tr");
                    self.pop();
                    self.mode.set(InsertionMode::InTableBody);
                }
            },
            types::Token::Tag(tag)
                if tag.kind == EndTag && matches!(tag.name.as_str(), "tbody" | "tfoot" | "thead") && matches!(mode, InsertionMode::InTableBody) =>
            {
                if self.open_elems.borrow().has_in_table_scope(tag.name.as_str()) {
                    self.pop_back_to_table_body();
                    self.pop();
                    self.mode.set(InsertionMode::InTable);
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "caption" && matches!(mode, InsertionMode::InCaption) => {
                self.close_caption();
            },
            types::Token::Tag(tag) if tag.kind == EndTag && matches!(tag.name.as_str(), "td" | "th") && matches!(mode, InsertionMode::InCell) => {
                let target = tag.name.as_str();
                if self.open_elems.borrow().has_in_table_scope(target) {
                    self.generate_implied_end_tags(None);
                    self.pop_back_to(target);
                    self.pop();
                    self.clear_active_formatting_to_marker();
                    self.mode.set(InsertionMode::InRow);
                }
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag
                    && matches!(tag.name.as_str(), "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr")
                    && matches!(mode, InsertionMode::InCaption) =>
            {
                self.close_caption();
                self.process(types::Token::Tag(tag));
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "colgroup" && matches!(mode, InsertionMode::InColumnGroup) => {
                if !self.current_node_name_is("html") {
                    self.pop();
                    self.mode.set(InsertionMode::InTable);
                }
            },
            other if matches!(mode, InsertionMode::InColumnGroup) => {
                self.pop();
                self.mode.set(InsertionMode::InTable);
                self.process(other);
            },
            other => self.step_in_body(other),
        }
    }

    fn clear_stack_back_to_table_context(&self) {
        loop {
            if self.current_node_name_is_one_of(&["table", "template", "html"]) {
                break;
            }
            if self.pop().is_none() {
                break;
            }
        }
    }

    fn clear_stack_back_to_table_body_context(&self) {
        loop {
            if self.current_node_name_is_one_of(&["tbody", "tfoot", "thead", "template", "html"]) {
                break;
            }
            if self.pop().is_none() {
                break;
            }
        }
    }

    fn pop_back_to(&self, name: &str) {
        while !self.current_node_name_is(name) {
            if self.pop().is_none() {
                break;
            }
        }
    }

    fn pop_back_to_table(&self) {
        self.pop_back_to("table");
    }

    fn pop_back_to_table_body(&self) {
        loop {
            if self.current_node_name_is_one_of(&["tbody", "tfoot", "thead"]) {
                break;
            }
            if self.pop().is_none() {
                break;
            }
        }
    }

    fn close_caption(&self) {
        if self.open_elems.borrow().has_in_table_scope("caption") {
            self.generate_implied_end_tags(None);
            self.pop_back_to("caption");
            self.pop();
            self.clear_active_formatting_to_marker();
            self.mode.set(InsertionMode::InTable);
        }
    }

    fn step_in_table_text(&self, token: types::Token) {
        match token {
            types::Token::NullCharacter => {},
            types::Token::Characters(s) => {
                let is_ws = Self::is_whitespace_text(&s);
                self.pending_table_text.borrow_mut().push((is_ws, s));
            },
            other => {
                let pending = std::mem::take(&mut *self.pending_table_text.borrow_mut());
                let all_ws = pending.iter().all(|(ws, _)| *ws);
                if all_ws {
                    for (_, s) in pending {
                        self.insert_chars(s);
                    }
                } else {
                    self.foster_parenting.set(true);
                    for (_, s) in pending {
                        self.insert_chars(s);
                    }
                    self.foster_parenting.set(false);
                }
                self.mode.set(self.orig_mode.take().unwrap_or(InsertionMode::InTable));
                self.process(other);
            },
        }
    }

    // ---- select ------------------------------------------------------------

    fn step_in_select(&self, token: types::Token) {
        match token {
            types::Token::NullCharacter => {},
            types::Token::Characters(s) => self.insert_chars(s),
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "option" => {
                if self.current_node_name_is("option") {
                    self.pop();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "optgroup" => {
                if self.current_node_name_is("option") {
                    self.pop();
                }
                if self.current_node_name_is("optgroup") {
                    self.pop();
                }
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "optgroup" => {
                if self.current_node_name_is("option") {
                    self.pop();
                }
                if self.current_node_name_is("optgroup") {
                    self.pop();
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "option" => {
                if self.current_node_name_is("option") {
                    self.pop();
                }
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "select" => {
                if self.open_elems.borrow().has_in_select_scope("select") {
                    self.pop_back_to("select");
                    self.pop();
                    self.reset_insertion_mode();
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "select" => {
                if self.open_elems.borrow().has_in_select_scope("select") {
                    self.pop_back_to("select");
                    self.pop();
                    self.reset_insertion_mode();
                }
            },
            types::Token::Tag(tag)
                if tag.kind == StartTag && matches!(tag.name.as_str(), "input" | "keygen" | "textarea") =>
            {
                if self.open_elems.borrow().has_in_select_scope("select") {
                    self.pop_back_to("select");
                    self.pop();
                    self.reset_insertion_mode();
                    self.process(types::Token::Tag(tag));
                }
            },
            types::Token::Eof => self.stop_parsing(),
            _ => {},
        }
    }

    // ---- after body / frameset ---------------------------------------------

    fn step_after_body(&self, token: types::Token) {
        match token {
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.step_in_body(types::Token::Characters(s)),
            types::Token::Comment(data) => {
                if let Some(html) = self.open_elems.borrow().get(0) {
                    let comment = self.sink.create_comment(data);
                    self.sink.append(&html.0, NodeOrText::AppendNode(comment));
                }
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => self.step_in_body(types::Token::Tag(tag)),
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "html" => {
                self.mode.set(InsertionMode::AfterAfterBody);
            },
            types::Token::Eof => self.stop_parsing(),
            other => {
                self.mode.set(InsertionMode::InBody);
                self.process(other);
            },
        }
    }

    fn step_in_frameset(&self, token: types::Token) {
        match token {
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.insert_chars(s),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "frameset" => {
                self.insert_html_element(&tag);
            },
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "frameset" => {
                if !self.current_node_name_is("html") {
                    self.pop();
                }
                self.mode.set(InsertionMode::AfterFrameset);
            },
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "frame" => {
                self.insert_html_element(&tag);
                self.pop();
            },
            types::Token::Eof => self.stop_parsing(),
            _ => {},
        }
    }

    fn step_after_frameset(&self, token: types::Token) {
        match token {
            types::Token::Comment(data) => self.insert_comment(data),
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.insert_chars(s),
            types::Token::Tag(tag) if tag.kind == EndTag && tag.name.as_str() == "html" => {
                self.mode.set(InsertionMode::AfterAfterFrameset);
            },
            types::Token::Eof => self.stop_parsing(),
            _ => {},
        }
    }

    fn step_after_after_body(&self, token: types::Token) {
        match token {
            types::Token::Comment(data) => {
                let doc = self.sink.get_document();
                let comment = self.sink.create_comment(data);
                self.sink.append(&doc, NodeOrText::AppendNode(comment));
            },
            types::Token::Characters(s) if Self::is_whitespace_text(&s) => self.step_in_body(types::Token::Characters(s)),
            types::Token::Tag(tag) if tag.kind == StartTag && tag.name.as_str() == "html" => self.step_in_body(types::Token::Tag(tag)),
            types::Token::Eof => self.stop_parsing(),
            other => {
                self.mode.set(InsertionMode::InBody);
                self.process(other);
            },
        }
    }

    /// <https://html.spec.whatwg.org/#reset-the-insertion-mode-appropriately>
    fn reset_insertion_mode(&self) {
        let open = self.open_elems.borrow();
        for (i, (_, stack_name)) in open.iter().enumerate() {
            let last = i == open.len() - 1;
            let name = if last {
                self.context_elem.as_ref().unwrap_or(stack_name)
            } else {
                stack_name
            };
            if name.ns != ns!(html) {
                continue;
            }
            let mode = match name.local.as_str() {
                "select" => InsertionMode::InSelect,
                "td" | "th" if !last => InsertionMode::InCell,
                "tr" => InsertionMode::InRow,
                "tbody" | "thead" | "tfoot" => InsertionMode::InTableBody,
                "caption" => InsertionMode::InCaption,
                "colgroup" => InsertionMode::InColumnGroup,
                "table" => InsertionMode::InTable,
                "template" => *self.template_modes.borrow().last().unwrap_or(&InsertionMode::InBody),
                "head" if !last => InsertionMode::InHead,
                "body" => InsertionMode::InBody,
                "frameset" => InsertionMode::InFrameset,
                "html" => InsertionMode::BeforeHead,
                _ if last => InsertionMode::InBody,
                _ => continue,
            };
            self.mode.set(mode);
            return;
        }
        self.mode.set(InsertionMode::InBody);
    }
}

impl<Handle: Clone, Sink: TreeSink<Handle = Handle>> TreeBuilder<Handle, Sink> {
    /// Consumed by the driver right after a token that called
    /// [`TreeBuilder::switch_to_text_mode`] to know which tokenizer raw-text
    /// state to switch into alongside the tree builder's own `Text` mode.
    pub fn take_pending_raw_state(&self) -> Option<RawKind> {
        self.pending_raw_state.take()
    }

    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    pub fn quirks_mode(&self) -> QuirksMode {
        self.quirks_mode.get()
    }
}

impl<Handle: Clone, Sink: TreeSink<Handle = Handle>> TokenSink for TreeBuilder<Handle, Sink> {
    type Handle = Handle;

    fn process_token(&self, token: TokToken, line_number: u64) -> TokenSinkResult<Handle> {
        self.process_raw(token, line_number)
    }

    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        self.sink.adjusted_current_node_present_but_not_in_html_namespace()
    }
}

/// Public-identifier prefixes that force quirks mode regardless of the
/// system identifier. <https://html.spec.whatwg.org/#an-html-document>
const QUIRKY_PUBLIC_PREFIXES: &[&str] = &[
    "+//silmaril//dtd html pro v0r11 19970101//",
    "-//as//dtd html 3.0 aswedit + extensions//",
    "-//advasoft ltd//dtd html 3.0 aswedit + extensions//",
    "-//ietf//dtd html 2.0 level 1//",
    "-//ietf//dtd html 2.0 level 2//",
    "-//ietf//dtd html 2.0 strict level 1//",
    "-//ietf//dtd html 2.0 strict level 2//",
    "-//ietf//dtd html 2.0 strict//",
    "-//ietf//dtd html 2.0//",
    "-//ietf//dtd html 2.1e//",
    "-//ietf//dtd html 3.0//",
    "-//ietf//dtd html 3.2 final//",
    "-//ietf//dtd html 3.2//",
    "-//ietf//dtd html 3//",
    "-//ietf//dtd html level 0//",
    "-//ietf//dtd html level 1//",
    "-//ietf//dtd html level 2//",
    "-//ietf//dtd html level 3//",
    "-//ietf//dtd html strict level 0//",
    "-//ietf//dtd html strict level 1//",
    "-//ietf//dtd html strict level 2//",
    "-//ietf//dtd html strict level 3//",
    "-//ietf//dtd html strict//",
    "-//ietf//dtd html//",
    "-//metrius//dtd metrius presentational//",
    "-//microsoft//dtd internet explorer 2.0 html strict//",
    "-//microsoft//dtd internet explorer 2.0 html//",
    "-//microsoft//dtd internet explorer 2.0 tables//",
    "-//microsoft//dtd internet explorer 3.0 html strict//",
    "-//microsoft//dtd internet explorer 3.0 html//",
    "-//microsoft//dtd internet explorer 3.0 tables//",
    "-//netscape comm. corp.//dtd html//",
    "-//netscape comm. corp.//dtd strict html//",
    "-//o'reilly and associates//dtd html 2.0//",
    "-//o'reilly and associates//dtd html extended 1.0//",
    "-//o'reilly and associates//dtd html extended relaxed 1.0//",
    "-//sq//dtd html 2.0 hotmetal + extensions//",
    "-//softquad software//dtd hotmetal pro 6.0::19990601::extensions to html 4.0//",
    "-//softquad//dtd hotmetal pro 4.0::19971010::extensions to html 4.0//",
    "-//spyglass//dtd html 2.0 extended//",
    "-//sun microsystems corp.//dtd hotjava html//",
    "-//sun microsystems corp.//dtd hotjava strict html//",
    "-//w3c//dtd html 3 1995-03-24//",
    "-//w3c//dtd html 3.2 draft//",
    "-//w3c//dtd html 3.2 final//",
    "-//w3c//dtd html 3.2//",
    "-//w3c//dtd html 3.2s draft//",
    "-//w3c//dtd html 4.0 frameset//",
    "-//w3c//dtd html 4.0 transitional//",
    "-//w3c//dtd html experimental 19960712//",
    "-//w3c//dtd html experimental 970421//",
    "-//w3c//dtd w3 html//",
    "-//w3o//dtd w3 html 3.0//",
    "-//webtechs//dtd mozilla html 2.0//",
    "-//webtechs//dtd mozilla html//",
];

const QUIRKY_PUBLIC_EXACT: &[&str] = &["-//w3o//dtd w3 html strict 3.0//en//", "html"];

const QUIRKY_SYSTEM_EXACT: &str = "http://www.ibm.com/data/dtd/v11/ibmxhtml1-transitional.dtd";

/// Public-identifier prefixes that force quirks mode only when there is no
/// system identifier.
const QUIRKY_PUBLIC_PREFIXES_NO_SYSTEM: &[&str] =
    &["-//w3c//dtd html 4.01 frameset//", "-//w3c//dtd html 4.01 transitional//"];

const LIMITED_QUIRKY_PUBLIC_PREFIXES: &[&str] =
    &["-//w3c//dtd xhtml 1.0 frameset//", "-//w3c//dtd xhtml 1.0 transitional//"];

const LIMITED_QUIRKY_PUBLIC_PREFIXES_WITH_SYSTEM: &[&str] =
    &["-//w3c//dtd html 4.01 frameset//", "-//w3c//dtd html 4.01 transitional//"];

fn starts_with_any(haystack: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| haystack.starts_with(p))
}

fn doctype_quirks_mode(dt: &Doctype) -> QuirksMode {
    let name = dt.name.as_deref().unwrap_or("");
    if dt.force_quirks || !name.eq_ignore_ascii_case("html") {
        return QuirksMode::Quirks;
    }

    let public_id = dt.public_id.as_deref().unwrap_or("").to_ascii_lowercase();
    let system_id = dt.system_id.as_deref().unwrap_or("").to_ascii_lowercase();
    let has_public = dt.public_id.is_some();
    let has_system = dt.system_id.is_some();

    if has_public && QUIRKY_PUBLIC_EXACT.contains(&public_id.as_str()) {
        return QuirksMode::Quirks;
    }
    if has_system && system_id == QUIRKY_SYSTEM_EXACT {
        return QuirksMode::Quirks;
    }
    if has_public && starts_with_any(&public_id, QUIRKY_PUBLIC_PREFIXES) {
        return QuirksMode::Quirks;
    }
    if !has_system && has_public && starts_with_any(&public_id, QUIRKY_PUBLIC_PREFIXES_NO_SYSTEM) {
        return QuirksMode::Quirks;
    }

    if has_public && starts_with_any(&public_id, LIMITED_QUIRKY_PUBLIC_PREFIXES) {
        return QuirksMode::LimitedQuirks;
    }
    if has_public && starts_with_any(&public_id, LIMITED_QUIRKY_PUBLIC_PREFIXES_WITH_SYSTEM) {
        return QuirksMode::LimitedQuirks;
    }

    QuirksMode::NoQuirks
}
