//! The stack of open elements (spec.md §4.4 "Stack of open elements") and
//! its scope-matching algorithms.

use markup_core::TreeSink;

/// Element names that bound the default "scope" algorithm — roughly the
/// set of elements whose content an implicit close must not reach past.
const DEFAULT_SCOPE: &[&str] = &[
    "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
];

const LIST_ITEM_SCOPE_EXTRA: &[&str] = &["ol", "ul"];
const BUTTON_SCOPE_EXTRA: &[&str] = &["button"];
const TABLE_SCOPE: &[&str] = &["html", "table", "template"];
const SELECT_SCOPE_EXCEPT: &[&str] = &["optgroup", "option"];

/// <https://html.spec.whatwg.org/#special>, used by the adoption agency
/// algorithm's furthest-block search.
const SPECIAL_TAGS: &[&str] = &[
    "address", "applet", "area", "article", "aside", "base", "basefont", "bgsound", "blockquote", "body", "br", "button", "caption",
    "center", "col", "colgroup", "dd", "details", "dir", "div", "dl", "dt", "embed", "fieldset", "figcaption", "figure", "footer",
    "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr", "html", "iframe", "img", "input",
    "keygen", "li", "link", "listing", "main", "marquee", "menu", "meta", "nav", "noembed", "noframes", "noscript", "object", "ol", "p",
    "param", "plaintext", "pre", "script", "section", "select", "source", "style", "summary", "table", "tbody", "td", "template",
    "textarea", "tfoot", "th", "thead", "title", "tr", "track", "ul", "wbr", "xmp",
];

pub fn is_special(name: &markup_core::QualName) -> bool {
    name.ns == markup_core::ns!(html) && SPECIAL_TAGS.contains(&name.local.as_str())
}

pub struct ElemStack<Handle, Sink> {
    items: Vec<(Handle, markup_core::QualName)>,
    _sink: std::marker::PhantomData<Sink>,
}

impl<Handle: Clone, Sink: TreeSink<Handle = Handle>> ElemStack<Handle, Sink> {
    pub fn new() -> Self {
        ElemStack {
            items: Vec::new(),
            _sink: std::marker::PhantomData,
        }
    }

    pub fn push(&mut self, handle: Handle, name: markup_core::QualName) {
        self.items.push((handle, name));
    }

    pub fn pop(&mut self) -> Option<Handle> {
        self.items.pop().map(|(h, _)| h)
    }

    pub fn top(&self) -> Option<&Handle> {
        self.items.last().map(|(h, _)| h)
    }

    pub fn top_name(&self) -> Option<&markup_core::QualName> {
        self.items.last().map(|(_, n)| n)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Handle, markup_core::QualName)> {
        self.items.iter().rev()
    }

    pub fn contains_html_elem(&self, name: &str) -> bool {
        self.items
            .iter()
            .any(|(_, n)| n.ns == markup_core::ns!(html) && n.local.as_str() == name)
    }

    pub fn remove_first(&mut self, handle: &Handle, same_node: impl Fn(&Handle, &Handle) -> bool) {
        if let Some(pos) = self.items.iter().position(|(h, _)| same_node(h, handle)) {
            self.items.remove(pos);
        }
    }

    pub fn position(&self, handle: &Handle, same_node: impl Fn(&Handle, &Handle) -> bool) -> Option<usize> {
        self.items.iter().position(|(h, _)| same_node(h, handle))
    }

    pub fn insert_at(&mut self, index: usize, handle: Handle, name: markup_core::QualName) {
        self.items.insert(index, (handle, name));
    }

    pub fn get(&self, index: usize) -> Option<&(Handle, markup_core::QualName)> {
        self.items.get(index)
    }

    pub fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    pub fn remove(&mut self, index: usize) -> Handle {
        self.items.remove(index).0
    }

    pub fn replace_at(&mut self, index: usize, handle: Handle, name: markup_core::QualName) {
        self.items[index] = (handle, name);
    }

    /// <https://html.spec.whatwg.org/#has-an-element-in-the-specific-scope>,
    /// applied to a known stack slot rather than a tag name — the adoption
    /// agency algorithm already has the exact formatting-element handle in
    /// hand and needs to know whether that one is in (default) scope, not
    /// just whether some element sharing its tag name is.
    pub fn has_index_in_scope(&self, index: usize) -> bool {
        for (i, (_, name)) in self.items.iter().enumerate().rev() {
            if i == index {
                return true;
            }
            if name.ns != markup_core::ns!(html) {
                continue;
            }
            if DEFAULT_SCOPE.contains(&name.local.as_str()) {
                return false;
            }
        }
        false
    }

    /// <https://html.spec.whatwg.org/#has-an-element-in-the-specific-scope>
    fn has_in_scope_kind(&self, target: &str, boundary: &[&str]) -> bool {
        for (_, name) in self.items.iter().rev() {
            if name.ns != markup_core::ns!(html) {
                continue;
            }
            let local = name.local.as_str();
            if local == target {
                return true;
            }
            if DEFAULT_SCOPE.contains(&local) || boundary.contains(&local) {
                return false;
            }
        }
        false
    }

    pub fn has_in_scope(&self, target: &str) -> bool {
        self.has_in_scope_kind(target, &[])
    }

    pub fn has_in_list_item_scope(&self, target: &str) -> bool {
        self.has_in_scope_kind(target, LIST_ITEM_SCOPE_EXTRA)
    }

    pub fn has_in_button_scope(&self, target: &str) -> bool {
        self.has_in_scope_kind(target, BUTTON_SCOPE_EXTRA)
    }

    pub fn has_in_table_scope(&self, target: &str) -> bool {
        for (_, name) in self.items.iter().rev() {
            if name.ns != markup_core::ns!(html) {
                continue;
            }
            let local = name.local.as_str();
            if local == target {
                return true;
            }
            if TABLE_SCOPE.contains(&local) {
                return false;
            }
        }
        false
    }

    pub fn has_in_select_scope(&self, target: &str) -> bool {
        for (_, name) in self.items.iter().rev() {
            if name.ns != markup_core::ns!(html) {
                continue;
            }
            let local = name.local.as_str();
            if local == target {
                return true;
            }
            if !SELECT_SCOPE_EXCEPT.contains(&local) {
                return false;
            }
        }
        false
    }
}

impl<Handle: Clone, Sink: TreeSink<Handle = Handle>> Default for ElemStack<Handle, Sink> {
    fn default() -> Self {
        Self::new()
    }
}
