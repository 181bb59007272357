//! Tree-construction bookkeeping types that aren't part of the public
//! [`TreeSink`](markup_core::TreeSink) surface: insertion modes, the active
//! formatting element list, and the handful of internal pseudo-tokens the
//! tree constructor derives from the real token stream (spec.md §4.4).

use crate::token::{Doctype, Tag};

/// <https://html.spec.whatwg.org/#the-insertion-mode>
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// A decoded, tree-constructor-facing view of a tokenizer [`Token`],
/// collapsing `CharacterTokens`/`NullCharacterToken` boundaries the
/// tokenizer needs but the tree builder doesn't (spec.md §4.4 "internal
/// token model").
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Comment(tendril::StrTendril),
    Characters(tendril::StrTendril),
    NullCharacter,
    Eof,
}

/// An entry in the list of active formatting elements (spec.md §4.4
/// "adoption agency").
#[derive(Clone)]
pub enum FormatEntry<Handle> {
    Element(Handle, Tag),
    Marker,
}
