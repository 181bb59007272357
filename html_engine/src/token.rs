//! The token model (spec.md §4.2): tagged variants the tokenizer emits and
//! the tree constructor consumes one at a time.

use std::borrow::Cow;

use markup_core::{Attribute, LocalName};
use tendril::StrTendril;

use crate::tokenizer::states::RawKind;

/// A `DOCTYPE` token. `name`/`public_id`/`system_id` are `None` when
/// "missing" — distinct from `Some(empty tendril)`.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}
pub use TagKind::{EndTag, StartTag};

/// A start or end tag token. Attributes and the self-closing flag are parse
/// errors on an end tag, but must still be representable (spec.md §4.2).
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: LocalName,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// Equivalence ignoring attribute order and the self-closing flag, used
    /// by integration tests that compare against html5lib-style fixtures.
    pub fn equiv_modulo_attr_order(&self, other: &Tag) -> bool {
        if self.kind != other.kind || self.name != other.name {
            return false;
        }
        let mut a = self.attrs.clone();
        let mut b = other.attrs.clone();
        a.sort();
        b.sort();
        a == b
    }

    pub(crate) fn get_attribute(&self, name: &LocalName) -> Option<StrTendril> {
        self.attrs
            .iter()
            .find(|a| a.name.ns.is_empty() && a.name.local == *name)
            .map(|a| a.value.clone())
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum Token {
    DoctypeToken(Doctype),
    TagToken(Tag),
    CommentToken(StrTendril),
    CharacterTokens(StrTendril),
    NullCharacterToken,
    EofToken,
    ParseError(Cow<'static, str>),
}
pub use Token::{CharacterTokens, CommentToken, DoctypeToken, EofToken, NullCharacterToken, ParseError, TagToken};

/// What the tree constructor tells the tokenizer to do next, returned from
/// [`TokenSink::process_token`].
#[derive(Debug, PartialEq)]
#[must_use]
pub enum TokenSinkResult<Handle> {
    Continue,
    /// A `<script>` element finished parsing; the driver should hand it to
    /// the sink for "execution" (a no-op host in this specification, per
    /// spec.md §4.4 "Stopping").
    Script(Handle),
    Plaintext,
    RawData(RawKind),
    /// `<meta charset=...>` (or an equivalent) was seen; the sink may want
    /// to restart decoding with the named encoding.
    EncodingIndicator(StrTendril),
}

/// Types which can receive tokens from the tokenizer.
pub trait TokenSink {
    type Handle;

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<Self::Handle>;

    fn end(&self) {}

    /// Consulted by the markup-declaration-open state to decide whether a
    /// `<![CDATA[` section tokenizes as CDATA (true, only valid in foreign
    /// content) or as a bogus comment (false, the HTML-namespace default).
    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        false
    }
}
