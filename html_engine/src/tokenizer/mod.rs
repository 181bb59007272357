//! The tokenizer (spec.md §4.3): a deterministic state machine over code
//! points that emits [`Token`]s. ~80 states, grouped below the same way the
//! spec groups them: data, tag-open, attribute, markup-declaration
//! (comment/doctype/CDATA), and character-reference.
//!
//! The transition function is `(state, input code point, tag-building
//! scratch state) -> (next state, zero or more emitted tokens)`. Emitted
//! tokens are always well-formed; violations are reported as out-of-band
//! parse errors that never abort tokenization (spec.md §4.3 "Failure
//! semantics").

pub mod states;
mod char_ref;

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use log::trace;
use markup_core::{Attribute, BufferQueue, LocalName, QualName};
use tendril::StrTendril;

use crate::token::{Doctype, EndTag, StartTag, Tag, TagKind, Token, TokenSink, TokenSinkResult};
use char_ref::{CharRef, CharRefTokenizer, Status as CharRefStatus};
use states::{AttrValueKind, DoctypeIdKind, RawKind, ScriptEscapeKind, State};

#[derive(Clone, Debug)]
pub struct TokenizerOpts {
    /// Emit exact, descriptive parse-error messages rather than a single
    /// generic one. Turning this off trades diagnostic quality for fewer
    /// allocations on the error path; off by default the way the teacher's
    /// tokenizer defaults `exact_errors: false`.
    pub exact_errors: bool,
    pub discard_bom: bool,
    /// Start in a state other than `Data` — used by fragment parsing to
    /// begin inside RAWTEXT/RCDATA/PLAINTEXT when the context element
    /// demands it (spec.md §6 `parseHTMLFragment`).
    pub initial_state: Option<State>,
    pub last_start_tag_name: Option<LocalName>,
}

impl Default for TokenizerOpts {
    fn default() -> Self {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

pub struct Tokenizer<Sink> {
    sink: Sink,
    opts: TokenizerOpts,
    state: Cell<State>,
    current_line: Cell<u64>,
    at_eof: Cell<bool>,

    current_tag_kind: Cell<TagKind>,
    current_tag_name: RefCell<StrTendril>,
    current_tag_self_closing: Cell<bool>,
    current_tag_attrs: RefCell<Vec<Attribute>>,
    current_attr_name: RefCell<StrTendril>,
    current_attr_value: RefCell<StrTendril>,
    current_attr_is_duplicate: Cell<bool>,

    current_comment: RefCell<StrTendril>,
    current_doctype: RefCell<Doctype>,

    last_start_tag_name: RefCell<Option<LocalName>>,
    temp_buf: RefCell<StrTendril>,
    return_state: Cell<Option<State>>,
    char_ref_tokenizer: RefCell<Option<Box<CharRefTokenizer>>>,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    pub fn new(sink: Sink, mut opts: TokenizerOpts) -> Tokenizer<Sink> {
        let state = opts.initial_state.take().unwrap_or(State::Data);
        let last_start_tag_name = opts.last_start_tag_name.take();
        Tokenizer {
            sink,
            opts,
            state: Cell::new(state),
            current_line: Cell::new(1),
            at_eof: Cell::new(false),
            current_tag_kind: Cell::new(StartTag),
            current_tag_name: RefCell::new(StrTendril::new()),
            current_tag_self_closing: Cell::new(false),
            current_tag_attrs: RefCell::new(Vec::new()),
            current_attr_name: RefCell::new(StrTendril::new()),
            current_attr_value: RefCell::new(StrTendril::new()),
            current_attr_is_duplicate: Cell::new(false),
            current_comment: RefCell::new(StrTendril::new()),
            current_doctype: RefCell::new(Doctype::default()),
            last_start_tag_name: RefCell::new(last_start_tag_name),
            temp_buf: RefCell::new(StrTendril::new()),
            return_state: Cell::new(None),
            char_ref_tokenizer: RefCell::new(None),
        }
    }

    pub fn sink(&self) -> &Sink {
        &self.sink
    }

    pub fn into_sink(self) -> Sink {
        self.sink
    }

    pub fn set_state(&self, state: State) {
        self.state.set(state);
    }

    pub fn set_last_start_tag_name(&self, name: Option<LocalName>) {
        *self.last_start_tag_name.borrow_mut() = name;
    }

    /// Feed input into the tokenizer, driving it until it either runs out of
    /// buffered input or the sink asks it to pause.
    pub fn feed(&self, input: &BufferQueue) {
        while !input.is_empty() {
            if !self.step(input) {
                break;
            }
        }
    }

    pub fn end(&self) {
        self.at_eof.set(true);
        let empty = BufferQueue::new();
        while self.step(&empty) {}
        self.sink.end();
    }

    fn emit_error(&self, msg: Cow<'static, str>) {
        let _ = self.sink.process_token(Token::ParseError(msg), self.current_line.get());
    }

    fn emit_token(&self, token: Token) -> TokenSinkResult<Sink::Handle> {
        self.sink.process_token(token, self.current_line.get())
    }

    fn apply_sink_result(&self, result: TokenSinkResult<Sink::Handle>) {
        match result {
            TokenSinkResult::Continue | TokenSinkResult::Script(_) => {},
            TokenSinkResult::Plaintext => self.state.set(State::Plaintext),
            TokenSinkResult::RawData(kind) => self.state.set(State::RawData(kind)),
            TokenSinkResult::EncodingIndicator(_) => {},
        }
    }

    fn get_char(&self, input: &BufferQueue) -> Option<char> {
        let c = input.next();
        if c == Some('\n') {
            self.current_line.set(self.current_line.get() + 1);
        }
        c
    }

    fn reconsume(&self, input: &BufferQueue, c: char) {
        input.reconsume(c);
    }

    // ---- tag building -------------------------------------------------

    fn create_tag(&self, kind: TagKind, initial: char) {
        self.current_tag_kind.set(kind);
        let mut name = self.current_tag_name.borrow_mut();
        name.clear();
        name.push_char(initial.to_ascii_lowercase());
        self.current_tag_self_closing.set(false);
        self.current_tag_attrs.borrow_mut().clear();
    }

    fn append_to_tag_name(&self, c: char) {
        self.current_tag_name.borrow_mut().push_char(c.to_ascii_lowercase());
    }

    fn start_new_attribute(&self, initial: char) {
        self.finish_attribute();
        self.current_attr_name.borrow_mut().push_char(initial.to_ascii_lowercase());
        self.current_attr_is_duplicate.set(false);
    }

    fn append_to_attr_name(&self, c: char) {
        self.current_attr_name.borrow_mut().push_char(c.to_ascii_lowercase());
    }

    fn append_to_attr_value(&self, c: char) {
        self.current_attr_value.borrow_mut().push_char(c);
    }

    fn append_str_to_attr_value(&self, s: &str) {
        self.current_attr_value.borrow_mut().push_slice(s);
    }

    /// Called when leaving `AttributeName` and whenever we otherwise commit
    /// the attribute under construction. Runs the duplicate-name check: a
    /// later attribute with a name already seen on this tag is dropped with
    /// a parse error (spec.md §4.2).
    fn finish_attribute(&self) {
        let mut name = self.current_attr_name.borrow_mut();
        if name.is_empty() {
            return;
        }
        let is_dup = self
            .current_tag_attrs
            .borrow()
            .iter()
            .any(|a| a.name.local.as_str() == &name[..] && a.name.ns.is_empty());
        if is_dup {
            self.emit_error(Cow::Borrowed("duplicate attribute"));
        } else {
            let value = std::mem::take(&mut *self.current_attr_value.borrow_mut());
            self.current_tag_attrs.borrow_mut().push(Attribute {
                name: QualName::html(LocalName::from(&name[..])),
                value,
            });
        }
        name.clear();
        self.current_attr_value.borrow_mut().clear();
    }

    fn emit_current_tag(&self) {
        self.finish_attribute();
        let kind = self.current_tag_kind.get();
        let name = LocalName::from(&self.current_tag_name.borrow()[..]);
        let self_closing = self.current_tag_self_closing.get();
        let attrs = std::mem::take(&mut *self.current_tag_attrs.borrow_mut());

        if kind == EndTag && (!attrs.is_empty() || self_closing) {
            self.emit_error(Cow::Borrowed("end tag with attributes or self-closing flag"));
        }

        if kind == StartTag {
            *self.last_start_tag_name.borrow_mut() = Some(name.clone());
        }

        let tag = Tag {
            kind,
            name,
            self_closing,
            attrs,
        };
        let result = self.emit_token(Token::TagToken(tag));
        self.apply_sink_result(result);
    }

    fn emit_current_comment(&self) {
        let data = std::mem::take(&mut *self.current_comment.borrow_mut());
        self.emit_token(Token::CommentToken(data));
    }

    fn emit_current_doctype(&self) {
        let doctype = std::mem::take(&mut *self.current_doctype.borrow_mut());
        self.emit_token(Token::DoctypeToken(doctype));
    }

    fn emit_chars(&self, s: StrTendril) {
        if !s.is_empty() {
            self.emit_token(Token::CharacterTokens(s));
        }
    }

    fn emit_char(&self, c: char) {
        let mut t = StrTendril::new();
        t.push_char(c);
        self.emit_chars(t);
    }

    /// Is the end tag currently under construction the "appropriate" one to
    /// close RAWTEXT/RCDATA/script-data — i.e. does it match the last start
    /// tag, by name only, regardless of the open-elements stack (spec.md
    /// §4.3 "Appropriate end tag")?
    fn current_end_tag_is_appropriate(&self) -> bool {
        match &*self.last_start_tag_name.borrow() {
            Some(last) => &self.current_tag_name.borrow()[..] == last.as_str(),
            None => false,
        }
    }

    // ---- the main step function ---------------------------------------

    /// Advance the tokenizer by (usually) one code point. Returns `false`
    /// when the current state needs more buffered input than is available
    /// to make progress, which tells [`Tokenizer::feed`] to stop and wait.
    fn step(&self, input: &BufferQueue) -> bool {
        if let Some(char_ref_tok) = self.char_ref_tokenizer.borrow_mut().take() {
            return self.step_char_ref(input, char_ref_tok);
        }

        trace!("tokenizer stepping in state {:?}", self.state.get());
        match self.state.get() {
            State::Data => self.step_data(input),
            State::Plaintext => self.step_raw_no_markup(input, None),
            State::RawData(RawKind::Rcdata) => self.step_rcdata(input),
            State::RawData(kind) => self.step_raw_no_markup(input, Some(kind)),
            State::RawLessThanSign(kind) => self.step_raw_less_than_sign(input, kind),
            State::RawEndTagOpen(kind) => self.step_raw_end_tag_open(input, kind),
            State::RawEndTagName(kind) => self.step_raw_end_tag_name(input, kind),
            State::ScriptDataEscapeStart(kind) => self.step_script_data_escape_start(input, kind),
            State::ScriptDataEscapeStartDash => self.step_script_data_escape_start_dash(input),
            State::ScriptDataEscapedDash(kind) => self.step_script_data_escaped_dash(input, kind),
            State::ScriptDataEscapedDashDash(kind) => self.step_script_data_escaped_dash_dash(input, kind),
            State::ScriptDataDoubleEscapeStart => self.step_script_data_double_escape_start(input),
            State::ScriptDataDoubleEscapeEnd => self.step_script_data_double_escape_end(input),

            State::TagOpen => self.step_tag_open(input),
            State::EndTagOpen => self.step_end_tag_open(input),
            State::TagName => self.step_tag_name(input),

            State::BeforeAttributeName => self.step_before_attribute_name(input),
            State::AttributeName => self.step_attribute_name(input),
            State::AfterAttributeName => self.step_after_attribute_name(input),
            State::BeforeAttributeValue => self.step_before_attribute_value(input),
            State::AttributeValue(kind) => self.step_attribute_value(input, kind),
            State::AfterAttributeValueQuoted => self.step_after_attribute_value_quoted(input),
            State::SelfClosingStartTag => self.step_self_closing_start_tag(input),

            State::BogusComment => self.step_bogus_comment(input),
            State::MarkupDeclarationOpen => self.step_markup_declaration_open(input),
            State::CommentStart => self.step_comment_start(input),
            State::CommentStartDash => self.step_comment_start_dash(input),
            State::Comment => self.step_comment(input),
            State::CommentLessThanSign => self.step_comment_less_than_sign(input),
            State::CommentLessThanSignBang => self.step_comment_less_than_sign_bang(input),
            State::CommentLessThanSignBangDash => self.step_comment_less_than_sign_bang_dash(input),
            State::CommentLessThanSignBangDashDash => self.step_comment_less_than_sign_bang_dash_dash(input),
            State::CommentEndDash => self.step_comment_end_dash(input),
            State::CommentEnd => self.step_comment_end(input),
            State::CommentEndBang => self.step_comment_end_bang(input),

            State::Doctype => self.step_doctype(input),
            State::BeforeDoctypeName => self.step_before_doctype_name(input),
            State::DoctypeName => self.step_doctype_name(input),
            State::AfterDoctypeName => self.step_after_doctype_name(input),
            State::AfterDoctypeKeyword(kind) => self.step_after_doctype_keyword(input, kind),
            State::BeforeDoctypeIdentifier(kind) => self.step_before_doctype_identifier(input, kind),
            State::DoctypeIdentifierDoubleQuoted(kind) => self.step_doctype_identifier_quoted(input, kind, '"'),
            State::DoctypeIdentifierSingleQuoted(kind) => self.step_doctype_identifier_quoted(input, kind, '\''),
            State::AfterDoctypeIdentifier(kind) => self.step_after_doctype_identifier(input, kind),
            State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.step_between_doctype_public_and_system_identifiers(input)
            },
            State::BogusDoctype => self.step_bogus_doctype(input),

            State::CdataSection => self.step_cdata_section(input),
            State::CdataSectionBracket => self.step_cdata_section_bracket(input),
            State::CdataSectionEnd => self.step_cdata_section_end(input),
        }
    }

    // ---- data / raw-text family -----------------------------------------

    fn step_data(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            None => {
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some('&') => {
                self.start_char_ref(State::Data, false);
                true
            },
            Some('<') => {
                self.state.set(State::TagOpen);
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.emit_char('\0');
                true
            },
            Some(c) => {
                self.emit_char(c);
                true
            },
        }
    }

    /// PLAINTEXT, and the non-RCDATA raw-text states (RAWTEXT, script data,
    /// and the escaped script-data variants) that don't recognize `&` and
    /// only watch for `<` as a possible way out.
    fn step_raw_no_markup(&self, input: &BufferQueue, kind: Option<RawKind>) -> bool {
        match self.get_char(input) {
            None => {
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some('<') if kind.is_some() => {
                self.state.set(State::RawLessThanSign(kind.unwrap()));
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.emit_char('\u{FFFD}');
                true
            },
            Some(c) => {
                self.emit_char(c);
                true
            },
        }
    }

    fn step_rcdata(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            None => {
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some('&') => {
                self.start_char_ref(State::RawData(RawKind::Rcdata), false);
                true
            },
            Some('<') => {
                self.state.set(State::RawLessThanSign(RawKind::Rcdata));
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.emit_char('\u{FFFD}');
                true
            },
            Some(c) => {
                self.emit_char(c);
                true
            },
        }
    }

    fn step_raw_less_than_sign(&self, input: &BufferQueue, kind: RawKind) -> bool {
        match self.get_char(input) {
            Some('/') => {
                self.temp_buf.borrow_mut().clear();
                self.state.set(State::RawEndTagOpen(kind));
                true
            },
            Some('!') if matches!(kind, RawKind::ScriptData) => {
                self.emit_chars("<!".into());
                self.state.set(State::ScriptDataEscapeStart(ScriptEscapeKind::Escaped));
                true
            },
            Some(c) if c.is_ascii_alphabetic() && matches!(kind, RawKind::ScriptDataEscaped(_)) => {
                self.temp_buf.borrow_mut().clear();
                self.reconsume(input, c);
                self.state.set(State::ScriptDataDoubleEscapeStart);
                true
            },
            c => {
                self.emit_char('<');
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::RawData(kind));
                true
            },
        }
    }

    fn step_raw_end_tag_open(&self, input: &BufferQueue, kind: RawKind) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(EndTag, c);
                self.temp_buf.borrow_mut().push_char(c);
                self.state.set(State::RawEndTagName(kind));
                true
            },
            c => {
                self.emit_chars("</".into());
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::RawData(kind));
                true
            },
        }
    }

    fn step_raw_end_tag_name(&self, input: &BufferQueue, kind: RawKind) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_alphabetic() => {
                self.append_to_tag_name(c);
                self.temp_buf.borrow_mut().push_char(c);
                true
            },
            Some(c) if is_tag_name_terminator(c) && self.current_end_tag_is_appropriate() => {
                self.finish_raw_end_tag_and_reconsume(c)
            },
            c => {
                let buf = std::mem::take(&mut *self.temp_buf.borrow_mut());
                self.emit_chars("</".into());
                self.emit_chars(buf);
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::RawData(kind));
                true
            },
        }
    }

    fn finish_raw_end_tag_and_reconsume(&self, c: char) -> bool {
        match c {
            '\t' | '\n' | '\x0C' | ' ' => {
                self.state.set(State::BeforeAttributeName);
            },
            '/' => {
                self.state.set(State::SelfClosingStartTag);
            },
            '>' => {
                self.state.set(State::Data);
                self.emit_current_tag();
                return true;
            },
            _ => unreachable!(),
        }
        true
    }

    fn step_script_data_escape_start(&self, input: &BufferQueue, kind: ScriptEscapeKind) -> bool {
        match self.get_char(input) {
            Some('-') if kind == ScriptEscapeKind::Escaped => {
                self.emit_char('-');
                self.state.set(State::ScriptDataEscapeStartDash);
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::RawData(RawKind::ScriptData));
                true
            },
        }
    }

    fn step_script_data_escape_start_dash(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.emit_char('-');
                self.state
                    .set(State::ScriptDataEscapedDashDash(ScriptEscapeKind::Escaped));
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::RawData(RawKind::ScriptData));
                true
            },
        }
    }

    fn step_script_data_escaped_dash(&self, input: &BufferQueue, kind: ScriptEscapeKind) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.emit_char('-');
                self.state.set(State::ScriptDataEscapedDashDash(kind));
                true
            },
            Some('<') => {
                self.state.set(State::RawLessThanSign(RawKind::ScriptDataEscaped(kind)));
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.emit_char('\u{FFFD}');
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
                true
            },
            Some(c) => {
                self.emit_char(c);
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
                true
            },
            None => {
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn step_script_data_escaped_dash_dash(&self, input: &BufferQueue, kind: ScriptEscapeKind) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.emit_char('-');
                true
            },
            Some('<') => {
                self.state.set(State::RawLessThanSign(RawKind::ScriptDataEscaped(kind)));
                true
            },
            Some('>') => {
                self.emit_char('>');
                self.state.set(State::RawData(RawKind::ScriptData));
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.emit_char('\u{FFFD}');
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
                true
            },
            Some(c) => {
                self.emit_char(c);
                self.state.set(State::RawData(RawKind::ScriptDataEscaped(kind)));
                true
            },
            None => {
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn step_script_data_double_escape_start(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if is_tag_name_terminator(c) => {
                let matches_script = self.temp_buf.borrow().as_bytes().eq_ignore_ascii_case(b"script");
                self.emit_char(c);
                let next = if matches_script {
                    RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)
                } else {
                    RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)
                };
                self.state.set(State::RawData(next));
                true
            },
            Some(c) if c.is_ascii_alphabetic() => {
                self.temp_buf.borrow_mut().push_char(c.to_ascii_lowercase());
                self.emit_char(c);
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state
                    .set(State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)));
                true
            },
        }
    }

    fn step_script_data_double_escape_end(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if is_tag_name_terminator(c) => {
                let matches_script = self.temp_buf.borrow().as_bytes().eq_ignore_ascii_case(b"script");
                self.emit_char(c);
                let next = if matches_script {
                    RawKind::ScriptDataEscaped(ScriptEscapeKind::Escaped)
                } else {
                    RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)
                };
                self.state.set(State::RawData(next));
                true
            },
            Some(c) if c.is_ascii_alphabetic() => {
                self.temp_buf.borrow_mut().push_char(c.to_ascii_lowercase());
                self.emit_char(c);
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state
                    .set(State::RawData(RawKind::ScriptDataEscaped(ScriptEscapeKind::DoubleEscaped)));
                true
            },
        }
    }

    // ---- tag-open family --------------------------------------------------

    fn step_tag_open(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('!') => {
                self.state.set(State::MarkupDeclarationOpen);
                true
            },
            Some('/') => {
                self.state.set(State::EndTagOpen);
                true
            },
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(StartTag, c);
                self.state.set(State::TagName);
                true
            },
            Some('?') => {
                self.emit_error(Cow::Borrowed("unexpected question mark instead of tag name"));
                self.current_comment.borrow_mut().clear();
                self.reconsume(input, '?');
                self.state.set(State::BogusComment);
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("invalid first character of tag name"));
                self.emit_char('<');
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::Data);
                true
            },
        }
    }

    fn step_end_tag_open(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_alphabetic() => {
                self.create_tag(EndTag, c);
                self.state.set(State::TagName);
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("missing end tag name"));
                self.state.set(State::Data);
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("invalid first character of tag name"));
                self.current_comment.borrow_mut().clear();
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::BogusComment);
                true
            },
        }
    }

    fn step_tag_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if is_tag_name_terminator(c) => self.finish_tag_name(c),
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.current_tag_name.borrow_mut().push_char('\u{FFFD}');
                true
            },
            Some(c) => {
                self.append_to_tag_name(c);
                true
            },
            None => false,
        }
    }

    fn finish_tag_name(&self, c: char) -> bool {
        match c {
            '\t' | '\n' | '\x0C' | ' ' => self.state.set(State::BeforeAttributeName),
            '/' => self.state.set(State::SelfClosingStartTag),
            '>' => {
                self.state.set(State::Data);
                self.emit_current_tag();
            },
            _ => unreachable!(),
        }
        true
    }

    // ---- attribute family ---------------------------------------------

    fn step_before_attribute_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some(c @ ('/' | '>')) => {
                self.reconsume(input, c);
                self.state.set(State::AfterAttributeName);
                true
            },
            None => {
                self.state.set(State::AfterAttributeName);
                true
            },
            Some('=') => {
                self.emit_error(Cow::Borrowed("unexpected equals sign before attribute name"));
                self.start_new_attribute('=');
                self.state.set(State::AttributeName);
                true
            },
            Some(c) => {
                self.start_new_attribute(c);
                self.state.set(State::AttributeName);
                true
            },
        }
    }

    fn step_attribute_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if is_tag_name_terminator(c) || c == '=' => {
                self.finish_attribute();
                self.reconsume(input, c);
                self.state.set(State::AfterAttributeName);
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.current_attr_name.borrow_mut().push_char('\u{FFFD}');
                true
            },
            Some(c @ ('"' | '\'' | '<')) => {
                self.emit_error(Cow::Borrowed("unexpected character in attribute name"));
                self.append_to_attr_name(c);
                true
            },
            Some(c) => {
                self.append_to_attr_name(c);
                true
            },
            None => false,
        }
    }

    fn step_after_attribute_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('/') => {
                self.state.set(State::SelfClosingStartTag);
                true
            },
            Some('=') => {
                self.state.set(State::BeforeAttributeValue);
                true
            },
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_tag();
                true
            },
            Some(c) => {
                self.start_new_attribute(c);
                self.state.set(State::AttributeName);
                true
            },
            None => false,
        }
    }

    fn step_before_attribute_value(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('"') => {
                self.state.set(State::AttributeValue(AttrValueKind::DoubleQuoted));
                true
            },
            Some('\'') => {
                self.state.set(State::AttributeValue(AttrValueKind::SingleQuoted));
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("missing attribute value"));
                self.state.set(State::Data);
                self.emit_current_tag();
                true
            },
            Some(c) => {
                self.reconsume(input, c);
                self.state.set(State::AttributeValue(AttrValueKind::Unquoted));
                true
            },
            None => false,
        }
    }

    fn step_attribute_value(&self, input: &BufferQueue, kind: AttrValueKind) -> bool {
        let quote = match kind {
            AttrValueKind::DoubleQuoted => Some('"'),
            AttrValueKind::SingleQuoted => Some('\''),
            AttrValueKind::Unquoted => None,
        };
        match self.get_char(input) {
            Some(c) if quote == Some(c) => {
                self.state.set(State::AfterAttributeValueQuoted);
                true
            },
            Some(c) if quote.is_none() && c.is_ascii_whitespace() => {
                self.finish_attribute();
                self.state.set(State::BeforeAttributeName);
                true
            },
            Some(c) if quote.is_none() && c == '>' => {
                self.state.set(State::Data);
                self.emit_current_tag();
                true
            },
            Some('&') => {
                self.start_char_ref(State::AttributeValue(kind), true);
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.append_to_attr_value('\u{FFFD}');
                true
            },
            Some(c @ ('"' | '\'' | '<' | '=' | '`')) if quote.is_none() => {
                self.emit_error(Cow::Borrowed("unexpected character in unquoted attribute value"));
                self.append_to_attr_value(c);
                true
            },
            Some(c) => {
                self.append_to_attr_value(c);
                true
            },
            None => false,
        }
    }

    fn step_after_attribute_value_quoted(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => {
                self.finish_attribute();
                self.state.set(State::BeforeAttributeName);
                true
            },
            Some('/') => {
                self.finish_attribute();
                self.state.set(State::SelfClosingStartTag);
                true
            },
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_tag();
                true
            },
            Some(c) => {
                self.emit_error(Cow::Borrowed("missing whitespace between attributes"));
                self.finish_attribute();
                self.reconsume(input, c);
                self.state.set(State::BeforeAttributeName);
                true
            },
            None => false,
        }
    }

    fn step_self_closing_start_tag(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('>') => {
                self.current_tag_self_closing.set(true);
                self.state.set(State::Data);
                self.emit_current_tag();
                true
            },
            Some(c) => {
                self.emit_error(Cow::Borrowed("unexpected solidus in tag"));
                self.reconsume(input, c);
                self.state.set(State::BeforeAttributeName);
                true
            },
            None => false,
        }
    }

    // ---- bogus comment / markup declaration ----------------------------

    fn step_bogus_comment(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_comment();
                true
            },
            Some('\0') => {
                self.current_comment.borrow_mut().push_char('\u{FFFD}');
                true
            },
            Some(c) => {
                self.current_comment.borrow_mut().push_char(c);
                true
            },
            None => {
                self.emit_current_comment();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn step_markup_declaration_open(&self, input: &BufferQueue) -> bool {
        if let Some(true) = input.eat("--", u8::eq_ignore_ascii_case) {
            self.current_comment.borrow_mut().clear();
            self.state.set(State::CommentStart);
            return true;
        }
        if let Some(true) = input.eat("doctype", u8::eq_ignore_ascii_case) {
            self.state.set(State::Doctype);
            return true;
        }
        if self.sink.adjusted_current_node_present_but_not_in_html_namespace() {
            if let Some(true) = input.eat("[CDATA[", |a, b| a == b) {
                self.state.set(State::CdataSection);
                return true;
            }
        }
        match input.peek() {
            None => false,
            Some(_) => {
                self.emit_error(Cow::Borrowed("incorrectly opened comment"));
                self.current_comment.borrow_mut().clear();
                self.state.set(State::BogusComment);
                true
            },
        }
    }

    // ---- comment family -------------------------------------------------

    fn step_comment_start(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.state.set(State::CommentStartDash);
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("abrupt closing of empty comment"));
                self.state.set(State::Data);
                self.emit_current_comment();
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment_start_dash(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.state.set(State::CommentEnd);
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("abrupt closing of empty comment"));
                self.state.set(State::Data);
                self.emit_current_comment();
                true
            },
            c => {
                self.current_comment.borrow_mut().push_char('-');
                if let Some(c) = c {
                    self.reconsume(input, c);
                } else {
                    self.emit_current_comment();
                    return false;
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('<') => {
                self.current_comment.borrow_mut().push_char('<');
                self.state.set(State::CommentLessThanSign);
                true
            },
            Some('-') => {
                self.state.set(State::CommentEndDash);
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.current_comment.borrow_mut().push_char('\u{FFFD}');
                true
            },
            Some(c) => {
                self.current_comment.borrow_mut().push_char(c);
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in comment"));
                self.emit_current_comment();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn step_comment_less_than_sign(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('!') => {
                self.current_comment.borrow_mut().push_char('!');
                self.state.set(State::CommentLessThanSignBang);
                true
            },
            Some('<') => {
                self.current_comment.borrow_mut().push_char('<');
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment_less_than_sign_bang(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.state.set(State::CommentLessThanSignBangDash);
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment_less_than_sign_bang_dash(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.state.set(State::CommentLessThanSignBangDashDash);
                true
            },
            c => {
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::CommentEndDash);
                true
            },
        }
    }

    fn step_comment_less_than_sign_bang_dash_dash(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c @ '>') => {
                self.reconsume(input, c);
                self.state.set(State::CommentEnd);
                true
            },
            None => {
                self.state.set(State::CommentEnd);
                true
            },
            Some(c) => {
                self.emit_error(Cow::Borrowed("nested comment"));
                self.reconsume(input, c);
                self.state.set(State::CommentEnd);
                true
            },
        }
    }

    fn step_comment_end_dash(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.state.set(State::CommentEnd);
                true
            },
            c => {
                self.current_comment.borrow_mut().push_char('-');
                if let Some(c) = c {
                    self.reconsume(input, c);
                } else {
                    self.emit_current_comment();
                    return false;
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment_end(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_comment();
                true
            },
            Some('!') => {
                self.state.set(State::CommentEndBang);
                true
            },
            Some('-') => {
                self.current_comment.borrow_mut().push_char('-');
                true
            },
            c => {
                self.current_comment.borrow_mut().push_slice("--");
                if let Some(c) = c {
                    self.reconsume(input, c);
                } else {
                    self.emit_current_comment();
                    return false;
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    fn step_comment_end_bang(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('-') => {
                self.current_comment.borrow_mut().push_slice("--!");
                self.state.set(State::CommentEndDash);
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("incorrectly closed comment"));
                self.state.set(State::Data);
                self.emit_current_comment();
                true
            },
            c => {
                self.current_comment.borrow_mut().push_slice("--!");
                if let Some(c) = c {
                    self.reconsume(input, c);
                } else {
                    self.emit_current_comment();
                    return false;
                }
                self.state.set(State::Comment);
                true
            },
        }
    }

    // ---- doctype family -------------------------------------------------

    fn step_doctype(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => {
                self.state.set(State::BeforeDoctypeName);
                true
            },
            Some('>') => {
                self.reconsume(input, '>');
                self.state.set(State::BeforeDoctypeName);
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in doctype"));
                self.new_doctype_force_quirks();
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some(c) => {
                self.emit_error(Cow::Borrowed("missing whitespace before doctype name"));
                self.reconsume(input, c);
                self.state.set(State::BeforeDoctypeName);
                true
            },
        }
    }

    fn new_doctype_force_quirks(&self) {
        let mut dt = self.current_doctype.borrow_mut();
        *dt = Doctype {
            force_quirks: true,
            ..Doctype::default()
        };
    }

    fn step_before_doctype_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                *self.current_doctype.borrow_mut() = Doctype {
                    name: Some("\u{FFFD}".into()),
                    ..Doctype::default()
                };
                self.state.set(State::DoctypeName);
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("missing doctype name"));
                self.new_doctype_force_quirks();
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in doctype"));
                self.new_doctype_force_quirks();
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some(c) => {
                let mut name = StrTendril::new();
                name.push_char(c.to_ascii_lowercase());
                *self.current_doctype.borrow_mut() = Doctype {
                    name: Some(name),
                    ..Doctype::default()
                };
                self.state.set(State::DoctypeName);
                true
            },
        }
    }

    fn step_doctype_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => {
                self.state.set(State::AfterDoctypeName);
                true
            },
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.push_doctype_name('\u{FFFD}');
                true
            },
            Some(c) => {
                self.push_doctype_name(c.to_ascii_lowercase());
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in doctype"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn push_doctype_name(&self, c: char) {
        if let Some(name) = self.current_doctype.borrow_mut().name.as_mut() {
            name.push_char(c);
        }
    }

    fn step_after_doctype_name(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in doctype"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
            Some(_) => {
                if input.eat("public", u8::eq_ignore_ascii_case) == Some(true) {
                    self.state.set(State::AfterDoctypeKeyword(DoctypeIdKind::Public));
                } else if input.eat("system", u8::eq_ignore_ascii_case) == Some(true) {
                    self.state.set(State::AfterDoctypeKeyword(DoctypeIdKind::System));
                } else {
                    self.emit_error(Cow::Borrowed("invalid character sequence after doctype name"));
                    self.current_doctype.borrow_mut().force_quirks = true;
                    self.state.set(State::BogusDoctype);
                }
                true
            },
        }
    }

    fn step_after_doctype_keyword(&self, input: &BufferQueue, kind: DoctypeIdKind) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => {
                self.state.set(State::BeforeDoctypeIdentifier(kind));
                true
            },
            Some('"') => {
                self.emit_error(Cow::Borrowed("missing whitespace after doctype keyword"));
                self.start_doctype_id(kind);
                self.state.set(State::DoctypeIdentifierDoubleQuoted(kind));
                true
            },
            Some('\'') => {
                self.emit_error(Cow::Borrowed("missing whitespace after doctype keyword"));
                self.start_doctype_id(kind);
                self.state.set(State::DoctypeIdentifierSingleQuoted(kind));
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("missing doctype public/system identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("missing quote before doctype identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                if let Some(c) = c {
                    self.reconsume(input, c);
                    self.state.set(State::BogusDoctype);
                    true
                } else {
                    self.emit_current_doctype();
                    false
                }
            },
        }
    }

    fn start_doctype_id(&self, kind: DoctypeIdKind) {
        let mut dt = self.current_doctype.borrow_mut();
        match kind {
            DoctypeIdKind::Public => dt.public_id = Some(StrTendril::new()),
            DoctypeIdKind::System => dt.system_id = Some(StrTendril::new()),
        }
    }

    fn step_before_doctype_identifier(&self, input: &BufferQueue, kind: DoctypeIdKind) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('"') => {
                self.start_doctype_id(kind);
                self.state.set(State::DoctypeIdentifierDoubleQuoted(kind));
                true
            },
            Some('\'') => {
                self.start_doctype_id(kind);
                self.state.set(State::DoctypeIdentifierSingleQuoted(kind));
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("missing doctype identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("missing quote before doctype identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                if let Some(c) = c {
                    self.reconsume(input, c);
                    self.state.set(State::BogusDoctype);
                    true
                } else {
                    self.emit_current_doctype();
                    false
                }
            },
        }
    }

    fn step_doctype_identifier_quoted(&self, input: &BufferQueue, kind: DoctypeIdKind, quote: char) -> bool {
        match self.get_char(input) {
            Some(c) if c == quote => {
                self.state.set(State::AfterDoctypeIdentifier(kind));
                true
            },
            Some('\0') => {
                self.emit_error(Cow::Borrowed("unexpected null character"));
                self.push_doctype_id(kind, '\u{FFFD}');
                true
            },
            Some('>') => {
                self.emit_error(Cow::Borrowed("abrupt doctype public/system identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            Some(c) => {
                self.push_doctype_id(kind, c);
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in doctype"));
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn push_doctype_id(&self, kind: DoctypeIdKind, c: char) {
        let mut dt = self.current_doctype.borrow_mut();
        let field = match kind {
            DoctypeIdKind::Public => &mut dt.public_id,
            DoctypeIdKind::System => &mut dt.system_id,
        };
        if let Some(s) = field.as_mut() {
            s.push_char(c);
        }
    }

    fn step_after_doctype_identifier(&self, input: &BufferQueue, kind: DoctypeIdKind) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            Some(c) if kind == DoctypeIdKind::Public => {
                match c {
                    '"' => {
                        self.emit_error(Cow::Borrowed("missing whitespace between doctype public and system identifiers"));
                        self.start_doctype_id(DoctypeIdKind::System);
                        self.state.set(State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System));
                    },
                    '\'' => {
                        self.emit_error(Cow::Borrowed("missing whitespace between doctype public and system identifiers"));
                        self.start_doctype_id(DoctypeIdKind::System);
                        self.state.set(State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System));
                    },
                    _ => {
                        self.emit_error(Cow::Borrowed("missing quote before doctype identifier"));
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.reconsume(input, c);
                        self.state.set(State::BogusDoctype);
                    },
                }
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("missing quote before doctype identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                if let Some(c) = c {
                    self.reconsume(input, c);
                    self.state.set(State::BogusDoctype);
                    true
                } else {
                    self.emit_current_doctype();
                    false
                }
            },
        }
    }

    fn step_between_doctype_public_and_system_identifiers(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(c) if c.is_ascii_whitespace() => true,
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            Some('"') => {
                self.start_doctype_id(DoctypeIdKind::System);
                self.state.set(State::DoctypeIdentifierDoubleQuoted(DoctypeIdKind::System));
                true
            },
            Some('\'') => {
                self.start_doctype_id(DoctypeIdKind::System);
                self.state.set(State::DoctypeIdentifierSingleQuoted(DoctypeIdKind::System));
                true
            },
            c => {
                self.emit_error(Cow::Borrowed("missing quote before doctype identifier"));
                self.current_doctype.borrow_mut().force_quirks = true;
                if let Some(c) = c {
                    self.reconsume(input, c);
                    self.state.set(State::BogusDoctype);
                    true
                } else {
                    self.emit_current_doctype();
                    false
                }
            },
        }
    }

    fn step_bogus_doctype(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some('>') => {
                self.state.set(State::Data);
                self.emit_current_doctype();
                true
            },
            Some(_) => true,
            None => {
                self.emit_current_doctype();
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    // ---- CDATA ------------------------------------------------------------

    fn step_cdata_section(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(']') => {
                self.state.set(State::CdataSectionBracket);
                true
            },
            Some(c) => {
                self.emit_char(c);
                true
            },
            None => {
                self.emit_error(Cow::Borrowed("eof in cdata"));
                if self.at_eof.get() {
                    self.emit_token(Token::EofToken);
                }
                false
            },
        }
    }

    fn step_cdata_section_bracket(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(']') => {
                self.state.set(State::CdataSectionEnd);
                true
            },
            c => {
                self.emit_char(']');
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::CdataSection);
                true
            },
        }
    }

    fn step_cdata_section_end(&self, input: &BufferQueue) -> bool {
        match self.get_char(input) {
            Some(']') => {
                self.emit_char(']');
                true
            },
            Some('>') => {
                self.state.set(State::Data);
                true
            },
            c => {
                self.emit_chars("]]".into());
                if let Some(c) = c {
                    self.reconsume(input, c);
                }
                self.state.set(State::CdataSection);
                true
            },
        }
    }

    // ---- character references ------------------------------------------

    fn start_char_ref(&self, return_state: State, is_attribute: bool) {
        self.return_state.set(Some(return_state));
        *self.char_ref_tokenizer.borrow_mut() = Some(Box::new(CharRefTokenizer::new(is_attribute)));
    }

    fn step_char_ref(&self, input: &BufferQueue, mut char_ref_tok: Box<CharRefTokenizer>) -> bool {
        match char_ref_tok.step(self, input) {
            CharRefStatus::Stuck => {
                *self.char_ref_tokenizer.borrow_mut() = Some(char_ref_tok);
                false
            },
            CharRefStatus::Progress => {
                *self.char_ref_tokenizer.borrow_mut() = Some(char_ref_tok);
                true
            },
            CharRefStatus::Done(char_ref) => {
                let unmatched = char_ref_tok.unmatched_buffer().to_string();
                self.finish_char_ref(char_ref, &unmatched);
                true
            },
        }
    }

    fn finish_char_ref(&self, char_ref: CharRef, unmatched: &str) {
        let return_state = self.return_state.take().unwrap_or(State::Data);
        let is_attr = matches!(return_state, State::AttributeValue(_));

        if char_ref.num_chars == 0 {
            // No match: emit '&' plus whatever alphanumerics were buffered
            // looking for a name, verbatim.
            if is_attr {
                self.append_to_attr_value('&');
                self.append_str_to_attr_value(unmatched);
            } else {
                let mut s = StrTendril::new();
                s.push_char('&');
                s.push_slice(unmatched);
                self.emit_chars(s);
            }
        } else if is_attr {
            for i in 0..char_ref.num_chars as usize {
                if char_ref.chars[i] != '\0' {
                    self.append_to_attr_value(char_ref.chars[i]);
                }
            }
        } else {
            for i in 0..char_ref.num_chars as usize {
                if char_ref.chars[i] != '\0' {
                    self.emit_char(char_ref.chars[i]);
                }
            }
        }

        self.state.set(return_state);
    }
}

fn is_tag_name_terminator(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\x0C' | ' ' | '/' | '>')
}
