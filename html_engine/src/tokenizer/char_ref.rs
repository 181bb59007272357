//! Character reference tokenization, run as a nested sub-state-machine of
//! the main tokenizer (spec.md §4.3 "Character reference").
//!
//! Numeric references resolve directly; named references resolve against
//! [`markup_core::named_entities`] using longest-match-wins. A reference
//! without a trailing `;` that is immediately followed by `=` or an
//! alphanumeric, while being consumed as part of an attribute value, is left
//! unresolved (spec.md §8 boundary behavior) — this is the one place the
//! *return state* changes how a successfully parsed reference is applied.

use std::borrow::Cow;

use markup_core::named_entities;
use markup_core::BufferQueue;
use tendril::StrTendril;

use super::Tokenizer;
use crate::token::TokenSink;

pub(super) struct CharRef {
    pub(super) chars: [char; 2],
    pub(super) num_chars: u8,
}

impl CharRef {
    const EMPTY: CharRef = CharRef {
        chars: ['\0', '\0'],
        num_chars: 0,
    };

    fn one(c: char) -> CharRef {
        CharRef {
            chars: [c, '\0'],
            num_chars: 1,
        }
    }

    fn two(a: char, b: char) -> CharRef {
        CharRef {
            chars: [a, b],
            num_chars: 2,
        }
    }
}

pub(super) enum Status {
    Stuck,
    Progress,
    Done(CharRef),
}

#[derive(Debug)]
enum State {
    Begin,
    Octothorpe,
    Numeric(u32),
    NumericSemicolon,
    Named,
    BogusName,
}

pub(super) struct CharRefTokenizer {
    state: State,
    is_consumed_in_attribute: bool,
    num: u32,
    num_too_big: bool,
    seen_digit: bool,
    hex_marker: Option<char>,
    name_buf: StrTendril,
}

impl CharRefTokenizer {
    pub(super) fn new(is_consumed_in_attribute: bool) -> CharRefTokenizer {
        CharRefTokenizer {
            is_consumed_in_attribute,
            state: State::Begin,
            num: 0,
            num_too_big: false,
            seen_digit: false,
            hex_marker: None,
            name_buf: StrTendril::new(),
        }
    }

    pub(super) fn step<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Status {
        log::trace!("char ref tokenizer stepping in state {:?}", self.state);
        match self.state {
            State::Begin => self.do_begin(input),
            State::Octothorpe => self.do_octothorpe(input),
            State::Numeric(base) => self.do_numeric(tokenizer, input, base),
            State::NumericSemicolon => self.do_numeric_semicolon(tokenizer, input),
            State::Named => self.do_named(tokenizer, input),
            State::BogusName => self.do_bogus_name(input),
        }
    }

    fn do_begin(&mut self, input: &BufferQueue) -> Status {
        match input.peek() {
            None => Status::Stuck,
            Some('#') => {
                input.next();
                self.state = State::Octothorpe;
                Status::Progress
            },
            Some(c) if c.is_ascii_alphanumeric() => {
                self.state = State::Named;
                Status::Progress
            },
            _ => Status::Done(CharRef::EMPTY),
        }
    }

    fn do_octothorpe(&mut self, input: &BufferQueue) -> Status {
        match input.peek() {
            None => Status::Stuck,
            Some(c) if c == 'x' || c == 'X' => {
                input.next();
                self.hex_marker = Some(c);
                self.state = State::Numeric(16);
                Status::Progress
            },
            _ => {
                self.hex_marker = None;
                self.state = State::Numeric(10);
                Status::Progress
            },
        }
    }

    fn do_numeric<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
        base: u32,
    ) -> Status {
        match input.peek() {
            None => Status::Stuck,
            Some(c) if c.is_digit(base) => {
                input.next();
                self.num = self.num.wrapping_mul(base).wrapping_add(c.to_digit(base).unwrap());
                if self.num > 0x10FFFF {
                    self.num_too_big = true;
                }
                self.seen_digit = true;
                Status::Progress
            },
            Some(';') if self.seen_digit => {
                input.next();
                self.finish_numeric(tokenizer)
            },
            _ if self.seen_digit => {
                tokenizer.emit_error(Cow::Borrowed(
                    "numeric character reference without trailing semicolon",
                ));
                self.finish_numeric(tokenizer)
            },
            _ => {
                tokenizer.emit_error(Cow::Borrowed("numeric character reference has no digits"));
                // Reconsume '#'/'x' and everything — caller treats this as no match.
                Status::Done(CharRef::EMPTY)
            },
        }
    }

    fn do_numeric_semicolon<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>, _: &BufferQueue) -> Status {
        self.finish_numeric(tokenizer)
    }

    fn finish_numeric<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> Status {
        // https://html.spec.whatwg.org/#numeric-character-reference-end-state
        let mut n = self.num;
        if self.num_too_big || n > 0x10FFFF {
            tokenizer.emit_error(Cow::Borrowed("character reference outside of Unicode range"));
            return Status::Done(CharRef::one('\u{FFFD}'));
        }
        if n == 0 {
            tokenizer.emit_error(Cow::Borrowed("null character reference"));
            return Status::Done(CharRef::one('\u{FFFD}'));
        }
        if (0xD800..=0xDFFF).contains(&n) {
            tokenizer.emit_error(Cow::Borrowed("surrogate character reference"));
            return Status::Done(CharRef::one('\u{FFFD}'));
        }
        if let Some(replacement) = c1_control_replacement(n) {
            tokenizer.emit_error(Cow::Borrowed("control character reference"));
            return Status::Done(CharRef::one(replacement));
        }
        if is_disallowed_char_ref(n) {
            tokenizer.emit_error(Cow::Borrowed("control character reference"));
        }
        if n > 0x10FFFF {
            n = 0xFFFD;
        }
        match char::from_u32(n) {
            Some(c) => Status::Done(CharRef::one(c)),
            None => Status::Done(CharRef::one('\u{FFFD}')),
        }
    }

    fn do_named<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>, input: &BufferQueue) -> Status {
        // Greedily buffer alphanumerics (plus the eventual ';'), then resolve
        // the longest matching prefix once we hit a non-matching character
        // or run out of input possibilities.
        loop {
            match input.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == ';' => {
                    let terminal = c == ';';
                    self.name_buf.push_char(c);
                    input.next();
                    if terminal {
                        break;
                    }
                    // Stop buffering once we can no longer possibly extend a
                    // match (cheap bound: named refs in this table top out
                    // well under 32 bytes).
                    if self.name_buf.len32() >= 32 {
                        break;
                    }
                },
                _ => break,
            }
        }

        match named_entities::resolve_longest_match(&self.name_buf) {
            Some((len, (a, b))) => {
                let matched_with_semicolon = self.name_buf.as_bytes().get(len - 1) == Some(&b';');
                // Put back anything buffered past the match.
                let leftover_len = self.name_buf.len32() - len as u32;
                if leftover_len > 0 {
                    let leftover = self.name_buf.subtendril(len as u32, leftover_len);
                    for c in leftover.chars().rev() {
                        input.reconsume(c);
                    }
                }

                if !matched_with_semicolon && self.is_consumed_in_attribute {
                    // Boundary rule (spec.md §8): unterminated reference
                    // immediately followed by '=' or an alphanumeric, while
                    // inside an attribute value, is left unresolved.
                    if let Some(next) = input.peek() {
                        if next == '=' || next.is_ascii_alphanumeric() {
                            for c in self.name_buf[..len].chars().rev() {
                                input.reconsume(c);
                            }
                            return Status::Done(CharRef::EMPTY);
                        }
                    }
                }

                if !matched_with_semicolon {
                    tokenizer.emit_error(Cow::Borrowed(
                        "named character reference without trailing semicolon",
                    ));
                }

                if b == '\0' {
                    Status::Done(CharRef::one(a))
                } else {
                    Status::Done(CharRef::two(a, b))
                }
            },
            None => {
                self.state = State::BogusName;
                Status::Progress
            },
        }
    }

    fn do_bogus_name(&mut self, _input: &BufferQueue) -> Status {
        // No named reference matched at all; the characters already
        // consumed into name_buf are emitted verbatim by the caller as part
        // of "no match" handling via end_of_file/CharRef::EMPTY semantics.
        Status::Done(CharRef::EMPTY)
    }

    /// Characters buffered so far that did not end up part of a resolved
    /// reference — the caller re-emits `&` followed by these verbatim.
    pub(super) fn unmatched_buffer(&self) -> &str {
        &self.name_buf
    }

    pub(super) fn end_of_file<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> CharRef {
        match self.state {
            State::Numeric(_) | State::NumericSemicolon if self.seen_digit => {
                match self.finish_numeric(tokenizer) {
                    Status::Done(cr) => cr,
                    _ => CharRef::EMPTY,
                }
            },
            _ => CharRef::EMPTY,
        }
    }
}

/// <https://html.spec.whatwg.org/#numeric-character-reference-end-state>
/// table mapping windows-1252 holes to their intended code points.
fn c1_control_replacement(n: u32) -> Option<char> {
    let replacement = match n {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => return None,
    };
    Some(replacement)
}

fn is_disallowed_char_ref(n: u32) -> bool {
    matches!(n, 0x1..=0x8 | 0xB | 0xD..=0x1F | 0x7F..=0x9F | 0xFDD0..=0xFDEF)
        || matches!(
            n & 0xFFFF,
            0xFFFE | 0xFFFF
        )
}
