//! The code-point input stream. <https://html.spec.whatwg.org/#input-stream>
//!
//! Pre-processes bytes (or already-decoded text) into a seekable code-point
//! sequence, applying the two normalizations the HTML spec requires before
//! tokenization ever sees a character:
//!
//! 1. Every `CR LF` pair or lone `CR` becomes a single `LF`.
//! 2. Surrogates and noncharacters are parse errors but are preserved in the
//!    stream rather than replaced — callers that want them reported should
//!    scan tendrils pushed through [`InputStream::append`] themselves; this
//!    type does not allocate a side channel for something so rare.

use std::cell::RefCell;

use encoding_rs::Encoding;
use tendril::StrTendril;

use crate::buffer_queue::BufferQueue;
use crate::encoding::{Confidence, Decoder};

fn normalize_newlines(input: &str) -> StrTendril {
    if !input.as_bytes().contains(&b'\r') {
        return StrTendril::from_slice(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    StrTendril::from_slice(&out)
}

/// A positionally addressable sequence of Unicode scalar values, fed by
/// bytes (decoded incrementally) or pre-decoded text.
pub struct InputStream {
    input: BufferQueue,
    decoder: RefCell<Decoder>,
}

impl InputStream {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            input: BufferQueue::new(),
            decoder: RefCell::new(Decoder::new(encoding, Confidence::Tentative)),
        }
    }

    /// Append already-decoded text, after CR/LF normalization.
    pub fn append(&self, data: &str) {
        self.input.push_back(normalize_newlines(data));
    }

    /// Append raw bytes, decoded with the stream's current encoding, then
    /// normalized.
    pub fn append_bytes(&self, data: &[u8]) {
        let staging = BufferQueue::new();
        self.decoder.borrow_mut().decode(data, false, &staging);
        while let Some(chunk) = staging.pop_front() {
            self.input.push_back(normalize_newlines(&chunk));
        }
    }

    /// Flush any bytes the decoder is still holding onto (a trailing
    /// incomplete multi-byte sequence).
    pub fn finish_decoding(&self) {
        let staging = BufferQueue::new();
        self.decoder.borrow_mut().decode(&[], true, &staging);
        while let Some(chunk) = staging.pop_front() {
            self.input.push_back(normalize_newlines(&chunk));
        }
    }

    /// The queue the tokenizer drives directly for its hot-path character
    /// consumption (`pop_except_from`, `eat`, single-character `next`).
    pub fn code_points(&self) -> &BufferQueue {
        &self.input
    }

    /// `peek(n)`: look at the next `n` code points without consuming them.
    /// Returns fewer than `n` if the stream doesn't have that much buffered.
    pub fn peek(&self, n: usize) -> Vec<char> {
        let mut taken = Vec::with_capacity(n);
        while taken.len() < n {
            match self.input.next() {
                Some(c) => taken.push(c),
                None => break,
            }
        }
        for c in taken.iter().rev() {
            self.input.reconsume(*c);
        }
        taken
    }

    /// `get()`: consume and return the next code point, if any.
    pub fn get(&self) -> Option<char> {
        self.input.next()
    }

    /// `get(n)`: consume and return the next `n` code points.
    pub fn get_n(&self, n: usize) -> Vec<char> {
        let mut taken = Vec::with_capacity(n);
        while taken.len() < n {
            match self.input.next() {
                Some(c) => taken.push(c),
                None => break,
            }
        }
        taken
    }

    /// `seekRelative(-1)`: reconsume the given code point, making it the
    /// next one returned by `get`. The stream only supports stepping back
    /// exactly one code point, matching the tokenizer's single-token
    /// push-back discipline (spec.md Design Notes, "Generator-style
    /// iteration").
    pub fn seek_relative(&self, c: char) {
        self.input.reconsume(c);
    }

    pub fn is_at_end(&self) -> bool {
        self.input.is_empty()
    }

    /// Attempt to switch to another encoding mid-stream.
    /// <https://html.spec.whatwg.org/#change-the-encoding>
    pub fn maybe_switch_encoding(&self, encoding: &'static Encoding) -> Option<&'static Encoding> {
        if self.decoder.borrow().confidence() == Confidence::Tentative {
            return self.decoder.borrow_mut().change_the_encoding_to(encoding);
        }
        None
    }

    pub fn current_encoding(&self) -> &'static Encoding {
        self.decoder.borrow().encoding()
    }

    pub fn clear(&self) {
        self.input.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_crlf_and_lone_cr() {
        let stream = InputStream::new(encoding_rs::UTF_8);
        stream.append("a\r\nb\rc\n");
        let mut out = String::new();
        while let Some(c) = stream.get() {
            out.push(c);
        }
        assert_eq!(out, "a\nb\nc\n");
    }

    #[test]
    fn peek_does_not_consume() {
        let stream = InputStream::new(encoding_rs::UTF_8);
        stream.append("abc");
        assert_eq!(stream.peek(2), vec!['a', 'b']);
        assert_eq!(stream.get(), Some('a'));
        assert_eq!(stream.get(), Some('b'));
        assert_eq!(stream.get(), Some('c'));
        assert!(stream.is_at_end());
    }

    #[test]
    fn seek_relative_reconsumes_one() {
        let stream = InputStream::new(encoding_rs::UTF_8);
        stream.append("xy");
        let c = stream.get().unwrap();
        stream.seek_relative(c);
        assert_eq!(stream.get(), Some('x'));
        assert_eq!(stream.get(), Some('y'));
    }
}
