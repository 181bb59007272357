//! Byte decoding and the WHATWG encoding-sniffing confidence state machine.
//!
//! <https://encoding.spec.whatwg.org/#concept-encoding-confidence>

use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};
use tendril::{fmt::Bytes, Tendril};

use crate::buffer_queue::BufferQueue;

/// How sure the input stream is about the encoding currently in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confidence {
    Tentative,
    Certain,
    Irrelevant,
}

pub struct Decoder {
    inner: encoding_rs::Decoder,
    confidence: Confidence,
}

impl Decoder {
    pub fn new(encoding: &'static Encoding, confidence: Confidence) -> Self {
        Self {
            inner: encoding.new_decoder(),
            confidence,
        }
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.inner.encoding()
    }

    /// <https://html.spec.whatwg.org/#change-the-encoding>
    ///
    /// Returns `None` if the encoding should not be changed, `Some(encoding)`
    /// if the stream should restart decoding with `encoding` (which may
    /// differ from the argument after the WHATWG overrides below).
    pub fn change_the_encoding_to(
        &mut self,
        mut new_encoding: &'static Encoding,
    ) -> Option<&'static Encoding> {
        let current_encoding = self.inner.encoding();

        // Step 1: UTF-16 is sticky once chosen.
        if current_encoding == UTF_16BE || current_encoding == UTF_16LE {
            self.confidence = Confidence::Certain;
            return None;
        }

        // Step 2: never switch *to* UTF-16 via a meta tag.
        if new_encoding == UTF_16BE || new_encoding == UTF_16LE {
            new_encoding = UTF_8;
        }

        // Step 3: x-user-defined is really windows-1252.
        if new_encoding == X_USER_DEFINED {
            new_encoding = WINDOWS_1252;
        }

        // Step 4: no-op if it's the encoding we're already using.
        if current_encoding == new_encoding {
            self.confidence = Confidence::Certain;
            return None;
        }

        // Step 5 (byte-compatible on-the-fly switch) is not implemented; we
        // always ask the caller to restart decoding from scratch (step 6).
        Some(new_encoding)
    }

    /// Decode `chunk`, appending the result to `output`. `last` signals
    /// end-of-stream so any pending incomplete sequence is flushed.
    pub fn decode(&mut self, chunk: &[u8], last: bool, output: &BufferQueue) {
        let mut remaining = chunk;
        loop {
            let mut out: Tendril<Bytes> = Tendril::new();
            let max_len = self
                .inner
                .max_utf8_buffer_length_without_replacement(remaining.len())
                .unwrap_or(8192)
                .min(8192);

            // SAFETY: decode_to_utf8_without_replacement initializes a
            // prefix of the buffer; we only read that prefix below.
            unsafe {
                out.push_uninitialized(max_len as u32);
            }

            let (result, bytes_read, bytes_written) =
                self.inner.decode_to_utf8_without_replacement(remaining, &mut out, last);

            if bytes_written > 0 {
                let bytes_chunk = out.subtendril(0, bytes_written as u32);
                // SAFETY: decode_to_utf8_without_replacement writes valid UTF-8.
                let utf8_chunk = unsafe { bytes_chunk.reinterpret_without_validating() };
                output.push_back(utf8_chunk);
            }

            if matches!(result, DecoderResult::Malformed(_, _)) {
                output.push_back("\u{FFFD}".into());
            }

            remaining = &remaining[bytes_read..];
            if remaining.is_empty() {
                return;
            }
        }
    }
}
