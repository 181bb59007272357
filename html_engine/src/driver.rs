//! Entry points that wire an [`InputStream`], a [`Tokenizer`], and a
//! [`TreeBuilder`] together the way a caller actually wants to use them
//! (spec.md §6 "External interfaces"): feed bytes or text in, get a
//! document or fragment out.

use markup_core::{ns, ElementFlags, InputStream, LocalName, QualName, TreeSink};

use crate::token::TokenSink;
use crate::tokenizer::states::{RawKind, State};
use crate::tokenizer::{Tokenizer, TokenizerOpts};
use crate::tree_builder::{TreeBuilder, TreeBuilderOpts};

#[derive(Clone, Default)]
pub struct ParseOpts {
    pub tokenizer: TokenizerOpts,
    pub tree_builder: TreeBuilderOpts,
}

/// Feed `input` (already-decoded text) through a tokenizer in front of
/// `sink`, driving it to completion. Useful for tests that want to observe
/// raw tokens without a tree constructor in the loop.
pub fn tokenize_to<Sink: TokenSink>(sink: Sink, input: &str, opts: TokenizerOpts) -> Sink {
    let tok = Tokenizer::new(sink, opts);
    let stream = InputStream::new(encoding_rs::UTF_8);
    stream.append(input);
    tok.feed(stream.code_points());
    tok.end();
    tok.into_sink()
}

/// `parseHTMLDocument` (spec.md §6): create a document and run the full
/// algorithm to end of stream against text that's already been decoded to
/// Unicode.
pub fn parse_document<Sink: TreeSink>(sink: Sink, input: &str, opts: ParseOpts) -> Sink::Output {
    let tb = TreeBuilder::new(sink, opts.tree_builder);
    let tok = Tokenizer::new(tb, opts.tokenizer);
    let stream = InputStream::new(encoding_rs::UTF_8);
    stream.append(input);
    tok.feed(stream.code_points());
    tok.end();
    tok.into_sink().into_sink().finish()
}

/// `parseHTMLDocument` over raw bytes, decoding with `encoding` (tentative —
/// a `<meta charset>` seen mid-stream will not trigger a re-parse from
/// scratch here; see `TokenSinkResult::EncodingIndicator`).
pub fn parse_document_bytes<Sink: TreeSink>(
    sink: Sink,
    input: &[u8],
    encoding: &'static encoding_rs::Encoding,
    opts: ParseOpts,
) -> Sink::Output {
    let tb = TreeBuilder::new(sink, opts.tree_builder);
    let tok = Tokenizer::new(tb, opts.tokenizer);
    let stream = InputStream::new(encoding);
    stream.append_bytes(input);
    stream.finish_decoding();
    tok.feed(stream.code_points());
    tok.end();
    tok.into_sink().into_sink().finish()
}

/// The tokenizer state (and, for raw-text contexts, the "last start tag
/// name") fragment parsing must seed itself with so the context element's
/// content model is respected from the very first character.
/// <https://html.spec.whatwg.org/#parsing-html-fragments>
fn fragment_initial_state(context: &QualName) -> (Option<State>, Option<LocalName>) {
    if context.ns != ns!(html) {
        return (None, None);
    }
    let local = context.local.clone();
    let state = match local.as_str() {
        "title" | "textarea" => Some(State::RawData(RawKind::Rcdata)),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => Some(State::RawData(RawKind::Rawtext)),
        "script" => Some(State::RawData(RawKind::ScriptData)),
        "plaintext" => Some(State::Plaintext),
        _ => None,
    };
    (state, state.map(|_| local))
}

/// `parseHTMLFragment` (spec.md §6): parse `input` as if it were the
/// contents of `context`, returning the sink's finished output alongside a
/// standalone fragment handle holding the parsed nodes.
pub fn parse_fragment<Sink: TreeSink>(
    sink: Sink,
    context: QualName,
    input: &str,
    opts: ParseOpts,
) -> (Sink::Output, Sink::Handle) {
    let root = sink.create_element(QualName::html(LocalName::from("html")), Vec::new(), ElementFlags::default());
    let tb = TreeBuilder::new_for_fragment(sink, opts.tree_builder, root.clone(), context.clone());

    let (initial_state, last_start_tag_name) = fragment_initial_state(&context);
    let mut tokenizer_opts = opts.tokenizer;
    tokenizer_opts.initial_state = initial_state;
    tokenizer_opts.last_start_tag_name = last_start_tag_name;

    let tok = Tokenizer::new(tb, tokenizer_opts);
    let stream = InputStream::new(encoding_rs::UTF_8);
    stream.append(input);
    tok.feed(stream.code_points());
    tok.end();

    let sink = tok.into_sink().into_sink();
    let fragment = sink.create_document_fragment();
    sink.reparent_children(&root, &fragment);
    (sink.finish(), fragment)
}
