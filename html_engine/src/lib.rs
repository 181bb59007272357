//! Tokenizer, tree constructor, serializer, and driver entry points
//! implementing the WHATWG HTML parsing algorithm, generic over any
//! [`markup_core::TreeSink`].
//!
//! Grounded on the teacher's `html5ever` crate: `tokenizer`/`tree_builder`
//! play the same role here, `driver` wires them together the same way
//! `html5ever::driver` does, and `serialize` is this crate's counterpart to
//! `html5ever::serialize`.

pub mod driver;
pub mod serialize;
pub mod token;
pub mod tokenizer;
pub mod tree_builder;

pub use driver::{parse_document, parse_document_bytes, parse_fragment, tokenize_to, ParseOpts};
pub use serialize::{serialize_html, HtmlSerializer, SerializeOpts};
pub use token::{Token, TokenSink, TokenSinkResult};
pub use tokenizer::{Tokenizer, TokenizerOpts};
pub use tree_builder::{TreeBuilder, TreeBuilderOpts};

/// Re-export so downstream crates can depend on `html_engine` alone rather
/// than also adding `markup_core` to their own `Cargo.toml`.
pub use markup_core;

/// Re-export of the tendril crate, matching the teacher's
/// `pub mod tendril { ... }` convenience re-export.
pub mod tendril {
    pub use ::tendril::*;
}
