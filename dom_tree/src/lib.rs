//! A reference-counted DOM tree (spec.md §3-§7): the node representation,
//! mutation algorithms, live collections, iterators, and the `TreeSink`
//! implementation `html_engine` parses into.
//!
//! Grounded on the teacher's `markup5ever_rcdom` crate for the node shape
//! and `TreeSink` impl; `mutation`, `document`, `collections`, and
//! `iterator` have no teacher counterpart (a static parse-result DOM never
//! needed a public mutation API) and are built directly from the DOM spec's
//! method contracts instead.

pub mod collections;
pub mod document;
pub mod error;
pub mod iterator;
pub mod mutation;
pub mod node;
pub mod registry;
pub mod sink;

pub use collections::HtmlCollection;
pub use document::{Document, ElementExt, NodeExt};
pub use error::{DomError, DomResult};
pub use iterator::{NodeFilterFn, NodeIterator, TreeWalker};
pub use node::{Handle, Node, NodeData, WeakHandle};
pub use sink::DomSink;

use html_engine::driver;
use markup_core::QualName;

/// Parse a complete HTML document (spec.md §6 `parseHTML`), returning the
/// finished [`DomSink`].
pub fn parse_document(input: &str) -> DomSink {
    driver::parse_document(DomSink::default(), input, driver::ParseOpts::default())
}

/// Parse an HTML fragment in the context of `context_element` (spec.md §6
/// `parseHTMLFragment`), returning the sink and the resulting
/// `DocumentFragment` handle.
pub fn parse_fragment(context: QualName, input: &str) -> (DomSink, Handle) {
    driver::parse_fragment(DomSink::default(), context, input, driver::ParseOpts::default())
}
