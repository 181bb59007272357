//! Shared types for the HTML parsing pipeline: namespace/name plumbing, the
//! input stream and buffer queue the tokenizer consumes, the
//! [`tree_sink::TreeSink`] interface the tree constructor drives, and the
//! serialization traits a concrete writer implements against.
//!
//! Grounded on the teacher's `markup5ever` crate, which plays the same
//! "common code shared by the tokenizer/tree-builder and whatever tree
//! you're building" role for `html5ever`.

#[macro_use]
pub mod atom;
#[macro_use]
pub mod small_char_set;
pub mod buffer_queue;
pub mod encoding;
pub mod input_stream;
pub mod named_entities;
pub mod qualname;
pub mod serialize;
pub mod tree_sink;

pub use atom::{LocalName, Namespace, Prefix};
pub use buffer_queue::BufferQueue;
pub use input_stream::InputStream;
pub use qualname::{Attribute, ExpandedName, QualName};
pub use serialize::{AttrRef, Serialize, Serializer, TraversalScope};
pub use small_char_set::SmallCharSet;
pub use tree_sink::{ElementFlags, NextParserState, NodeOrText, QuirksMode, Tracer, TreeSink};
