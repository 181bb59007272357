//! Serialization traits. A concrete HTML writer lives in `html_engine`; this
//! crate only defines the seam between a tree implementation and any
//! serializer that walks it.

use std::io;

use crate::qualname::QualName;

/// How much of a node a [`Serialize`] impl should walk: itself and its
/// descendants, or just its descendants (used by fragment serialization,
/// e.g. serializing a `<template>`'s contents without the `<template>` tag).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TraversalScope {
    IncludeNode,
    ChildrenOnly,
}

pub type AttrRef<'a> = (&'a QualName, &'a str);

pub trait Serialize {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer;
}

/// A sink for serialization events, implemented once per output format
/// (HTML text, XML text, ...).
pub trait Serializer {
    fn start_elem<'a, AttrIter>(&mut self, name: QualName, attrs: AttrIter) -> io::Result<()>
    where
        AttrIter: Iterator<Item = AttrRef<'a>>;

    fn end_elem(&mut self, name: QualName) -> io::Result<()>;

    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn write_comment(&mut self, text: &str) -> io::Result<()>;

    fn write_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> io::Result<()>;

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()>;
}
