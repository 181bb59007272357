//! Qualified names and attributes. <https://dom.spec.whatwg.org/#concept-element-attribute>

use std::fmt;

use tendril::StrTendril;

use crate::atom::{LocalName, Namespace, Prefix};

/// `https://www.w3.org/TR/REC-xml-names/#dt-expname`
///
/// The (namespace, local name) pair two attributes on the same element may
/// never share — see spec.md §3 Element invariants.
#[derive(Copy, Clone, Eq, Hash)]
pub struct ExpandedName<'a> {
    pub ns: &'a Namespace,
    pub local: &'a LocalName,
}

impl<'a, 'b> PartialEq<ExpandedName<'a>> for ExpandedName<'b> {
    fn eq(&self, other: &ExpandedName<'a>) -> bool {
        self.ns == other.ns && self.local == other.local
    }
}

impl fmt::Debug for ExpandedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.ns, self.local)
        }
    }
}

/// Fully qualified name: optional prefix, namespace, and local name.
///
/// Two elements with the same local name but different namespaces (an HTML
/// `<title>` versus an SVG `<title>`) are distinct tag identities; `QualName`
/// is how the tree constructor and element registry keep them apart.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone)]
pub struct QualName {
    pub prefix: Option<Prefix>,
    pub ns: Namespace,
    pub local: LocalName,
}

impl QualName {
    #[inline]
    pub fn new(prefix: Option<Prefix>, ns: Namespace, local: LocalName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// Construct a name in the HTML namespace with no prefix — the common case
    /// for every element the tree constructor creates outside foreign content.
    #[inline]
    pub fn html(local: LocalName) -> QualName {
        QualName::new(None, ns!(html), local)
    }

    #[inline]
    pub fn expanded(&self) -> ExpandedName<'_> {
        ExpandedName {
            ns: &self.ns,
            local: &self.local,
        }
    }
}

/// A tag attribute.
///
/// The namespace on the attribute name is almost always `ns!()` (the null
/// namespace) — the tokenizer creates all attributes this way. The tree
/// constructor adjusts certain attribute names to `xlink`/`xml`/`xmlns`
/// inside foreign content (§4.4 Foreign content).
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct Attribute {
    pub name: QualName,
    pub value: StrTendril,
}
