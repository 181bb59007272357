//! Interned-ish string newtypes for namespace URIs, local names, and prefixes.
//!
//! The teacher crate generates a perfect-hash atom table at build time
//! (`string_cache`/`html5ever-atoms`). We keep the same cheap-clone,
//! cheap-compare shape without a codegen step: a `tendril::StrTendril` is
//! already reference-counted, so cloning one of these is a pointer bump, and
//! equality is byte comparison. `local_name!`/`ns!` below read the same at
//! call sites as the teacher's macros.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use tendril::StrTendril;

macro_rules! atom_newtype {
    ($name:ident) => {
        #[derive(Clone, Eq, Ord, PartialOrd, Hash, Default)]
        pub struct $name(StrTendril);

        impl $name {
            #[inline]
            pub fn from_static(s: &'static str) -> Self {
                $name(StrTendril::from_slice(s))
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(StrTendril::from_slice(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(StrTendril::from_slice(&s))
            }
        }

        impl From<StrTendril> for $name {
            fn from(s: StrTendril) -> Self {
                $name(s)
            }
        }

        impl Deref for $name {
            type Target = str;
            #[inline]
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                self.0.as_ref() == other.0.as_ref()
            }
        }

        impl PartialEq<str> for $name {
            #[inline]
            fn eq(&self, other: &str) -> bool {
                self.0.as_ref() == other
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self.as_str(), f)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(self.as_str(), f)
            }
        }
    };
}

atom_newtype!(Namespace);
atom_newtype!(Prefix);
atom_newtype!(LocalName);

pub const HTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NS: &str = "http://www.w3.org/2000/xmlns/";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

/// Expands to a [`Namespace`] literal. `ns!()` is the null (empty) namespace;
/// `ns!(html)`, `ns!(svg)`, etc. name the well-known namespaces the HTML
/// parsing algorithm cares about.
#[macro_export]
macro_rules! ns {
    () => {
        $crate::atom::Namespace::from_static("")
    };
    (html) => {
        $crate::atom::Namespace::from_static($crate::atom::HTML_NS)
    };
    (xml) => {
        $crate::atom::Namespace::from_static($crate::atom::XML_NS)
    };
    (xmlns) => {
        $crate::atom::Namespace::from_static($crate::atom::XMLNS_NS)
    };
    (xlink) => {
        $crate::atom::Namespace::from_static($crate::atom::XLINK_NS)
    };
    (svg) => {
        $crate::atom::Namespace::from_static($crate::atom::SVG_NS)
    };
    (mathml) => {
        $crate::atom::Namespace::from_static($crate::atom::MATHML_NS)
    };
}

/// Expands to a [`LocalName`] literal, e.g. `local_name!("div")`.
#[macro_export]
macro_rules! local_name {
    ($s:tt) => {
        $crate::atom::LocalName::from_static($s)
    };
}

/// Expands to a [`Prefix`] literal.
#[macro_export]
macro_rules! namespace_prefix {
    ($s:tt) => {
        $crate::atom::Prefix::from_static($s)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ns_macro_values() {
        assert_eq!(ns!(), Namespace::from(""));
        assert_eq!(ns!(html), Namespace::from(HTML_NS));
        assert_eq!(ns!(svg), Namespace::from(SVG_NS));
        assert_eq!(ns!(mathml), Namespace::from(MATHML_NS));
    }

    #[test]
    fn local_name_cheap_clone_eq() {
        let a = local_name!("div");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "div");
    }
}
