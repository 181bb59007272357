//! The HTML serializer (spec.md §4.8): walks a tree via [`Serialize`] and
//! writes it out through the [`Serializer`] seam `markup_core` defines.
//!
//! Grounded on the teacher's `html5ever::serialize::Serializer`: same
//! per-element stack tracking whether children are suppressed (void
//! elements) and whether attribute/text escaping applies (raw-text
//! elements), adapted to the newer `Serializer` trait shape and to this
//! workspace's `QualName`/`Attribute` types.

use std::io;

use markup_core::{ns, AttrRef, QualName, Serializer, TraversalScope};

/// Mirrors spec.md §4.8: controls whether `<noscript>` content is escaped
/// like ordinary text (scripting disabled, so its content is markup the
/// fallback author wrote) or treated as raw CDATA (scripting enabled, where
/// `<noscript>` hides markup a scripting host would never render).
#[derive(Copy, Clone, Debug)]
pub struct SerializeOpts {
    pub scripting_enabled: bool,
}

impl Default for SerializeOpts {
    fn default() -> Self {
        SerializeOpts {
            scripting_enabled: true,
        }
    }
}

/// Elements that never have an end tag or serialized children.
/// <https://html.spec.whatwg.org/#void-elements>
fn is_void(local: &str) -> bool {
    matches!(
        local,
        "area" | "base" | "basefont" | "bgsound" | "br" | "col" | "embed" | "frame" | "hr" | "img" | "input"
            | "keygen" | "link" | "menuitem" | "meta" | "param" | "source" | "track" | "wbr"
    )
}

struct ElemInfo {
    html_name: Option<String>,
    ignore_children: bool,
    processed_first_child: bool,
}

pub struct HtmlSerializer<Wr> {
    writer: Wr,
    opts: SerializeOpts,
    stack: Vec<ElemInfo>,
}

impl<Wr: io::Write> HtmlSerializer<Wr> {
    pub fn new(writer: Wr, opts: SerializeOpts) -> Self {
        HtmlSerializer {
            writer,
            opts,
            stack: vec![ElemInfo {
                html_name: None,
                ignore_children: false,
                processed_first_child: false,
            }],
        }
    }

    pub fn into_inner(self) -> Wr {
        self.writer
    }

    fn parent(&mut self) -> &mut ElemInfo {
        self.stack.last_mut().expect("no parent ElemInfo")
    }

    fn write_escaped(&mut self, text: &str, attr_mode: bool) -> io::Result<()> {
        for c in text.chars() {
            match c {
                '&' => self.writer.write_all(b"&amp;")?,
                '\u{00A0}' => self.writer.write_all(b"&nbsp;")?,
                '"' if attr_mode => self.writer.write_all(b"&quot;")?,
                '<' if !attr_mode => self.writer.write_all(b"&lt;")?,
                '>' if !attr_mode => self.writer.write_all(b"&gt;")?,
                c => write!(self.writer, "{c}")?,
            }
        }
        Ok(())
    }
}

impl<Wr: io::Write> Serializer for HtmlSerializer<Wr> {
    fn start_elem<'a, AttrIter>(&mut self, name: QualName, attrs: AttrIter) -> io::Result<()>
    where
        AttrIter: Iterator<Item = AttrRef<'a>>,
    {
        let html_name = (name.ns == ns!(html)).then(|| name.local.as_str().to_owned());

        if self.parent().ignore_children {
            self.stack.push(ElemInfo {
                html_name,
                ignore_children: true,
                processed_first_child: false,
            });
            return Ok(());
        }

        write!(self.writer, "<{}", name.local.as_str())?;
        for (attr_name, value) in attrs {
            write!(self.writer, " {}", attr_name.local.as_str())?;
            write!(self.writer, "=\"")?;
            self.write_escaped(value, true)?;
            write!(self.writer, "\"")?;
        }
        write!(self.writer, ">")?;

        let ignore_children = name.ns == ns!(html) && is_void(name.local.as_str());

        self.parent().processed_first_child = true;

        self.stack.push(ElemInfo {
            html_name,
            ignore_children,
            processed_first_child: false,
        });

        Ok(())
    }

    fn end_elem(&mut self, _name: QualName) -> io::Result<()> {
        let info = self.stack.pop().expect("no ElemInfo");
        if info.ignore_children {
            return Ok(());
        }
        write!(self.writer, "</{}>", info.html_name.as_deref().unwrap_or_default())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let prepend_lf = text.starts_with('\n') && {
            let parent = self.parent();
            !parent.processed_first_child
                && matches!(parent.html_name.as_deref(), Some("pre") | Some("textarea") | Some("listing"))
        };
        if prepend_lf {
            self.writer.write_all(b"\n")?;
        }
        self.parent().processed_first_child = true;

        let escape = match self.parent().html_name.as_deref() {
            Some("style") | Some("script") | Some("xmp") | Some("iframe") | Some("noembed") | Some("noframes")
            | Some("plaintext") => false,
            Some("noscript") => !self.opts.scripting_enabled,
            _ => true,
        };

        if escape {
            self.write_escaped(text, false)
        } else {
            self.writer.write_all(text.as_bytes())
        }
    }

    fn write_comment(&mut self, text: &str) -> io::Result<()> {
        write!(self.writer, "<!--{text}-->")
    }

    fn write_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> io::Result<()> {
        write!(self.writer, "<!DOCTYPE {name}")?;
        if !public_id.is_empty() {
            write!(self.writer, " PUBLIC \"{public_id}\"")?;
        } else if !system_id.is_empty() {
            write!(self.writer, " SYSTEM")?;
        }
        if !system_id.is_empty() {
            write!(self.writer, " \"{system_id}\"")?;
        }
        write!(self.writer, ">")
    }

    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()> {
        write!(self.writer, "<?{target} {data}?>")
    }
}

/// `serializeHTML(node, options) → string` (spec.md §6). `node` drives a
/// fresh [`HtmlSerializer`] over the `markup_core::Serialize` seam; the
/// `requireWellFormed` option from the spec only matters for the XML
/// serializer, so it isn't threaded through here.
pub fn serialize_html<T>(node: &T, scope: TraversalScope, opts: SerializeOpts) -> io::Result<String>
where
    T: markup_core::Serialize,
{
    let mut ser = HtmlSerializer::new(Vec::new(), opts);
    node.serialize(&mut ser, scope)?;
    Ok(String::from_utf8(ser.into_inner()).expect("serializer only ever writes valid UTF-8"))
}
