//! HTML5 serializer for the arena DOM.
//!
//! The output has to round-trip: an untouched template serializes back to
//! its source (modulo parser normalization), and predicates match against
//! the same serialization of each subtree.
//!
//! - Void elements never get end tags
//! - Text content escapes `&`, `<`, `>` and no-break spaces
//! - Attribute values are double-quoted and escape `&`, `<`, `>`, `"` and
//!   no-break spaces
//! - Raw text elements (script, style) are written verbatim
//! - RCDATA elements (title, textarea) escape only `&`, `<` and no-break spaces
//! - Empty foreign elements (SVG/MathML) use self-closing syntax

use std::fmt::Write;

use indextree::NodeId;

use crate::dom::{Document, ElementData, Namespace, NodeKind, TemplateKind};

/// Serialize a whole template.
///
/// Documents get their doctype, root and any top-level comments; fragments
/// only the children of the synthetic container they were parsed into.
pub fn serialize_document(doc: &Document) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(&mut out, doc);
    match doc.kind() {
        TemplateKind::Document => {
            // Comments before and after <html> hang off the document node.
            let siblings: Vec<NodeId> = match doc.arena[doc.root].parent() {
                Some(document) => doc.children(document).collect(),
                None => vec![doc.root],
            };
            for node in siblings {
                if node == doc.root {
                    if let Some(doctype) = &doc.doctype {
                        let _ = write!(ser.out, "<!DOCTYPE {}>", &**doctype);
                    }
                }
                ser.write_node(node);
            }
        }
        TemplateKind::Fragment => {
            for child in doc.children(doc.root) {
                ser.write_node(child);
            }
        }
    }
    out
}

/// Serialize one node and its subtree.
pub fn serialize_node(doc: &Document, node: NodeId) -> String {
    let mut out = String::new();
    Serializer::new(&mut out, doc).write_node(node);
    out
}

/// HTML5 void elements - these never have end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// RCDATA elements - only `&` and `<` are escaped.
const RCDATA_ELEMENTS: &[&str] = &["title", "textarea"];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

fn is_rcdata_element(tag: &str) -> bool {
    RCDATA_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

#[derive(Clone, Copy)]
enum TextMode {
    Escaped,
    Rcdata,
    Raw,
}

struct Serializer<'a, W: Write> {
    out: &'a mut W,
    doc: &'a Document,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(out: &'a mut W, doc: &'a Document) -> Self {
        Self { out, doc }
    }

    fn write_text(&mut self, text: &str, mode: TextMode) {
        for c in text.chars() {
            let _ = match (c, mode) {
                (_, TextMode::Raw) => self.out.write_char(c),
                ('&', _) => self.out.write_str("&amp;"),
                ('\u{a0}', _) => self.out.write_str("&nbsp;"),
                ('<', _) => self.out.write_str("&lt;"),
                ('>', TextMode::Escaped) => self.out.write_str("&gt;"),
                _ => self.out.write_char(c),
            };
        }
    }

    fn write_attr(&mut self, name: &str, value: &str) {
        let _ = write!(self.out, " {name}=\"");
        for c in value.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '\u{a0}' => self.out.write_str("&nbsp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                '"' => self.out.write_str("&quot;"),
                _ => self.out.write_char(c),
            };
        }
        let _ = self.out.write_char('"');
    }

    fn write_node(&mut self, node: NodeId) {
        let data = self.doc.get(node);
        match &data.kind {
            NodeKind::Document => {
                for child in self.doc.children(node) {
                    self.write_node(child);
                }
            }
            NodeKind::Element(elem) => self.write_element(node, elem, data.ns),
            NodeKind::Text(text) => self.write_text(text, TextMode::Escaped),
            NodeKind::Comment(text) => {
                let _ = write!(self.out, "<!--{}-->", &**text);
            }
        }
    }

    fn write_element(&mut self, node: NodeId, elem: &ElementData, ns: Namespace) {
        let tag = &*elem.tag;

        let _ = write!(self.out, "<{tag}");
        for (name, value) in &elem.attrs {
            self.write_attr(name, value);
        }

        if ns == Namespace::Html && is_void_element(tag) {
            let _ = self.out.write_char('>');
            return;
        }

        let mut children = self.doc.children(node).peekable();
        if ns != Namespace::Html && children.peek().is_none() {
            let _ = self.out.write_str("/>");
            return;
        }
        let _ = self.out.write_char('>');

        let mode = if ns != Namespace::Html {
            TextMode::Escaped
        } else if is_raw_text_element(tag) {
            TextMode::Raw
        } else if is_rcdata_element(tag) {
            TextMode::Rcdata
        } else {
            TextMode::Escaped
        };

        for child in children {
            match &self.doc.get(child).kind {
                NodeKind::Text(text) => self.write_text(text, mode),
                _ => self.write_node(child),
            }
        }

        let _ = write!(self.out, "</{tag}>");
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{Document, ParseOptions};

    fn roundtrip(source: &str) -> String {
        Document::parse(source).expect("parse").to_html()
    }

    #[test]
    fn test_fragment_roundtrip_preserves_whitespace() {
        let source = "<h2>List</h2>\n<ul>\n  <li>${url.url}</li>\n</ul>\n";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(
            roundtrip(r#"<p>a<br>b<img src="x.png"></p>"#),
            r#"<p>a<br>b<img src="x.png"></p>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(roundtrip("<p>a &amp; b &lt; c</p>"), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(
            roundtrip(r#"<a href="test?a=1&amp;b=2" title='Say "hi"'>x</a>"#),
            r#"<a href="test?a=1&amp;b=2" title="Say &quot;hi&quot;">x</a>"#
        );
    }

    #[test]
    fn test_nbsp_roundtrip() {
        let source = r#"<p title="a&nbsp;b">List&nbsp;of URLs</p>"#;
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_document_keeps_leading_comment() {
        let doc = Document::parse("<!-- Copyright -->\n<!DOCTYPE html><html><head></head><body><p>x</p></body></html>")
            .expect("parse");
        assert_eq!(
            doc.to_html(),
            "<!-- Copyright --><!DOCTYPE html><html><head></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_placeholders_survive() {
        let source = r#"<a href="${info.url.url}">${info.url.url}</a>"#;
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_raw_text_elements() {
        let source = "<script>if (a < b && c > d) {}</script>";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_rcdata_elements() {
        assert_eq!(
            roundtrip("<textarea>Test &amp; &lt;Demo></textarea>"),
            "<textarea>Test &amp; &lt;Demo></textarea>"
        );
    }

    #[test]
    fn test_comments_verbatim() {
        let source = "<div><!-- keep me --></div>";
        assert_eq!(roundtrip(source), source);
    }

    #[test]
    fn test_foreign_content_self_closing() {
        assert_eq!(
            roundtrip(r#"<svg><rect width="1"></rect></svg>"#),
            r#"<svg><rect width="1"/></svg>"#
        );
    }

    #[test]
    fn test_document_serialization() {
        let doc = Document::parse_with(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>",
            &ParseOptions::new(),
        )
        .expect("parse");
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_outer_html_of_subtree() {
        let doc = Document::parse(r#"<ul><li class="x">one</li></ul>"#).expect("parse");
        let li = doc.first_descendant(doc.root, "li").expect("li");
        assert_eq!(doc.outer_html(li), r#"<li class="x">one</li>"#);
    }
}
