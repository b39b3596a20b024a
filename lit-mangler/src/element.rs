//! Mutable view of one element, handed to mutators.
//!
//! Lookups that a mutator depends on come in two flavours: `query`-style
//! accessors returning `Option`, and `require`/`expect_*` checks returning a
//! [`StructureError`] that names what was missing, so mutators can fail the
//! build with `?` the moment a template stops looking the way they assume.

use html5ever::tendril::StrTendril;
use indextree::NodeId;

use crate::dom::{Document, ElementData, ElementId, Namespace, NodeData, NodeKind};
use crate::error::StructureError;

pub struct ElementMut<'a> {
    doc: &'a mut Document,
    node: NodeId,
}

impl<'a> ElementMut<'a> {
    pub(crate) fn new(doc: &'a mut Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    fn data(&self) -> Option<&ElementData> {
        self.doc.element(self.node)
    }

    /// Arena handle of this element.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn id(&self) -> Option<ElementId> {
        self.doc.element_id(self.node)
    }

    pub fn tag(&self) -> &str {
        self.doc.tag(self.node).unwrap_or_default()
    }

    /// First descendant with the given tag, or `None`.
    pub fn query(&mut self, tag: &str) -> Option<ElementMut<'_>> {
        let found = self.doc.first_descendant(self.node, tag)?;
        Some(ElementMut::new(self.doc, found))
    }

    /// First descendant with the given tag, or a violation naming it.
    pub fn require(&mut self, tag: &str) -> Result<ElementMut<'_>, StructureError> {
        match self.doc.first_descendant(self.node, tag) {
            Some(found) => Ok(ElementMut::new(self.doc, found)),
            None => Err(StructureError::MissingDescendant {
                within: self.tag().to_string(),
                tag: tag.to_string(),
            }),
        }
    }

    pub fn text_content(&self) -> String {
        self.doc.text_content(self.node)
    }

    /// Replace every child with a single text node.
    pub fn set_text_content(&mut self, text: &str) {
        self.doc.set_text_content(self.node, text);
    }

    /// Fail unless the text content is exactly `expected`.
    pub fn expect_text(&self, expected: &str) -> Result<(), StructureError> {
        let found = self.text_content();
        if found == expected {
            Ok(())
        } else {
            Err(StructureError::UnexpectedText {
                tag: self.tag().to_string(),
                expected: expected.to_string(),
                found,
            })
        }
    }

    /// Check the current text, then overwrite it.
    pub fn replace_text(&mut self, expected: &str, replacement: &str) -> Result<(), StructureError> {
        self.expect_text(expected)?;
        self.set_text_content(replacement);
        Ok(())
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.data()
            .and_then(|elem| elem.attrs.get(name))
            .map(|value| &**value)
    }

    /// Fail unless the attribute is present and equals `expected`.
    pub fn expect_attr(&self, name: &str, expected: &str) -> Result<(), StructureError> {
        match self.attr(name) {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(StructureError::UnexpectedAttribute {
                tag: self.tag().to_string(),
                name: name.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            }),
            None => Err(StructureError::MissingAttribute {
                tag: self.tag().to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(elem) = self.doc.element_mut(self.node) {
            elem.attrs.insert(name.to_string(), StrTendril::from(value));
        }
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.doc
            .element_mut(self.node)
            .and_then(|elem| elem.attrs.shift_remove(name))
            .map(|value| value.to_string())
    }

    /// Append a new, empty child element and return it. It gets the next
    /// unused id, so later rules in the same pass can target it.
    pub fn append_element(&mut self, tag: &str) -> ElementMut<'_> {
        let id = self.doc.allocate_id();
        let ns = self.doc.get(self.node).ns;
        let child = self.doc.arena.new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                id: Some(id),
                tag: StrTendril::from(tag),
                attrs: Default::default(),
            }),
            ns,
        });
        self.node.append(child, &mut self.doc.arena);
        ElementMut::new(self.doc, child)
    }

    /// Append a text node after the existing children.
    pub fn append_text(&mut self, text: &str) {
        let child = self.doc.arena.new_node(NodeData {
            kind: NodeKind::Text(StrTendril::from(text)),
            ns: Namespace::Html,
        });
        self.node.append(child, &mut self.doc.arena);
    }

    pub fn outer_html(&self) -> String {
        self.doc.outer_html(self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(doc: &mut Document) -> ElementMut<'_> {
        let node = doc.root;
        ElementMut::new(doc, node)
    }

    #[test]
    fn test_require_names_missing_tag() {
        let mut doc = Document::parse("<div><p>only a paragraph</p></div>").expect("parse");
        let node = doc.first_descendant(doc.root, "div").expect("div");
        let mut div = ElementMut::new(&mut doc, node);

        let err = div.require("li").err().expect("li is missing");
        assert_eq!(
            err,
            StructureError::MissingDescendant {
                within: "div".to_string(),
                tag: "li".to_string(),
            }
        );
    }

    #[test]
    fn test_replace_text_checks_expected() {
        let mut doc = Document::parse("<ul><li>${url.url}</li></ul>").expect("parse");
        let mut ul = root(&mut doc);
        let mut li = ul.require("li").expect("li");

        let err = li.replace_text("${other}", "x").expect_err("text differs");
        assert!(matches!(err, StructureError::UnexpectedText { ref found, .. } if found == "${url.url}"));

        li.replace_text("${url.url}", "${url.url.replace(/chrome:/, \"brave:\")}")
            .expect("text matches");
        assert_eq!(
            doc.to_html(),
            "<ul><li>${url.url.replace(/chrome:/, \"brave:\")}</li></ul>"
        );
    }

    #[test]
    fn test_attributes() {
        let mut doc = Document::parse(r#"<a href="chrome://x" class="c">x</a>"#).expect("parse");
        let mut body = root(&mut doc);
        let mut a = body.require("a").expect("a");

        assert_eq!(a.attr("href"), Some("chrome://x"));
        a.expect_attr("href", "chrome://x").expect("matches");
        assert!(matches!(
            a.expect_attr("href", "brave://x"),
            Err(StructureError::UnexpectedAttribute { .. })
        ));
        assert!(matches!(
            a.expect_attr("target", "_blank"),
            Err(StructureError::MissingAttribute { .. })
        ));

        a.set_attr("href", "brave://x");
        assert_eq!(a.remove_attr("class"), Some("c".to_string()));
        assert_eq!(a.remove_attr("class"), None);
        assert_eq!(doc.to_html(), r#"<a href="brave://x">x</a>"#);
    }

    #[test]
    fn test_append_element_gets_fresh_id() {
        let mut doc = Document::parse("<ul><li>a</li></ul>").expect("parse");
        let mut body = root(&mut doc);
        let mut ul = body.require("ul").expect("ul");
        let mut li = ul.append_element("li");
        li.append_text("b");
        assert_eq!(li.id(), Some(ElementId(3)));

        assert_eq!(doc.to_html(), "<ul><li>a</li><li>b</li></ul>");
        assert!(doc.find_element(ElementId(3)).is_some());
    }
}
