//! Arena-based template DOM with deterministic element ids.
//!
//! Templates are parsed with html5ever into an indextree arena. Once tree
//! construction finishes, every element reachable from the root is numbered
//! in document order, so the same source always produces the same
//! [`ElementId`] for structurally corresponding elements. Those ids are what
//! rules use to tell otherwise identical fragments apart.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;

use facet::Facet;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, LocalName, ParseOpts, QualName, parse_document};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use smallvec::SmallVec;

use crate::error::MangleError;
use crate::tracing_macros::{debug, trace};
#[cfg(feature = "tracing")]
use crate::tracing_macros::warn;

/// Wrapper that puts fragment sources into a body context. It has no line
/// breaks so parse error line numbers still point into the caller's source.
const FRAGMENT_PREFIX: &str = "<!DOCTYPE html><html><head></head><body>";

/// Skip a byte order mark, whitespace and comments at the start of a source.
fn skip_preamble(source: &str) -> &str {
    let mut rest = source.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        match rest.strip_prefix("<!--").and_then(|c| c.split_once("-->")) {
            Some((_, after)) => rest = after,
            None => return rest,
        }
    }
}

/// Name of the first start tag, if the source opens with one.
fn leading_tag(source: &str) -> Option<String> {
    let name: String = skip_preamble(source)
        .strip_prefix('<')?
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (!name.is_empty()).then(|| name.to_ascii_lowercase())
}

/// Table-section elements are dropped by the parser when they show up
/// directly in `<body>`, so fragments that start with one get parsed inside
/// the containers they need. The last container becomes the root.
fn fragment_context(source: &str) -> &'static [&'static str] {
    match leading_tag(source).as_deref() {
        Some("tr") => &["table", "tbody"],
        Some("td" | "th") => &["table", "tbody", "tr"],
        Some("col") => &["table", "colgroup"],
        Some("tbody" | "thead" | "tfoot" | "caption" | "colgroup") => &["table"],
        _ => &[],
    }
}

/// Position of an element in document order, assigned once per parse.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[facet(transparent)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of source a template is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// A complete document with `<!DOCTYPE>`/`<html>`; the root is `<html>`.
    Document,
    /// A snippet parsed in a body context (or a table context for row and
    /// cell snippets); the root is the synthetic container and only its
    /// children are serialized.
    Fragment,
}

impl TemplateKind {
    /// Guess the kind from the start of the source, past any byte order mark,
    /// whitespace and leading comments.
    pub fn detect(source: &str) -> Self {
        let head = skip_preamble(source).as_bytes();
        let starts_with = |prefix: &[u8]| {
            head.len() >= prefix.len() && head[..prefix.len()].eq_ignore_ascii_case(prefix)
        };
        if starts_with(b"<!doctype") || starts_with(b"<html") {
            TemplateKind::Document
        } else {
            TemplateKind::Fragment
        }
    }
}

/// Options for parsing a template.
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Force a template kind instead of detecting it from the source.
    pub kind: Option<TemplateKind>,
    /// Reject sources that the HTML5 parser reports errors for (default: true).
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            kind: None,
            strict: true,
        }
    }
}

impl ParseOptions {
    /// Create new default options (auto-detected kind, strict).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse as a fragment regardless of what the source looks like.
    pub fn fragment(mut self) -> Self {
        self.kind = Some(TemplateKind::Fragment);
        self
    }

    /// Parse as a full document regardless of what the source looks like.
    pub fn document(mut self) -> Self {
        self.kind = Some(TemplateKind::Document);
        self
    }

    /// Accept browser-style error recovery instead of failing.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }
}

/// A parsed template: arena, root, and id bookkeeping.
#[derive(Debug, Clone)]
pub struct Document {
    /// The tree; all nodes live here.
    pub arena: Arena<NodeData>,

    /// Root element: `<html>` for documents, the synthetic container
    /// (`<body>`, or a table section for row and cell snippets) for fragments.
    pub root: NodeId,

    /// DOCTYPE if present (usually "html").
    pub doctype: Option<StrTendril>,

    kind: TemplateKind,
    next_id: u32,
}

/// What goes in each arena slot.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

/// Node types.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root (invisible, parent of `<html>`).
    Document,
    /// Element with id, tag and attributes.
    Element(ElementData),
    /// Text content.
    Text(StrTendril),
    /// HTML comment.
    Comment(StrTendril),
}

/// Element data.
#[derive(Debug, Clone)]
pub struct ElementData {
    /// `None` only for the wrapper elements of a fragment, which are never candidates.
    pub id: Option<ElementId>,

    pub tag: StrTendril,

    /// Insertion order is source order, which keeps serialization stable.
    pub attrs: IndexMap<String, StrTendril>,
}

/// XML namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html,
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

/// Ancestor tag chain of an element, used to point at failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPath(pub SmallVec<[String; 8]>);

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}

impl Document {
    /// Parse a template with default options.
    pub fn parse(source: &str) -> Result<Self, MangleError> {
        Self::parse_with(source, &ParseOptions::default())
    }

    /// Parse a template.
    ///
    /// In strict mode any error reported by the HTML5 tokenizer or tree
    /// builder fails the parse; the first one is returned with its line.
    pub fn parse_with(source: &str, options: &ParseOptions) -> Result<Self, MangleError> {
        let kind = options.kind.unwrap_or_else(|| TemplateKind::detect(source));
        let context = match kind {
            TemplateKind::Document => &[][..],
            TemplateKind::Fragment => fragment_context(source),
        };
        let input = match kind {
            TemplateKind::Document => StrTendril::from(source),
            TemplateKind::Fragment => {
                let mut input = StrTendril::from(FRAGMENT_PREFIX);
                for tag in context {
                    input.push_slice(&format!("<{tag}>"));
                }
                input.push_slice(source);
                for tag in context.iter().rev() {
                    input.push_slice(&format!("</{tag}>"));
                }
                input
            }
        };

        let sink = ArenaSink::new();
        let ParseOutcome {
            arena,
            document,
            doctype,
            errors,
        } = parse_document(sink, ParseOpts::default()).one(input);

        if let Some(first) = errors.first() {
            if options.strict {
                return Err(MangleError::Parse {
                    line: first.line,
                    message: first.message.to_string(),
                });
            }
            #[cfg(feature = "tracing")]
            for error in &errors {
                warn!(line = error.line, message = %error.message, "tolerated parse error");
            }
        }

        let root = match kind {
            TemplateKind::Document => find_child(&arena, document, "html"),
            TemplateKind::Fragment => find_child(&arena, document, "html")
                .and_then(|html| find_child(&arena, html, "body"))
                .and_then(|body| {
                    context
                        .iter()
                        .try_fold(body, |parent, tag| find_child(&arena, parent, tag))
                }),
        }
        .ok_or_else(|| MangleError::Parse {
            line: 0,
            message: format!("parser produced no root element for {kind:?} template"),
        })?;

        let mut doc = Document {
            arena,
            root,
            doctype: match kind {
                TemplateKind::Document => doctype,
                TemplateKind::Fragment => None,
            },
            kind,
            next_id: 0,
        };
        doc.assign_ids();
        Ok(doc)
    }

    /// Number the elements under the root in document order.
    fn assign_ids(&mut self) {
        let order: Vec<NodeId> = self.root.descendants(&self.arena).collect();
        for node in order {
            if let NodeKind::Element(elem) = &mut self.arena[node].get_mut().kind {
                elem.id = Some(ElementId(self.next_id));
                self.next_id += 1;
            }
        }
        debug!(elements = self.next_id, kind = ?self.kind, "assigned element ids");
    }

    /// Hand out the next unused id, for elements created after parsing.
    pub(crate) fn allocate_id(&mut self) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        id
    }

    /// The kind this template was parsed as.
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Get immutable reference to node data.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data.
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// Iterate children of a node.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Element data of a node, if it is an element.
    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.get(node).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.get_mut(node).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// Tag name of an element node.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|elem| &*elem.tag)
    }

    /// Id of an element node.
    pub fn element_id(&self, node: NodeId) -> Option<ElementId> {
        self.element(node).and_then(|elem| elem.id)
    }

    /// All numbered elements in current document order, root first.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root
            .descendants(&self.arena)
            .filter(|&node| self.element_id(node).is_some())
    }

    /// Find the element carrying `id`, if it is still attached.
    pub fn find_element(&self, id: ElementId) -> Option<NodeId> {
        self.elements().find(|&node| self.element_id(node) == Some(id))
    }

    /// First element strictly below `node` whose tag matches (ASCII case-insensitive).
    pub fn first_descendant(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        node.descendants(&self.arena)
            .skip(1)
            .find(|&d| self.tag(d).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
    }

    /// Concatenated text of every text node below `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for d in node.descendants(&self.arena) {
            if let NodeKind::Text(text) = &self.get(d).kind {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children of `node` with a single text node (none for empty text).
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        let children: Vec<NodeId> = node.children(&self.arena).collect();
        for child in children {
            child.remove_subtree(&mut self.arena);
        }
        if !text.is_empty() {
            let text_node = self.arena.new_node(NodeData {
                kind: NodeKind::Text(StrTendril::from(text)),
                ns: Namespace::Html,
            });
            node.append(text_node, &mut self.arena);
        }
    }

    /// Tag chain from the root down to `node`.
    pub fn path_of(&self, node: NodeId) -> ElementPath {
        let mut tags: SmallVec<[String; 8]> = node
            .ancestors(&self.arena)
            .take_while(|&a| a != self.root)
            .filter_map(|a| self.tag(a).map(str::to_string))
            .collect();
        if let Some(root_tag) = self.tag(self.root) {
            tags.push(root_tag.to_string());
        }
        tags.reverse();
        ElementPath(tags)
    }

    /// Serialize the template: full document for documents, the body's
    /// children for fragments.
    pub fn to_html(&self) -> String {
        crate::serialize::serialize_document(self)
    }

    /// Serialize one subtree, including the node itself.
    pub fn outer_html(&self, node: NodeId) -> String {
        crate::serialize::serialize_node(self, node)
    }
}

fn find_child(arena: &Arena<NodeData>, parent: NodeId, tag: &str) -> Option<NodeId> {
    parent.children(arena).find(|&id| {
        matches!(&arena[id].get().kind, NodeKind::Element(elem) if &*elem.tag == tag)
    })
}

/// A parse error reported by html5ever, with the line it was reported on.
struct SourceError {
    line: u64,
    message: Cow<'static, str>,
}

/// What the sink hands back once tree construction is done.
struct ParseOutcome {
    arena: Arena<NodeData>,
    document: NodeId,
    doctype: Option<StrTendril>,
    errors: Vec<SourceError>,
}

/// Owned element name wrapper.
#[derive(Debug, Clone)]
struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink implementation for building the arena DOM.
struct ArenaSink {
    arena: RefCell<Arena<NodeData>>,

    /// Document node (parent of `<html>`).
    document: NodeId,

    doctype: RefCell<Option<StrTendril>>,

    current_line: Cell<u64>,
    errors: RefCell<Vec<SourceError>>,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });

        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(None),
            current_line: Cell::new(1),
            errors: RefCell::new(Vec::new()),
        }
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = ParseOutcome;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        ParseOutcome {
            arena: self.arena.into_inner(),
            document: self.document,
            doctype: self.doctype.into_inner(),
            errors: self.errors.into_inner(),
        }
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        let line = self.current_line.get();
        trace!(line, %msg, "parse error");
        self.errors.borrow_mut().push(SourceError { line, message: msg });
    }

    fn set_current_line(&self, line_number: u64) {
        self.current_line.set(line_number);
    }

    fn get_document(&self) -> Self::Handle {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> OwnedElemName {
        let arena = self.arena.borrow();
        let node = arena[*target].get();

        let (local, ns) = match &node.kind {
            NodeKind::Element(elem) => (LocalName::from(&*elem.tag), node.ns),
            _ => (LocalName::from(""), Namespace::Html),
        };
        OwnedElemName(QualName {
            prefix: None,
            ns: html5ever::Namespace::from(ns.url()),
            local,
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let tag = StrTendril::from(&*name.local);
        let ns = Namespace::from_url(&name.ns);

        let attrs: IndexMap<_, _> = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value))
            .collect();

        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                id: None,
                tag,
                attrs,
            }),
            ns,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(text),
            ns: Namespace::Html,
        })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(StrTendril::new()),
            ns: Namespace::Html,
        })
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut arena);
            }
            NodeOrText::AppendText(text) => {
                // Adjacent text merges into one node, as in a browser DOM
                if let Some(last) = parent.children(&arena).next_back()
                    && let NodeKind::Text(existing) = &mut arena[last].get_mut().kind
                {
                    existing.push_tendril(&text);
                    return;
                }

                let text_node = arena.new_node(NodeData {
                    kind: NodeKind::Text(text),
                    ns: Namespace::Html,
                });
                parent.append(text_node, &mut arena);
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        let node = match new_node {
            NodeOrText::AppendNode(node) => node,
            NodeOrText::AppendText(text) => arena.new_node(NodeData {
                kind: NodeKind::Text(text),
                ns: Namespace::Html,
            }),
        };
        sibling.insert_before(node, &mut arena);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        _prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        self.append(element, child);
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        *self.doctype.borrow_mut() = Some(name);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // Template contents live directly under the <template> element so
        // fragments are ordinary, queryable subtrees
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        if let NodeKind::Element(elem) = &mut arena[*target].get_mut().kind {
            for attr in attrs {
                elem.attrs
                    .entry(attr.name.local.to_string())
                    .or_insert(attr.value);
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&arena).collect();
        for child in children {
            child.detach(&mut arena);
            new_parent.append(child, &mut arena);
        }
    }
}
