//! Predicates deciding which element a rule targets.
//!
//! Predicates see a [`Candidate`]: the element's id, tag and serialized text.
//! Most are stateless substring checks. Templates often contain two fragments
//! that serialize identically but need different rewrites; those are told
//! apart by a [`Predicate::RecordFirst`] rule that stores the id it matched
//! in [`MatchState`], followed by a [`Predicate::Excluding`] rule that skips
//! that id. The state is owned by a single pass and passed in explicitly.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

use facet::Facet;
use indextree::NodeId;

use crate::dom::{Document, ElementId};

/// An element being considered by a predicate.
///
/// The serialized text is computed on first use, so predicates that only
/// look at the tag stay cheap.
pub struct Candidate<'a> {
    doc: &'a Document,
    node: NodeId,
    id: ElementId,
    text: OnceCell<String>,
}

impl<'a> Candidate<'a> {
    pub(crate) fn new(doc: &'a Document, node: NodeId, id: ElementId) -> Self {
        Self {
            doc,
            node,
            id,
            text: OnceCell::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn tag(&self) -> &str {
        self.doc.tag(self.node).unwrap_or_default()
    }

    /// Outer HTML of the element, as the serializer writes it.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| self.doc.outer_html(self.node))
    }

    /// Concatenated text nodes below the element.
    pub fn text_content(&self) -> String {
        self.doc.text_content(self.node)
    }

    /// Whether any element strictly below this one has the given tag.
    pub fn has_descendant(&self, tag: &str) -> bool {
        self.doc.first_descendant(self.node, tag).is_some()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.doc
            .element(self.node)
            .and_then(|elem| elem.attrs.get(name))
            .map(|value| &**value)
    }
}

/// Ids recorded by stateful predicates during one pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchState {
    seen: HashMap<String, ElementId>,
}

impl MatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `id` under `key`. A later record under the same key wins.
    pub fn record(&mut self, key: &str, id: ElementId) {
        self.seen.insert(key.to_string(), id);
    }

    pub fn recorded(&self, key: &str) -> Option<ElementId> {
        self.seen.get(key).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Stateless constraints on a candidate. Every constraint that is set must
/// hold; an empty matcher matches anything.
#[derive(Facet, Debug, Clone, Default, PartialEq, Eq)]
pub struct Matcher {
    /// Tag name, compared ASCII case-insensitively.
    #[facet(default)]
    pub tag: Option<String>,

    /// Substring of the element's outer HTML.
    #[facet(default)]
    pub contains: Option<String>,

    /// Exact text content of the element.
    #[facet(default)]
    pub text: Option<String>,

    /// Tag that must not appear anywhere below the element. With
    /// `"template"` this selects innermost fragments only.
    #[facet(default)]
    pub without: Option<String>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn containing(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn without_descendant(mut self, tag: impl Into<String>) -> Self {
        self.without = Some(tag.into());
        self
    }

    pub fn matches(&self, candidate: &Candidate<'_>) -> bool {
        if let Some(tag) = &self.tag
            && !candidate.tag().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(needle) = &self.contains
            && !candidate.text().contains(needle.as_str())
        {
            return false;
        }
        if let Some(text) = &self.text
            && candidate.text_content() != *text
        {
            return false;
        }
        if let Some(tag) = &self.without
            && candidate.has_descendant(tag)
        {
            return false;
        }
        true
    }
}

type CustomPredicate = dyn Fn(&Candidate<'_>, &mut MatchState) -> bool;

/// Decides whether a candidate is the element a rule should rewrite.
#[derive(Default)]
pub enum Predicate {
    /// Matches the first element scanned, which is the template root.
    #[default]
    Always,

    /// Stateless match.
    Matches(Matcher),

    /// Match and remember the matched id under `key`.
    RecordFirst { matcher: Matcher, key: String },

    /// Match anything except the id remembered under `key`. With nothing
    /// remembered yet, this is a plain match.
    Excluding { matcher: Matcher, key: String },

    /// Arbitrary check. Its only side effects must go through the state it is
    /// handed.
    Custom(Box<CustomPredicate>),
}

impl Predicate {
    pub fn matching(matcher: Matcher) -> Self {
        Predicate::Matches(matcher)
    }

    pub fn record_first(matcher: Matcher, key: impl Into<String>) -> Self {
        Predicate::RecordFirst {
            matcher,
            key: key.into(),
        }
    }

    pub fn excluding(matcher: Matcher, key: impl Into<String>) -> Self {
        Predicate::Excluding {
            matcher,
            key: key.into(),
        }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Candidate<'_>, &mut MatchState) -> bool + 'static,
    {
        Predicate::Custom(Box::new(f))
    }

    pub fn evaluate(&self, candidate: &Candidate<'_>, state: &mut MatchState) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Matches(matcher) => matcher.matches(candidate),
            Predicate::RecordFirst { matcher, key } => {
                if matcher.matches(candidate) {
                    state.record(key, candidate.id());
                    true
                } else {
                    false
                }
            }
            Predicate::Excluding { matcher, key } => {
                state.recorded(key) != Some(candidate.id()) && matcher.matches(candidate)
            }
            Predicate::Custom(f) => f(candidate, state),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "Always"),
            Predicate::Matches(matcher) => f.debug_tuple("Matches").field(matcher).finish(),
            Predicate::RecordFirst { matcher, key } => f
                .debug_struct("RecordFirst")
                .field("matcher", matcher)
                .field("key", key)
                .finish(),
            Predicate::Excluding { matcher, key } => f
                .debug_struct("Excluding")
                .field("matcher", matcher)
                .field("key", key)
                .finish(),
            Predicate::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(doc: &Document) -> Vec<Candidate<'_>> {
        doc.elements()
            .map(|node| Candidate::new(doc, node, doc.element_id(node).expect("numbered")))
            .collect()
    }

    #[test]
    fn test_matcher_constraints() {
        let doc = Document::parse(r##"<ul><li><a href="#">home</a></li></ul>"##).expect("parse");
        let all = candidates(&doc);
        let li = &all[2];
        assert_eq!(li.tag(), "li");

        assert!(Matcher::new().matches(li));
        assert!(Matcher::new().on_tag("LI").matches(li));
        assert!(Matcher::new().containing(r##"href="#""##).matches(li));
        assert!(Matcher::new().with_text("home").matches(li));
        assert!(!Matcher::new().on_tag("li").with_text("away").matches(li));
        assert!(!Matcher::new().on_tag("ul").containing("nope").matches(&all[1]));
    }

    #[test]
    fn test_without_descendant_selects_innermost() {
        let doc = Document::parse(
            "<template><h2>x</h2><template><li>${u}</li></template></template>",
        )
        .expect("parse");
        let all = candidates(&doc);
        let fragment = Matcher::new()
            .on_tag("template")
            .containing("<li>${u}</li>")
            .without_descendant("template");

        let hits: Vec<ElementId> = all
            .iter()
            .filter(|c| fragment.matches(c))
            .map(Candidate::id)
            .collect();
        assert_eq!(hits, vec![ElementId(3)]);
    }

    #[test]
    fn test_candidate_text_is_outer_html() {
        let doc = Document::parse("<p><b>x</b></p>").expect("parse");
        let all = candidates(&doc);
        assert_eq!(all[1].text(), "<p><b>x</b></p>");
        assert_eq!(all[2].attr("class"), None);
    }

    #[test]
    fn test_record_then_exclude_picks_other_occurrence() {
        let doc = Document::parse("<i>same</i><i>same</i>").expect("parse");
        let all = candidates(&doc);
        let same = Matcher::new().on_tag("i").with_text("same");
        let first = Predicate::record_first(same.clone(), "i");
        let second = Predicate::excluding(same, "i");

        let mut state = MatchState::new();
        let hit = all.iter().find(|c| first.evaluate(c, &mut state)).expect("first");
        assert_eq!(hit.id(), ElementId(1));
        assert_eq!(state.recorded("i"), Some(ElementId(1)));

        let hit = all.iter().find(|c| second.evaluate(c, &mut state)).expect("second");
        assert_eq!(hit.id(), ElementId(2));
    }

    #[test]
    fn test_excluding_without_record_matches() {
        let doc = Document::parse("<i>same</i>").expect("parse");
        let all = candidates(&doc);
        let pred = Predicate::excluding(Matcher::new().on_tag("i"), "never-recorded");
        let mut state = MatchState::new();
        assert!(pred.evaluate(&all[1], &mut state));
        assert!(state.is_empty());
    }

    #[test]
    fn test_custom_predicate_sees_state() {
        let doc = Document::parse("<i>a</i><i>b</i>").expect("parse");
        let all = candidates(&doc);
        let pred = Predicate::custom(|c, state| {
            if c.tag() == "i" && state.recorded("seen").is_none() {
                state.record("seen", c.id());
                return true;
            }
            false
        });

        let mut state = MatchState::new();
        let hits: Vec<ElementId> = all
            .iter()
            .filter(|c| pred.evaluate(c, &mut state))
            .map(Candidate::id)
            .collect();
        assert_eq!(hits, vec![ElementId(1)]);
    }
}
