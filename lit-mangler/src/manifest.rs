//! Declarative rule sets loaded from JSON.
//!
//! A manifest covers the common rewrites (retitle a heading, swap a URL
//! scheme in an attribute) without compiling Rust. Enums use facet-json's
//! externally tagged form:
//!
//! ```json
//! {
//!   "name": "chrome_urls",
//!   "rules": [
//!     {
//!       "label": "heading",
//!       "rewrite": { "ReplaceText": { "within": "h2", "text": "List of Brave URLs" } }
//!     },
//!     {
//!       "when": { "Matches": { "tag": "a", "contains": "href=\"#\"" } },
//!       "rewrite": {
//!         "ReplaceText": { "expect": "chrome://chrome-urls", "text": "brave://chrome-urls" }
//!       }
//!     }
//!   ]
//! }
//! ```

use facet::Facet;

use crate::element::ElementMut;
use crate::engine::Mangler;
use crate::error::{MangleError, StructureError};
use crate::predicate::{Matcher, Predicate};
use crate::rule::{Mutator, Rule};
use crate::tracing_macros::debug;

/// A named, ordered list of rules.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct RuleManifest {
    #[facet(default)]
    pub name: Option<String>,
    pub rules: Vec<RuleSpec>,
}

#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    #[facet(default)]
    pub label: Option<String>,
    /// Defaults to matching the template root.
    #[facet(default)]
    pub when: Option<PredicateSpec>,
    pub rewrite: RewriteSpec,
}

/// Serializable subset of [`Predicate`].
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PredicateSpec {
    Always,
    Matches(Matcher),
    RecordFirst { matcher: Matcher, key: String },
    Excluding { matcher: Matcher, key: String },
}

impl From<PredicateSpec> for Predicate {
    fn from(spec: PredicateSpec) -> Self {
        match spec {
            PredicateSpec::Always => Predicate::Always,
            PredicateSpec::Matches(matcher) => Predicate::matching(matcher),
            PredicateSpec::RecordFirst { matcher, key } => Predicate::record_first(matcher, key),
            PredicateSpec::Excluding { matcher, key } => Predicate::excluding(matcher, key),
        }
    }
}

/// What to do with the matched element.
///
/// `within` retargets the rewrite at the first descendant with that tag; a
/// missing descendant is a violation, as is an `expect` that does not hold.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum RewriteSpec {
    ReplaceText {
        #[facet(default)]
        within: Option<String>,
        #[facet(default)]
        expect: Option<String>,
        text: String,
    },
    SetAttribute {
        #[facet(default)]
        within: Option<String>,
        name: String,
        #[facet(default)]
        expect: Option<String>,
        value: String,
    },
    RemoveAttribute {
        #[facet(default)]
        within: Option<String>,
        name: String,
    },
}

impl RewriteSpec {
    fn within(&self) -> Option<&str> {
        match self {
            RewriteSpec::ReplaceText { within, .. }
            | RewriteSpec::SetAttribute { within, .. }
            | RewriteSpec::RemoveAttribute { within, .. } => within.as_deref(),
        }
    }

    fn rewrite(&self, target: &mut ElementMut<'_>) -> Result<(), StructureError> {
        match self {
            RewriteSpec::ReplaceText { expect, text, .. } => {
                if let Some(expected) = expect {
                    target.expect_text(expected)?;
                }
                target.set_text_content(text);
            }
            RewriteSpec::SetAttribute {
                name,
                expect,
                value,
                ..
            } => {
                if let Some(expected) = expect {
                    target.expect_attr(name, expected)?;
                }
                target.set_attr(name, value);
            }
            RewriteSpec::RemoveAttribute { name, .. } => {
                if target.remove_attr(name).is_none() {
                    return Err(StructureError::MissingAttribute {
                        tag: target.tag().to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Mutator for RewriteSpec {
    fn mutate(&self, target: &mut ElementMut<'_>) -> Result<(), StructureError> {
        match self.within() {
            Some(tag) => self.rewrite(&mut target.require(tag)?),
            None => self.rewrite(target),
        }
    }
}

impl RuleManifest {
    pub fn from_json(json: &str) -> Result<Self, MangleError> {
        let manifest: RuleManifest =
            facet_json::from_str(json).map_err(|e| MangleError::Manifest {
                message: e.to_string(),
            })?;
        debug!(name = ?manifest.name, rules = manifest.rules.len(), "loaded rule manifest");
        Ok(manifest)
    }

    /// Build a [`Mangler`] with the rules in manifest order.
    pub fn into_mangler(self) -> Mangler {
        let mut mangler = Mangler::new();
        for spec in self.rules {
            let mut rule = Rule::with_mutator(spec.rewrite);
            if let Some(when) = spec.when {
                rule = rule.when(when.into());
            }
            if let Some(label) = spec.label {
                rule = rule.labeled(label);
            }
            mangler.register(rule);
        }
        mangler
    }
}
