//! The mangling pass.
//!
//! Rules run strictly in registration order. Each one scans the elements in
//! current document order and rewrites the first that its predicate accepts;
//! a rule never fires twice in one pass. A rule that finds nothing is skipped,
//! since some targets only exist in certain build configurations. A mutator
//! error stops the pass on the spot and no later rule runs.

use crate::dom::{Document, ElementId};
use crate::element::ElementMut;
use crate::error::MangleError;
use crate::predicate::{Candidate, MatchState};
use crate::rule::Rule;
use crate::tracing_macros::{debug, trace};

/// What happened to one rule during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Registration index.
    pub rule: usize,
    pub label: Option<String>,
    /// Element the rule rewrote; `None` when nothing matched.
    pub matched: Option<ElementId>,
}

/// Per-rule results of a successful pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<RuleOutcome>,
}

impl ApplyReport {
    /// Rules that rewrote an element.
    pub fn applied(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.matched.is_some())
    }

    /// Rules whose predicate matched nothing.
    pub fn skipped(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.matched.is_none())
    }

    /// Element rewritten by the rule registered at `rule`.
    pub fn matched(&self, rule: usize) -> Option<ElementId> {
        self.outcomes.get(rule).and_then(|o| o.matched)
    }
}

/// An ordered registry of rewrite rules.
#[derive(Debug, Default)]
pub struct Mangler {
    rules: Vec<Rule>,
}

impl Mangler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Order of registration is order of application.
    pub fn register(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule once against `doc`, mutating it in place.
    ///
    /// Disambiguation state starts empty on every call, so one `Mangler` can
    /// be applied to any number of documents. On error the document is left
    /// partially rewritten and should be discarded.
    pub fn apply(&self, doc: &mut Document) -> Result<ApplyReport, MangleError> {
        let mut state = MatchState::new();
        let mut report = ApplyReport::default();

        for (index, rule) in self.rules.iter().enumerate() {
            let target = doc.elements().find_map(|node| {
                let id = doc.element_id(node)?;
                let candidate = Candidate::new(doc, node, id);
                rule.predicate
                    .evaluate(&candidate, &mut state)
                    .then_some((node, id))
            });

            let Some((node, id)) = target else {
                debug!(rule = index, label = ?rule.label, "no element matched, skipping");
                report.outcomes.push(RuleOutcome {
                    rule: index,
                    label: rule.label.clone(),
                    matched: None,
                });
                continue;
            };

            trace!(rule = index, element = %id, "rule matched");
            let path = doc.path_of(node);
            let mut element = ElementMut::new(doc, node);
            rule.mutator
                .mutate(&mut element)
                .map_err(|reason| MangleError::StructureViolated {
                    rule: index,
                    label: rule.label.clone().unwrap_or_else(|| "unlabeled".to_string()),
                    element: id,
                    path: path.to_string(),
                    reason,
                })?;

            debug!(rule = index, label = ?rule.label, element = %id, %path, "rewrote element");
            report.outcomes.push(RuleOutcome {
                rule: index,
                label: rule.label.clone(),
                matched: Some(id),
            });
        }

        Ok(report)
    }
}
