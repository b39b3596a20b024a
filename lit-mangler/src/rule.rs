//! Rewrite rules: a mutator guarded by a predicate.

use std::fmt;

use crate::element::ElementMut;
use crate::error::StructureError;
use crate::predicate::Predicate;

/// Rewrites the element a rule matched.
///
/// Returning an error aborts the whole pass; mutators should check every
/// assumption they make about the element before changing it.
pub trait Mutator {
    fn mutate(&self, target: &mut ElementMut<'_>) -> Result<(), StructureError>;
}

impl<F> Mutator for F
where
    F: Fn(&mut ElementMut<'_>) -> Result<(), StructureError>,
{
    fn mutate(&self, target: &mut ElementMut<'_>) -> Result<(), StructureError> {
        self(target)
    }
}

/// One registered rewrite.
pub struct Rule {
    pub(crate) label: Option<String>,
    pub(crate) predicate: Predicate,
    pub(crate) mutator: Box<dyn Mutator>,
}

impl Rule {
    /// A rule that rewrites the first element scanned (the template root)
    /// unless narrowed with [`Rule::when`].
    pub fn new<F>(mutator: F) -> Self
    where
        F: Fn(&mut ElementMut<'_>) -> Result<(), StructureError> + 'static,
    {
        Self::with_mutator(mutator)
    }

    /// Same as [`Rule::new`], for mutators that are not closures.
    pub fn with_mutator(mutator: impl Mutator + 'static) -> Self {
        Self {
            label: None,
            predicate: Predicate::Always,
            mutator: Box::new(mutator),
        }
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Name used in logs and error messages.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("label", &self.label)
            .field("predicate", &self.predicate)
            .finish_non_exhaustive()
    }
}
