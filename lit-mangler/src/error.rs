//! Error types for parsing templates and applying rewrite rules.
//!
//! Every failure here is fatal to the build step that triggered it: the
//! mangler exists to notice upstream template drift, so nothing is retried
//! or recovered internally. A rule whose predicate matches nothing is not an
//! error and never shows up here (see [`crate::ApplyReport`]).

use facet::Facet;

use crate::dom::ElementId;

/// A mutator's assumption about the shape of the element it was handed did
/// not hold.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum StructureError {
    /// missing <{tag}> element inside <{within}>
    MissingDescendant { within: String, tag: String },

    /// unexpected text in <{tag}>: expected "{expected}", found "{found}"
    UnexpectedText {
        tag: String,
        expected: String,
        found: String,
    },

    /// missing attribute {name} on <{tag}>
    MissingAttribute { tag: String, name: String },

    /// unexpected value for attribute {name} on <{tag}>: expected "{expected}", found "{found}"
    UnexpectedAttribute {
        tag: String,
        name: String,
        expected: String,
        found: String,
    },

    /// {message}
    Custom { message: String },
}

impl StructureError {
    /// Build a free-form violation for mutators whose checks don't fit the
    /// other variants.
    pub fn custom(message: impl Into<String>) -> Self {
        StructureError::Custom {
            message: message.into(),
        }
    }
}

/// Errors surfaced by parsing, manifest loading, or a mangling pass.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum MangleError {
    /// template is not well-formed (line {line}): {message}
    Parse { line: u64, message: String },

    /// rule #{rule} ({label}) failed on element {element} at {path}: {reason}
    StructureViolated {
        rule: usize,
        label: String,
        element: ElementId,
        path: String,
        reason: StructureError,
    },

    /// invalid rule manifest: {message}
    Manifest { message: String },
}

impl MangleError {
    /// The structural violation behind this error, if that is what it is.
    pub fn structure(&self) -> Option<&StructureError> {
        match self {
            MangleError::StructureViolated { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
