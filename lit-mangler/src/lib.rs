//! Build-time rewriting of pre-rendered web UI templates.
//!
//! lit-mangler parses a template snapshot, numbers its elements in document
//! order, and applies an ordered list of predicate-guarded rewrite rules to
//! it. Rules are strict about what they expect to find: when an upstream
//! template changes shape, the pass fails with an error that names the rule
//! and the element, instead of silently producing a broken page.
//!
//! - **Parsing**: html5ever tree construction into an indextree arena, strict
//!   by default (see [`ParseOptions`])
//! - **Predicates**: tag, substring and text matchers, plus record/exclude
//!   pairs for telling identical fragments apart
//! - **Rules**: closures or [`Mutator`] impls working on an [`ElementMut`]
//! - **Manifests**: the same rules described in JSON
//!
//! # Example
//!
//! ```rust
//! use lit_mangler::{Document, Mangler, Matcher, Predicate, Rule};
//!
//! let mut doc = Document::parse("<h2>List of Chrome URLs</h2><p><a href=\"#\">chrome://about</a></p>")?;
//!
//! let mut mangler = Mangler::new();
//! mangler
//!     .register(Rule::new(|el| {
//!         el.require("h2")?.set_text_content("List of Brave URLs");
//!         Ok(())
//!     }))
//!     .register(
//!         Rule::new(|el| el.require("a")?.replace_text("chrome://about", "brave://about"))
//!             .when(Predicate::matching(Matcher::new().on_tag("p"))),
//!     );
//!
//! let report = mangler.apply(&mut doc)?;
//! assert_eq!(report.applied().count(), 2);
//! assert_eq!(
//!     doc.to_html(),
//!     "<h2>List of Brave URLs</h2><p><a href=\"#\">brave://about</a></p>"
//! );
//! # Ok::<(), lit_mangler::MangleError>(())
//! ```

mod tracing_macros;

pub mod dom;
pub mod element;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod overrides;
pub mod predicate;
pub mod rule;
pub mod serialize;

pub use dom::{Document, ElementId, ElementPath, ParseOptions, TemplateKind};
pub use element::ElementMut;
pub use engine::{ApplyReport, Mangler, RuleOutcome};
pub use error::{MangleError, StructureError};
pub use manifest::{PredicateSpec, RewriteSpec, RuleManifest, RuleSpec};
pub use predicate::{Candidate, MatchState, Matcher, Predicate};
pub use rule::{Mutator, Rule};
