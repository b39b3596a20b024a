//! Rule sets the browser applies to upstream WebUI templates.
//!
//! Each function returns a fresh [`Mangler`]. Lit fragments show up in the
//! template snapshots as `<template>` elements, so fragment-level rules match
//! on that tag.

use crate::element::ElementMut;
use crate::engine::Mangler;
use crate::error::StructureError;
use crate::predicate::{Matcher, Predicate};
use crate::rule::Rule;

const URL_PLACEHOLDER: &str = "${info.url.url}";
const URL_REWRITTEN: &str = r#"${info.url.url.replace(/chrome:/, "brave:")}"#;
const COMMAND_URL_PLACEHOLDER: &str = "${url.url}";
const COMMAND_URL_REWRITTEN: &str = r#"${url.url.replace(/chrome:/, "brave:")}"#;

/// Innermost fragment containing `needle`. Conditional sections wrap their
/// fragments in an outer `<template>` whose text contains the same needle.
fn fragment(needle: &str) -> Matcher {
    Matcher::new()
        .on_tag("template")
        .containing(needle)
        .without_descendant("template")
}

fn rewrite_url_in(
    tag: &'static str,
) -> impl Fn(&mut ElementMut<'_>) -> Result<(), StructureError> + 'static {
    move |el: &mut ElementMut<'_>| el.require(tag)?.replace_text(URL_PLACEHOLDER, URL_REWRITTEN)
}

/// `chrome://chrome-urls`: show `brave:` URLs everywhere the page lists them.
///
/// The page renders its URL list twice (under the main heading and under
/// "Internal Debugging Page URLs") from identical fragments. The first rule of
/// each pair records the fragment it rewrote and the second skips it.
pub fn chrome_urls() -> Mangler {
    let anchor = format!(r#"href="{URL_PLACEHOLDER}""#);
    let list_item = format!("<li>{URL_PLACEHOLDER}</li>");

    let mut mangler = Mangler::new();
    mangler
        .register(
            Rule::new(|el| {
                el.require("h2")?.set_text_content("List of Brave URLs");
                Ok(())
            })
            .labeled("heading"),
        )
        .register(
            Rule::new(|el| {
                el.require("a")?
                    .replace_text("chrome://chrome-urls", "brave://chrome-urls")
            })
            .when(Predicate::matching(
                Matcher::new().on_tag("p").containing(r##"href="#""##),
            ))
            .labeled("chrome-urls link"),
        )
        .register(
            Rule::new(rewrite_url_in("a"))
                .when(Predicate::record_first(fragment(&anchor), "anchor"))
                .labeled("url anchors"),
        )
        .register(
            Rule::new(rewrite_url_in("a"))
                .when(Predicate::excluding(fragment(&anchor), "anchor"))
                .labeled("debug url anchors"),
        )
        .register(
            Rule::new(rewrite_url_in("li"))
                .when(Predicate::record_first(fragment(&list_item), "list item"))
                .labeled("inactive url items"),
        )
        .register(
            Rule::new(rewrite_url_in("li"))
                .when(Predicate::excluding(fragment(&list_item), "list item"))
                .labeled("debug url items"),
        )
        .register(
            Rule::new(|el| {
                el.require("li")?
                    .replace_text(COMMAND_URL_PLACEHOLDER, COMMAND_URL_REWRITTEN)
            })
            .when(Predicate::matching(fragment(&format!(
                "<li>{COMMAND_URL_PLACEHOLDER}</li>"
            ))))
            .labeled("command url items"),
        );
    mangler
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_urls_rule_order() {
        let mangler = chrome_urls();
        let labels: Vec<_> = mangler.rules().iter().filter_map(|r| r.label()).collect();
        assert_eq!(
            labels,
            [
                "heading",
                "chrome-urls link",
                "url anchors",
                "debug url anchors",
                "inactive url items",
                "debug url items",
                "command url items",
            ]
        );
    }
}
