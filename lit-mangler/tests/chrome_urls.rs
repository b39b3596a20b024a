//! The `chrome://chrome-urls` override against a snapshot of its template.

use facet_testhelpers::test;
use lit_mangler::overrides::chrome_urls;
use lit_mangler::{Document, StructureError};

const APP: &str = include_str!("fixtures/chrome_urls/app.html");
const EXPECTED: &str = include_str!("fixtures/chrome_urls/expected.html");
const APP_NESTED: &str = include_str!("fixtures/chrome_urls/app_nested.html");
const EXPECTED_NESTED: &str = include_str!("fixtures/chrome_urls/expected_nested.html");

#[test]
fn test_rewrites_snapshot() {
    let mut doc = Document::parse(APP).unwrap();
    let report = chrome_urls().apply(&mut doc).unwrap();

    assert_eq!(report.skipped().count(), 0);
    assert_eq!(doc.to_html(), EXPECTED);
}

#[test]
fn test_rewrites_snapshot_with_conditional_section() {
    let mut doc = Document::parse(APP_NESTED).unwrap();
    let report = chrome_urls().apply(&mut doc).unwrap();

    assert_eq!(report.skipped().count(), 0);
    assert_eq!(doc.to_html(), EXPECTED_NESTED);
}

#[test]
fn test_identical_fragments_rewritten_in_document_order() {
    let mut doc = Document::parse(APP).unwrap();
    let report = chrome_urls().apply(&mut doc).unwrap();

    let first = report.matched(2).unwrap();
    let second = report.matched(3).unwrap();
    assert!(first < second, "{first} should precede {second}");

    let first = report.matched(4).unwrap();
    let second = report.matched(5).unwrap();
    assert!(first < second, "{first} should precede {second}");
}

#[test]
fn test_missing_chrome_urls_link_is_skipped() {
    let source = APP.replace(
        "<p>For debug, see <a href=\"#\">chrome://chrome-urls</a></p>\n",
        "",
    );
    let mut doc = Document::parse(&source).unwrap();
    let report = chrome_urls().apply(&mut doc).unwrap();

    let skipped: Vec<_> = report.skipped().filter_map(|o| o.label.as_deref()).collect();
    assert_eq!(skipped, ["chrome-urls link"]);
}

#[test]
fn test_debug_section_absent() {
    let source = APP.replace(
        "<h2>Internal Debugging Page URLs</h2>\n<ul>\n  <template class=\"enabled\"><li><a href=\"${info.url.url}\">${info.url.url}</a></li></template>\n  <template class=\"disabled\"><li>${info.url.url}</li></template>\n</ul>\n",
        "",
    );
    assert_ne!(source, APP);
    let mut doc = Document::parse(&source).unwrap();
    let report = chrome_urls().apply(&mut doc).unwrap();

    let skipped: Vec<_> = report.skipped().filter_map(|o| o.label.as_deref()).collect();
    assert_eq!(skipped, ["debug url anchors", "debug url items"]);
}

#[test]
fn test_upstream_text_drift_fails() {
    let source = APP.replacen(
        r#"<a href="${info.url.url}">${info.url.url}</a>"#,
        r#"<a href="${info.url.url}">${info.url.url.spec}</a>"#,
        1,
    );
    let mut doc = Document::parse(&source).unwrap();
    let err = chrome_urls().apply(&mut doc).unwrap_err();

    assert!(err.to_string().contains("url anchors"), "{err}");
    assert_eq!(
        err.structure(),
        Some(&StructureError::UnexpectedText {
            tag: "a".to_string(),
            expected: "${info.url.url}".to_string(),
            found: "${info.url.url.spec}".to_string(),
        })
    );
}

#[test]
fn test_missing_heading_fails() {
    let source = APP.replace("h2>", "h3>");
    let mut doc = Document::parse(&source).unwrap();
    let err = chrome_urls().apply(&mut doc).unwrap_err();

    assert_eq!(
        err.structure(),
        Some(&StructureError::MissingDescendant {
            within: "body".to_string(),
            tag: "h2".to_string(),
        })
    );
}
