use divan::{Bencher, black_box};
use lit_mangler::overrides::chrome_urls;
use lit_mangler::{Document, Mangler, Matcher, Predicate, Rule};

fn main() {
    divan::main();
}

const CHROME_URLS: &str = include_str!("../tests/fixtures/chrome_urls/app.html");

/// A long list of identical fragments.
fn repeated_fragments(count: usize) -> String {
    let mut out = String::from("<h2>List of Chrome URLs</h2>\n<ul>\n");
    for _ in 0..count {
        out.push_str("  <template><li><a href=\"${info.url.url}\">${info.url.url}</a></li></template>\n");
    }
    out.push_str("</ul>\n<p>For debug, see <a href=\"#\">chrome://chrome-urls</a></p>\n");
    out
}

#[divan::bench]
fn parse_chrome_urls(bencher: Bencher) {
    bencher.bench_local(|| {
        let doc = Document::parse(black_box(CHROME_URLS));
        black_box(doc)
    });
}

#[divan::bench]
fn apply_chrome_urls(bencher: Bencher) {
    let mangler = chrome_urls();
    let doc = Document::parse(CHROME_URLS).expect("fixture parses");
    bencher.bench_local(|| {
        let mut doc = doc.clone();
        let report = mangler.apply(black_box(&mut doc));
        black_box(report)
    });
}

#[divan::bench(args = [10, 100, 1000])]
fn apply_full_scan(bencher: Bencher, count: usize) {
    let source = repeated_fragments(count);
    let doc = Document::parse(&source).expect("generated source parses");

    // The first rule never matches, so every fragment gets serialized once.
    let mut mangler = Mangler::new();
    mangler.register(
        Rule::new(|el| el.require("a")?.replace_text("${info.url.url}", "never"))
            .when(Predicate::custom(|c, _| {
                c.tag() == "template" && c.text().contains("\"#\"")
            })),
    );
    mangler.register(
        Rule::new(|el| el.require("a")?.replace_text("${info.url.url}", "first"))
            .when(Predicate::matching(Matcher::new().on_tag("template"))),
    );

    bencher.bench_local(|| {
        let mut doc = doc.clone();
        let report = mangler.apply(black_box(&mut doc));
        black_box(report)
    });
}

#[divan::bench]
fn serialize_chrome_urls(bencher: Bencher) {
    let doc = Document::parse(CHROME_URLS).expect("fixture parses");
    bencher.bench_local(|| black_box(&doc).to_html());
}
