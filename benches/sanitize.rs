use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

/// A newsletter-style body: nested layout tables, inline styles, tracking pixels.
fn newsletter_html() -> String {
    let row = "<tr><td width=\"600\" style=\"padding:10px\" bgcolor=\"#ffffff\">\
               <p style=\"font-size:14px\">Item <b>description</b> with a \
               <a href=\"https://example.com/?utm=1\">link</a></p>\
               <img src=\"https://example.com/pixel.gif\" width=\"1\" height=\"1\"></td></tr>";
    format!(
        "<html><head><style>td {{ height: 40px }}</style></head><body>\
         <table>{}</table><script>track()</script></body></html>",
        row.repeat(200)
    )
}

fn bench_sanitize(c: &mut Criterion) {
    let html = newsletter_html();
    c.bench_function("sanitize_newsletter", |b| {
        b.iter(|| mailbinder::sanitize::sanitize_html(&html))
    });

    let deep = "<div>".repeat(5_000);
    c.bench_function("sanitize_deep_nesting", |b| {
        b.iter(|| mailbinder::sanitize::sanitize_html(&deep))
    });
}

fn bench_mbox_run(c: &mut Criterion) {
    let fixture_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("inbox.mbox");

    c.bench_function("load_and_extract_fixture", |b| {
        b.iter(|| {
            let source = mailbinder::source::MboxSource::open(&fixture_path).unwrap();
            let refs =
                mailbinder::source::MailSource::list_matching(&source, "").unwrap();
            refs.iter()
                .map(|r| {
                    let msg =
                        mailbinder::source::MailSource::get_message(&source, &r.id).unwrap();
                    mailbinder::parser::body::extract_html_body(&msg.payload).len()
                })
                .sum::<usize>()
        })
    });
}

criterion_group!(benches, bench_sanitize, bench_mbox_run);
criterion_main!(benches);
