use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use xylem::Document;

fn sample_document(items: usize) -> String {
    let mut src = String::from("<catalog xmlns:m=\"urn:meta\">");
    for i in 0..items {
        src.push_str(&format!(
            "<item id=\"{i}\" m:rank=\"{}\"><name>item-{i}</name><price>{}.50</price></item>",
            i % 7,
            i % 100
        ));
    }
    src.push_str("</catalog>");
    src
}

fn bench_parse(c: &mut Criterion) {
    let src = sample_document(1000);
    c.bench_function("parse_1k_items", |b| {
        b.iter(|| Document::parse_str(black_box(&src)).unwrap())
    });
}

fn bench_xpath(c: &mut Criterion) {
    let src = sample_document(1000);
    let doc = Document::parse_str(&src).unwrap();
    c.bench_function("xpath_attribute_filter", |b| {
        b.iter(|| xylem::xpath(black_box(&doc), "//item[@id='500']/price").unwrap())
    });
    c.bench_function("xpath_union_sort", |b| {
        b.iter(|| xylem::xpath(black_box(&doc), "//price | //name").unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_xpath);
criterion_main!(benches);
