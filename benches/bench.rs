use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

/// `<catalog>` with `count` books, each with attributes, text and a nested element.
fn generate(count: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<catalog>\n");
    for i in 0..count {
        writeln!(
            xml,
            "  <book id=\"bk{}\" lang=\"en\">\n    <title>Title number {}</title>\n    <price>{}.95</price>\n    <note><![CDATA[a < b]]></note>\n    <empty/>\n  </book>",
            i, i, i % 100
        )
        .unwrap();
    }
    xml.push_str("</catalog>\n");
    xml
}

macro_rules! bench {
    ($count:literal, $name:ident, $func:path) => {
        fn $name(c: &mut Criterion) {
            let xml = generate($count);
            c.bench_function(stringify!($name), |b| b.iter(|| $func(&xml)));
        }
    };
}

fn xmldoc_parse(xml: &str) {
    let doc = simple_xml_doc::Document::parse_str(xml).unwrap();
    black_box(doc);
}
bench!(10, tiny_xmldoc, xmldoc_parse);
bench!(1000, medium_xmldoc, xmldoc_parse);
bench!(20000, large_xmldoc, xmldoc_parse);

fn xmldoc_tokenize(xml: &str) -> usize {
    let mut count = 0;
    simple_xml_doc::tokenize(xml, |_, _| count += 1);
    count
}
bench!(1000, medium_tokenize, xmldoc_tokenize);

fn xmldoc_roundtrip(xml: &str) {
    let doc = simple_xml_doc::Document::parse_str(xml).unwrap();
    black_box(doc.write_str().unwrap());
}
bench!(1000, medium_roundtrip, xmldoc_roundtrip);

fn roxmltree_parse(xml: &str) {
    let doc = roxmltree::Document::parse(xml).unwrap();
    black_box(doc);
}
bench!(10, tiny_roxmltree, roxmltree_parse);
bench!(1000, medium_roxmltree, roxmltree_parse);
bench!(20000, large_roxmltree, roxmltree_parse);

criterion_group! {
    name = tiny;
    config = Criterion::default().sample_size(200);
    targets = tiny_xmldoc, tiny_roxmltree
}

criterion_group!(
    medium,
    medium_xmldoc,
    medium_roxmltree,
    medium_tokenize,
    medium_roundtrip,
);

criterion_group! {
    name = large;
    config = Criterion::default().sample_size(50);
    targets = large_xmldoc, large_roxmltree
}

criterion_main!(tiny, medium, large);
