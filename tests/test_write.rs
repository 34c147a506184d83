use simple_xml_doc::{Document, Element, Node, WriteOptions};
use std::collections::HashMap;

fn compact() -> WriteOptions {
    WriteOptions {
        indent_char: b' ',
        indent_size: 0,
    }
}

#[test]
fn test_write_built_document() {
    let expected = r#"<?xml encoding="UTF-8" version="1.0"?><root attr="attrval" attr="again"><inner xmlns:ns="nsval">text</inner><empty></empty></root>"#;
    let mut doc = Document::new();
    doc.set_declaration("xml", "version", "1.0");
    doc.set_declaration("xml", "encoding", "UTF-8");
    let root = doc.create_root("root").unwrap();
    root.add_attribute(&mut doc, "attr", "attrval");
    root.add_attribute(&mut doc, "attr", "again");
    let inner = root.add_child(&mut doc, "inner");
    inner.add_attribute(&mut doc, "xmlns:ns", "nsval");
    inner.set_text(&mut doc, "text");
    let empty = Element::new(&mut doc, "empty");
    root.push_child(&mut doc, Node::Element(empty)).unwrap();
    let xml = doc.write_str_with_opts(compact()).unwrap();

    assert_eq!(xml, expected);
}

#[test]
fn test_self_closing_is_written_as_pair() {
    let doc = Document::parse_str(r#"<a><b k="v"/></a>"#).unwrap();
    assert_eq!(
        doc.write_str_with_opts(compact()).unwrap(),
        r#"<a><b k="v"></b></a>"#
    );
}

#[test]
fn test_text_before_children() {
    let doc = Document::parse_str("<a>one<b>two</b>three</a>").unwrap();
    assert_eq!(
        doc.write_str_with_opts(compact()).unwrap(),
        "<a>onethree<b>two</b></a>"
    );
}

#[test]
fn test_markup_text_written_as_cdata() {
    let mut doc = Document::parse_str("<a><![CDATA[1 < 2 & 3]]></a>").unwrap();
    let xml = doc.write_str_with_opts(compact()).unwrap();
    assert_eq!(xml, "<a><![CDATA[1 < 2 & 3]]></a>");

    let a = doc.root_element().unwrap();
    a.set_text(&mut doc, "<b>");
    let xml = doc.write_str_with_opts(compact()).unwrap();
    let reread = Document::parse_str(&xml).unwrap();
    assert_eq!(reread.root_element().unwrap().text(&reread), "<b>");
}

#[test]
fn test_edit_then_write() {
    let xml = r#"<?xml version="1.0"?>
<library>
    <book id="1" lang="en">
        <title>Old Title</title>
    </book>
    <book id="2">
        <title>Other</title>
    </book>
</library>"#;
    let mut doc = Document::parse_str(xml).unwrap();
    let library = doc.root_element().unwrap();
    let first = library.find(&doc, "book").unwrap();
    first
        .find(&doc, "title")
        .unwrap()
        .set_text(&mut doc, "New Title");
    first.update_attribute(&mut doc, "lang", "fr");
    first.delete_attribute(&mut doc, "id");
    library.child_elements(&doc)[1].delete(&mut doc).unwrap();
    let added = library.add_child(&mut doc, "magazine");
    added.add_attribute(&mut doc, "issue", "7");

    assert_eq!(
        doc.write_str_with_opts(compact()).unwrap(),
        r#"<?xml version="1.0"?><library><book lang="fr"><title>New Title</title></book><magazine issue="7"></magazine></library>"#
    );
}

type Outline = Vec<(String, HashMap<String, String>, String)>;

fn outline(doc: &Document, elem: Element, out: &mut Outline) {
    out.push((elem.name(doc).to_string(), elem.attributes(doc), elem.text(doc)));
    for child in elem.child_elements(doc) {
        outline(doc, child, out);
    }
}

#[test]
fn test_read_write_read_keeps_structure() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<?style href="main.css"?>
<root xmlns="urn:r" xmlns:p="urn:p">
    <p:item key="a" other="b">first</p:item>
    <item>second <![CDATA[<raw>]]></item>
    <nested><deeper><deepest>bottom</deepest></deeper>tail</nested>
</root>"#;
    let doc = Document::parse_str(xml).unwrap();
    for opts in vec![WriteOptions::default(), compact()] {
        let written = doc.write_str_with_opts(opts).unwrap();
        let reread = Document::parse_str(&written).unwrap();

        let mut before = Vec::new();
        outline(&doc, doc.root_element().unwrap(), &mut before);
        let mut after = Vec::new();
        outline(&reread, reread.root_element().unwrap(), &mut after);
        assert_eq!(before, after);
        assert_eq!(doc.declarations(), reread.declarations());
        assert_eq!(doc.namespaces(), reread.namespaces());
        assert_eq!(doc.default_namespace(), reread.default_namespace());
    }
}

#[test]
fn test_write_file() {
    let path = std::env::temp_dir().join("simple_xml_doc_test_write_file.xml");
    let mut doc = Document::new();
    let root = doc.create_root("saved").unwrap();
    root.set_text(&mut doc, "on disk");
    doc.write_file(&path).unwrap();

    let reread = Document::parse_file(&path).unwrap();
    let root = reread.root_element().unwrap();
    assert_eq!(root.name(&reread), "saved");
    assert_eq!(root.text(&reread), "on disk");
    std::fs::remove_file(&path).unwrap();
}
