use crate::element::{Element, ElementData};
use crate::error::{Error, Result};
use crate::parser::{DocumentParser, ParseResult, ReadOptions};
use quick_xml::events::attributes::Attribute as XmlAttribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

/// `key="value"` pair, stored as a child node of its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Attribute {
        Attribute {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Child of an [`Element`], kept in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Attribute(Attribute),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<Element> {
        match self {
            Self::Element(elem) => Some(*elem),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Attribute(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn build_text_content<'a>(&self, document: &'a Document, buf: &'a mut String) {
        match self {
            Node::Element(elem) => elem.build_text_content(document, buf),
            Node::Text(text) => buf.push_str(text),
            Node::Attribute(_) => {}
        }
    }

    /// Returns content if node is `Text`.
    /// If node is `Element`, return [Element::text_content()]
    pub fn text_content(&self, document: &Document) -> String {
        let mut buf = String::new();
        self.build_text_content(document, &mut buf);
        buf
    }
}

/// Options when writing xml.
///
/// `indent_size`: number of `indent_char` per nesting level. `0` writes everything on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub indent_char: u8,
    pub indent_size: usize,
}

impl Default for WriteOptions {
    fn default() -> WriteOptions {
        WriteOptions {
            indent_char: b' ',
            indent_size: 2,
        }
    }
}

/// Represents a XML document.
///
/// Use [`Document::parse_str()`], [`Document::parse_reader()`], or [`Document::from_str()`] to parse xml.
///
/// # Examples
/// ```
/// use simple_xml_doc::Document;
/// use std::str::FromStr;
///
/// let mut doc = Document::from_str(r#"<?xml version="1.0" encoding="UTF-8"?>
/// <package>
///     <metadata>
///         <author>Lewis Carol</author>
///     </metadata>
/// </package>
/// "#).unwrap();
/// let author_elem = doc
///   .root_element()
///   .unwrap()
///   .find(&doc, "metadata")
///   .unwrap()
///   .find(&doc, "author")
///   .unwrap();
/// author_elem.set_text(&mut doc, "Lewis Carroll");
/// let xml = doc.write_str().unwrap();
/// assert!(xml.contains("Lewis Carroll"));
/// ```
#[derive(Debug)]
pub struct Document {
    pub(crate) store: Vec<ElementData>,
    pub(crate) root: Option<Element>,

    pub(crate) declarations: HashMap<String, HashMap<String, String>>,
    pub(crate) default_namespace: String,
    pub(crate) namespaces: HashMap<String, String>,
}

impl Document {
    /// Create a blank new xml document.
    pub fn new() -> Document {
        Document {
            store: Vec::new(),
            root: None,
            declarations: HashMap::new(),
            default_namespace: String::new(),
            namespaces: HashMap::new(),
        }
    }

    /// Returns `true` if the document has no root element.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Get the root element of document.
    pub fn root_element(&self) -> Option<Element> {
        self.root
    }

    /// Creates the root element of an empty document.
    ///
    /// # Errors
    ///
    /// - [`Error::RootExists`]: The document already has a root.
    pub fn create_root<S: Into<String>>(&mut self, name: S) -> Result<Element> {
        if self.root.is_some() {
            return Err(Error::RootExists);
        }
        let root = Element::new(self, name);
        self.root = Some(root);
        Ok(root)
    }

    /// Declarations (`<?target key="value"?>`) keyed by target name.
    pub fn declarations(&self) -> &HashMap<String, HashMap<String, String>> {
        &self.declarations
    }

    pub fn declaration(&self, target: &str) -> Option<&HashMap<String, String>> {
        self.declarations.get(target)
    }

    /// Sets `key="value"` on the declaration `target`, creating it if needed.
    pub fn set_declaration<T, K, V>(&mut self, target: T, key: K, value: V)
    where
        T: Into<String>,
        K: Into<String>,
        V: Into<String>,
    {
        self.declarations
            .entry(target.into())
            .or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    pub fn remove_declaration(&mut self, target: &str) -> Option<HashMap<String, String>> {
        self.declarations.remove(target)
    }

    /// Value of the last `xmlns` attribute read, or `""`.
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// `prefix => uri` for every `xmlns:prefix` attribute read.
    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

// Read and write
impl Document {
    /// Parses xml string. Fails on the first problem found.
    ///
    /// This includes a literal `]]>` in text, such as the trailing `]]>` of
    /// `<a><![CDATA[x]]y]]>done]]></a>`. Use [`Document::parse_str_with_opts`]
    /// with `recover` to read such text anyway, the `>` being dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedXML`]: The first lex or structural problem.
    pub fn parse_str(str: &str) -> Result<Document> {
        Ok(DocumentParser::parse_str(str, ReadOptions::default())?.document)
    }

    /// Parses xml string with options. With `opts.recover` set, this never
    /// fails and returns every problem in [`ParseResult::diagnostics`].
    pub fn parse_str_with_opts(str: &str, opts: ReadOptions) -> Result<ParseResult> {
        DocumentParser::parse_str(str, opts)
    }

    /// Decodes bytes to text and parses it.
    ///
    /// # Errors
    ///
    /// - [`Error::CannotDecode`]: Could not decode XML.
    /// - [`Error::MalformedXML`]: Could not read XML.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Document> {
        Ok(DocumentParser::parse_bytes(bytes, ReadOptions::default())?.document)
    }

    pub fn parse_bytes_with_opts(bytes: &[u8], opts: ReadOptions) -> Result<ParseResult> {
        DocumentParser::parse_bytes(bytes, opts)
    }

    /// Reads everything from reader, then parses it.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`]: IO Error
    /// - [`Error::CannotDecode`]: Could not decode XML.
    /// - [`Error::MalformedXML`]: Could not read XML.
    pub fn parse_reader<R: Read>(reader: R) -> Result<Document> {
        Ok(DocumentParser::parse_reader(reader, ReadOptions::default())?.document)
    }

    pub fn parse_reader_with_opts<R: Read>(reader: R, opts: ReadOptions) -> Result<ParseResult> {
        DocumentParser::parse_reader(reader, opts)
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
        Ok(Self::parse_file_with_opts(path, ReadOptions::default())?.document)
    }

    pub fn parse_file_with_opts<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<ParseResult> {
        let bytes = std::fs::read(path)?;
        DocumentParser::parse_bytes(&bytes, opts)
    }

    /// Writes document as xml string.
    pub fn write_str(&self) -> Result<String> {
        self.write_str_with_opts(WriteOptions::default())
    }

    pub fn write_str_with_opts(&self, opts: WriteOptions) -> Result<String> {
        let mut buf: Vec<u8> = Vec::with_capacity(200);
        self.write_with_opts(&mut buf, opts)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write document to writer. Will be written in UTF-8.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        self.write_with_opts(writer, WriteOptions::default())
    }

    pub fn write_with_opts(&self, writer: &mut impl Write, opts: WriteOptions) -> Result<()> {
        let mut writer = if opts.indent_size == 0 {
            Writer::new(writer)
        } else {
            Writer::new_with_indent(writer, opts.indent_char, opts.indent_size)
        };
        self.write_decls(&mut writer)?;
        if let Some(root) = self.root {
            self.write_element(&mut writer, root)?;
        }
        writer.write_event(Event::Eof)?;
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.write(&mut file)?;
        file.flush()?;
        Ok(())
    }

    // Sorted, so that output doesn't depend on HashMap order.
    fn write_decls(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        let mut targets: Vec<&String> = self.declarations.keys().collect();
        targets.sort();
        for target in targets {
            let mut attrs: Vec<(&String, &String)> = self.declarations[target].iter().collect();
            attrs.sort();
            let mut content = target.clone();
            for (key, value) in attrs {
                content.push_str(&format!(" {}=\"{}\"", key, value));
            }
            writer.write_event(Event::PI(BytesText::from_escaped_str(content.as_str())))?;
        }
        Ok(())
    }

    fn write_element(&self, writer: &mut Writer<impl Write>, root: Element) -> Result<()> {
        // `true` once the start tag of the element is written.
        let mut stack = vec![(root, false)];
        while let Some((element, entered)) = stack.pop() {
            let name_bytes = element.name(self).as_bytes();
            if entered {
                writer.write_event(Event::End(BytesEnd::borrowed(name_bytes)))?;
                continue;
            }
            let mut start = BytesStart::borrowed_name(name_bytes);
            for node in element.nodes(self) {
                if let Node::Attribute(attr) = node {
                    // Values are written as-is, there is no entity support to escape into.
                    start.push_attribute(XmlAttribute {
                        key: attr.key.as_bytes(),
                        value: Cow::Borrowed(attr.value.as_bytes()),
                    });
                }
            }
            // Never written as an empty tag: <a/> is read back as <a></a>.
            writer.write_event(Event::Start(start))?;
            let text = element.text(self);
            if text.contains('<') || text.contains('&') {
                writer.write_event(Event::CData(BytesText::from_escaped_str(text.as_str())))?;
            } else if !text.is_empty() {
                writer.write_event(Event::Text(BytesText::from_escaped_str(text.as_str())))?;
            }
            stack.push((element, true));
            for child in element.child_elements(self).into_iter().rev() {
                stack.push((child, false));
            }
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Document> {
        Document::parse_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_element() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <basic>
            Text
            <c />
        </basic>
        "#;
        let mut document = Document::from_str(xml).unwrap();
        let basic = document.root_element().unwrap();
        let p = basic.add_child(&mut document, "p");
        assert_eq!(p.parent(&document).unwrap(), basic);
        assert_eq!(
            p,
            basic
                .nodes(&document)
                .last()
                .unwrap()
                .as_element()
                .unwrap()
        );
        assert_eq!(basic.child_elements(&document).len(), 2);
    }

    #[test]
    fn test_declarations() {
        let doc = Document::parse_str(r#"<?xml version="1.0" encoding="UTF-8"?><a/>"#).unwrap();
        let decl = doc.declaration("xml").unwrap();
        assert_eq!(decl.len(), 2);
        assert_eq!(decl["version"], "1.0");
        assert_eq!(decl["encoding"], "UTF-8");
        assert_eq!(doc.root_element().unwrap().name(&doc), "a");
    }

    #[test]
    fn test_repeated_declaration_merges() {
        let doc =
            Document::parse_str(r#"<?pi a="1"?><?pi b="2"?><?pi a="3"?><root/>"#).unwrap();
        let decl = doc.declaration("pi").unwrap();
        assert_eq!(decl.len(), 2);
        assert_eq!(decl["a"], "3");
        assert_eq!(decl["b"], "2");
    }

    #[test]
    fn test_namespaces() {
        let doc = Document::parse_str(
            r#"<root xmlns="urn:default" xmlns:p="urn:p"><p:child xmlns:q="urn:q"/></root>"#,
        )
        .unwrap();
        assert_eq!(doc.default_namespace(), "urn:default");
        assert_eq!(doc.namespaces().len(), 2);
        assert_eq!(doc.namespaces()["p"], "urn:p");
        assert_eq!(doc.namespaces()["q"], "urn:q");
        // xmlns attributes stay on their element too
        let root = doc.root_element().unwrap();
        assert_eq!(root.attribute(&doc, "xmlns"), Some("urn:default"));
    }

    #[test]
    fn test_create_root() {
        let mut doc = Document::new();
        assert!(doc.is_empty());
        let root = doc.create_root("config").unwrap();
        assert!(root.is_root(&doc));
        assert!(root.parent(&doc).is_none());
        assert!(matches!(doc.create_root("other"), Err(Error::RootExists)));
        doc.set_declaration("xml", "version", "1.0");
        assert_eq!(doc.declaration("xml").unwrap()["version"], "1.0");
        assert!(doc.remove_declaration("xml").is_some());
        assert!(doc.declarations().is_empty());
    }

    #[test]
    fn test_write_compact() {
        let mut doc = Document::new();
        doc.set_declaration("xml", "version", "1.0");
        let root = doc.create_root("a").unwrap();
        root.add_attribute(&mut doc, "x", "1");
        root.set_text(&mut doc, "hi");
        root.add_child(&mut doc, "b");
        let c = root.add_child(&mut doc, "c");
        c.set_text(&mut doc, "t");
        let opts = WriteOptions {
            indent_char: b' ',
            indent_size: 0,
        };
        assert_eq!(
            doc.write_str_with_opts(opts).unwrap(),
            r#"<?xml version="1.0"?><a x="1">hi<b></b><c>t</c></a>"#
        );
    }

    #[test]
    fn test_write_deep_document() {
        let depth = 100_000;
        let xml = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let doc = Document::parse_str(&xml).unwrap();
        let opts = WriteOptions {
            indent_char: b' ',
            indent_size: 0,
        };
        assert_eq!(doc.write_str_with_opts(opts).unwrap(), xml);
    }

    #[test]
    fn test_write_empty_document() {
        let doc = Document::new();
        assert_eq!(doc.write_str().unwrap(), "");
    }
}
