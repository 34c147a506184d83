use crate::document::{Attribute, Document, Node};
use crate::element::Element;
use crate::error::{Diagnostic, DiagnosticKind, Error, Position, Result};
use crate::lexer::{Lexer, Token};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use tracing::{debug, trace};

/// Options when parsing xml.
///
/// `recover`: keep going after a problem and report every problem in
/// [`ParseResult::diagnostics`], instead of failing on the first one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadOptions {
    pub recover: bool,
}

/// A parsed document together with the problems found while parsing it.
///
/// `diagnostics` is always empty unless [`ReadOptions::recover`] is set.
#[derive(Debug)]
pub struct ParseResult {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_well_formed(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

pub(crate) struct DocumentParser {
    document: Document,
    read_opts: ReadOptions,
    cursor: Option<Element>,
    pending_attributes: Vec<Attribute>,
    diagnostics: Vec<Diagnostic>,
}

impl DocumentParser {
    pub(crate) fn new(opts: ReadOptions) -> DocumentParser {
        DocumentParser {
            document: Document::new(),
            read_opts: opts,
            cursor: None,
            pending_attributes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn parse_str(text: &str, opts: ReadOptions) -> Result<ParseResult> {
        let mut parser = DocumentParser::new(opts);
        let mut lexer = Lexer::new(text);
        for (token, position) in &mut lexer {
            parser.handle_token(token, position)?;
        }
        parser.finish(lexer.current_position())?;
        Ok(ParseResult {
            document: parser.document,
            diagnostics: parser.diagnostics,
        })
    }

    pub(crate) fn parse_bytes(bytes: &[u8], opts: ReadOptions) -> Result<ParseResult> {
        let text = decode(bytes)?;
        Self::parse_str(&text, opts)
    }

    pub(crate) fn parse_reader<R: Read>(mut reader: R, opts: ReadOptions) -> Result<ParseResult> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::parse_bytes(&bytes, opts)
    }

    fn report(&mut self, kind: DiagnosticKind, message: String, position: Position) -> Result<()> {
        let diagnostic = Diagnostic {
            kind,
            message,
            position,
        };
        debug!(%diagnostic, "xml diagnostic");
        if !self.read_opts.recover {
            return Err(Error::MalformedXML(diagnostic));
        }
        self.diagnostics.push(diagnostic);
        Ok(())
    }

    fn new_element(&mut self, name: String) -> Element {
        let attributes = std::mem::take(&mut self.pending_attributes);
        Element::with_attributes(&mut self.document, name, attributes)
    }

    fn handle_token(&mut self, token: Token, position: Position) -> Result<()> {
        trace!(?token, %position, "xml token");
        match token {
            Token::Attribute { key, value } => {
                if key.starts_with("xmlns") {
                    match key.split_once(':') {
                        Some((_, prefix)) => {
                            self.document
                                .namespaces
                                .insert(prefix.to_string(), value.clone());
                        }
                        None => self.document.default_namespace = value.clone(),
                    }
                }
                self.pending_attributes.push(Attribute { key, value });
                Ok(())
            }
            Token::StartTag(name) => match self.cursor {
                Some(parent) => {
                    let element = self.new_element(name);
                    parent.append_new(&mut self.document, Node::Element(element));
                    self.cursor = Some(element);
                    Ok(())
                }
                None if self.document.root.is_none() => {
                    let element = self.new_element(name);
                    self.document.root = Some(element);
                    self.cursor = Some(element);
                    Ok(())
                }
                None => self.multiple_roots(name, position),
            },
            Token::SelfClosingTag(name) => match self.cursor {
                Some(parent) => {
                    let element = self.new_element(name);
                    parent.append_new(&mut self.document, Node::Element(element));
                    Ok(())
                }
                None if self.document.root.is_none() => {
                    let element = self.new_element(name);
                    self.document.root = Some(element);
                    Ok(())
                }
                None => self.multiple_roots(name, position),
            },
            Token::EndTag(name) => match self.cursor {
                Some(open) if open.name(&self.document) == name => {
                    self.cursor = open.parent(&self.document);
                    Ok(())
                }
                Some(open) => {
                    let message = format!(
                        "expected </{}>, found </{}>",
                        open.name(&self.document),
                        name
                    );
                    self.report(DiagnosticKind::MismatchedEndTag, message, position)
                }
                None => self.report(
                    DiagnosticKind::UnmatchedEndTag,
                    format!("</{}> has no matching start tag", name),
                    position,
                ),
            },
            Token::Text(content) => match self.cursor {
                Some(open) => {
                    open.append_new(&mut self.document, Node::Text(content));
                    Ok(())
                }
                None => self.report(
                    DiagnosticKind::TextOutsideElement,
                    format!("text {:?} is outside of any element", content),
                    position,
                ),
            },
            Token::Declaration { target, attributes } => {
                self.document
                    .declarations
                    .entry(target)
                    .or_insert_with(HashMap::new)
                    .extend(attributes);
                Ok(())
            }
            Token::Error(message) => self.report(DiagnosticKind::Lex, message, position),
        }
    }

    fn multiple_roots(&mut self, name: String, position: Position) -> Result<()> {
        // The element is dropped along with the attributes read for it.
        self.pending_attributes.clear();
        self.report(
            DiagnosticKind::MultipleRoots,
            format!("<{}> is a second root element", name),
            position,
        )
    }

    fn finish(&mut self, end: Position) -> Result<()> {
        if let Some(open) = self.cursor {
            let message = format!("<{}> is never closed", open.name(&self.document));
            self.report(DiagnosticKind::UnterminatedElement, message, end)?;
        }
        Ok(())
    }
}

/// Decodes raw input to text.
///
/// A BOM or a UTF-16 encoded `<?` decides the encoding. Otherwise the
/// `encoding` of the xml declaration is used, defaulting to UTF-8.
pub(crate) fn decode(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (init_encoding, bom_len) = match bytes {
        [0xfe, 0xff, ..] => (UTF_16BE, 2), // UTF-16 BE BOM
        [0xff, 0xfe, ..] => (UTF_16LE, 2), // UTF-16 LE BOM
        [0xef, 0xbb, 0xbf, ..] => (UTF_8, 3),
        [0x00, 0x3c, 0x00, 0x3f, ..] => (UTF_16BE, 0),
        [0x3c, 0x00, 0x3f, 0x00, ..] => (UTF_16LE, 0),
        _ => (UTF_8, 0),
    };
    let body = &bytes[bom_len..];
    let mut encoding = init_encoding;
    if bom_len == 0 && init_encoding == UTF_8 {
        let head = String::from_utf8_lossy(&body[..body.len().min(1024)]);
        if let Some(label) = declared_encoding(&head) {
            let declared = Encoding::for_label(label.as_bytes()).ok_or(Error::CannotDecode)?;
            // Without a BOM or UTF-16 `<?`, the text can't be UTF-16 whatever the label says.
            if declared != UTF_16LE && declared != UTF_16BE {
                encoding = declared;
            }
        }
    }
    if encoding != init_encoding {
        debug!(encoding = encoding.name(), "decoding with declared encoding");
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or(Error::CannotDecode)
}

fn declared_encoding(head: &str) -> Option<String> {
    let head = head.trim_start();
    if !head.starts_with("<?xml") {
        return None;
    }
    let end = head.find("?>")? + 2;
    Lexer::new(&head[..end]).find_map(|(token, _)| match token {
        Token::Declaration { target, attributes } if target == "xml" => attributes
            .into_iter()
            .find(|(key, _)| key == "encoding")
            .map(|(_, value)| value),
        _ => None,
    })
}
