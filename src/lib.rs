//! Read, inspect, modify and write xml documents.
//!
//! Text is scanned by a hand written [`Lexer`] and assembled into a
//! [`Document`] in a single pass. Elements are [`Element`] handles into the
//! document, and their children ([`Node`]s) are attributes, text and other
//! elements in document order.
//!
//! ```
//! use simple_xml_doc::{Document, DiagnosticKind, ReadOptions};
//!
//! let result = Document::parse_str_with_opts(
//!     "<a><b></c></a>",
//!     ReadOptions { recover: true },
//! )
//! .unwrap();
//! assert_eq!(result.diagnostics[0].kind, DiagnosticKind::MismatchedEndTag);
//! ```
//!
//! Comments are skipped, CDATA is folded into text, and entity references
//! are reported as lex errors.

mod document;
mod element;
mod error;
mod lexer;
mod parser;

pub use crate::document::{Attribute, Document, Node, WriteOptions};
pub use crate::element::Element;
pub use crate::error::{Diagnostic, DiagnosticKind, Error, Position, Result};
pub use crate::lexer::{tokenize, Lexer, Token};
pub use crate::parser::{ParseResult, ReadOptions};
