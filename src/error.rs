use quick_xml::Error as XMLError;
use std::fmt;
use std::string::FromUtf8Error;

/// Wrapper around `std::Result`
pub type Result<T> = std::result::Result<T, Error>;

/// Location of a character in the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number, counted in characters.
    pub column: usize,
    /// 0-based byte offset.
    pub offset: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// What went wrong while reading a document.
///
/// [`DiagnosticKind::Lex`] comes from the lexer, every other kind is
/// structural and comes from tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Character not allowed at this point of a tag, comment, CDATA or declaration.
    Lex,
    /// A second top-level element.
    MultipleRoots,
    /// End tag name differs from the currently open element.
    MismatchedEndTag,
    /// End tag while no element is open.
    UnmatchedEndTag,
    /// Non-blank text while no element is open.
    TextOutsideElement,
    /// Input ended while an element was still open.
    UnterminatedElement,
}

impl DiagnosticKind {
    pub fn is_structural(&self) -> bool {
        !matches!(self, DiagnosticKind::Lex)
    }
}

/// A single problem found while parsing. Parsing in recover mode
/// collects these instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub position: Position,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.kind.is_structural() {
            "structural error"
        } else {
            "lex error"
        };
        write!(f, "{} at {}: {}", kind, self.position, self.message)
    }
}

/// Error types
#[derive(Debug)]
pub enum Error {
    /// [`std::io`] related error, raised while reading input or writing output.
    Io(std::io::Error),
    /// Decoding related error.
    /// Maybe the XML declaration has an encoding value that it doesn't recognize,
    /// or it doesn't match its actual encoding,
    CannotDecode,
    /// First problem found while parsing with `recover` turned off.
    MalformedXML(Diagnostic),
    /// The root element cannot be detached or deleted.
    RootCannotMove,
    /// You need to call `element.detatch()` before assigning another parent.
    HasAParent,
    /// Element was not found among the children of its parent.
    NotFound,
    /// The document already has a root element.
    RootExists,
    /// The element was deleted and can no longer be attached to a tree.
    Deleted,
    /// An element can't become a child of itself or of its own descendant.
    IsAnAncestor,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO Error: {}", err),
            Error::CannotDecode => write!(f, "Cannot decode XML"),
            Error::MalformedXML(diag) => write!(f, "Malformed XML: {}", diag),
            Error::RootCannotMove => write!(f, "Root element cannot move"),
            Error::HasAParent => write!(
                f,
                "Element already has a parent. Call detatch() before changing parent."
            ),
            Error::NotFound => write!(f, "Element not found"),
            Error::RootExists => write!(f, "Document already has a root element"),
            Error::Deleted => write!(f, "Element was deleted"),
            Error::IsAnAncestor => write!(f, "Element is an ancestor of its new parent"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<XMLError> for Error {
    fn from(err: XMLError) -> Error {
        match err {
            XMLError::Io(err) => Error::Io(err),
            // The writer only ever fails on its sink.
            err => Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                err.to_string(),
            )),
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_: FromUtf8Error) -> Error {
        Error::CannotDecode
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic {
            kind: DiagnosticKind::MismatchedEndTag,
            message: "expected </b>, found </c>".to_string(),
            position: Position {
                line: 2,
                column: 7,
                offset: 12,
            },
        };
        assert_eq!(
            diag.to_string(),
            "structural error at 2:7: expected </b>, found </c>"
        );
        let err = Error::MalformedXML(diag);
        assert_eq!(
            err.to_string(),
            "Malformed XML: structural error at 2:7: expected </b>, found </c>"
        );
    }

    #[test]
    fn test_io_error_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&Error::CannotDecode).is_none());
        assert!(!DiagnosticKind::Lex.is_structural());
        assert!(DiagnosticKind::UnterminatedElement.is_structural());
    }
}
