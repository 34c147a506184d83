//! Single pass scanner turning xml text into [`Token`]s.
//!
//! The scanner is a finite state machine driven one character at a time by
//! `step`. Carriage returns and line feeds never reach a token, but still
//! advance the line counter used for [`Position`]s.
//!
//! Problems never stop the scan: an unexpected character produces a
//! [`Token::Error`] and scanning continues in the same state.

use crate::error::Position;

/// A unit recognized by the [`Lexer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name ...>`, emitted once the tag is closed, after its attributes.
    StartTag(String),
    /// `key="value"` inside a start tag or self-closing tag.
    Attribute { key: String, value: String },
    /// `</name>`
    EndTag(String),
    /// `<name .../>`, emitted after its attributes.
    SelfClosingTag(String),
    /// Trimmed, non-empty character data, with CDATA sections folded in.
    Text(String),
    /// `<?target key="value" ...?>`
    Declaration {
        target: String,
        attributes: Vec<(String, String)>,
    },
    /// Character that is not allowed where it was found.
    Error(String),
}

const CDATA_KEYWORD: [char; 6] = ['C', 'D', 'A', 'T', 'A', '['];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Between tags, accumulating text.
    Text,
    /// Just after `<`.
    TagOpen,
    StartTagName,
    BeforeAttrName,
    AttrName,
    AfterAttrName,
    BeforeAttrValue,
    AttrValue,
    /// Seen `/` in a start tag, `>` must follow.
    SelfClosing,
    /// Just after `</`.
    EndTagOpen,
    EndTagName,
    AfterEndTagName,
    /// Just after `<?`.
    DeclTarget,
    DeclBeforeKey,
    DeclKey,
    DeclBeforeValue,
    DeclValue,
    /// Seen `?` in a declaration, `>` must follow.
    DeclClose,
    /// Just after `<!`.
    MarkupOpen,
    /// Seen `<!-`.
    CommentOpen,
    Comment,
    CommentDash,
    /// Two or more `-` in a row inside a comment.
    CommentDashDash,
    /// Matched this many characters of `CDATA[`.
    CdataKeyword(usize),
    CdataBody,
    CdataBracket,
    CdataBrackets,
}

impl State {
    /// Inside markup a line break separates names like a blank does.
    /// Everywhere else it is dropped.
    fn breaks_as_blank(self) -> bool {
        use State::*;
        matches!(
            self,
            TagOpen
                | StartTagName
                | BeforeAttrName
                | AttrName
                | AfterAttrName
                | BeforeAttrValue
                | EndTagOpen
                | EndTagName
                | AfterEndTagName
                | DeclTarget
                | DeclBeforeKey
                | DeclKey
                | DeclBeforeValue
        )
    }
}

/// Buffers carried between transitions.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    text: String,
    text_start: Option<Position>,
    tag: String,
    tag_start: Position,
    key: String,
    value: String,
    attr_start: Position,
    target: String,
    decl_attributes: Vec<(String, String)>,
}

impl Scratch {
    fn push_text(&mut self, ch: char, pos: Position) {
        if self.text_start.is_none() && !ch.is_whitespace() {
            self.text_start = Some(pos);
        }
        self.text.push(ch);
    }

    fn push_text_str(&mut self, s: &str, pos: Position) {
        for ch in s.chars() {
            self.push_text(ch, pos);
        }
    }

    fn take_text(&mut self) -> Option<(Token, Position)> {
        let text = std::mem::take(&mut self.text);
        let start = self.text_start.take();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some((Token::Text(trimmed.to_string()), start.unwrap_or_default()))
    }

    fn take_start_tag(&mut self) -> Option<(Token, Position)> {
        Some((Token::StartTag(std::mem::take(&mut self.tag)), self.tag_start))
    }

    fn take_self_closing_tag(&mut self) -> Option<(Token, Position)> {
        Some((
            Token::SelfClosingTag(std::mem::take(&mut self.tag)),
            self.tag_start,
        ))
    }

    fn take_end_tag(&mut self) -> Option<(Token, Position)> {
        Some((Token::EndTag(std::mem::take(&mut self.tag)), self.tag_start))
    }

    fn take_attribute(&mut self) -> Option<(Token, Position)> {
        let token = Token::Attribute {
            key: std::mem::take(&mut self.key),
            value: std::mem::take(&mut self.value),
        };
        Some((token, self.attr_start))
    }

    fn take_declaration(&mut self) -> Option<(Token, Position)> {
        self.key.clear();
        self.value.clear();
        let token = Token::Declaration {
            target: std::mem::take(&mut self.target),
            attributes: std::mem::take(&mut self.decl_attributes),
        };
        Some((token, self.tag_start))
    }
}

fn is_blank(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn unexpected(ch: char, pos: Position) -> Option<(Token, Position)> {
    Some((Token::Error(format!("unexpected character {:?}", ch)), pos))
}

/// Feeds one character through the state machine.
///
/// Returns the next state and the token completed by `ch`, if any.
/// `ch` is never `'\r'` or `'\n'`; line breaks inside markup arrive as `' '`.
pub(crate) fn step(
    state: State,
    scratch: &mut Scratch,
    ch: char,
    pos: Position,
) -> (State, Option<(Token, Position)>) {
    use State::*;
    match state {
        Text => match ch {
            '<' => {
                scratch.tag_start = pos;
                (TagOpen, scratch.take_text())
            }
            '&' => (Text, unexpected(ch, pos)),
            '>' if scratch.text.ends_with("]]") => (
                Text,
                Some((Token::Error("\"]]>\" is not allowed in text".to_string()), pos)),
            ),
            _ => {
                scratch.push_text(ch, pos);
                (Text, None)
            }
        },
        TagOpen => match ch {
            '?' => (DeclTarget, None),
            '!' => (MarkupOpen, None),
            '/' => (EndTagOpen, None),
            '<' | '>' | '&' => (TagOpen, unexpected(ch, pos)),
            c if is_blank(c) => (TagOpen, None),
            _ => {
                scratch.tag.push(ch);
                (StartTagName, None)
            }
        },
        StartTagName => match ch {
            '/' => (SelfClosing, None),
            '>' => (Text, scratch.take_start_tag()),
            '<' | '&' => (StartTagName, unexpected(ch, pos)),
            c if is_blank(c) => (BeforeAttrName, None),
            _ => {
                scratch.tag.push(ch);
                (StartTagName, None)
            }
        },
        BeforeAttrName => match ch {
            '/' => (SelfClosing, None),
            '>' => (Text, scratch.take_start_tag()),
            '<' | '&' | '=' => (BeforeAttrName, unexpected(ch, pos)),
            c if is_blank(c) => (BeforeAttrName, None),
            _ => {
                scratch.attr_start = pos;
                scratch.key.push(ch);
                (AttrName, None)
            }
        },
        AttrName => match ch {
            '=' => (BeforeAttrValue, None),
            '<' | '&' | '>' => (AttrName, unexpected(ch, pos)),
            c if is_blank(c) => (AfterAttrName, None),
            _ => {
                scratch.key.push(ch);
                (AttrName, None)
            }
        },
        AfterAttrName => match ch {
            '=' => (BeforeAttrValue, None),
            c if is_blank(c) => (AfterAttrName, None),
            _ => (AfterAttrName, unexpected(ch, pos)),
        },
        BeforeAttrValue => match ch {
            '"' => (AttrValue, None),
            c if is_blank(c) => (BeforeAttrValue, None),
            _ => (BeforeAttrValue, unexpected(ch, pos)),
        },
        AttrValue => match ch {
            '"' => (BeforeAttrName, scratch.take_attribute()),
            '<' | '&' => (AttrValue, unexpected(ch, pos)),
            _ => {
                scratch.value.push(ch);
                (AttrValue, None)
            }
        },
        SelfClosing => match ch {
            '>' => (Text, scratch.take_self_closing_tag()),
            _ => (SelfClosing, unexpected(ch, pos)),
        },
        EndTagOpen => match ch {
            '!' | '/' | '>' | '<' | '&' => (EndTagOpen, unexpected(ch, pos)),
            c if is_blank(c) => (EndTagOpen, None),
            _ => {
                scratch.tag.push(ch);
                (EndTagName, None)
            }
        },
        EndTagName => match ch {
            '>' => (Text, scratch.take_end_tag()),
            '!' | '/' | '<' | '&' => (EndTagName, unexpected(ch, pos)),
            c if is_blank(c) => (AfterEndTagName, None),
            _ => {
                scratch.tag.push(ch);
                (EndTagName, None)
            }
        },
        AfterEndTagName => match ch {
            '>' => (Text, scratch.take_end_tag()),
            c if is_blank(c) => (AfterEndTagName, None),
            _ => (AfterEndTagName, unexpected(ch, pos)),
        },
        DeclTarget => match ch {
            '?' => (DeclClose, None),
            '!' | '/' | '<' | '&' | '>' => (DeclTarget, unexpected(ch, pos)),
            c if is_blank(c) => {
                if scratch.target.is_empty() {
                    (DeclTarget, None)
                } else {
                    (DeclBeforeKey, None)
                }
            }
            _ => {
                scratch.target.push(ch);
                (DeclTarget, None)
            }
        },
        DeclBeforeKey => match ch {
            '?' => (DeclClose, None),
            '>' | '!' | '/' | '<' | '&' | '=' => (DeclBeforeKey, unexpected(ch, pos)),
            c if is_blank(c) => (DeclBeforeKey, None),
            _ => {
                scratch.key.push(ch);
                (DeclKey, None)
            }
        },
        DeclKey => match ch {
            '=' => (DeclBeforeValue, None),
            '>' | '!' | '/' | '<' | '&' | '?' => (DeclKey, unexpected(ch, pos)),
            c if is_blank(c) => (DeclKey, None),
            _ => {
                scratch.key.push(ch);
                (DeclKey, None)
            }
        },
        DeclBeforeValue => match ch {
            '"' => (DeclValue, None),
            c if is_blank(c) => (DeclBeforeValue, None),
            _ => (DeclBeforeValue, unexpected(ch, pos)),
        },
        DeclValue => match ch {
            '"' => {
                let key = std::mem::take(&mut scratch.key);
                let value = std::mem::take(&mut scratch.value);
                scratch.decl_attributes.push((key, value));
                (DeclBeforeKey, None)
            }
            '<' | '&' => (DeclValue, unexpected(ch, pos)),
            _ => {
                scratch.value.push(ch);
                (DeclValue, None)
            }
        },
        DeclClose => match ch {
            '>' => (Text, scratch.take_declaration()),
            _ => (DeclClose, unexpected(ch, pos)),
        },
        MarkupOpen => match ch {
            '-' => (CommentOpen, None),
            '[' => (CdataKeyword(0), None),
            _ => (MarkupOpen, unexpected(ch, pos)),
        },
        CommentOpen => match ch {
            '-' => (Comment, None),
            _ => (CommentOpen, unexpected(ch, pos)),
        },
        Comment => match ch {
            '-' => (CommentDash, None),
            _ => (Comment, None),
        },
        CommentDash => match ch {
            '-' => (CommentDashDash, None),
            _ => (Comment, None),
        },
        CommentDashDash => match ch {
            '>' => (Text, None),
            '-' => (CommentDashDash, None),
            _ => (Comment, None),
        },
        CdataKeyword(matched) => {
            if ch.eq_ignore_ascii_case(&CDATA_KEYWORD[matched]) {
                if matched + 1 == CDATA_KEYWORD.len() {
                    (CdataBody, None)
                } else {
                    (CdataKeyword(matched + 1), None)
                }
            } else {
                (CdataKeyword(matched), unexpected(ch, pos))
            }
        }
        CdataBody => match ch {
            ']' => (CdataBracket, None),
            _ => {
                scratch.push_text(ch, pos);
                (CdataBody, None)
            }
        },
        CdataBracket => match ch {
            ']' => (CdataBrackets, None),
            _ => {
                scratch.push_text(']', pos);
                scratch.push_text(ch, pos);
                (CdataBody, None)
            }
        },
        CdataBrackets => match ch {
            '>' => (Text, None),
            ']' => {
                scratch.push_text(']', pos);
                (CdataBrackets, None)
            }
            _ => {
                scratch.push_text_str("]]", pos);
                scratch.push_text(ch, pos);
                (CdataBody, None)
            }
        },
    }
}

/// Closes the scan. Pending text is flushed; any other unfinished construct
/// is an error.
pub(crate) fn finish(
    state: State,
    scratch: &mut Scratch,
    pos: Position,
) -> Option<(Token, Position)> {
    match state {
        State::Text => scratch.take_text(),
        _ => Some((Token::Error("unexpected end of input".to_string()), pos)),
    }
}

/// Iterator over the tokens of a complete xml text.
///
/// ```
/// use simple_xml_doc::{Lexer, Token};
///
/// let tokens: Vec<Token> = Lexer::new("<a>hi</a>").map(|(token, _)| token).collect();
/// assert_eq!(
///     tokens,
///     vec![
///         Token::StartTag("a".to_string()),
///         Token::Text("hi".to_string()),
///         Token::EndTag("a".to_string()),
///     ]
/// );
/// ```
#[derive(Debug)]
pub struct Lexer<'a> {
    chars: std::str::CharIndices<'a>,
    state: State,
    scratch: Scratch,
    line: usize,
    column: usize,
    offset: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Lexer<'a> {
        Lexer {
            chars: text.char_indices(),
            state: State::Text,
            scratch: Scratch::default(),
            line: 1,
            column: 1,
            offset: 0,
            finished: false,
        }
    }

    /// Position of the next character to be scanned, or the end of input.
    pub fn current_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (Token, Position);

    fn next(&mut self) -> Option<(Token, Position)> {
        while let Some((offset, ch)) = self.chars.next() {
            let pos = self.current_position();
            self.offset = offset + ch.len_utf8();
            let ch = match ch {
                '\n' | '\r' => {
                    if ch == '\n' {
                        self.line += 1;
                        self.column = 1;
                    }
                    if !self.state.breaks_as_blank() {
                        continue;
                    }
                    ' '
                }
                _ => {
                    self.column += 1;
                    ch
                }
            };
            let (state, emitted) = step(self.state, &mut self.scratch, ch, pos);
            self.state = state;
            if emitted.is_some() {
                return emitted;
            }
        }
        if self.finished {
            return None;
        }
        self.finished = true;
        let pos = self.current_position();
        finish(self.state, &mut self.scratch, pos)
    }
}

/// Scans `text` once, calling `emit` for every token in order.
pub fn tokenize<F>(text: &str, mut emit: F)
where
    F: FnMut(Token, Position),
{
    for (token, position) in Lexer::new(text) {
        emit(token, position);
    }
}
