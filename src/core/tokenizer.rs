//! XML Tokenizer - State machine for markup token extraction
//!
//! Implements a pull-parser style tokenizer that classifies raw markup
//! into typed tokens:
//! - Element open/close tags (self-closing tags included)
//! - Attribute names and values
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions
//! - Entity references
//! - Declarations (DOCTYPE and friends)
//!
//! The tokenizer is a single left-to-right scan driven by one explicit
//! state per position; each transition consumes at most one byte and is
//! selected by the current state and that byte alone (quoted attribute
//! values and comment/CDATA terminators remember their opening
//! delimiter until the matching closer is seen). Lexemes are zero-copy
//! slices of the input, emitted in document order and never revised.
//!
//! Structural violations surface as [`Error::Malformed`] values; tokens
//! emitted before the failure remain observable through
//! [`tokenize_with_observer`].

use super::scanner::{is_name_char, is_name_start_char, is_whitespace, Scanner};
use crate::error::Error;
use std::collections::VecDeque;
use std::fmt;

/// Current lexical context of the tokenizer.
///
/// Exactly one state is active at any point. End of input is legal only
/// in `OutsideTag` or `InText`, and only once every open element has
/// been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Between constructs, outside any tag (initial state)
    OutsideTag,
    /// Accumulating character data
    InText,
    /// Just consumed '<'
    AfterOpenAngle,
    /// Reading an element name after '<'
    InTagName,
    /// Inside an open tag, between attributes
    InTag,
    /// Just consumed '/' inside an open tag, expecting '>'
    AfterSlash,
    /// Reading an attribute name
    InAttributeName,
    /// Attribute name finished, expecting '='
    AfterAttributeName,
    /// '=' consumed, expecting the opening quote
    BeforeAttributeValue,
    /// Inside a quoted attribute value
    InAttributeValue,
    /// Reading an element name after '</'
    InCloseTagName,
    /// Close tag name finished, expecting '>'
    AfterCloseTagName,
    /// Just consumed '<!', classifying comment/CDATA/declaration
    Bang,
    /// Matching the second '-' of '<!--'
    CommentOpen,
    /// Matching the 'CDATA[' tail of '<![CDATA['
    CdataOpen,
    /// Inside a comment, scanning for '-->'
    InComment,
    /// Inside a CDATA section, scanning for ']]>'
    InCdata,
    /// Inside a '<!...>' declaration
    InDeclaration,
    /// Inside a '<?...?>' processing instruction
    InProcessingInstruction,
    /// Inside an '&...;' entity reference
    InEntityRef,
}

impl State {
    /// Diagnostic name of the state
    pub fn name(&self) -> &'static str {
        match self {
            State::OutsideTag => "outside-tag",
            State::InText => "in-text",
            State::AfterOpenAngle => "after-open-angle",
            State::InTagName => "in-tag-name",
            State::InTag => "in-tag",
            State::AfterSlash => "after-slash",
            State::InAttributeName => "in-attribute-name",
            State::AfterAttributeName => "after-attribute-name",
            State::BeforeAttributeValue => "before-attribute-value",
            State::InAttributeValue => "in-attribute-value",
            State::InCloseTagName => "in-close-tag-name",
            State::AfterCloseTagName => "after-close-tag-name",
            State::Bang => "in-markup-declaration-open",
            State::CommentOpen => "in-comment-open",
            State::CdataOpen => "in-cdata-open",
            State::InComment => "in-comment",
            State::InCdata => "in-cdata",
            State::InDeclaration => "in-declaration",
            State::InProcessingInstruction => "in-processing-instruction",
            State::InEntityRef => "in-entity-reference",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of markup token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// '<name' - open tag started; lexeme is the element name
    ElementOpenStart,
    /// '>' ending an open tag; lexeme is the element name
    ElementOpenEnd,
    /// '/>' - open tag closed in place; lexeme is the element name.
    /// Semantically identical to `ElementOpenEnd` followed by
    /// `ElementClose`, so consumers need no special casing.
    ElementSelfClose,
    /// '</name>'; lexeme is the element name
    ElementClose,
    /// Attribute name
    AttributeName,
    /// Attribute value (raw text between its quotes)
    AttributeValue,
    /// Character data run
    Text,
    /// Comment content (between '<!--' and '-->')
    Comment,
    /// CDATA content (between '<![CDATA[' and ']]>')
    CData,
    /// Processing instruction content (between '<?' and '?>')
    ProcessingInstruction,
    /// Entity reference name (between '&' and ';')
    EntityReference,
    /// Declaration content (between '<!' and '>')
    Declaration,
}

/// A classified fragment of markup: a kind plus the exact substring
/// matched. Reinserting each kind's delimiters around its lexeme, in
/// emission order, reconstructs the original document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
}

impl<'a> Token<'a> {
    #[inline]
    fn new(kind: TokenKind, lexeme: &'a str) -> Self {
        Token { kind, lexeme }
    }
}

const CDATA_TAIL: &[u8] = b"CDATA[";

/// Streaming markup tokenizer (pull parser).
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    state: State,
    /// Start of the lexeme currently being accumulated
    mark: usize,
    /// Opening quote of the current attribute value
    quote: u8,
    /// Closer progress: '-'/']' run length, '?' seen, CDATA tail matched
    run: usize,
    /// '[...]' nesting inside a declaration
    subset_depth: usize,
    /// Quote delimiter active inside a declaration (0 = none)
    decl_quote: u8,
    /// Names of elements opened but not yet closed
    open_elements: Vec<&'a str>,
    /// Name of the tag currently being read
    tag_name: &'a str,
    /// Tokens emitted by a transition but not yet pulled
    pending: VecDeque<Token<'a>>,
    /// First structural violation; sticky
    failed: Option<Error>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for already-decoded input text.
    ///
    /// A leading byte-order mark is skipped; it does not alter
    /// tokenization.
    pub fn new(input: &'a str) -> Self {
        let mut scanner = Scanner::new(input);
        if input.starts_with('\u{FEFF}') {
            scanner.advance('\u{FEFF}'.len_utf8());
        }
        Tokenizer {
            scanner,
            state: State::OutsideTag,
            mark: 0,
            quote: 0,
            run: 0,
            subset_depth: 0,
            decl_quote: 0,
            open_elements: Vec::new(),
            tag_name: "",
            pending: VecDeque::new(),
            failed: None,
            done: false,
        }
    }

    /// Get the current parse state
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Get the current byte position in the input
    #[inline]
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Pull the next token.
    ///
    /// Returns `Ok(None)` once the input is exhausted in a state that
    /// permits end of input (outside any tag, all elements closed).
    /// Returns the same `Err` on every call after a structural
    /// violation has been reported.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, Error> {
        loop {
            if let Some(err) = &self.failed {
                return Err(err.clone());
            }
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            if self.done {
                return Ok(None);
            }
            let result = if self.scanner.is_eof() {
                self.finish()
            } else {
                self.step()
            };
            if let Err(err) = result {
                self.failed = Some(err.clone());
                return Err(err);
            }
        }
    }

    #[inline]
    fn emit(&mut self, kind: TokenKind, lexeme: &'a str) {
        self.pending.push_back(Token::new(kind, lexeme));
    }

    #[inline]
    fn error(&self, message: impl Into<String>) -> Error {
        Error::malformed(self.scanner.position(), self.state, message)
    }

    /// Process one input byte in the current state.
    ///
    /// Transitions consume at most one byte; a few re-dispatch the same
    /// byte after a state change (entity downgrade), which keeps every
    /// decision a pure function of (state, byte).
    fn step(&mut self) -> Result<(), Error> {
        let pos = self.scanner.position();
        // Safe: is_eof was checked by the caller
        let b = self.scanner.peek().unwrap_or(0);

        match self.state {
            State::OutsideTag => match b {
                b'<' => {
                    self.scanner.advance(1);
                    self.state = State::AfterOpenAngle;
                }
                b'&' => {
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.state = State::InEntityRef;
                }
                _ => {
                    self.mark = pos;
                    self.state = State::InText;
                    self.skip_to_text_boundary();
                }
            },

            State::InText => match b {
                b'<' => {
                    self.flush_text(pos);
                    self.scanner.advance(1);
                    self.state = State::AfterOpenAngle;
                }
                b'&' => {
                    self.flush_text(pos);
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.state = State::InEntityRef;
                }
                _ => self.skip_to_text_boundary(),
            },

            State::InEntityRef => match b {
                b';' => {
                    if pos > self.mark {
                        let body = self.scanner.slice(self.mark, pos);
                        self.emit(TokenKind::EntityReference, body);
                    } else {
                        // '&;' carries no reference; it is ordinary text
                        self.emit(TokenKind::Text, self.scanner.slice(self.mark - 1, pos + 1));
                    }
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                b'#' if pos == self.mark => self.scanner.advance(1),
                _ if is_name_char(b) => self.scanner.advance(1),
                _ => {
                    // Interrupted reference: the '&' run is ordinary text.
                    // Re-dispatch the interrupting byte as text content.
                    self.emit(TokenKind::Text, self.scanner.slice(self.mark - 1, pos));
                    self.mark = pos;
                    self.state = State::InText;
                }
            },

            State::AfterOpenAngle => match b {
                b'/' => {
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.state = State::InCloseTagName;
                }
                b'!' => {
                    self.scanner.advance(1);
                    self.state = State::Bang;
                }
                b'?' => {
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.run = 0;
                    self.state = State::InProcessingInstruction;
                }
                _ if is_name_start_char(b) => {
                    self.mark = pos;
                    self.scanner.advance(1);
                    self.state = State::InTagName;
                }
                b'<' => return Err(self.error("'<' is not allowed inside a tag")),
                _ => return Err(self.error(format!("unexpected character '{}' after '<'", b as char))),
            },

            State::InTagName => match b {
                _ if is_name_char(b) => self.scanner.advance(1),
                _ if is_whitespace(b) => {
                    self.tag_name = self.scanner.slice(self.mark, pos);
                    self.emit(TokenKind::ElementOpenStart, self.tag_name);
                    self.scanner.advance(1);
                    self.state = State::InTag;
                }
                b'>' => {
                    self.tag_name = self.scanner.slice(self.mark, pos);
                    self.emit(TokenKind::ElementOpenStart, self.tag_name);
                    self.emit(TokenKind::ElementOpenEnd, self.tag_name);
                    self.open_elements.push(self.tag_name);
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                b'/' => {
                    self.tag_name = self.scanner.slice(self.mark, pos);
                    self.emit(TokenKind::ElementOpenStart, self.tag_name);
                    self.scanner.advance(1);
                    self.state = State::AfterSlash;
                }
                b'<' => return Err(self.error("'<' is not allowed inside a tag")),
                _ => return Err(self.error(format!("invalid character '{}' in element name", b as char))),
            },

            State::InTag => match b {
                _ if is_whitespace(b) => self.scanner.advance(1),
                b'>' => {
                    self.emit(TokenKind::ElementOpenEnd, self.tag_name);
                    self.open_elements.push(self.tag_name);
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                b'/' => {
                    self.scanner.advance(1);
                    self.state = State::AfterSlash;
                }
                _ if is_name_start_char(b) => {
                    self.mark = pos;
                    self.scanner.advance(1);
                    self.state = State::InAttributeName;
                }
                b'<' => return Err(self.error("'<' is not allowed inside a tag")),
                _ => return Err(self.error(format!("unexpected character '{}' in tag", b as char))),
            },

            State::AfterSlash => match b {
                b'>' => {
                    self.emit(TokenKind::ElementSelfClose, self.tag_name);
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                _ => return Err(self.error("expected '>' after '/' in tag")),
            },

            State::InAttributeName => match b {
                _ if is_name_char(b) => self.scanner.advance(1),
                b'=' => {
                    self.emit(TokenKind::AttributeName, self.scanner.slice(self.mark, pos));
                    self.scanner.advance(1);
                    self.state = State::BeforeAttributeValue;
                }
                _ if is_whitespace(b) => {
                    self.emit(TokenKind::AttributeName, self.scanner.slice(self.mark, pos));
                    self.scanner.advance(1);
                    self.state = State::AfterAttributeName;
                }
                b'<' => return Err(self.error("'<' is not allowed inside a tag")),
                _ => return Err(self.error("attribute requires a quoted value")),
            },

            State::AfterAttributeName => match b {
                _ if is_whitespace(b) => self.scanner.advance(1),
                b'=' => {
                    self.scanner.advance(1);
                    self.state = State::BeforeAttributeValue;
                }
                _ => return Err(self.error("expected '=' after attribute name")),
            },

            State::BeforeAttributeValue => match b {
                _ if is_whitespace(b) => self.scanner.advance(1),
                b'"' | b'\'' => {
                    self.quote = b;
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.state = State::InAttributeValue;
                }
                _ => return Err(self.error("attribute value must be quoted")),
            },

            State::InAttributeValue => match b {
                // Only the opening delimiter closes the value; the other
                // quote character is ordinary text
                _ if b == self.quote => {
                    self.emit(TokenKind::AttributeValue, self.scanner.slice(self.mark, pos));
                    self.scanner.advance(1);
                    self.state = State::InTag;
                }
                b'<' => return Err(self.error("'<' is not allowed in an attribute value")),
                b'>' => return Err(self.error("unterminated attribute value")),
                _ => self.scanner.advance(1),
            },

            State::InCloseTagName => match b {
                _ if is_name_char(b) => self.scanner.advance(1),
                _ if is_whitespace(b) && pos > self.mark => {
                    self.tag_name = self.scanner.slice(self.mark, pos);
                    self.scanner.advance(1);
                    self.state = State::AfterCloseTagName;
                }
                b'>' => {
                    let name = self.scanner.slice(self.mark, pos);
                    self.close_element(name)?;
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                _ => return Err(self.error("invalid character in close tag")),
            },

            State::AfterCloseTagName => match b {
                _ if is_whitespace(b) => self.scanner.advance(1),
                b'>' => {
                    let name = self.tag_name;
                    self.close_element(name)?;
                    self.scanner.advance(1);
                    self.state = State::OutsideTag;
                }
                _ => return Err(self.error("invalid character in close tag")),
            },

            State::Bang => match b {
                b'-' => {
                    self.scanner.advance(1);
                    self.state = State::CommentOpen;
                }
                b'[' => {
                    self.scanner.advance(1);
                    self.run = 0;
                    self.state = State::CdataOpen;
                }
                _ => {
                    self.mark = pos;
                    self.subset_depth = 0;
                    self.decl_quote = 0;
                    self.state = State::InDeclaration;
                }
            },

            State::CommentOpen => match b {
                b'-' => {
                    self.scanner.advance(1);
                    self.mark = pos + 1;
                    self.run = 0;
                    self.state = State::InComment;
                }
                _ => return Err(self.error("expected '<!--' to open a comment")),
            },

            State::CdataOpen => {
                if b == CDATA_TAIL[self.run] {
                    self.run += 1;
                    self.scanner.advance(1);
                    if self.run == CDATA_TAIL.len() {
                        self.mark = pos + 1;
                        self.run = 0;
                        self.state = State::InCdata;
                    }
                } else {
                    return Err(self.error("expected '<![CDATA[' to open a CDATA section"));
                }
            }

            State::InComment => match b {
                b'-' => {
                    self.run += 1;
                    self.scanner.advance(1);
                }
                // A partial '-' run never terminates; only a full '-->'
                b'>' if self.run >= 2 => {
                    self.emit(TokenKind::Comment, self.scanner.slice(self.mark, pos - 2));
                    self.scanner.advance(1);
                    self.run = 0;
                    self.state = State::OutsideTag;
                }
                _ => {
                    self.run = 0;
                    self.scanner.advance(1);
                }
            },

            State::InCdata => match b {
                b']' => {
                    self.run += 1;
                    self.scanner.advance(1);
                }
                b'>' if self.run >= 2 => {
                    self.emit(TokenKind::CData, self.scanner.slice(self.mark, pos - 2));
                    self.scanner.advance(1);
                    self.run = 0;
                    self.state = State::OutsideTag;
                }
                _ => {
                    self.run = 0;
                    self.scanner.advance(1);
                }
            },

            State::InDeclaration => {
                if self.decl_quote != 0 {
                    if b == self.decl_quote {
                        self.decl_quote = 0;
                    }
                    self.scanner.advance(1);
                } else {
                    match b {
                        b'"' | b'\'' => {
                            self.decl_quote = b;
                            self.scanner.advance(1);
                        }
                        b'[' => {
                            self.subset_depth += 1;
                            self.scanner.advance(1);
                        }
                        b']' => {
                            self.subset_depth = self.subset_depth.saturating_sub(1);
                            self.scanner.advance(1);
                        }
                        // '>' inside an internal subset does not close
                        b'>' if self.subset_depth == 0 => {
                            self.emit(TokenKind::Declaration, self.scanner.slice(self.mark, pos));
                            self.scanner.advance(1);
                            self.state = State::OutsideTag;
                        }
                        _ => self.scanner.advance(1),
                    }
                }
            }

            State::InProcessingInstruction => match b {
                b'?' => {
                    self.run = 1;
                    self.scanner.advance(1);
                }
                b'>' if self.run == 1 => {
                    self.emit(
                        TokenKind::ProcessingInstruction,
                        self.scanner.slice(self.mark, pos - 1),
                    );
                    self.scanner.advance(1);
                    self.run = 0;
                    self.state = State::OutsideTag;
                }
                _ => {
                    self.run = 0;
                    self.scanner.advance(1);
                }
            },
        }

        Ok(())
    }

    /// End-of-input handling: legal only outside any markup construct
    /// with the open-element stack empty.
    fn finish(&mut self) -> Result<(), Error> {
        let end = self.scanner.position();
        match self.state {
            State::OutsideTag => {}
            State::InText => self.flush_text(end),
            State::InEntityRef => {
                // Unterminated reference downgrades to text
                self.emit(TokenKind::Text, self.scanner.slice(self.mark - 1, end));
            }
            _ => {
                return Err(self.error(format!("unexpected end of input ({})", self.state)));
            }
        }
        if let Some(name) = self.open_elements.last() {
            return Err(Error::malformed(
                end,
                self.state,
                format!("unexpected end of input: unclosed element <{name}>"),
            ));
        }
        self.done = true;
        Ok(())
    }

    /// Emit the pending text run, if non-empty.
    #[inline]
    fn flush_text(&mut self, end: usize) {
        if end > self.mark {
            self.emit(TokenKind::Text, self.scanner.slice(self.mark, end));
        }
    }

    /// Bulk-advance over character data to the next '<' or '&' (or end
    /// of input). Pure scanning: no state decision happens in between.
    #[inline]
    fn skip_to_text_boundary(&mut self) {
        match self.scanner.find_text_boundary() {
            Some(boundary) => {
                let pos = self.scanner.position();
                self.scanner.advance(boundary - pos);
            }
            None => {
                while !self.scanner.is_eof() {
                    self.scanner.advance(1);
                }
            }
        }
    }

    /// Balance check for a close tag against the open-element stack.
    fn close_element(&mut self, name: &'a str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(self.error("missing element name in close tag"));
        }
        match self.open_elements.pop() {
            Some(open) if open == name => {
                self.emit(TokenKind::ElementClose, name);
                Ok(())
            }
            Some(open) => Err(self.error(format!(
                "mismatched close tag: expected </{open}>, found </{name}>"
            ))),
            None => Err(self.error(format!("close tag </{name}> without matching open tag"))),
        }
    }
}

/// Tokenize a complete document.
///
/// On success the returned sequence is lossless over the input (see
/// [`Token`]). On malformed input the first structural violation is
/// returned; use [`tokenize_with_observer`] to observe the tokens
/// emitted before the failure point.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, Error> {
    let mut tokenizer = Tokenizer::new(input);
    // Average token length of ~16 bytes
    let mut tokens = Vec::with_capacity(input.len() / 16);
    while let Some(token) = tokenizer.next_token()? {
        tokens.push(token);
    }
    tracing::trace!(tokens = tokens.len(), bytes = input.len(), "tokenized document");
    Ok(tokens)
}

/// Drive the tokenizer with an observer callback, invoked once per
/// emitted token with the tokenizer's current state.
///
/// This is the diagnostic surface: on malformed input the observer has
/// already seen every token emitted before the failure point, while the
/// overall outcome is still the error.
pub fn tokenize_with_observer<F>(input: &str, mut observer: F) -> Result<(), Error>
where
    F: FnMut(State, &Token<'_>),
{
    let mut tokenizer = Tokenizer::new(input);
    loop {
        match tokenizer.next_token()? {
            Some(token) => observer(tokenizer.state(), &token),
            None => return Ok(()),
        }
    }
}
