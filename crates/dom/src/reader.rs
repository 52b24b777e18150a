//! The pull event reader.
//!
//! A hand-rolled state machine over the lexer that exposes the document as
//! an ordered stream of events without building a tree. One syntactic unit
//! can produce several events — a start tag enqueues `BeginElement`, then
//! its `Namespace` declarations, then its `Attribute`s — and the queue is
//! drained in order by `next_event`/`peek_event`.
//!
//! Well-formedness is only decidable once the whole input has been read;
//! [`EventReader::is_well_formed`] answers `None` before `EndDocument`.

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use xylem_util::{MapInsert, OrderedMap};

use crate::config::Config;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::node::{XML_PREFIX, XML_URI, XMLNS_PREFIX, XMLNS_URI};
use crate::scope::ScopeChain;

/// One unit of the document, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    BeginDocument,
    /// Prolog attributes in declaration order.
    XmlHeader(Vec<(String, String)>),
    Dtd(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: String,
    },
    Text(String),
    Cdata(String),
    BeginElement(String),
    Namespace {
        /// `None` for a default declaration.
        prefix: Option<String>,
        uri: String,
    },
    Attribute {
        name: String,
        value: String,
    },
    EndElement(String),
    EndDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Prolog,
    Content,
    Epilog,
    Done,
}

pub struct EventReader<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    prev: Token<'src>,
    queue: VecDeque<Event>,
    // open element qualified names
    open: Vec<String>,
    // the reader only needs to know that a prefix is bound
    scopes: ScopeChain<()>,
    phase: Phase,
    warnings: Vec<String>,
    well_formed: Option<bool>,
    error: Option<ParseError>,
    has_header: bool,
    cfg: Config,
}

impl EventReader<'static> {
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        EventReader::from_file_with(path, Config::default())
    }

    pub fn from_file_with(path: impl AsRef<Path>, cfg: Config) -> io::Result<Self> {
        let lexer = Lexer::from_file(path.as_ref(), &cfg)?;
        Ok(EventReader::with_lexer(lexer, cfg))
    }
}

impl<'src> EventReader<'src> {
    pub fn from_str(source: &'src str) -> Self {
        EventReader::from_str_with(source, Config::default())
    }

    pub fn from_str_with(source: &'src str, cfg: Config) -> Self {
        let lexer = Lexer::from_str(source, &cfg);
        EventReader::with_lexer(lexer, cfg)
    }

    fn with_lexer(lexer: Lexer<'src>, cfg: Config) -> Self {
        EventReader {
            lexer,
            current: Token::eof(),
            prev: Token::eof(),
            queue: VecDeque::new(),
            open: Vec::new(),
            scopes: ScopeChain::new(),
            phase: Phase::Init,
            warnings: Vec::new(),
            well_formed: None,
            error: None,
            has_header: false,
            cfg,
        }
    }

    /// `Some(..)` only after `EndDocument` has been emitted.
    pub fn is_well_formed(&self) -> Option<bool> {
        self.well_formed
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Stops reading and releases the input early.
    pub fn close(&mut self) {
        self.lexer.close();
        self.queue.clear();
        self.phase = Phase::Done;
    }

    pub fn has_event(&mut self) -> bool {
        self.pump();
        !self.queue.is_empty() || self.error.is_some()
    }

    /// The next event without consuming it. `None` at end of stream or when
    /// the stream is in error (the error surfaces from `next_event`).
    pub fn peek_event(&mut self) -> Option<&Event> {
        self.pump();
        self.queue.front()
    }

    /// Consumes and returns the next event; `Ok(None)` once the stream is
    /// exhausted.
    pub fn next_event(&mut self) -> Result<Option<Event>, ParseError> {
        self.pump();
        if let Some(event) = self.queue.pop_front() {
            return Ok(Some(event));
        }
        if let Some(error) = self.error.take() {
            self.phase = Phase::Done;
            return Err(error);
        }
        Ok(None)
    }

    fn pump(&mut self) {
        while self.queue.is_empty() && self.phase != Phase::Done && self.error.is_none() {
            if let Err(error) = self.step() {
                self.error = Some(error);
            }
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let token = self.lexer.get_token()?;
        self.prev = std::mem::replace(&mut self.current, token);
        Ok(())
    }

    fn consume(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.current.kind == kind {
            self.advance()
        } else {
            Err(self.syntax_error(format!(
                "expected token type {:?}, got {:?} ('{}')",
                kind, self.current.kind, self.current.text
            )))
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.lexer.line(),
            message: message.into(),
        }
    }

    fn warn(&mut self, warning: &str) {
        self.warnings.push(warning.to_string());
    }

    fn finish_document(&mut self) {
        if self.cfg.enable_debugging {
            log::debug!("event stream complete: {} warning(s)", self.warnings.len());
        }
        self.queue.push_back(Event::EndDocument);
        self.well_formed = Some(self.warnings.is_empty());
        self.phase = Phase::Done;
    }

    fn step(&mut self) -> Result<(), ParseError> {
        match self.phase {
            Phase::Init => {
                self.advance()?;
                self.scopes.push();
                for prefix in [XML_PREFIX, XMLNS_PREFIX] {
                    self.scopes.insert(prefix, ());
                }
                self.queue.push_back(Event::BeginDocument);
                self.phase = Phase::Prolog;
                Ok(())
            }
            Phase::Prolog => self.step_prolog(),
            Phase::Content => self.step_content(),
            Phase::Epilog => self.step_epilog(),
            Phase::Done => Ok(()),
        }
    }

    fn step_prolog(&mut self) -> Result<(), ParseError> {
        match self.current.kind {
            TokenKind::Comment => self.read_comment(),
            TokenKind::Text => {
                if !self.current.text.chars().all(char::is_whitespace) {
                    self.warn("Found non-whitespace text at an unexpected position.");
                }
                self.advance()
            }
            TokenKind::Cdata => {
                self.warn("Found CDATA at an unexpected position.");
                self.advance()
            }
            TokenKind::Doctype => {
                let dtd = format!("<!DOCTYPE {}>", self.current.text);
                self.queue.push_back(Event::Dtd(dtd));
                self.advance()
            }
            TokenKind::LessThan => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Question => self.read_pi_or_header(),
                    TokenKind::Identifier => {
                        self.phase = Phase::Content;
                        self.read_element_start()
                    }
                    _ => Err(self.syntax_error(
                        "Parse Error. Possible causes: Nameless tag. All tags must have a name",
                    )),
                }
            }
            TokenKind::Eof => {
                self.finish_document();
                Ok(())
            }
            _ => Err(self.syntax_error(format!(
                "{:?} found at unexpected position. | Possibly outside xml root element",
                self.current.kind
            ))),
        }
    }

    fn step_content(&mut self) -> Result<(), ParseError> {
        match self.current.kind {
            TokenKind::Text => {
                self.queue.push_back(Event::Text(self.current.text.to_string()));
                self.advance()
            }
            TokenKind::Cdata => {
                let text = self.current.text.as_ref();
                self.queue
                    .push_back(Event::Cdata(text[9..text.len() - 3].to_string()));
                self.advance()
            }
            TokenKind::Comment => self.read_comment(),
            TokenKind::LessThan => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Question => self.read_pi(),
                    TokenKind::Identifier => self.read_element_start(),
                    TokenKind::Slash => self.read_element_end(),
                    _ => Err(self.syntax_error(
                        "Parse Error. Possible causes: Nameless tag. All tags must have a name",
                    )),
                }
            }
            TokenKind::Eof => {
                Err(self.syntax_error("Reached end of input with unclosed elements."))
            }
            _ => Err(self.syntax_error(format!(
                "{:?} found at unexpected position.",
                self.current.kind
            ))),
        }
    }

    fn step_epilog(&mut self) -> Result<(), ParseError> {
        match self.current.kind {
            TokenKind::Comment => self.read_comment(),
            TokenKind::Text => {
                if !self.current.text.chars().all(char::is_whitespace) {
                    self.warn("Found non-whitespace text outside root element.");
                }
                self.advance()
            }
            TokenKind::Cdata => {
                self.warn("Found CDATA outside root element.");
                self.advance()
            }
            TokenKind::LessThan => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Question => self.read_pi(),
                    TokenKind::Identifier => {
                        self.warn("Found an element outside the root element.");
                        self.read_element_start()
                    }
                    _ => Err(self.syntax_error(format!(
                        "{:?} found at unexpected position. | Possibly outside xml root element",
                        self.current.kind
                    ))),
                }
            }
            TokenKind::Eof => {
                self.finish_document();
                Ok(())
            }
            _ => Err(self.syntax_error(format!(
                "{:?} found at unexpected position. | Possibly outside xml root element",
                self.current.kind
            ))),
        }
    }

    fn read_comment(&mut self) -> Result<(), ParseError> {
        let text = self.current.text.as_ref();
        self.queue
            .push_back(Event::Comment(text[4..text.len() - 3].to_string()));
        self.advance()
    }

    fn read_pi_or_header(&mut self) -> Result<(), ParseError> {
        self.advance()?; // past '?'
        if self.has_header || !self.current.text.eq_ignore_ascii_case("xml") {
            return self.read_pi_body();
        }
        self.consume(TokenKind::Identifier)?;
        let mut seen: OrderedMap<String, ()> = OrderedMap::new();
        let mut attributes = Vec::new();
        while self.current.kind == TokenKind::Identifier {
            let name = self.current.text.to_string();
            self.consume(TokenKind::Identifier)?;
            if self.current.kind == TokenKind::Colon {
                return Err(self.syntax_error("Cannot use namespace prefix in xml prolog."));
            }
            if name == XMLNS_PREFIX {
                return Err(self.syntax_error("Cannot declare namespace in xml prolog."));
            }
            self.consume(TokenKind::Equal)?;
            let value = self.current.text.to_string();
            self.consume(TokenKind::String)?;
            if seen.insert(name.clone(), ()) == MapInsert::Updated {
                return Err(self.syntax_error("Duplicate attributes found in xml prolog."));
            }
            attributes.push((name, value));
        }
        self.consume(TokenKind::Question)?;
        self.consume(TokenKind::GreaterThan)?;
        self.has_header = true;
        self.queue.push_back(Event::XmlHeader(attributes));
        Ok(())
    }

    fn read_pi(&mut self) -> Result<(), ParseError> {
        self.advance()?; // past '?'
        self.read_pi_body()
    }

    fn read_pi_body(&mut self) -> Result<(), ParseError> {
        if self.current.kind != TokenKind::Identifier {
            return Err(self.syntax_error("Expected processing-instruction target."));
        }
        let target = self.current.text.to_string();
        self.advance()?;
        let mut value = String::new();
        if self.current.kind != TokenKind::Question {
            if self.current.kind == TokenKind::Colon {
                return Err(self.syntax_error(
                    "Cannot have namespace prefix in processing-instruction target.",
                ));
            }
            let token = self.lexer.take_until(
                b'?',
                TokenKind::Text,
                "Invalid processing-instruction declaration. Missing '?'. -> ",
            )?;
            value = token.text.to_string();
            self.advance()?;
        }
        self.consume(TokenKind::Question)?;
        self.consume(TokenKind::GreaterThan)?;
        self.queue
            .push_back(Event::ProcessingInstruction { target, value });
        Ok(())
    }

    fn parse_qname(&mut self) -> Result<String, ParseError> {
        let first = self.current.text.to_string();
        self.consume(TokenKind::Identifier)?;
        if self.current.kind == TokenKind::Colon {
            self.advance()?;
            let local = self.current.text.to_string();
            self.consume(TokenKind::Identifier)?;
            Ok(format!("{first}:{local}"))
        } else {
            Ok(first)
        }
    }

    fn read_element_start(&mut self) -> Result<(), ParseError> {
        if self.current.text.eq_ignore_ascii_case(XMLNS_PREFIX) {
            return Err(self.syntax_error("Element name cannot have the prefix `xmlns`."));
        }
        let qname = self.parse_qname()?;
        self.scopes.push();

        let mut ns_events = Vec::new();
        let mut attr_events = Vec::new();
        let mut attr_names: OrderedMap<String, ()> = OrderedMap::new();
        while self.current.kind == TokenKind::Identifier {
            if self.current.text.eq_ignore_ascii_case(XMLNS_PREFIX) {
                self.read_namespace_decl(&mut ns_events)?;
            } else {
                let name = self.parse_qname()?;
                self.consume(TokenKind::Equal)?;
                let value = self.current.text.to_string();
                self.consume(TokenKind::String)?;
                if attr_names.insert(name.clone(), ()) == MapInsert::Updated {
                    return Err(ParseError::DuplicateAttribute {
                        line: self.lexer.line(),
                        name,
                    });
                }
                attr_events.push(Event::Attribute { name, value });
            }
        }

        // every prefix in use must resolve in the scope chain
        if let Some((prefix, _)) = qname.split_once(':') {
            if self.scopes.lookup(prefix).is_none() {
                return Err(ParseError::UndeclaredPrefix {
                    line: self.lexer.line(),
                    prefix: prefix.to_string(),
                    owner: "element",
                    name: qname.clone(),
                });
            }
        }
        for event in &attr_events {
            if let Event::Attribute { name, .. } = event {
                if let Some((prefix, _)) = name.split_once(':') {
                    if self.scopes.lookup(prefix).is_none() {
                        return Err(ParseError::UndeclaredPrefix {
                            line: self.lexer.line(),
                            prefix: prefix.to_string(),
                            owner: "attribute",
                            name: name.clone(),
                        });
                    }
                }
            }
        }

        self.queue.push_back(Event::BeginElement(qname.clone()));
        self.queue.extend(ns_events);
        self.queue.extend(attr_events);

        match self.current.kind {
            TokenKind::GreaterThan => {
                self.open.push(qname);
                self.advance()
            }
            TokenKind::Slash => {
                self.advance()?;
                self.consume(TokenKind::GreaterThan)?;
                self.scopes.pop();
                self.queue.push_back(Event::EndElement(qname));
                if self.open.is_empty() {
                    self.phase = Phase::Epilog;
                }
                Ok(())
            }
            _ => Err(self.syntax_error(format!(
                "expected '>' or '/>', got {:?}",
                self.current.kind
            ))),
        }
    }

    fn read_namespace_decl(&mut self, ns_events: &mut Vec<Event>) -> Result<(), ParseError> {
        self.consume(TokenKind::Identifier)?; // 'xmlns'
        let mut prefix = None;
        let mut is_xml_prefix = false;
        if self.current.kind == TokenKind::Colon {
            self.advance()?;
            if self.current.text.eq_ignore_ascii_case(XMLNS_PREFIX) {
                return Err(self.syntax_error("`xmlns` cannot be used as a namespace prefix."));
            }
            if self.current.text.eq_ignore_ascii_case(XML_PREFIX) {
                is_xml_prefix = true;
            }
            prefix = Some(self.current.text.to_string());
            self.consume(TokenKind::Identifier)?;
        }
        self.consume(TokenKind::Equal)?;
        let uri = self.current.text.to_string();
        let trimmed = uri.trim();
        if is_xml_prefix {
            if trimmed != XML_URI {
                return Err(ParseError::XmlPrefixUri {
                    line: self.lexer.line(),
                });
            }
        } else {
            if prefix.is_some() && trimmed.is_empty() {
                return Err(ParseError::EmptyNamespaceUri {
                    line: self.lexer.line(),
                });
            }
            if trimmed == XML_URI || trimmed == XMLNS_URI {
                return Err(ParseError::ReservedUri {
                    line: self.lexer.line(),
                });
            }
        }
        self.consume(TokenKind::String)?;
        let key = prefix.as_deref().unwrap_or(XMLNS_PREFIX);
        if self.scopes.insert(key, ()) == MapInsert::Updated {
            return Err(ParseError::DuplicateNamespace {
                line: self.lexer.line(),
            });
        }
        ns_events.push(Event::Namespace { prefix, uri });
        Ok(())
    }

    fn read_element_end(&mut self) -> Result<(), ParseError> {
        self.consume(TokenKind::Slash)?;
        if self.current.kind != TokenKind::Identifier {
            return Err(self.syntax_error("Expected closing tag name."));
        }
        let qname = self.parse_qname()?;
        let Some(expected) = self.open.last().cloned() else {
            return Err(self.syntax_error("Closing tag without an open element."));
        };
        if qname != expected {
            return Err(ParseError::CloseTagMismatch {
                line: self.lexer.line(),
                expected,
            });
        }
        self.consume(TokenKind::GreaterThan)?;
        self.open.pop();
        self.scopes.pop();
        self.queue.push_back(Event::EndElement(qname));
        if self.open.is_empty() {
            self.phase = Phase::Epilog;
        }
        Ok(())
    }
}
