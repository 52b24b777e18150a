//! The DOM parser.
//!
//! Recursive descent over the token stream. Fatal conditions surface as
//! [`ParseError`]; anything found outside the root element is recorded as a
//! warning on the document and clears its well-formed flag without aborting
//! the parse.

use std::path::Path;

use xylem_util::literal::{self, LiteralKind};
use xylem_util::{MapInsert, OrderedMap};

use crate::config::Config;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::name::QName;
use crate::node::{
    AttributeData, CommentData, Document, DtdData, ElementData, NamespaceData, NodeData, NodeId,
    NodeKind, PiData, TextData, XmlHeaderData, XML_PREFIX, XML_URI, XMLNS_PREFIX, XMLNS_URI,
};
use crate::scope::ScopeChain;

/// Case-insensitive equality against a lowercase needle.
fn ci_eq(value: &str, lower: &str) -> bool {
    value.len() == lower.len()
        && value
            .bytes()
            .zip(lower.bytes())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

fn is_whitespace(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

pub(crate) struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    prev: Token<'src>,
    doc: Document,
    // open element stack; the root sits at the bottom
    stack: Vec<NodeId>,
    scopes: ScopeChain<NodeId>,
    // attributes and namespace declarations of the tag being parsed, in
    // parse order, resolved together once the attribute list closes
    attr_list: Vec<NodeId>,
    root_element: Option<NodeId>,
    is_root_wrapped: bool,
    has_header: bool,
    pos: u32,
    cfg: Config,
}

impl<'src> Parser<'src> {
    pub fn new(lexer: Lexer<'src>, cfg: Config) -> Self {
        let doc = Document::new(cfg.clone());
        Parser {
            lexer,
            current: Token::eof(),
            prev: Token::eof(),
            doc,
            stack: Vec::new(),
            scopes: ScopeChain::new(),
            attr_list: Vec::new(),
            root_element: None,
            is_root_wrapped: false,
            has_header: false,
            pos: 0,
            cfg,
        }
    }

    pub fn run(mut self) -> Result<Document, ParseError> {
        if self.cfg.enable_debugging {
            log::debug!("starting parse");
        }
        self.parse_document()?;
        self.lexer.close();
        if self.cfg.enable_debugging {
            log::debug!(
                "parse finished: {} node(s), {} warning(s)",
                self.pos,
                self.doc.warnings().len()
            );
        }
        Ok(self.doc)
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
            Err(ParseError::Syntax {
                line: self.lexer.line(),
                message: format!(
                    "expected token type {:?}, got {:?} ('{}')",
                    kind, self.current.kind, self.current.text
                ),
            })
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.lexer.line(),
            message: message.into(),
        }
    }

    fn warn(&mut self, warning: &str) {
        self.doc.push_warning(warning);
    }

    fn next_pos(&mut self) -> u32 {
        self.pos += 1;
        self.pos
    }

    fn top(&self) -> NodeId {
        *self.stack.last().expect("parser stack is never empty")
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        match self.doc.data_mut(parent) {
            NodeData::Root(root) => root.children.push(child),
            NodeData::Element(elem) => elem.children.push(child),
            _ => unreachable!("only containers sit on the parser stack"),
        }
        self.doc.set_parent(child, Some(parent));
    }

    // document ::= prolog element Misc*
    fn parse_document(&mut self) -> Result<(), ParseError> {
        self.advance()?;
        let root = self.doc.root();
        self.stack.push(root);
        let pos = self.next_pos();
        self.doc.set_position(root, pos);
        self.inject_global_namespaces();

        self.parse_prolog()?;

        while matches!(
            self.current.kind,
            TokenKind::LessThan | TokenKind::Text | TokenKind::Comment | TokenKind::Cdata
        ) || self.prev.kind == TokenKind::LessThan
        {
            if self.current.kind == TokenKind::Slash {
                return Err(self.unexpected_position_error());
            }
            self.dispatch()?;
        }
        if self.current.kind != TokenKind::Eof {
            return Err(self.unexpected_position_error());
        }

        self.doc.root_data_mut().is_well_formed = self.doc.warnings().is_empty();
        self.doc.root_data_mut().root_element = self.root_element;
        if self.cfg.show_warnings && !self.doc.warnings().is_empty() {
            for warning in self.doc.warnings() {
                log::warn!("{warning}");
            }
            let count = self.doc.warnings().len();
            log::warn!(
                "Found at least {count} {} during parsing.",
                if count > 1 { "errors" } else { "error" }
            );
        }
        self.stack.pop();
        Ok(())
    }

    fn unexpected_position_error(&self) -> ParseError {
        self.syntax_error(format!(
            "{:?} found at unexpected position. | Possibly outside xml root element",
            self.current.kind
        ))
    }

    fn inject_global_namespaces(&mut self) {
        self.scopes.push();
        let root = self.doc.root();
        for (prefix, uri) in [(XML_PREFIX, XML_URI), (XMLNS_PREFIX, XMLNS_URI)] {
            let ns = self.doc.push(
                NodeData::Namespace(NamespaceData {
                    prefix: prefix.to_string(),
                    uri: uri.to_string(),
                    is_default: false,
                    is_global: true,
                }),
                None,
                0,
            );
            self.scopes.insert(prefix, ns);
            match self.doc.data_mut(root) {
                NodeData::Root(data) => data.namespaces.push(ns),
                _ => unreachable!(),
            }
        }
    }

    // prolog ::= XMLDecl? Misc* (doctypedecl Misc*)?
    fn parse_prolog(&mut self) -> Result<(), ParseError> {
        self.gather_leading_misc()?;
        self.parse_xml_decl()?;
        self.discard_pre_header_comments();
        self.parse_misc()?;
        self.parse_dtd()?;
        self.parse_misc()
    }

    /// Content found before the prolog proper: comments are kept for later
    /// inspection, stray text and CDATA are warned about and skipped.
    fn gather_leading_misc(&mut self) -> Result<(), ParseError> {
        while matches!(
            self.current.kind,
            TokenKind::Comment | TokenKind::Cdata | TokenKind::Text
        ) {
            if self.current.kind == TokenKind::Comment {
                self.parse_comment()?;
            } else {
                self.advance()?;
                self.warn("Found one of TEXT/CDATA/Comment(s) outside root element.");
            }
        }
        Ok(())
    }

    /// Comments lexed ahead of the XML declaration are invalid; drop them.
    fn discard_pre_header_comments(&mut self) {
        if !self.has_header {
            return;
        }
        let leading: Vec<NodeId> = self
            .doc
            .children(self.doc.root())
            .iter()
            .copied()
            .take_while(|&c| self.doc.kind(c) == NodeKind::Comment)
            .collect();
        for comment in leading {
            self.warn("Found Comment(s) before xml declaration.");
            self.doc.detach(comment);
            self.doc.release_subtree(comment);
        }
    }

    fn parse_misc(&mut self) -> Result<(), ParseError> {
        loop {
            match self.current.kind {
                TokenKind::Comment => self.parse_comment()?,
                TokenKind::Text => {
                    if !is_whitespace(&self.current.text) {
                        self.warn("Found non-whitespace text at an unexpected position.");
                    }
                    self.advance()?;
                }
                TokenKind::Cdata => {
                    self.warn("Found CDATA at an unexpected position.");
                    self.advance()?;
                }
                TokenKind::LessThan => {
                    self.consume(TokenKind::LessThan)?;
                    if self.current.kind == TokenKind::Question {
                        self.parse_pi()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    // XMLDecl ::= '<?' 'xml' attribute* '?>'
    fn parse_xml_decl(&mut self) -> Result<(), ParseError> {
        if self.current.kind == TokenKind::LessThan {
            self.advance()?;
        }
        if self.current.kind != TokenKind::Question {
            return Ok(());
        }
        self.advance()?;
        if !ci_eq(&self.current.text, "xml") {
            return self.parse_pi();
        }
        self.consume(TokenKind::Identifier)?;
        let mut attributes: OrderedMap<String, NodeId> = OrderedMap::new();
        while self.current.kind == TokenKind::Identifier {
            let pos = self.next_pos();
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
            let number = literal::to_number(&value);
            self.consume(TokenKind::String)?;
            let attr = self.doc.push(
                NodeData::Attribute(AttributeData {
                    name: QName::new(name.clone()),
                    value,
                    number,
                    namespace: None,
                }),
                None,
                pos,
            );
            if attributes.insert(name, attr) == MapInsert::Updated {
                return Err(self.syntax_error("Duplicate attributes found in xml prolog."));
            }
        }
        let root = self.doc.root();
        let header = self
            .doc
            .push(NodeData::XmlHeader(XmlHeaderData { attributes }), Some(root), 0);
        match self.doc.data_mut(root) {
            NodeData::Root(data) => data.children.push(header),
            _ => unreachable!(),
        }
        self.doc.xml_header = Some(header);
        self.has_header = true;
        self.consume(TokenKind::Question)?;
        self.consume(TokenKind::GreaterThan)
    }

    fn parse_dtd(&mut self) -> Result<(), ParseError> {
        if self.current.kind != TokenKind::Doctype {
            return Ok(());
        }
        let value = format!("<!DOCTYPE {}>", self.current.text);
        let root = self.doc.root();
        let dtd = self
            .doc
            .push(NodeData::Dtd(DtdData { value }), Some(root), 0);
        match self.doc.data_mut(root) {
            NodeData::Root(data) => data.children.push(dtd),
            _ => unreachable!(),
        }
        self.doc.dtd = Some(dtd);
        self.consume(TokenKind::Doctype)
    }

    fn parse_pi(&mut self) -> Result<(), ParseError> {
        while matches!(self.current.kind, TokenKind::LessThan | TokenKind::Question) {
            self.advance()?;
        }
        if self.current.kind != TokenKind::Identifier {
            return Ok(());
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
        let parent = self.top();
        let pos = self.next_pos();
        let pi = self
            .doc
            .push(NodeData::Pi(PiData { target, value }), None, pos);
        self.append_child(parent, pi);
        Ok(())
    }

    fn parse_comment(&mut self) -> Result<(), ParseError> {
        let text = self.current.text.as_ref();
        // '<!--' ... '-->'
        let value = text[4..text.len() - 3].to_string();
        let parent = self.top();
        let pos = self.next_pos();
        let comment = self
            .doc
            .push(NodeData::Comment(CommentData { value }), None, pos);
        self.append_child(parent, comment);
        self.consume(TokenKind::Comment)
    }

    fn parse_cdata(&mut self) -> Result<(), ParseError> {
        if self.is_root_wrapped {
            self.warn("Found CDATA outside root element.");
            return self.advance();
        }
        let text = self.current.text.as_ref();
        // '<![CDATA[' ... ']]>'
        let value = text[9..text.len() - 3].to_string();
        let parent = self.top();
        let pos = self.next_pos();
        let node = self.doc.push(
            NodeData::Text(TextData {
                value,
                number: f64::NAN,
                is_cdata: true,
                has_entity: false,
            }),
            None,
            pos,
        );
        self.append_child(parent, node);
        self.consume(TokenKind::Cdata)
    }

    fn parse_text(&mut self) -> Result<(), ParseError> {
        if self.is_root_wrapped {
            if !is_whitespace(&self.current.text) {
                self.warn("Found non-whitespace text outside root element.");
            }
            return self.advance();
        }
        let value = self.current.text.to_string();
        let has_entity =
            self.cfg.transpose_text && value.contains(['&', '<', '>', '\'', '"']);
        let number = match self.current.literal {
            LiteralKind::Integer | LiteralKind::HexInteger | LiteralKind::Double => {
                literal::to_number(&value)
            }
            _ => f64::NAN,
        };
        let parent = self.top();
        let pos = self.next_pos();
        let node = self.doc.push(
            NodeData::Text(TextData {
                value,
                number,
                is_cdata: false,
                has_entity,
            }),
            None,
            pos,
        );
        self.append_child(parent, node);
        self.consume(TokenKind::Text)
    }

    fn parse_name(&mut self, elem_id: NodeId) -> Result<(), ParseError> {
        // element names must not carry the reserved `xmlns` prefix
        if ci_eq(&self.current.text, XMLNS_PREFIX) {
            return Err(self.syntax_error("Element name cannot have the prefix `xmlns`."));
        }
        let first = self.current.text.to_string();
        self.consume(TokenKind::Identifier)?;
        let name = if self.current.kind == TokenKind::Colon {
            self.advance()?;
            self.consume(TokenKind::Identifier)?;
            QName::from_parts(&first, &self.prev.text)
        } else {
            QName::new(first)
        };
        self.doc.element_mut(elem_id).name = name;
        if self.root_element.is_none() {
            self.root_element = Some(elem_id);
        }
        self.scopes.push();
        Ok(())
    }

    // xmlns (':' prefix)? '=' uri
    fn parse_namespace_decl(&mut self) -> Result<(), ParseError> {
        self.consume(TokenKind::Identifier)?; // 'xmlns'
        let parent = self.top();
        let mut prefix = String::new();
        let mut is_prefix = false;
        let mut is_xml_prefix = false;
        if self.current.kind == TokenKind::Colon {
            self.advance()?;
            if ci_eq(&self.current.text, XMLNS_PREFIX) {
                return Err(self.syntax_error("`xmlns` cannot be used as a namespace prefix."));
            }
            if ci_eq(&self.current.text, XML_PREFIX) {
                is_xml_prefix = true;
            }
            is_prefix = true;
            prefix = self.current.text.to_string();
            self.consume(TokenKind::Identifier)?;
        }
        self.consume(TokenKind::Equal)?;
        let uri = self.current.text.to_string();
        let trimmed = uri.trim();
        let mut is_global = false;
        if is_xml_prefix {
            if trimmed != XML_URI {
                return Err(ParseError::XmlPrefixUri {
                    line: self.lexer.line(),
                });
            }
            is_global = true;
        } else {
            if is_prefix && trimmed.is_empty() {
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
        let ns = self.doc.push(
            NodeData::Namespace(NamespaceData {
                prefix: prefix.clone(),
                uri,
                is_default: !is_prefix,
                is_global,
            }),
            Some(parent),
            0,
        );
        let key = if is_prefix { prefix.as_str() } else { XMLNS_PREFIX };
        if self.scopes.insert(key, ns) == MapInsert::Updated {
            return Err(ParseError::DuplicateNamespace {
                line: self.lexer.line(),
            });
        }
        let pos = self.next_pos();
        self.doc.set_position(ns, pos);
        self.attr_list.push(ns);
        Ok(())
    }

    // attribute ::= Name '=' StringLit
    fn parse_attribute(&mut self) -> Result<(), ParseError> {
        if ci_eq(&self.current.text, XMLNS_PREFIX) {
            return self.parse_namespace_decl();
        }
        let parent = self.top();
        let first = self.current.text.to_string();
        self.consume(TokenKind::Identifier)?;
        let pos = self.next_pos();
        let name = if self.current.kind == TokenKind::Colon {
            self.advance()?;
            self.consume(TokenKind::Identifier)?;
            QName::from_parts(&first, &self.prev.text)
        } else {
            QName::new(first)
        };
        self.consume(TokenKind::Equal)?;
        let value = self.current.text.to_string();
        let number = match self.current.literal {
            LiteralKind::Integer | LiteralKind::HexInteger | LiteralKind::Double => {
                literal::to_number(&value)
            }
            _ => f64::NAN,
        };
        self.consume(TokenKind::String)?;
        let attr = self.doc.push(
            NodeData::Attribute(AttributeData {
                name,
                value,
                number,
                namespace: None,
            }),
            Some(parent),
            pos,
        );
        self.attr_list.push(attr);
        Ok(())
    }

    /// Binds the element and its accumulated attributes against the scope
    /// chain, then distributes the pending list into the element's
    /// declared-namespace list and attribute map.
    fn resolve_namespaces(&mut self, elem_id: NodeId) -> Result<(), ParseError> {
        let prefix = self.doc.element(elem_id).name.prefix().map(str::to_string);
        if let Some(prefix) = prefix {
            match self.scopes.lookup(&prefix) {
                Some(ns) => self.doc.element_mut(elem_id).namespace = Some(ns),
                None => {
                    return Err(ParseError::UndeclaredPrefix {
                        line: self.lexer.line(),
                        prefix,
                        owner: "element",
                        name: self.doc.element(elem_id).name.qualified().to_string(),
                    });
                }
            }
        } else if self.cfg.allow_default_namespace {
            // the reserved globals are not default namespaces; only a real
            // default declaration binds an unprefixed element
            if let Some(ns) = self.scopes.lookup(XMLNS_PREFIX) {
                if self.doc.is_default_namespace(ns) {
                    self.doc.element_mut(elem_id).namespace = Some(ns);
                }
            }
        }

        let pending = std::mem::take(&mut self.attr_list);
        let mut attr_checker: OrderedMap<String, ()> = OrderedMap::new();
        for node in pending {
            if self.doc.kind(node) == NodeKind::Namespace {
                self.doc
                    .element_mut(elem_id)
                    .namespaces
                    .get_or_insert_with(Vec::new)
                    .push(node);
                continue;
            }
            let (qname, local, attr_prefix) = {
                let NodeData::Attribute(attr) = self.doc.data(node) else {
                    unreachable!("pending list holds attributes and namespaces only");
                };
                (
                    attr.name.qualified().to_string(),
                    attr.name.local_name().to_string(),
                    attr.name.prefix().map(str::to_string),
                )
            };
            if let Some(attr_prefix) = attr_prefix {
                let Some(ns) = self.scopes.lookup(&attr_prefix) else {
                    return Err(ParseError::UndeclaredPrefix {
                        line: self.lexer.line(),
                        prefix: attr_prefix,
                        owner: "attribute",
                        name: qname,
                    });
                };
                if let NodeData::Attribute(attr) = self.doc.data_mut(node) {
                    attr.namespace = Some(ns);
                }
                if self.cfg.ensure_ns_attribute_unique {
                    let uri = self.doc.namespace_uri(ns).unwrap_or_default();
                    let expanded = format!("{uri}:{local}");
                    if attr_checker.insert(expanded, ()) == MapInsert::Updated {
                        return Err(ParseError::DuplicateAttribute {
                            line: self.lexer.line(),
                            name: qname,
                        });
                    }
                }
                self.doc
                    .element_mut(elem_id)
                    .attributes
                    .get_or_insert_with(OrderedMap::new)
                    .insert(qname, node);
            } else if self
                .doc
                .element_mut(elem_id)
                .attributes
                .get_or_insert_with(OrderedMap::new)
                .insert(qname.clone(), node)
                == MapInsert::Updated
            {
                return Err(ParseError::DuplicateAttribute {
                    line: self.lexer.line(),
                    name: qname,
                });
            }
        }
        Ok(())
    }

    // '</' Name '>' | '/>'
    fn parse_close_tag(&mut self, elem_id: NodeId) -> Result<(), ParseError> {
        self.consume(TokenKind::Slash)?;
        if self.current.kind == TokenKind::Identifier {
            if Some(elem_id) == self.root_element {
                self.is_root_wrapped = true;
            }
            let qname = self.doc.element(elem_id).name.qualified().to_string();
            let bound = self.doc.element(elem_id).namespace;
            let prefixed = bound.is_some_and(|ns| !self.doc.is_default_namespace(ns));
            let matched = if prefixed {
                let close_prefix = self.current.text.to_string();
                self.consume(TokenKind::Identifier)?;
                self.consume(TokenKind::Colon)?;
                format!("{close_prefix}:{}", self.current.text) == qname
            } else {
                self.current.text.as_ref() == qname.as_str()
            };
            if !matched {
                return Err(ParseError::CloseTagMismatch {
                    line: self.lexer.line(),
                    expected: qname,
                });
            }
            let elem = self.doc.element_mut(elem_id);
            elem.is_self_enclosing = elem.children.is_empty();
            self.consume(TokenKind::Identifier)?;
        } else {
            self.doc.element_mut(elem_id).is_self_enclosing = true;
        }
        self.consume(TokenKind::GreaterThan)?;
        self.scopes.pop();
        Ok(())
    }

    // element ::= STag (content ETag | EmptyETag)
    fn parse_element(&mut self) -> Result<(), ParseError> {
        let pos = self.next_pos();
        let elem_id = self.doc.push(
            NodeData::Element(ElementData {
                name: QName::new(String::new()),
                attributes: None,
                namespaces: None,
                namespace: None,
                children: Vec::new(),
                is_self_enclosing: false,
            }),
            None,
            pos,
        );
        self.stack.push(elem_id);
        self.parse_name(elem_id)?;
        while self.current.kind == TokenKind::Identifier {
            self.parse_attribute()?;
        }
        self.resolve_namespaces(elem_id)?;

        if self.current.kind == TokenKind::GreaterThan {
            self.advance()?;
            while matches!(
                self.current.kind,
                TokenKind::LessThan | TokenKind::Text | TokenKind::Comment | TokenKind::Cdata
            ) {
                self.dispatch()?;
            }
            self.parse_close_tag(elem_id)?;
        } else {
            self.parse_close_tag(elem_id)?;
        }
        self.stack.pop();

        // anything after the wrapped root element is extra content
        if self.is_root_wrapped && Some(elem_id) != self.root_element {
            self.warn("Found an element outside the root element.");
            self.doc.release_subtree(elem_id);
            return Ok(());
        }
        let parent = self.top();
        self.append_child(parent, elem_id);
        Ok(())
    }

    fn dispatch(&mut self) -> Result<(), ParseError> {
        if self.current.kind == TokenKind::LessThan {
            self.advance()?;
        }
        match self.current.kind {
            TokenKind::Comment => self.parse_comment(),
            TokenKind::Question => self.parse_pi(),
            TokenKind::Identifier => self.parse_element(),
            TokenKind::Text => self.parse_text(),
            TokenKind::Cdata => self.parse_cdata(),
            TokenKind::Slash => Ok(()), // the enclosing element consumes it
            _ => Err(self.syntax_error(
                "Parse Error. Possible causes: Nameless tag. All tags must have a name",
            )),
        }
    }
}

impl Document {
    /// Parses a whole in-memory source.
    pub fn parse_str(source: &str) -> Result<Document, ParseError> {
        Document::parse_str_with(source, Config::default())
    }

    pub fn parse_str_with(source: &str, config: Config) -> Result<Document, ParseError> {
        let lexer = Lexer::from_str(source, &config);
        Parser::new(lexer, config).run()
    }

    /// Parses a file through the chunked stream buffer.
    pub fn parse_file(path: impl AsRef<Path>) -> Result<Document, ParseError> {
        Document::parse_file_with(path, Config::default())
    }

    pub fn parse_file_with(path: impl AsRef<Path>, config: Config) -> Result<Document, ParseError> {
        let lexer = Lexer::from_file(path.as_ref(), &config)?;
        Parser::new(lexer, config).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_elements_with_text() {
        let doc = Document::parse_str("<bar><ball>A</ball><ball a=\"abcd\">B</ball></bar>").unwrap();
        let root_elem = doc.root_element().unwrap();
        assert_eq!(doc.name(root_elem), Some("bar"));
        let balls = doc.children(root_elem);
        assert_eq!(balls.len(), 2);
        let second = balls[1];
        assert_eq!(doc.name(second), Some("ball"));
        let attr = doc.attribute(second, "a").unwrap();
        assert_eq!(doc.value(attr), Some("abcd"));
        assert_eq!(doc.string_value(second), "B");
        assert!(doc.is_well_formed());
    }

    #[test]
    fn document_positions_increase_in_parse_order() {
        let doc = Document::parse_str("<r><a x=\"1\"/><b/></r>").unwrap();
        let r = doc.root_element().unwrap();
        let a = doc.children(r)[0];
        let b = doc.children(r)[1];
        let x = doc.attribute(a, "x").unwrap();
        assert!(doc.position(r) > doc.position(doc.root()));
        assert!(doc.position(a) > doc.position(r));
        assert!(doc.position(x) > doc.position(a));
        assert!(doc.position(b) > doc.position(x));
    }

    #[test]
    fn namespace_scoping_binds_prefixed_attribute() {
        let doc = Document::parse_str("<a xmlns:x=\"u\"><x:b x:c=\"1\"/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let declared = doc.declared_namespaces(a);
        assert_eq!(declared.len(), 1);
        let b = doc.children(a)[0];
        assert_eq!(doc.name(b), Some("x:b"));
        let c = doc.attribute(b, "x:c").unwrap();
        let ns = doc.bound_namespace(c).unwrap();
        assert_eq!(doc.namespace_uri(ns), Some("u"));
        assert_eq!(doc.bound_namespace(b), Some(declared[0]));
    }

    #[test]
    fn duplicate_attribute_is_fatal() {
        let err = Document::parse_str("<e a=\"1\" a=\"2\"/>").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateAttribute { .. }));
    }

    #[test]
    fn duplicate_expanded_name_is_fatal() {
        let src = "<e xmlns:n1=\"http://w\" xmlns:n2=\"http://w\" n1:a=\"b1\" n2:a=\"b2\"/>";
        let err = Document::parse_str(src).unwrap_err();
        assert!(matches!(err, ParseError::DuplicateAttribute { .. }));
    }

    #[test]
    fn expanded_name_check_can_be_disabled() {
        let src = "<e xmlns:n1=\"http://w\" xmlns:n2=\"http://w\" n1:a=\"b1\" n2:a=\"b2\"/>";
        let cfg = Config {
            ensure_ns_attribute_unique: false,
            ..Config::default()
        };
        let doc = Document::parse_str_with(src, cfg).unwrap();
        assert!(doc.is_well_formed());
    }

    #[test]
    fn undeclared_prefix_is_fatal() {
        let err = Document::parse_str("<x:a/>").unwrap_err();
        assert!(matches!(err, ParseError::UndeclaredPrefix { .. }));
    }

    #[test]
    fn xml_prefix_resolves_against_the_reserved_global() {
        let doc = Document::parse_str("<a xml:lang=\"en\"/>").unwrap();
        let a = doc.root_element().unwrap();
        let lang = doc.attribute(a, "xml:lang").unwrap();
        let ns = doc.bound_namespace(lang).unwrap();
        assert_eq!(doc.namespace_uri(ns), Some(XML_URI));
        assert!(doc.is_global_namespace(ns));
    }

    #[test]
    fn xmlns_prefix_on_element_is_fatal() {
        assert!(Document::parse_str("<xmlns:a/>").is_err());
    }

    #[test]
    fn empty_prefixed_namespace_uri_is_fatal() {
        let err = Document::parse_str("<a xmlns:p=\"\"><p:b/></a>").unwrap_err();
        assert!(matches!(err, ParseError::EmptyNamespaceUri { .. }));
    }

    #[test]
    fn reserved_uri_misuse_is_fatal() {
        let err =
            Document::parse_str("<a xmlns:p=\"http://www.w3.org/2000/xmlns/\"/>").unwrap_err();
        assert!(matches!(err, ParseError::ReservedUri { .. }));
        let err = Document::parse_str("<a xmlns:xml=\"http://other\"/>").unwrap_err();
        assert!(matches!(err, ParseError::XmlPrefixUri { .. }));
    }

    #[test]
    fn xml_prefix_with_reserved_uri_is_accepted() {
        let doc =
            Document::parse_str("<a xmlns:xml=\"http://www.w3.org/XML/1998/namespace\"/>").unwrap();
        assert!(doc.is_well_formed());
    }

    #[test]
    fn duplicate_namespace_in_one_element_is_fatal() {
        let err = Document::parse_str("<a xmlns:p=\"u1\" xmlns:p=\"u2\"/>").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateNamespace { .. }));
    }

    #[test]
    fn close_tag_mismatch_suggests_the_open_tag() {
        let err = Document::parse_str("<stuff>123</nuff>").unwrap_err();
        match err {
            ParseError::CloseTagMismatch { expected, .. } => assert_eq!(expected, "stuff"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn default_namespace_binds_elements_but_not_attributes() {
        let doc = Document::parse_str("<a xmlns=\"d\" k=\"v\"><b/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let ns = doc.bound_namespace(a).unwrap();
        assert_eq!(doc.namespace_uri(ns), Some("d"));
        assert!(doc.is_default_namespace(ns));
        let b = doc.children(a)[0];
        assert_eq!(doc.bound_namespace(b), Some(ns));
        let k = doc.attribute(a, "k").unwrap();
        assert_eq!(doc.bound_namespace(k), None);
    }

    #[test]
    fn default_namespace_binding_can_be_disabled() {
        let cfg = Config {
            allow_default_namespace: false,
            ..Config::default()
        };
        let doc = Document::parse_str_with("<a xmlns=\"d\"/>", cfg).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.bound_namespace(a), None);
    }

    #[test]
    fn content_after_wrapped_root_warns_but_still_parses() {
        let doc = Document::parse_str("<r></r>stray<x/>").unwrap();
        assert!(!doc.is_well_formed());
        assert!(doc.warnings().len() >= 2);
        assert!(doc.root_element().is_some());
        // neither the stray text nor the stray element joined the tree
        let root = doc.root();
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn whitespace_after_root_is_accepted() {
        let doc = Document::parse_str("<r/>\n  \n").unwrap();
        assert!(doc.is_well_formed());
    }

    #[test]
    fn prolog_is_parsed_into_header_and_dtd() {
        let src = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><!DOCTYPE note><note/>";
        let doc = Document::parse_str(src).unwrap();
        let header = doc.xml_header().unwrap();
        let version = doc.attribute(header, "version").unwrap();
        assert_eq!(doc.value(version), Some("1.0"));
        let dtd = doc.dtd().unwrap();
        assert_eq!(doc.value(dtd), Some("<!DOCTYPE note>"));
    }

    #[test]
    fn prolog_constraints_are_fatal() {
        assert!(Document::parse_str("<?xml version=\"1.0\" version=\"1.1\"?><a/>").is_err());
        assert!(Document::parse_str("<?xml p:version=\"1.0\"?><a/>").is_err());
        assert!(Document::parse_str("<?xml xmlns=\"u\"?><a/>").is_err());
    }

    #[test]
    fn processing_instruction_inside_element() {
        let doc = Document::parse_str("<a><?php echo 1; ?></a>").unwrap();
        let a = doc.root_element().unwrap();
        let pi = doc.children(a)[0];
        assert_eq!(doc.kind(pi), NodeKind::ProcessingInstruction);
        assert_eq!(doc.name(pi), Some("php"));
        assert_eq!(doc.value(pi), Some("echo 1; "));
    }

    #[test]
    fn pi_target_with_prefix_is_fatal() {
        assert!(Document::parse_str("<a><?p:t v?></a>").is_err());
    }

    #[test]
    fn cdata_becomes_a_cdata_text_node() {
        let doc = Document::parse_str("<n><![CDATA[<&>\"']]></n>").unwrap();
        let n = doc.root_element().unwrap();
        let cd = doc.children(n)[0];
        assert!(doc.is_cdata(cd));
        assert_eq!(doc.value(cd), Some("<&>\"'"));
        assert!(doc.number_value(cd).is_nan());
    }

    #[test]
    fn text_numeric_classification_flows_into_the_node() {
        let doc = Document::parse_str("<n>42</n>").unwrap();
        let n = doc.root_element().unwrap();
        assert_eq!(doc.number_value(n), 42.0);
        let t = doc.children(n)[0];
        assert_eq!(doc.number_value(t), 42.0);
    }

    #[test]
    fn mixed_content_string_value_concatenates_in_document_order() {
        let doc = Document::parse_str("<a>one<b>two</b>three</a>").unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.string_value(a), "onetwothree");
    }

    #[test]
    fn self_enclosing_flag_covers_both_spellings() {
        let doc = Document::parse_str("<r><a/><b></b><c>x</c></r>").unwrap();
        let r = doc.root_element().unwrap();
        let kids = doc.children(r);
        assert!(doc.is_self_enclosing(kids[0]));
        assert!(doc.is_self_enclosing(kids[1]));
        assert!(!doc.is_self_enclosing(kids[2]));
    }

    #[test]
    fn greater_than_as_first_text_char() {
        let doc = Document::parse_str("<tag>>foo</tag>").unwrap();
        let tag = doc.root_element().unwrap();
        assert_eq!(doc.string_value(tag), ">foo");
    }

    #[test]
    fn streamed_parse_matches_in_memory_parse() {
        use std::io::Write;
        let body = "<root>".to_string()
            + &(0..200)
                .map(|i| format!("<item id=\"{i}\">value-{i}</item>"))
                .collect::<String>()
            + "</root>";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.flush().unwrap();

        let cfg = Config {
            chunk_size: 64,
            ..Config::default()
        };
        let streamed = Document::parse_file_with(file.path(), cfg).unwrap();
        let in_memory = Document::parse_str(&body).unwrap();

        let s_root = streamed.root_element().unwrap();
        let m_root = in_memory.root_element().unwrap();
        assert_eq!(
            streamed.children(s_root).len(),
            in_memory.children(m_root).len()
        );
        assert_eq!(streamed.string_value(s_root), in_memory.string_value(m_root));
        let s_last = *streamed.children(s_root).last().unwrap();
        let attr = streamed.attribute(s_last, "id").unwrap();
        assert_eq!(streamed.value(attr), Some("199"));
    }
}
