//! The string query surface.
//!
//! A small selection language over the document model, thin glue over the
//! core:
//!
//! ```text
//! query       := segment+
//! segment     := '<' name '>' '/'           element by name
//!              | '@' attr '/'               attribute exists
//!              | attr '=' 'value' '/'       attribute equals literal
//!              | attr '|=' 'substr' '/'     attribute contains literal
//!              | '$text'    ('=' | '|=') 'literal' '/'
//!              | '#comment' ('=' | '|=') 'literal' '/'
//! ```
//!
//! [`find`] returns the first match in document order, [`find_all`] every
//! match; the search starts at the given node (itself included when it is
//! an element) and covers its whole subtree.

use thiserror::Error;
use xylem_dom::{Document, NodeId, NodeKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid query `{query}`: {message}")]
    Invalid { query: String, message: String },
}

#[derive(Debug, PartialEq, Eq)]
enum Condition {
    AttrExists(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    TextEquals(String),
    TextContains(String),
    CommentEquals(String),
    CommentContains(String),
}

#[derive(Debug)]
struct Query {
    name: String,
    conditions: Vec<Condition>,
}

struct Scanner<'q> {
    query: &'q str,
    bytes: &'q [u8],
    i: usize,
}

impl<'q> Scanner<'q> {
    fn error(&self, message: &str) -> QueryError {
        QueryError::Invalid {
            query: self.query.to_string(),
            message: message.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.i >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.i).copied().unwrap_or(0)
    }

    fn expect(&mut self, expected: u8) -> Result<(), QueryError> {
        if self.peek() == expected {
            self.i += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", expected as char)))
        }
    }

    fn take_until(&mut self, stops: &[u8]) -> &'q str {
        let start = self.i;
        while !self.at_end() && !stops.contains(&self.peek()) {
            self.i += 1;
        }
        &self.query[start..self.i]
    }

    fn literal(&mut self) -> Result<String, QueryError> {
        let quote = self.peek();
        if quote != b'\'' && quote != b'"' {
            return Err(self.error("expected a quoted literal"));
        }
        self.i += 1;
        let value = self.take_until(&[quote]).to_string();
        self.expect(quote)
            .map_err(|_| self.error("unterminated literal"))?;
        Ok(value)
    }

    /// `=` or `|=`; true means "contains".
    fn operator(&mut self) -> Result<bool, QueryError> {
        if self.peek() == b'|' {
            self.i += 1;
            self.expect(b'=')?;
            Ok(true)
        } else {
            self.expect(b'=')?;
            Ok(false)
        }
    }
}

fn parse_query(query: &str) -> Result<Query, QueryError> {
    let mut s = Scanner {
        query: query.trim(),
        bytes: query.trim().as_bytes(),
        i: 0,
    };
    s.expect(b'<')?;
    let name = s.take_until(&[b'>']).to_string();
    if name.is_empty() {
        return Err(s.error("expected an element name"));
    }
    s.expect(b'>')?;
    s.expect(b'/')?;

    let mut conditions = Vec::new();
    while !s.at_end() {
        match s.peek() {
            b'@' => {
                s.i += 1;
                let attr = s.take_until(&[b'/']).to_string();
                if attr.is_empty() {
                    return Err(s.error("expected an attribute name after `@`"));
                }
                conditions.push(Condition::AttrExists(attr));
            }
            b'$' => {
                let keyword = s.take_until(&[b'=', b'|']);
                if keyword != "$text" {
                    return Err(s.error("expected `$text`"));
                }
                let contains = s.operator()?;
                let value = s.literal()?;
                conditions.push(if contains {
                    Condition::TextContains(value)
                } else {
                    Condition::TextEquals(value)
                });
            }
            b'#' => {
                let keyword = s.take_until(&[b'=', b'|']);
                if keyword != "#comment" {
                    return Err(s.error("expected `#comment`"));
                }
                let contains = s.operator()?;
                let value = s.literal()?;
                conditions.push(if contains {
                    Condition::CommentContains(value)
                } else {
                    Condition::CommentEquals(value)
                });
            }
            _ => {
                let attr = s.take_until(&[b'=', b'|', b'/']).to_string();
                if attr.is_empty() {
                    return Err(s.error("expected a condition"));
                }
                let contains = s.operator()?;
                let value = s.literal()?;
                conditions.push(if contains {
                    Condition::AttrContains(attr, value)
                } else {
                    Condition::AttrEquals(attr, value)
                });
            }
        }
        s.expect(b'/')?;
    }
    Ok(Query { name, conditions })
}

fn condition_holds(doc: &Document, elem: NodeId, condition: &Condition) -> bool {
    match condition {
        Condition::AttrExists(name) => doc.attribute(elem, name).is_some(),
        Condition::AttrEquals(name, value) => doc
            .attribute(elem, name)
            .and_then(|a| doc.value(a))
            .is_some_and(|v| v == value),
        Condition::AttrContains(name, value) => doc
            .attribute(elem, name)
            .and_then(|a| doc.value(a))
            .is_some_and(|v| v.contains(value.as_str())),
        Condition::TextEquals(value) => doc.children(elem).iter().any(|&c| {
            doc.kind(c) == NodeKind::Text && doc.value(c) == Some(value.as_str())
        }),
        Condition::TextContains(value) => doc.children(elem).iter().any(|&c| {
            doc.kind(c) == NodeKind::Text
                && doc.value(c).is_some_and(|v| v.contains(value.as_str()))
        }),
        Condition::CommentEquals(value) => doc.children(elem).iter().any(|&c| {
            doc.kind(c) == NodeKind::Comment && doc.value(c) == Some(value.as_str())
        }),
        Condition::CommentContains(value) => doc.children(elem).iter().any(|&c| {
            doc.kind(c) == NodeKind::Comment
                && doc.value(c).is_some_and(|v| v.contains(value.as_str()))
        }),
    }
}

fn matches(doc: &Document, node: NodeId, query: &Query) -> bool {
    doc.kind(node) == NodeKind::Element
        && doc.name(node) == Some(query.name.as_str())
        && query
            .conditions
            .iter()
            .all(|c| condition_holds(doc, node, c))
}

fn candidates(doc: &Document, from: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    if doc.kind(from) == NodeKind::Element {
        out.push(from);
    }
    out.extend(doc.descendants(from));
    out
}

/// First element below (or at) `from` matching the query, in document
/// order.
pub fn find(doc: &Document, from: NodeId, query: &str) -> Result<Option<NodeId>, QueryError> {
    let query = parse_query(query)?;
    Ok(candidates(doc, from)
        .into_iter()
        .find(|&n| matches(doc, n, &query)))
}

/// Every element below (or at) `from` matching the query, in document
/// order.
pub fn find_all(doc: &Document, from: NodeId, query: &str) -> Result<Vec<NodeId>, QueryError> {
    let query = parse_query(query)?;
    Ok(candidates(doc, from)
        .into_iter()
        .filter(|&n| matches(doc, n, &query))
        .collect())
}

/// Destroys a subtree in place; the id becomes invalid.
pub fn delete(doc: &mut Document, node: NodeId) {
    doc.delete(node);
}

/// Extracts a subtree: it is unlinked from its parent and handed back to
/// the caller, still navigable through the document.
pub fn drop_node(doc: &mut Document, node: NodeId) -> NodeId {
    doc.detach(node)
}
