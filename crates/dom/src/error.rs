//! Error types for document parsing and tree manipulation.

use thiserror::Error;

/// A fatal condition raised while lexing or parsing a document.
///
/// Non-fatal conditions (anything found outside the root element) are
/// recorded as warnings on the resulting [`Document`] instead.
///
/// [`Document`]: crate::Document
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Lexical { line: u32, message: String },

    #[error("line {line}: {message}")]
    Syntax { line: u32, message: String },

    #[error("line {line}: closing tag mismatch, perhaps you meant `{expected}`?")]
    CloseTagMismatch { line: u32, expected: String },

    #[error("line {line}: duplicate attributes found in element declaration: `{name}`")]
    DuplicateAttribute { line: u32, name: String },

    #[error("line {line}: duplicate namespaces found in element declaration")]
    DuplicateNamespace { line: u32 },

    #[error("line {line}: found an empty namespace URI for a namespace with a declared prefix")]
    EmptyNamespaceUri { line: u32 },

    #[error("line {line}: namespace URI is in collision with a reserved standard URI")]
    ReservedUri { line: u32 },

    #[error("line {line}: namespace URI for the `xml` prefix does not match the reserved standard URI")]
    XmlPrefixUri { line: u32 },

    #[error("line {line}: could not find namespace corresponding to the prefix `{prefix}` for {owner} `{name}`")]
    UndeclaredPrefix {
        line: u32,
        prefix: String,
        owner: &'static str,
        name: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// The source line the error points at, when it has one.
    pub fn line(&self) -> Option<u32> {
        match self {
            ParseError::Lexical { line, .. }
            | ParseError::Syntax { line, .. }
            | ParseError::CloseTagMismatch { line, .. }
            | ParseError::DuplicateAttribute { line, .. }
            | ParseError::DuplicateNamespace { line }
            | ParseError::EmptyNamespaceUri { line }
            | ParseError::ReservedUri { line }
            | ParseError::XmlPrefixUri { line }
            | ParseError::UndeclaredPrefix { line, .. } => Some(*line),
            ParseError::Io(_) => None,
        }
    }
}

/// Structural violations raised by the tree mutation surface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("document already has a root element")]
    RootElementAlreadySet,

    #[error("node is not an element")]
    NotAnElement,

    #[error("node is not a child of the document")]
    NotADocumentChild,

    #[error("node is still attached to a parent")]
    StillAttached,
}
