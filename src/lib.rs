//! # xylem
//!
//! An XML 1.0 toolkit built from three coupled pieces over one document
//! model:
//!
//! - a tokenizing, buffer-streaming parser that materializes a DOM-like
//!   tree ([`Document`]),
//! - a pull-style event reader over the same grammar ([`EventReader`]),
//! - an XPath 1.0 engine returning typed results ([`xpath`], [`evaluate`]).
//!
//! ```
//! use xylem::Document;
//!
//! let doc = Document::parse_str(
//!     "<bar><ball>A</ball><ball a=\"abcd\">B</ball></bar>",
//! ).unwrap();
//!
//! // XPath selection
//! let set = xylem::xpath(&doc, "//ball[@a='abcd']").unwrap();
//! assert_eq!(doc.string_value(*set.first().unwrap()), "B");
//!
//! // string query selection
//! let ball = xylem::find(&doc, doc.root(), "<ball>/@a/").unwrap().unwrap();
//! assert_eq!(doc.string_value(ball), "B");
//! ```
//!
//! Parsing a file goes through a chunked stream buffer and never loads the
//! whole document text at once; see [`Document::parse_file`] and
//! [`EventReader::from_file`].

mod query;

pub use query::{delete, drop_node, find, find_all, QueryError};

// Document model and parsers
pub use xylem_dom::{
    Config, DomError, Document, Event, EventReader, NodeId, NodeKind, ParseError, QName,
    XML_PREFIX, XML_URI, XMLNS_PREFIX, XMLNS_URI,
};

// XPath engine
pub use xylem_xpath::{compile, evaluate, xpath, Compiled, NodeSet, Value, XPathError};

// Foundation structures
pub use xylem_util::{LiteralKind, LruCache, OrderedMap, OrderedSet};
