//! # xylem-dom
//!
//! XML 1.0 document model and parsers:
//!
//! - **node**: the arena document model with parent back references and
//!   document positions
//! - **parser**: a buffer-streaming recursive-descent DOM parser enforcing
//!   well-formedness, namespace scoping and attribute uniqueness
//! - **reader**: a pull-style event reader over the same grammar that never
//!   materializes the tree
//! - **serializer**: round-trippable plain rendering plus an annotated
//!   debugging view
//!
//! Fatal conditions surface as [`ParseError`]; content found outside the
//! root element is collected as warnings and clears the document's
//! well-formed flag without aborting the parse.

pub mod config;
pub mod error;
mod lexer;
pub mod name;
mod node;
mod parser;
pub mod reader;
mod scope;
mod serializer;
mod stream;

pub use config::Config;
pub use error::{DomError, ParseError};
pub use name::QName;
pub use node::{Document, NodeId, NodeKind, XML_PREFIX, XML_URI, XMLNS_PREFIX, XMLNS_URI};
pub use reader::{Event, EventReader};
