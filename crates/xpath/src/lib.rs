//! # xylem-xpath
//!
//! An XPath 1.0 engine over the `xylem-dom` document model:
//!
//! - **lexer**: hand-written expression scanner with nested `(: :)`
//!   comments
//! - **parser**: a Pratt parser driven by a binding-power table, producing
//!   a typed AST with parse-time function resolution
//! - **optimizer**: classifies predicates by context dependence so
//!   invariant predicates are evaluated once
//! - **eval**: the tree walker producing one of the four XPath value types,
//!   with document-order node sets and an LRU-cached predicate fast path
//!
//! The supported axes reduce to child (`/`), descendant (`//`), self (`.`),
//! parent (`..`) and attribute (`@`).
//!
//! ```
//! use xylem_dom::Document;
//!
//! let doc = Document::parse_str("<r><a/><b/><c/></r>").unwrap();
//! let set = xylem_xpath::xpath(&doc, "//c | //a").unwrap();
//! assert_eq!(set.len(), 2);
//! ```

pub mod ast;
pub mod error;
mod eval;
mod functions;
mod lexer;
pub mod parser;
mod optimizer;

pub use error::XPathError;
pub use eval::{compile, evaluate, xpath, Compiled, NodeSet, Value};
pub use parser::parse;
