//! Foundation structures shared by the DOM and XPath crates: literal
//! classification, insertion-ordered open-addressed collections, and a
//! small LRU cache.

pub mod literal;
pub mod lru;
pub mod ordmap;
pub mod ordset;

pub use literal::{IntegerKind, LiteralKind};
pub use lru::LruCache;
pub use ordmap::{MapInsert, OrderedMap, TableKey};
pub use ordset::OrderedSet;
