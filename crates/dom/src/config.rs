//! Parser and serializer options.
//!
//! A `Config` is snapshotted by value into every parser, lexer and reader at
//! construction time, so changing a config between parses never affects a
//! parse already in progress.

pub const DEFAULT_CHUNK_SIZE: usize = 0x100000; // 1 MiB

#[derive(Debug, Clone)]
pub struct Config {
    /// Name given to the synthetic document root.
    pub doc_name: String,
    /// Stream buffer chunk size in bytes.
    pub chunk_size: usize,
    /// Retain whitespace between tags.
    pub preserve_space: bool,
    /// Keep comment tokens.
    pub preserve_comment: bool,
    /// Keep CDATA tokens.
    pub preserve_cdata: bool,
    /// Substitute predefined entities when serializing.
    pub transpose_text: bool,
    /// Substitute all five predefined entities instead of only `&`, `<`, `>`.
    pub strict_transpose: bool,
    /// Spaces per indent level when serializing.
    pub indent_space_size: u16,
    /// Wrap serialized output in a `doc_name` top-level element.
    pub show_doc_as_top_level: bool,
    /// Type-annotated serialization.
    pub print_fancy: bool,
    /// Log non-fatal warnings at end of parse.
    pub show_warnings: bool,
    /// Emit debug traces.
    pub enable_debugging: bool,
    /// Store the entire DTD span rather than the name only.
    pub preserve_dtd_structure: bool,
    /// Enforce expanded-name uniqueness for namespaced attributes.
    pub ensure_ns_attribute_unique: bool,
    /// Bind an in-scope default namespace to unprefixed elements.
    pub allow_default_namespace: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            doc_name: "XMLDocument".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            preserve_space: true,
            preserve_comment: true,
            preserve_cdata: true,
            transpose_text: true,
            strict_transpose: false,
            indent_space_size: 2,
            show_doc_as_top_level: true,
            print_fancy: true,
            show_warnings: true,
            enable_debugging: false,
            preserve_dtd_structure: false,
            ensure_ns_attribute_unique: true,
            allow_default_namespace: true,
        }
    }
}
