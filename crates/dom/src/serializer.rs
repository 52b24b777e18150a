//! Document serialization.
//!
//! The plain renderer produces well-formed XML that re-parses to the same
//! tree: elements with text content render inline, element-only content
//! renders one child per line at the configured indent width, and CDATA is
//! emitted verbatim with no entity transposition. The fancy renderer is a
//! type-annotated tree view for inspection and is not meant to re-parse.

use crate::config::Config;
use crate::node::{Document, NodeId, NodeKind};

/// Plain XML rendition, honoring every option except `print_fancy`.
pub(crate) fn serialize(doc: &Document, cfg: &Config) -> String {
    let mut s = Serializer {
        doc,
        cfg,
        out: String::new(),
    };
    s.run();
    s.out
}

/// Dispatches on `print_fancy`; backs the `Display` impl.
pub(crate) fn render(doc: &Document, cfg: &Config) -> String {
    if cfg.print_fancy {
        render_fancy(doc, cfg)
    } else {
        serialize(doc, cfg)
    }
}

struct Serializer<'d> {
    doc: &'d Document,
    cfg: &'d Config,
    out: String,
}

impl Serializer<'_> {
    fn run(&mut self) {
        let doc = self.doc;
        let root = doc.root();
        if self.cfg.show_doc_as_top_level {
            self.out.push('<');
            self.out.push_str(doc.doc_name());
            self.out.push_str(">\n");
            for &child in doc.children(root) {
                self.write_node(child, 1);
                self.out.push('\n');
            }
            self.out.push_str("</");
            self.out.push_str(doc.doc_name());
            self.out.push('>');
        } else {
            let children = doc.children(root);
            for (i, &child) in children.iter().enumerate() {
                self.write_node(child, 0);
                if i + 1 < children.len() {
                    self.out.push('\n');
                }
            }
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth * self.cfg.indent_space_size as usize {
            self.out.push(' ');
        }
    }

    fn escape_into(&mut self, value: &str) {
        let strict = self.cfg.strict_transpose;
        for ch in value.chars() {
            match ch {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '\'' if strict => self.out.push_str("&apos;"),
                '"' if strict => self.out.push_str("&quot;"),
                _ => self.out.push(ch),
            }
        }
    }

    fn write_attr_value(&mut self, value: &str) {
        for ch in value.chars() {
            match ch {
                '"' => self.out.push_str("&quot;"),
                '&' if self.cfg.transpose_text => self.out.push_str("&amp;"),
                '<' if self.cfg.transpose_text => self.out.push_str("&lt;"),
                '>' if self.cfg.transpose_text => self.out.push_str("&gt;"),
                _ => self.out.push(ch),
            }
        }
    }

    fn write_node(&mut self, id: NodeId, depth: usize) {
        match self.doc.kind(id) {
            NodeKind::Element => self.write_element(id, depth),
            NodeKind::Text => {
                self.indent(depth);
                self.write_text(id);
            }
            NodeKind::Comment => {
                self.indent(depth);
                self.out.push_str("<!--");
                self.out.push_str(self.doc.value(id).unwrap_or(""));
                self.out.push_str("-->");
            }
            NodeKind::ProcessingInstruction => {
                self.indent(depth);
                self.out.push_str("<?");
                self.out.push_str(self.doc.name(id).unwrap_or(""));
                let value = self.doc.value(id).unwrap_or("");
                if !value.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(value);
                }
                self.out.push_str("?>");
            }
            NodeKind::XmlHeader => {
                self.indent(depth);
                self.out.push_str("<?xml");
                for attr in self.doc.attributes(id).collect::<Vec<_>>() {
                    self.out.push(' ');
                    self.out.push_str(self.doc.name(attr).unwrap_or(""));
                    self.out.push_str("=\"");
                    self.out.push_str(self.doc.value(attr).unwrap_or(""));
                    self.out.push('"');
                }
                self.out.push_str("?>");
            }
            NodeKind::Dtd => {
                self.indent(depth);
                self.out.push_str(self.doc.value(id).unwrap_or(""));
            }
            NodeKind::Root | NodeKind::Attribute | NodeKind::Namespace => {}
        }
    }

    fn write_text(&mut self, id: NodeId) {
        if self.doc.is_cdata(id) {
            self.out.push_str("<![CDATA[");
            self.out.push_str(self.doc.value(id).unwrap_or(""));
            self.out.push_str("]]>");
        } else if self.cfg.transpose_text && self.doc.has_entity(id) {
            let value = self.doc.value(id).unwrap_or("").to_string();
            self.escape_into(&value);
        } else {
            self.out.push_str(self.doc.value(id).unwrap_or(""));
        }
    }

    fn write_open_tag(&mut self, id: NodeId) {
        self.out.push('<');
        self.out.push_str(self.doc.name(id).unwrap_or(""));
        for &ns in self.doc.declared_namespaces(id) {
            let prefix = self.doc.namespace_prefix(ns).unwrap_or("");
            if self.doc.is_default_namespace(ns) {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(prefix);
                self.out.push_str("=\"");
            }
            self.out.push_str(self.doc.namespace_uri(ns).unwrap_or(""));
            self.out.push('"');
        }
        for attr in self.doc.attributes(id).collect::<Vec<_>>() {
            self.out.push(' ');
            self.out.push_str(self.doc.name(attr).unwrap_or(""));
            self.out.push_str("=\"");
            let value = self.doc.value(attr).unwrap_or("").to_string();
            self.write_attr_value(&value);
            self.out.push('"');
        }
    }

    fn write_element(&mut self, id: NodeId, depth: usize) {
        self.indent(depth);
        self.write_open_tag(id);
        let doc = self.doc;
        let children = doc.children(id);
        if children.is_empty() {
            self.out.push_str("/>");
            return;
        }
        self.out.push('>');
        if doc.has_text(id) {
            // mixed content renders inline so no synthetic whitespace is
            // introduced between text runs and tags
            for &child in children {
                match doc.kind(child) {
                    NodeKind::Text => self.write_text(child),
                    _ => self.write_node(child, 0),
                }
            }
        } else {
            for &child in children {
                self.out.push('\n');
                self.write_node(child, depth + 1);
            }
            self.out.push('\n');
            self.indent(depth);
        }
        self.out.push_str("</");
        self.out.push_str(doc.name(id).unwrap_or(""));
        self.out.push('>');
    }
}

/// Type-annotated tree view; a debugging aid, not XML.
pub(crate) fn render_fancy(doc: &Document, cfg: &Config) -> String {
    let mut out = String::new();
    fancy_node(doc, cfg, doc.root(), 0, &mut out);
    out
}

fn fancy_indent(cfg: &Config, depth: usize, out: &mut String) {
    for _ in 0..depth * cfg.indent_space_size as usize {
        out.push(' ');
    }
}

fn fancy_node(doc: &Document, cfg: &Config, id: NodeId, depth: usize, out: &mut String) {
    fancy_indent(cfg, depth, out);
    match doc.kind(id) {
        NodeKind::Root => {
            out.push_str(&format!("[Root]='{}'\n", doc.doc_name()));
            for &child in doc.children(id) {
                fancy_node(doc, cfg, child, depth + 1, out);
            }
        }
        NodeKind::Element => {
            out.push_str(&format!("[Element]='{}'\n", doc.name(id).unwrap_or("")));
            for ns in doc.declared_namespaces(id).to_vec() {
                fancy_node(doc, cfg, ns, depth + 1, out);
            }
            for attr in doc.attributes(id).collect::<Vec<_>>() {
                fancy_node(doc, cfg, attr, depth + 1, out);
            }
            for &child in doc.children(id) {
                fancy_node(doc, cfg, child, depth + 1, out);
            }
        }
        NodeKind::Text => {
            let tag = if doc.is_cdata(id) { "CDATA" } else { "Text" };
            out.push_str(&format!("[{tag}]='{}'\n", doc.value(id).unwrap_or("")));
        }
        NodeKind::Attribute => {
            out.push_str(&format!(
                "[Attribute]='{}'=\"{}\"\n",
                doc.name(id).unwrap_or(""),
                doc.value(id).unwrap_or("")
            ));
        }
        NodeKind::Comment => {
            out.push_str(&format!("[Comment]='{}'\n", doc.value(id).unwrap_or("")));
        }
        NodeKind::ProcessingInstruction => {
            out.push_str(&format!(
                "[ProcessingInstruction]='{}' '{}'\n",
                doc.name(id).unwrap_or(""),
                doc.value(id).unwrap_or("")
            ));
        }
        NodeKind::Namespace => {
            let prefix = doc.namespace_prefix(id).unwrap_or("");
            out.push_str(&format!(
                "[Namespace]='{}'=\"{}\"\n",
                prefix,
                doc.namespace_uri(id).unwrap_or("")
            ));
        }
        NodeKind::XmlHeader => {
            out.push_str("[XmlHeader]\n");
            for attr in doc.attributes(id).collect::<Vec<_>>() {
                fancy_node(doc, cfg, attr, depth + 1, out);
            }
        }
        NodeKind::Dtd => {
            out.push_str(&format!("[Dtd]='{}'\n", doc.value(id).unwrap_or("")));
        }
    }
}

impl Document {
    /// Renders the tree as plain XML using the document's own config.
    pub fn serialize(&self) -> String {
        serialize(self, self.config())
    }

    /// Renders the tree as plain XML with a different config.
    pub fn serialize_with(&self, cfg: &Config) -> String {
        serialize(self, cfg)
    }

    /// Type-annotated tree view.
    pub fn fancy_string(&self) -> String {
        render_fancy(self, self.config())
    }
}
