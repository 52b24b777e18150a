//! The document model.
//!
//! Nodes live in an arena owned by the [`Document`]; a [`NodeId`] is an
//! index into it. Parent links are plain ids, which sidesteps the back
//! pointer cycles a node graph otherwise needs. Every node records the
//! document position the parser assigned to it; node-set ordering is a
//! comparison of those positions.

use xylem_util::{OrderedMap, TableKey};

use crate::error::DomError;
use crate::name::QName;
use crate::Config;

pub const XML_PREFIX: &str = "xml";
pub const XMLNS_PREFIX: &str = "xmlns";
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl TableKey for NodeId {
    fn table_hash(&self) -> u32 {
        self.0.table_hash()
    }
}

/// Discriminant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element,
    Text,
    Attribute,
    Comment,
    ProcessingInstruction,
    Namespace,
    XmlHeader,
    Dtd,
}

#[derive(Debug)]
pub(crate) struct RootData {
    pub name: String,
    pub children: Vec<NodeId>,
    pub root_element: Option<NodeId>,
    pub namespaces: Vec<NodeId>,
    pub is_well_formed: bool,
}

#[derive(Debug)]
pub(crate) struct ElementData {
    pub name: QName,
    pub attributes: Option<OrderedMap<String, NodeId>>,
    pub namespaces: Option<Vec<NodeId>>,
    pub namespace: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub is_self_enclosing: bool,
}

#[derive(Debug)]
pub(crate) struct TextData {
    pub value: String,
    pub number: f64,
    pub is_cdata: bool,
    pub has_entity: bool,
}

#[derive(Debug)]
pub(crate) struct AttributeData {
    pub name: QName,
    pub value: String,
    pub number: f64,
    pub namespace: Option<NodeId>,
}

#[derive(Debug)]
pub(crate) struct CommentData {
    pub value: String,
}

#[derive(Debug)]
pub(crate) struct PiData {
    pub target: String,
    pub value: String,
}

#[derive(Debug)]
pub(crate) struct NamespaceData {
    pub prefix: String,
    pub uri: String,
    pub is_default: bool,
    pub is_global: bool,
}

#[derive(Debug)]
pub(crate) struct XmlHeaderData {
    pub attributes: OrderedMap<String, NodeId>,
}

#[derive(Debug)]
pub(crate) struct DtdData {
    pub value: String,
}

#[derive(Debug)]
pub(crate) enum NodeData {
    Root(RootData),
    Element(ElementData),
    Text(TextData),
    Attribute(AttributeData),
    Comment(CommentData),
    Pi(PiData),
    Namespace(NamespaceData),
    XmlHeader(XmlHeaderData),
    Dtd(DtdData),
    // released by delete(); the slot is dead until the document drops
    Vacant,
}

#[derive(Debug)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub pos: u32,
    pub data: NodeData,
}

/// A parsed XML document owning its full node arena.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    warnings: Vec<String>,
    config: Config,
    pub(crate) xml_header: Option<NodeId>,
    pub(crate) dtd: Option<NodeId>,
}

impl Document {
    /// Creates a document containing only its root node; the parser fills
    /// it in.
    pub(crate) fn new(config: Config) -> Self {
        let root = Node {
            parent: None,
            pos: 0,
            data: NodeData::Root(RootData {
                name: config.doc_name.clone(),
                children: Vec::new(),
                root_element: None,
                namespaces: Vec::new(),
                is_well_formed: true,
            }),
        };
        Document {
            nodes: vec![root],
            warnings: Vec::new(),
            config,
            xml_header: None,
            dtd: None,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        let node = &self.nodes[id.0];
        debug_assert!(
            !matches!(node.data, NodeData::Vacant),
            "use of a deleted node"
        );
        node
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push(&mut self, data: NodeData, parent: Option<NodeId>, pos: u32) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, pos, data });
        id
    }

    pub(crate) fn root_data(&self) -> &RootData {
        match &self.nodes[0].data {
            NodeData::Root(root) => root,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub(crate) fn root_data_mut(&mut self) -> &mut RootData {
        match &mut self.nodes[0].data {
            NodeData::Root(root) => root,
            _ => unreachable!("node 0 is always the root"),
        }
    }

    pub(crate) fn element(&self, id: NodeId) -> &ElementData {
        match &self.node(id).data {
            NodeData::Element(elem) => elem,
            _ => panic!("node is not an element"),
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> &mut ElementData {
        match &mut self.nodes[id.0].data {
            NodeData::Element(elem) => elem,
            _ => panic!("node is not an element"),
        }
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.node_mut(id).data
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.node_mut(id).parent = parent;
    }

    pub(crate) fn set_position(&mut self, id: NodeId, pos: u32) {
        self.node_mut(id).pos = pos;
    }

    pub(crate) fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    // ---- read surface ----

    /// The synthetic document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_element(&self) -> Option<NodeId> {
        self.root_data().root_element
    }

    pub fn doc_name(&self) -> &str {
        &self.root_data().name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        match &self.node(id).data {
            NodeData::Root(_) => NodeKind::Root,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Attribute(_) => NodeKind::Attribute,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Pi(_) => NodeKind::ProcessingInstruction,
            NodeData::Namespace(_) => NodeKind::Namespace,
            NodeData::XmlHeader(_) => NodeKind::XmlHeader,
            NodeData::Dtd(_) => NodeKind::Dtd,
            NodeData::Vacant => unreachable!(),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// The document position assigned at parse time; strictly increasing in
    /// parse order and the sole ordering key for node sets.
    pub fn position(&self, id: NodeId) -> u32 {
        self.node(id).pos
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).data {
            NodeData::Root(root) => &root.children,
            NodeData::Element(elem) => &elem.children,
            _ => &[],
        }
    }

    /// Attribute nodes in insertion order. Empty for nodes that cannot
    /// carry attributes.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let map = match &self.node(id).data {
            NodeData::Element(elem) => elem.attributes.as_ref(),
            NodeData::XmlHeader(header) => Some(&header.attributes),
            _ => None,
        };
        map.into_iter().flat_map(|m| m.iter().map(|(_, id)| *id))
    }

    /// Looks an attribute up by qualified name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match &self.node(id).data {
            NodeData::Element(elem) => elem
                .attributes
                .as_ref()
                .and_then(|m| m.get_str(name))
                .copied(),
            NodeData::XmlHeader(header) => header.attributes.get_str(name).copied(),
            _ => None,
        }
    }

    /// Qualified name of an element or attribute, or a PI's target.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element(elem) => Some(elem.name.qualified()),
            NodeData::Attribute(attr) => Some(attr.name.qualified()),
            NodeData::Pi(pi) => Some(&pi.target),
            _ => None,
        }
    }

    pub fn qname(&self, id: NodeId) -> Option<&QName> {
        match &self.node(id).data {
            NodeData::Element(elem) => Some(&elem.name),
            NodeData::Attribute(attr) => Some(&attr.name),
            _ => None,
        }
    }

    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.qname(id).map(QName::local_name)
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.qname(id).and_then(QName::prefix)
    }

    /// The literal value of a text, comment, PI, attribute or DTD node.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(&text.value),
            NodeData::Comment(comment) => Some(&comment.value),
            NodeData::Pi(pi) => Some(&pi.value),
            NodeData::Attribute(attr) => Some(&attr.value),
            NodeData::Dtd(dtd) => Some(&dtd.value),
            _ => None,
        }
    }

    pub fn is_cdata(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Text(t) if t.is_cdata)
    }

    pub fn has_entity(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Text(t) if t.has_entity)
    }

    pub fn is_self_enclosing(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Element(e) if e.is_self_enclosing)
    }

    pub fn is_namespaced(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Element(e) if e.namespace.is_some())
    }

    pub fn has_child(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    pub fn has_text(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|&c| self.kind(c) == NodeKind::Text)
    }

    pub fn has_comment(&self, id: NodeId) -> bool {
        self.children(id)
            .iter()
            .any(|&c| self.kind(c) == NodeKind::Comment)
    }

    pub fn has_attribute(&self, id: NodeId) -> bool {
        self.attributes(id).next().is_some()
    }

    /// The namespace an element or attribute is bound to, owned by the
    /// element (or document) that declared it.
    pub fn bound_namespace(&self, id: NodeId) -> Option<NodeId> {
        match &self.node(id).data {
            NodeData::Element(elem) => elem.namespace,
            NodeData::Attribute(attr) => attr.namespace,
            _ => None,
        }
    }

    /// Namespaces declared on this element, in declaration order.
    pub fn declared_namespaces(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).data {
            NodeData::Element(elem) => elem.namespaces.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }

    /// The two reserved global namespaces (`xml`, `xmlns`).
    pub fn global_namespaces(&self) -> &[NodeId] {
        &self.root_data().namespaces
    }

    pub fn namespace_prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Namespace(ns) => Some(&ns.prefix),
            _ => None,
        }
    }

    pub fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Namespace(ns) => Some(&ns.uri),
            _ => None,
        }
    }

    pub fn is_default_namespace(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Namespace(ns) if ns.is_default)
    }

    pub fn is_global_namespace(&self, id: NodeId) -> bool {
        matches!(&self.node(id).data, NodeData::Namespace(ns) if ns.is_global)
    }

    pub fn xml_header(&self) -> Option<NodeId> {
        self.xml_header
    }

    pub fn dtd(&self) -> Option<NodeId> {
        self.dtd
    }

    pub fn is_well_formed(&self) -> bool {
        self.root_data().is_well_formed
    }

    /// Non-fatal conditions recorded during the parse.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Subtree below `id` in document order, excluding `id` itself.
    /// Attributes and namespace declarations are not descendants.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// XPath string value: descendant text concatenation for containers,
    /// the literal value otherwise.
    pub fn string_value(&self, id: NodeId) -> String {
        let mut acc = String::new();
        self.append_string_value(id, &mut acc);
        acc
    }

    fn append_string_value(&self, id: NodeId, acc: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => acc.push_str(&text.value),
            NodeData::Comment(comment) => acc.push_str(&comment.value),
            NodeData::Attribute(attr) => acc.push_str(&attr.value),
            NodeData::Pi(pi) => acc.push_str(&pi.value),
            NodeData::Root(_) | NodeData::Element(_) => {
                for &child in self.children(id) {
                    match self.kind(child) {
                        NodeKind::Text | NodeKind::Element => {
                            self.append_string_value(child, acc)
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// XPath number value; NaN for anything non-numeric. Containers
    /// short-circuit to NaN as soon as one text descendant is non-numeric.
    pub fn number_value(&self, id: NodeId) -> f64 {
        match &self.node(id).data {
            NodeData::Text(text) => text.number,
            NodeData::Attribute(attr) => attr.number,
            NodeData::Root(_) | NodeData::Element(_) => {
                if self.subtree_has_nan_text(id) {
                    f64::NAN
                } else {
                    xylem_util::literal::to_number(&self.string_value(id))
                }
            }
            _ => xylem_util::literal::to_number(&self.string_value(id)),
        }
    }

    fn subtree_has_nan_text(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|&child| match &self.node(child).data {
            NodeData::Text(text) => text.number.is_nan(),
            NodeData::Element(_) => self.subtree_has_nan_text(child),
            _ => false,
        })
    }

    // ---- mutation surface ----

    /// Appends a detached node to an element's or the root's child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent(child).is_some() {
            return Err(DomError::StillAttached);
        }
        match &mut self.node_mut(parent).data {
            NodeData::Root(root) => root.children.push(child),
            NodeData::Element(elem) => elem.children.push(child),
            _ => return Err(DomError::NotAnElement),
        }
        self.set_parent(child, Some(parent));
        Ok(())
    }

    /// Unlinks a node from its parent and clears the back reference. The
    /// subtree stays alive and navigable; the arena keeps owning it until
    /// the document is dropped.
    pub fn detach(&mut self, id: NodeId) -> NodeId {
        let Some(parent) = self.parent(id) else {
            return id;
        };
        let key = self.name(id).map(str::to_string);
        match &mut self.node_mut(parent).data {
            NodeData::Root(root) => {
                root.children.retain(|&c| c != id);
                if root.root_element == Some(id) {
                    root.root_element = None;
                }
                root.namespaces.retain(|&c| c != id);
            }
            NodeData::Element(elem) => {
                elem.children.retain(|&c| c != id);
                if let (Some(map), Some(key)) = (elem.attributes.as_mut(), key.as_deref()) {
                    if map.get_str(key).copied() == Some(id) {
                        map.remove_str(key);
                    }
                }
                if let Some(list) = elem.namespaces.as_mut() {
                    list.retain(|&c| c != id);
                }
            }
            _ => {}
        }
        if self.xml_header == Some(id) {
            self.xml_header = None;
        }
        if self.dtd == Some(id) {
            self.dtd = None;
        }
        self.set_parent(id, None);
        id
    }

    /// Unlinks a node and releases its whole subtree; the id and every id
    /// below it become invalid.
    pub fn delete(&mut self, id: NodeId) {
        self.detach(id);
        self.release_subtree(id);
    }

    pub(crate) fn release_subtree(&mut self, id: NodeId) {
        let data = std::mem::replace(&mut self.nodes[id.0].data, NodeData::Vacant);
        self.nodes[id.0].parent = None;
        match data {
            NodeData::Root(root) => {
                for child in root.children {
                    self.release_subtree(child);
                }
                for ns in root.namespaces {
                    self.release_subtree(ns);
                }
            }
            NodeData::Element(elem) => {
                if let Some(attrs) = elem.attributes {
                    for (_, attr) in attrs.iter() {
                        self.release_subtree(*attr);
                    }
                }
                if let Some(namespaces) = elem.namespaces {
                    for ns in namespaces {
                        self.release_subtree(ns);
                    }
                }
                for child in elem.children {
                    self.release_subtree(child);
                }
            }
            NodeData::XmlHeader(header) => {
                for (_, attr) in header.attributes.iter() {
                    self.release_subtree(*attr);
                }
            }
            _ => {}
        }
    }

    /// Renames an element in place.
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        match self.data_mut(id) {
            NodeData::Element(elem) => {
                elem.name = QName::new(name.to_string());
                Ok(())
            }
            _ => Err(DomError::NotAnElement),
        }
    }

    /// Registers `id` as the document's root element. Fails when a root
    /// element is already set or `id` is not one of the document's
    /// children.
    pub fn set_root_element(&mut self, id: NodeId) -> Result<(), DomError> {
        if self.kind(id) != NodeKind::Element {
            return Err(DomError::NotAnElement);
        }
        if self.root_data().root_element.is_some() {
            return Err(DomError::RootElementAlreadySet);
        }
        if !self.root_data().children.contains(&id) {
            return Err(DomError::NotADocumentChild);
        }
        self.root_data_mut().root_element = Some(id);
        Ok(())
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::serializer::render(self, &self.config))
    }
}
