// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgbridge-dom` represents an SVG document as a mutable tree.

The tree is parsed with [`roxmltree`], has CSS already folded into presentation
attributes and records every mutation into a log, so that a consumer can keep
a derived structure in sync with the document.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::str::FromStr;

mod mutate;
mod names;
mod parse;

pub use mutate::Mutation;
pub use names::{allows_inherit_value, is_inheritable, is_presentation};
pub use roxmltree;
pub use svgtypes;

use tiny_skia_path::Transform;

/// The SVG namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// The XLink namespace.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
/// The XML namespace.
pub const XML_NAMESPACE_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// List of all document errors.
#[derive(Debug)]
pub enum Error {
    /// Only UTF-8 content are supported.
    NotAnUtf8Str,

    /// Compressed SVG must use the GZip algorithm.
    MalformedGZip,

    /// We do not allow SVG with more than 1_000_000 elements for security reasons.
    ElementsLimitReached,

    /// The root element is not an `svg` element in the SVG namespace.
    NoRootSvg,

    /// Failed to parse an SVG data.
    ParsingFailed(roxmltree::Error),
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::ParsingFailed(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::NotAnUtf8Str => {
                write!(f, "provided data has not an UTF-8 encoding")
            }
            Error::MalformedGZip => {
                write!(f, "provided data has a malformed GZip content")
            }
            Error::ElementsLimitReached => {
                write!(f, "the maximum number of SVG elements has been reached")
            }
            Error::NoRootSvg => {
                write!(f, "the root element must be 'svg'")
            }
            Error::ParsingFailed(ref e) => {
                write!(f, "SVG data parsing failed cause {}", e)
            }
        }
    }
}

impl std::error::Error for Error {}

/// A mutable SVG document.
///
/// Contains element and text nodes.
/// Nodes are never deallocated, so a [`NodeId`] stays valid for the whole
/// document lifetime, even after the node was detached.
pub struct Document {
    nodes: Vec<NodeData>,
    links: HashMap<String, NodeId>,
    url: Option<String>,
    mutations: Vec<Mutation>,
    recording: bool,
}

impl Document {
    /// Parses a document from a string.
    pub fn parse_str(text: &str) -> Result<Document, Error> {
        let xml_opt = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };

        let xml = roxmltree::Document::parse_with_options(text, xml_opt)?;
        Self::parse_tree(&xml)
    }

    /// Parses a document from raw data.
    ///
    /// Can contain an SVG string or a gzip compressed data.
    pub fn from_data(data: &[u8]) -> Result<Document, Error> {
        if data.starts_with(&[0x1f, 0x8b]) {
            let data = decompress_svgz(data)?;
            let text = std::str::from_utf8(&data).map_err(|_| Error::NotAnUtf8Str)?;
            Self::parse_str(text)
        } else {
            let text = std::str::from_utf8(data).map_err(|_| Error::NotAnUtf8Str)?;
            Self::parse_str(text)
        }
    }

    /// Parses a document from a [`roxmltree::Document`].
    pub fn parse_tree(xml: &roxmltree::Document) -> Result<Document, Error> {
        parse::parse(xml)
    }

    /// Returns the document URL.
    #[inline]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Sets the document URL.
    ///
    /// Cross-document references are resolved against it.
    #[inline]
    pub fn set_url(&mut self, url: Option<String>) {
        self.url = url;
    }

    /// Returns the root node.
    #[inline]
    pub fn root(&self) -> SvgNode {
        self.get(NodeId::new(0))
    }

    /// Returns the root element.
    ///
    /// A document is guarantee to have an `svg` root element after parsing,
    /// but it can be detached later.
    #[inline]
    pub fn root_element(&self) -> Option<SvgNode> {
        self.root().first_element_child()
    }

    /// Returns an iterator over document's descendant nodes.
    ///
    /// Shorthand for `doc.root().descendants()`.
    #[inline]
    pub fn descendants(&self) -> Descendants {
        self.root().descendants()
    }

    /// Returns a connected element by ID.
    ///
    /// Unlike the [`Descendants`] iterator, this is just a HashMap lookup.
    /// Meaning it's way faster.
    #[inline]
    pub fn element_by_id(&self, id: &str) -> Option<SvgNode> {
        let node_id = self.links.get(id)?;
        let node = self.get(*node_id);
        if node.is_connected() {
            Some(node)
        } else {
            None
        }
    }

    /// Returns a node by its ID.
    ///
    /// # Panics
    ///
    /// When the ID belongs to another document.
    #[inline]
    pub fn get(&self, id: NodeId) -> SvgNode {
        SvgNode {
            id,
            d: &self.nodes[id.get_usize()],
            doc: self,
        }
    }

    /// Checks that the ID belongs to this document.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        id.get_usize() < self.nodes.len()
    }

    /// Returns the number of allocated nodes, including detached ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks that the document has only the root node.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        if !self.root().has_children() {
            return write!(f, "Document []");
        }

        macro_rules! writeln_indented {
            ($depth:expr, $f:expr, $fmt:expr) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt)?;
            };
            ($depth:expr, $f:expr, $fmt:expr, $($arg:tt)*) => {
                for _ in 0..$depth { write!($f, "    ")?; }
                writeln!($f, $fmt, $($arg)*)?;
            };
        }

        fn print_children(
            parent: SvgNode,
            depth: usize,
            f: &mut std::fmt::Formatter,
        ) -> Result<(), std::fmt::Error> {
            for child in parent.children() {
                if child.is_element() {
                    writeln_indented!(depth, f, "Element {{");
                    writeln_indented!(depth, f, "    tag_name: {:?}", child.tag_name());

                    if !child.attributes().is_empty() {
                        writeln_indented!(depth + 1, f, "attributes: [");
                        for attr in child.attributes() {
                            writeln_indented!(depth + 2, f, "{:?}", attr);
                        }
                        writeln_indented!(depth + 1, f, "]");
                    }

                    if child.has_children() {
                        writeln_indented!(depth, f, "    children: [");
                        print_children(child, depth + 2, f)?;
                        writeln_indented!(depth, f, "    ]");
                    }

                    writeln_indented!(depth, f, "}}");
                } else {
                    writeln_indented!(depth, f, "{:?}", child);
                }
            }

            Ok(())
        }

        writeln!(f, "Document [")?;
        print_children(self.root(), 1, f)?;
        writeln!(f, "]")?;

        Ok(())
    }
}

fn decompress_svgz(data: &[u8]) -> Result<Vec<u8>, Error> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decoded = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut decoded)
        .map_err(|_| Error::MalformedGZip)?;
    Ok(decoded)
}

/// A node identifier.
///
/// Stays valid after the node was detached.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    #[inline]
    fn new(id: u32) -> Self {
        debug_assert!(id < u32::MAX);

        // We are using `NonZeroU32` to reduce overhead of `Option<NodeId>`.
        NodeId(NonZeroU32::MIN.saturating_add(id))
    }

    #[inline]
    fn get(self) -> u32 {
        self.0.get() - 1
    }

    #[inline]
    fn get_usize(self) -> usize {
        self.get() as usize
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(id: usize) -> Self {
        // We already checked that `id` is limited by u32::MAX.
        debug_assert!(id <= u32::MAX as usize);
        NodeId::new(id as u32)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Root,
    Element {
        namespace: String,
        local_name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct NodeData {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    // A `use` element that instantiates this shadow tree.
    host: Option<NodeId>,
    kind: NodeKind,
}

/// An attribute.
///
/// Attributes from the XLink namespace are stored without a prefix,
/// so `xlink:href` becomes `href`.
#[derive(Clone, PartialEq)]
pub struct Attribute {
    /// Attribute's name.
    pub name: String,
    /// Attribute's value.
    pub value: String,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "Attribute {{ name: {:?}, value: {} }}",
            self.name, self.value
        )
    }
}

/// An SVG node.
#[derive(Clone, Copy)]
pub struct SvgNode<'a> {
    id: NodeId,
    doc: &'a Document,
    d: &'a NodeData,
}

impl Eq for SvgNode<'_> {}

impl PartialEq for SvgNode<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && std::ptr::eq(self.doc, other.doc)
    }
}

impl<'a> SvgNode<'a> {
    /// Returns node's ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Checks if the current node is an element.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.d.kind, NodeKind::Element { .. })
    }

    /// Checks if the current node is a text.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.d.kind, NodeKind::Text(_))
    }

    /// Returns node's document.
    #[inline]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Returns element's local name, unless the current node is text.
    #[inline]
    pub fn tag_name(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Element { ref local_name, .. } => Some(local_name.as_str()),
            _ => None,
        }
    }

    /// Returns element's namespace URI, unless the current node is text.
    #[inline]
    pub fn namespace(&self) -> Option<&'a str> {
        match self.d.kind {
            NodeKind::Element { ref namespace, .. } => Some(namespace.as_str()),
            _ => None,
        }
    }

    /// Checks that the current node is an SVG element with the specified local name.
    #[inline]
    pub fn has_tag_name(&self, local_name: &str) -> bool {
        self.namespace() == Some(SVG_NS) && self.tag_name() == Some(local_name)
    }

    /// Returns element's `id` attribute value.
    ///
    /// Returns an empty string otherwise.
    #[inline]
    pub fn element_id(&self) -> &'a str {
        self.raw_attribute("id").unwrap_or("")
    }

    /// Returns an attribute value.
    pub fn attribute<T: FromValue<'a>>(&self, name: &str) -> Option<T> {
        let value = self.raw_attribute(name)?;
        match T::parse(*self, name, value) {
            Some(v) => Some(v),
            None => {
                log::warn!("Failed to parse {} value: '{}'.", name, value);
                None
            }
        }
    }

    /// Returns an attribute value.
    ///
    /// Same as `SvgNode::attribute`, but doesn't show a warning.
    pub fn try_attribute<T: FromValue<'a>>(&self, name: &str) -> Option<T> {
        let value = self.raw_attribute(name)?;
        T::parse(*self, name, value)
    }

    /// Returns an unparsed attribute value.
    #[inline]
    pub fn raw_attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Returns an element linked via an IRI (`href`) or a FuncIRI (`url(#id)`) attribute.
    ///
    /// Only same-document links are resolved.
    #[inline]
    pub fn node_attribute(&self, name: &str) -> Option<SvgNode<'a>> {
        let value = self.raw_attribute(name)?;
        let id = if name == "href" {
            svgtypes::IRI::from_str(value).ok().map(|v| v.0)
        } else {
            svgtypes::FuncIRI::from_str(value).ok().map(|v| v.0)
        }?;

        self.document().element_by_id(id)
    }

    /// Checks if an attribute is present.
    #[inline]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes().iter().any(|a| a.name == name)
    }

    /// Returns a list of all element's attributes.
    #[inline]
    pub fn attributes(&self) -> &'a [Attribute] {
        match self.d.kind {
            NodeKind::Element { ref attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Finds a [`SvgNode`] that contains the required attribute.
    ///
    /// For inheritable attributes walks over ancestors until a node with
    /// the specified attribute is found.
    ///
    /// For non-inheritable attributes checks only the current node and the parent one.
    /// As per SVG spec.
    pub fn find_attribute<T: FromValue<'a>>(&self, name: &str) -> Option<T> {
        self.find_attribute_impl(name)?.attribute(name)
    }

    fn find_attribute_impl(&self, name: &str) -> Option<SvgNode<'a>> {
        if is_inheritable(name) {
            self.ancestors().find(|n| n.has_attribute(name))
        } else if self.has_attribute(name) {
            Some(*self)
        } else {
            // Non-inheritable attributes can inherit a value only from a direct parent.
            let n = self.parent_element()?;
            if n.has_attribute(name) {
                Some(n)
            } else {
                None
            }
        }
    }

    /// Returns node's text data.
    ///
    /// For text nodes returns its content.
    /// For elements returns a concatenation of all direct text children.
    pub fn text(&self) -> String {
        match self.d.kind {
            NodeKind::Element { .. } => {
                let mut s = String::new();
                for child in self.children() {
                    if let NodeKind::Text(ref text) = child.d.kind {
                        s.push_str(text);
                    }
                }
                s
            }
            NodeKind::Text(ref text) => text.clone(),
            NodeKind::Root => String::new(),
        }
    }

    /// Checks that the node is attached to the document root.
    pub fn is_connected(&self) -> bool {
        self.ancestors()
            .last()
            .map(|n| matches!(n.d.kind, NodeKind::Root))
            .unwrap_or(false)
    }

    /// Returns a parent node.
    ///
    /// For a shadow tree root returns its host element.
    #[inline]
    pub fn parent(&self) -> Option<Self> {
        self.d.parent.or(self.d.host).map(|id| self.doc.get(id))
    }

    /// Checks that the node is a root of a shadow tree.
    #[inline]
    pub fn is_shadow_root(&self) -> bool {
        self.d.parent.is_none() && self.d.host.is_some()
    }

    /// Returns the parent element.
    #[inline]
    pub fn parent_element(&self) -> Option<Self> {
        self.ancestors().skip(1).find(|n| n.is_element())
    }

    /// Returns the previous sibling.
    #[inline]
    pub fn prev_sibling(&self) -> Option<Self> {
        self.d.prev_sibling.map(|id| self.doc.get(id))
    }

    /// Returns the previous sibling element.
    #[inline]
    pub fn prev_sibling_element(&self) -> Option<Self> {
        let mut curr = self.prev_sibling();
        while let Some(n) = curr {
            if n.is_element() {
                return Some(n);
            }
            curr = n.prev_sibling();
        }

        None
    }

    /// Returns the next sibling.
    #[inline]
    pub fn next_sibling(&self) -> Option<Self> {
        self.d.next_sibling.map(|id| self.doc.get(id))
    }

    /// Returns the first child.
    #[inline]
    pub fn first_child(&self) -> Option<Self> {
        self.d.children.map(|(id, _)| self.doc.get(id))
    }

    /// Returns the first child element.
    #[inline]
    pub fn first_element_child(&self) -> Option<Self> {
        self.children().find(|n| n.is_element())
    }

    /// Returns the last child.
    #[inline]
    pub fn last_child(&self) -> Option<Self> {
        self.d.children.map(|(_, id)| self.doc.get(id))
    }

    /// Checks if the node has child nodes.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.d.children.is_some()
    }

    /// Returns an iterator over ancestor nodes starting at this node.
    #[inline]
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors(Some(*self))
    }

    /// Returns an iterator over children nodes.
    #[inline]
    pub fn children(&self) -> Children<'a> {
        Children {
            front: self.first_child(),
            back: self.last_child(),
        }
    }

    /// Returns an iterator over children elements.
    #[inline]
    pub fn element_children(&self) -> impl Iterator<Item = SvgNode<'a>> {
        self.children().filter(|n| n.is_element())
    }

    /// Returns an iterator which traverses the subtree starting at this node.
    #[inline]
    fn traverse(&self) -> Traverse<'a> {
        Traverse {
            root: *self,
            edge: None,
        }
    }

    /// Returns an iterator over this node and its descendants.
    #[inline]
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants(self.traverse())
    }
}

impl std::fmt::Debug for SvgNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self.d.kind {
            NodeKind::Root => write!(f, "Root"),
            NodeKind::Element { .. } => {
                write!(
                    f,
                    "Element {{ tag_name: {:?}, attributes: {:?} }}",
                    self.tag_name(),
                    self.attributes()
                )
            }
            NodeKind::Text(ref text) => write!(f, "Text({:?})", text),
        }
    }
}

/// An iterator over ancestor nodes.
#[derive(Clone, Debug)]
pub struct Ancestors<'a>(Option<SvgNode<'a>>);

impl<'a> Iterator for Ancestors<'a> {
    type Item = SvgNode<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.0.take();
        self.0 = node.as_ref().and_then(SvgNode::parent);
        node
    }
}

/// An iterator over children nodes.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    front: Option<SvgNode<'a>>,
    back: Option<SvgNode<'a>>,
}

impl<'a> Iterator for Children<'a> {
    type Item = SvgNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.front.take();
        if self.front == self.back {
            self.back = None;
        } else {
            self.front = node.as_ref().and_then(SvgNode::next_sibling);
        }
        node
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Edge<'a> {
    Open(SvgNode<'a>),
    Close(SvgNode<'a>),
}

#[derive(Clone, Debug)]
struct Traverse<'a> {
    root: SvgNode<'a>,
    edge: Option<Edge<'a>>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Edge<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.edge {
            Some(Edge::Open(node)) => {
                self.edge = Some(match node.first_child() {
                    Some(first_child) => Edge::Open(first_child),
                    None => Edge::Close(node),
                });
            }
            Some(Edge::Close(node)) => {
                if node == self.root {
                    self.edge = None;
                } else if let Some(next_sibling) = node.next_sibling() {
                    self.edge = Some(Edge::Open(next_sibling));
                } else {
                    self.edge = node.parent().map(Edge::Close);
                }
            }
            None => {
                self.edge = Some(Edge::Open(self.root));
            }
        }

        self.edge
    }
}

/// A descendants iterator.
#[derive(Clone, Debug)]
pub struct Descendants<'a>(Traverse<'a>);

impl<'a> Iterator for Descendants<'a> {
    type Item = SvgNode<'a>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for edge in &mut self.0 {
            if let Edge::Open(node) = edge {
                return Some(node);
            }
        }

        None
    }
}

/// A trait for parsing attribute values.
pub trait FromValue<'a>: Sized {
    /// Parses an attribute value.
    ///
    /// When `None` is returned, the attribute value will be logged as a parsing failure.
    fn parse(node: SvgNode<'a>, name: &str, value: &'a str) -> Option<Self>;
}

impl<'a> FromValue<'a> for &'a str {
    fn parse(_: SvgNode<'a>, _: &str, value: &'a str) -> Option<Self> {
        Some(value)
    }
}

impl<'a> FromValue<'a> for f32 {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        svgtypes::Number::from_str(value).ok().map(|v| v.0 as f32)
    }
}

impl<'a> FromValue<'a> for svgtypes::Length {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        svgtypes::Length::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for Transform {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        let ts = match svgtypes::Transform::from_str(value) {
            Ok(v) => v,
            Err(_) => return None,
        };

        let ts = Transform::from_row(
            ts.a as f32,
            ts.b as f32,
            ts.c as f32,
            ts.d as f32,
            ts.e as f32,
            ts.f as f32,
        );

        if ts.is_valid() {
            Some(ts)
        } else {
            Some(Transform::default())
        }
    }
}

impl<'a> FromValue<'a> for svgtypes::ViewBox {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for svgtypes::AspectRatio {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for svgtypes::Color {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for svgtypes::Angle {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for svgtypes::Paint<'a> {
    fn parse(_: SvgNode, _: &str, value: &'a str) -> Option<Self> {
        Self::from_str(value).ok()
    }
}

impl<'a> FromValue<'a> for Vec<f32> {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        let mut list = Vec::new();
        for n in svgtypes::NumberListParser::from(value) {
            list.push(n.ok()? as f32);
        }

        Some(list)
    }
}

impl<'a> FromValue<'a> for Vec<svgtypes::Length> {
    fn parse(_: SvgNode, _: &str, value: &str) -> Option<Self> {
        let mut list = Vec::new();
        for n in svgtypes::LengthListParser::from(value) {
            list.push(n.ok()?);
        }

        Some(list)
    }
}

impl<'a> FromValue<'a> for SvgNode<'a> {
    fn parse(node: SvgNode<'a>, name: &str, value: &str) -> Option<Self> {
        let id = if name == "href" {
            svgtypes::IRI::from_str(value).ok().map(|v| v.0)
        } else {
            svgtypes::FuncIRI::from_str(value).ok().map(|v| v.0)
        }?;

        node.document().element_by_id(id)
    }
}
