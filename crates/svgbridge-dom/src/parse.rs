// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use simplecss::Declaration;

use super::names::{allows_inherit_value, initial_value, is_inheritable, is_presentation};
use super::{
    Attribute, Document, Error, NodeData, NodeId, NodeKind, SVG_NS, XLINK_NS, XML_NAMESPACE_NS,
};

const NODES_LIMIT: usize = 1_000_000;
const DEPTH_LIMIT: u32 = 1024;

pub(crate) fn parse(xml: &roxmltree::Document) -> Result<Document, Error> {
    let mut doc = Document {
        nodes: Vec::new(),
        links: HashMap::new(),
        url: None,
        mutations: Vec::new(),
        recording: false,
    };

    // Add a root node.
    doc.nodes.push(NodeData {
        parent: None,
        prev_sibling: None,
        next_sibling: None,
        children: None,
        host: None,
        kind: NodeKind::Root,
    });

    let style_sheet = resolve_css(xml);

    parse_xml_node_children(xml.root(), NodeId::new(0), &style_sheet, 0, &mut doc)?;

    // Check that the root element is `svg`.
    match doc.root().first_element_child() {
        Some(child) if child.has_tag_name("svg") => {}
        _ => return Err(Error::NoRootSvg),
    }

    // Collect all elements with `id` attribute.
    // The first element wins, like `getElementById` does.
    let mut links = HashMap::new();
    for node in doc.descendants() {
        let id = node.element_id();
        if !id.is_empty() {
            links.entry(id.to_string()).or_insert(node.id);
        }
    }
    doc.links = links;
    doc.recording = true;

    Ok(doc)
}

fn parse_xml_node_children(
    parent: roxmltree::Node,
    parent_id: NodeId,
    style_sheet: &simplecss::StyleSheet,
    depth: u32,
    doc: &mut Document,
) -> Result<(), Error> {
    for node in parent.children() {
        parse_xml_node(node, parent_id, style_sheet, depth, doc)?;
    }

    Ok(())
}

fn parse_xml_node(
    node: roxmltree::Node,
    parent_id: NodeId,
    style_sheet: &simplecss::StyleSheet,
    depth: u32,
    doc: &mut Document,
) -> Result<(), Error> {
    if depth > DEPTH_LIMIT {
        return Err(Error::ElementsLimitReached);
    }

    if doc.nodes.len() > NODES_LIMIT {
        return Err(Error::ElementsLimitReached);
    }

    if node.is_text() {
        let text = node.text().unwrap_or_default();
        if !text.trim().is_empty() {
            let id = doc.alloc(NodeKind::Text(text.to_string()));
            doc.link_child(parent_id, id, None);
        }

        return Ok(());
    }

    if !node.is_element() {
        return Ok(());
    }

    let node_id = if node.tag_name().namespace() == Some(SVG_NS) {
        parse_svg_element(node, parent_id, style_sheet, doc)
    } else {
        parse_foreign_element(node, parent_id, doc)
    };

    parse_xml_node_children(node, node_id, style_sheet, depth + 1, doc)
}

fn parse_foreign_element(xml_node: roxmltree::Node, parent_id: NodeId, doc: &mut Document) -> NodeId {
    let attributes = xml_node
        .attributes()
        .map(|attr| Attribute {
            name: attr.name().to_string(),
            value: attr.value().to_string(),
        })
        .collect();

    let id = doc.alloc(NodeKind::Element {
        namespace: xml_node.tag_name().namespace().unwrap_or_default().to_string(),
        local_name: xml_node.tag_name().name().to_string(),
        attributes,
    });
    doc.link_child(parent_id, id, None);
    id
}

fn parse_svg_element(
    xml_node: roxmltree::Node,
    parent_id: NodeId,
    style_sheet: &simplecss::StyleSheet,
    doc: &mut Document,
) -> NodeId {
    let mut attrs: Vec<Attribute> = Vec::new();

    // Copy presentational attributes first.
    for attr in xml_node.attributes() {
        match attr.namespace() {
            None | Some(SVG_NS) | Some(XLINK_NS) | Some(XML_NAMESPACE_NS) => {}
            _ => continue,
        }

        append_attribute(parent_id, attr.name(), attr.value(), &mut attrs, doc);
    }

    let mut write_declaration = |declaration: &Declaration| {
        if declaration.name == "marker" {
            for name in ["marker-start", "marker-mid", "marker-end"] {
                append_attribute(parent_id, name, declaration.value, &mut attrs, doc);
            }
        } else if is_presentation(declaration.name) {
            // Parse only the presentation attributes.
            append_attribute(parent_id, declaration.name, declaration.value, &mut attrs, doc);
        }
    };

    // Apply CSS.
    for rule in &style_sheet.rules {
        if rule.selector.matches(&XmlNode(xml_node)) {
            for declaration in &rule.declarations {
                write_declaration(declaration);
            }
        }
    }

    // Split a `style` attribute.
    if let Some(value) = xml_node.attribute("style") {
        for declaration in simplecss::DeclarationTokenizer::from(value) {
            write_declaration(&declaration);
        }
    }

    let id = doc.alloc(NodeKind::Element {
        namespace: SVG_NS.to_string(),
        local_name: xml_node.tag_name().name().to_string(),
        attributes: attrs,
    });
    doc.link_child(parent_id, id, None);
    id
}

fn append_attribute(
    parent_id: NodeId,
    name: &str,
    value: &str,
    attrs: &mut Vec<Attribute>,
    doc: &Document,
) -> bool {
    match name {
        // The `style` attribute will be split into attributes, so we don't need it.
        "style" |
        // No need to copy a `class` attribute since CSS were already resolved.
        "class" => return false,
        _ => {}
    }

    if allows_inherit_value(name) && value == "inherit" {
        return resolve_inherit(parent_id, name, attrs, doc);
    }

    insert_attribute(attrs, name, value);
    true
}

pub(crate) fn insert_attribute(attrs: &mut Vec<Attribute>, name: &str, value: &str) -> Option<String> {
    match attrs.iter_mut().find(|a| a.name == name) {
        Some(attr) => Some(std::mem::replace(&mut attr.value, value.to_string())),
        None => {
            attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            });
            None
        }
    }
}

fn resolve_inherit(parent_id: NodeId, name: &str, attrs: &mut Vec<Attribute>, doc: &Document) -> bool {
    let parent = doc.get(parent_id);
    let source = if is_inheritable(name) {
        // Inheritable attributes can inherit a value from an any ancestor.
        parent.ancestors().find(|n| n.has_attribute(name))
    } else {
        // Non-inheritable attributes can inherit a value only from a direct parent.
        Some(parent).filter(|n| n.has_attribute(name))
    };

    if let Some(value) = source.and_then(|n| n.raw_attribute(name)) {
        insert_attribute(attrs, name, value);
        return true;
    }

    // Fallback to a default value if possible.
    match initial_value(name) {
        Some(value) => {
            insert_attribute(attrs, name, value);
            true
        }
        None => false,
    }
}

fn resolve_css<'a>(xml: &'a roxmltree::Document<'a>) -> simplecss::StyleSheet<'a> {
    let mut sheet = simplecss::StyleSheet::new();

    for node in xml.descendants().filter(|n| n.has_tag_name("style")) {
        match node.attribute("type") {
            Some("text/css") => {}
            Some(_) => continue,
            None => {}
        }

        let text = match node.text() {
            Some(v) => v,
            None => continue,
        };

        sheet.parse_more(text);
    }

    sheet
}

struct XmlNode<'a, 'input: 'a>(roxmltree::Node<'a, 'input>);

impl simplecss::Element for XmlNode<'_, '_> {
    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(XmlNode)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.0.prev_sibling_element().map(XmlNode)
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.0.tag_name().name() == local_name
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        match self.0.attribute(local_name) {
            Some(value) => operator.matches(value),
            None => false,
        }
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        match class {
            simplecss::PseudoClass::FirstChild => self.prev_sibling_element().is_none(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn css_rules_become_attributes() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <style>.a { fill: green }</style>
                <rect id='r' class='a' style='stroke:red' width='10' height='10'/>
            </svg>",
        )
        .unwrap();

        let rect = doc.element_by_id("r").unwrap();
        assert_eq!(rect.raw_attribute("fill"), Some("green"));
        assert_eq!(rect.raw_attribute("stroke"), Some("red"));
        assert_eq!(rect.has_attribute("class"), false);
    }

    #[test]
    fn xlink_href_is_normalized() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <use id='u' xlink:href='#r'/>
                <rect id='r'/>
            </svg>",
        )
        .unwrap();

        let node = doc.element_by_id("u").unwrap();
        assert_eq!(node.node_attribute("href").map(|n| n.element_id()), Some("r"));
    }

    #[test]
    fn inherit_without_ancestor_uses_initial_value() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <rect id='r' stroke-width='inherit'/>
            </svg>",
        )
        .unwrap();

        assert_eq!(doc.element_by_id("r").unwrap().raw_attribute("stroke-width"), Some("1"));
    }

    #[test]
    fn non_svg_root() {
        assert!(Document::parse_str("<html/>").is_err());
    }
}
