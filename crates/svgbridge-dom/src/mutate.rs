// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::names::is_presentation;
use super::parse::insert_attribute;
use super::{Document, NodeData, NodeId, NodeKind};

/// A document mutation.
///
/// Recorded by every mutating [`Document`] method and drained with
/// [`Document::take_mutations`].
#[derive(Clone, PartialEq, Debug)]
pub enum Mutation {
    /// An attribute was added, changed or removed.
    AttributeModified {
        /// The modified element.
        element: NodeId,
        /// Attribute's name.
        name: String,
        /// A value before the change. `None` when the attribute was added.
        prev: Option<String>,
        /// A value after the change. `None` when the attribute was removed.
        new: Option<String>,
    },
    /// A node was attached to a parent.
    NodeInserted {
        /// The new parent.
        parent: NodeId,
        /// The attached node.
        child: NodeId,
    },
    /// A node was detached from a parent.
    NodeRemoved {
        /// The former parent.
        parent: NodeId,
        /// The detached node.
        child: NodeId,
    },
    /// Style properties were changed via the `style` attribute or directly.
    StyleChanged {
        /// The modified element.
        element: NodeId,
        /// Changed properties.
        properties: Vec<String>,
    },
    /// Text content of an element was changed.
    CharacterDataModified {
        /// The element that owns the text.
        element: NodeId,
    },
}

impl Mutation {
    /// Returns the node this mutation is about.
    ///
    /// For insertions and removals this is the parent.
    pub fn target(&self) -> NodeId {
        match *self {
            Mutation::AttributeModified { element, .. } => element,
            Mutation::NodeInserted { parent, .. } => parent,
            Mutation::NodeRemoved { parent, .. } => parent,
            Mutation::StyleChanged { element, .. } => element,
            Mutation::CharacterDataModified { element } => element,
        }
    }
}

impl Document {
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(NodeData {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            children: None,
            host: None,
            kind,
        });
        id
    }

    /// Links a detached node as a child of `parent`, before `before` or as the last child.
    pub(crate) fn link_child(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) {
        debug_assert!(self.nodes[child.get_usize()].parent.is_none());
        self.nodes[child.get_usize()].host = None;

        let before = before.filter(|id| self.nodes[id.get_usize()].parent == Some(parent));
        match before {
            Some(next) => {
                let prev = self.nodes[next.get_usize()].prev_sibling;
                {
                    let d = &mut self.nodes[child.get_usize()];
                    d.parent = Some(parent);
                    d.prev_sibling = prev;
                    d.next_sibling = Some(next);
                }
                self.nodes[next.get_usize()].prev_sibling = Some(child);
                match prev {
                    Some(prev) => self.nodes[prev.get_usize()].next_sibling = Some(child),
                    None => {
                        if let Some((_, last)) = self.nodes[parent.get_usize()].children {
                            self.nodes[parent.get_usize()].children = Some((child, last));
                        }
                    }
                }
            }
            None => {
                let last = self.nodes[parent.get_usize()].children.map(|(_, id)| id);
                {
                    let d = &mut self.nodes[child.get_usize()];
                    d.parent = Some(parent);
                    d.prev_sibling = last;
                    d.next_sibling = None;
                }

                let children = &mut self.nodes[parent.get_usize()].children;
                *children = match *children {
                    Some((first, _)) => Some((first, child)),
                    None => Some((child, child)),
                };

                if let Some(last) = last {
                    self.nodes[last.get_usize()].next_sibling = Some(child);
                }
            }
        }
    }

    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let (parent, prev, next) = {
            let d = &self.nodes[child.get_usize()];
            (d.parent?, d.prev_sibling, d.next_sibling)
        };

        if let Some(prev) = prev {
            self.nodes[prev.get_usize()].next_sibling = next;
        }

        if let Some(next) = next {
            self.nodes[next.get_usize()].prev_sibling = prev;
        }

        let children = &mut self.nodes[parent.get_usize()].children;
        *children = match (*children, prev, next) {
            (Some(_), None, None) => None,
            (Some((_, last)), None, Some(next)) => Some((next, last)),
            (Some((first, _)), Some(prev), None) => Some((first, prev)),
            (children, _, _) => children,
        };

        let d = &mut self.nodes[child.get_usize()];
        d.parent = None;
        d.prev_sibling = None;
        d.next_sibling = None;

        Some(parent)
    }

    fn record(&mut self, mutation: Mutation) {
        if self.recording {
            self.mutations.push(mutation);
        }
    }

    /// Enables or disables the mutation log.
    pub fn set_recording(&mut self, flag: bool) {
        self.recording = flag;
    }

    /// Checks that mutations are recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Drains the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    /// Checks that the mutation log has pending entries.
    pub fn has_mutations(&self) -> bool {
        !self.mutations.is_empty()
    }

    /// Creates a new detached element.
    pub fn create_element(&mut self, namespace: &str, local_name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            namespace: namespace.to_string(),
            local_name: local_name.to_string(),
            attributes: Vec::new(),
        })
    }

    /// Creates a new detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Sets an attribute value.
    ///
    /// The `style` attribute is split into presentation attributes,
    /// which is reported as [`Mutation::StyleChanged`].
    ///
    /// Does nothing for non-element nodes.
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) {
        if name == "style" {
            let mut properties = Vec::new();
            for declaration in simplecss::DeclarationTokenizer::from(value) {
                if is_presentation(declaration.name) {
                    self.write_attribute(element, declaration.name, declaration.value);
                    properties.push(declaration.name.to_string());
                }
            }

            if !properties.is_empty() {
                self.record(Mutation::StyleChanged {
                    element,
                    properties,
                });
            }

            return;
        }

        if let Some(prev) = self.write_attribute(element, name, value) {
            if name == "id" {
                self.links.insert(value.to_string(), element);
            }

            self.record(Mutation::AttributeModified {
                element,
                name: name.to_string(),
                prev,
                new: Some(value.to_string()),
            });
        }
    }

    /// Sets a single style property.
    pub fn set_style_property(&mut self, element: NodeId, name: &str, value: &str) {
        if !is_presentation(name) {
            log::warn!("'{}' is not a presentation attribute.", name);
            return;
        }

        if self.write_attribute(element, name, value).is_some() {
            self.record(Mutation::StyleChanged {
                element,
                properties: vec![name.to_string()],
            });
        }
    }

    /// Writes an attribute and returns a previous value.
    ///
    /// Returns `None` when the node is not an element.
    fn write_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Option<Option<String>> {
        match self.nodes[element.get_usize()].kind {
            NodeKind::Element {
                ref mut attributes, ..
            } => Some(insert_attribute(attributes, name, value)),
            _ => None,
        }
    }

    /// Removes an attribute.
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) {
        let prev = match self.nodes[element.get_usize()].kind {
            NodeKind::Element {
                ref mut attributes, ..
            } => match attributes.iter().position(|a| a.name == name) {
                Some(idx) => attributes.remove(idx).value,
                None => return,
            },
            _ => return,
        };

        if name == "id" && self.links.get(&prev) == Some(&element) {
            self.links.remove(&prev);
        }

        self.record(Mutation::AttributeModified {
            element,
            name: name.to_string(),
            prev: Some(prev),
            new: None,
        });
    }

    /// Appends a node to `parent`.
    ///
    /// An attached node is moved.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None)
    }

    /// Inserts a node into `parent` before `reference`.
    ///
    /// When `reference` is `None` or is not a child of `parent`, the node is appended.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.get(parent).ancestors().any(|n| n.id == child) {
            log::warn!("A node cannot be inserted into itself.");
            return;
        }

        if self.nodes[child.get_usize()].parent.is_some() {
            self.remove_child(child);
        }

        self.link_child(parent, child, reference);
        self.register_links(child);
        self.record(Mutation::NodeInserted { parent, child });
    }

    /// Detaches a node from its parent.
    ///
    /// The node and its subtree stay addressable.
    pub fn remove_child(&mut self, child: NodeId) {
        if let Some(parent) = self.unlink(child) {
            self.record(Mutation::NodeRemoved { parent, child });
        }
    }

    /// Attaches a detached subtree to `host` as a shadow tree.
    ///
    /// The shadow root is not a child of `host`, but `host` becomes its parent
    /// for ancestor lookups, so inherited properties flow into the shadow tree.
    pub fn set_shadow_host(&mut self, shadow_root: NodeId, host: NodeId) {
        let d = &mut self.nodes[shadow_root.get_usize()];
        if d.parent.is_none() {
            d.host = Some(host);
        }
    }

    /// Replaces the text content of an element or a text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        let element = match self.nodes[node.get_usize()].kind {
            NodeKind::Text(ref mut s) => {
                *s = text.to_string();
                match self.nodes[node.get_usize()].parent {
                    Some(parent) => parent,
                    None => return,
                }
            }
            NodeKind::Element { .. } => {
                let children: Vec<NodeId> = self.get(node).children().map(|n| n.id).collect();
                for child in children {
                    self.unlink(child);
                }

                let id = self.create_text(text);
                self.link_child(node, id, None);
                node
            }
            NodeKind::Root => return,
        };

        self.record(Mutation::CharacterDataModified { element });
    }

    /// Deep-copies a subtree.
    ///
    /// The copy is detached and its `id` attributes are not registered,
    /// so `element_by_id` keeps returning the original elements.
    pub fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        let kind = self.nodes[node.get_usize()].kind.clone();
        let new_id = self.alloc(kind);

        let children: Vec<NodeId> = self.get(node).children().map(|n| n.id).collect();
        for child in children {
            let new_child = self.clone_subtree(child);
            self.link_child(new_id, new_child, None);
        }

        new_id
    }

    /// Deep-copies a subtree from another document.
    ///
    /// The copy is detached and its `id` attributes are not registered.
    pub fn import_subtree(&mut self, other: &Document, node: NodeId) -> NodeId {
        let kind = other.nodes[node.get_usize()].kind.clone();
        let new_id = self.alloc(kind);

        for child in other.get(node).children() {
            let new_child = self.import_subtree(other, child.id);
            self.link_child(new_id, new_child, None);
        }

        new_id
    }

    /// Registers IDs of a freshly attached subtree, unless they are already taken.
    fn register_links(&mut self, root: NodeId) {
        if !self.get(root).is_connected() {
            return;
        }

        let mut ids = Vec::new();
        for node in self.get(root).descendants() {
            let id = node.element_id();
            if !id.is_empty() && self.element_by_id(id).is_none() {
                ids.push((id.to_string(), node.id));
            }
        }

        for (id, node) in ids {
            self.links.insert(id, node);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Document, Mutation, SVG_NS};

    fn doc() -> Document {
        Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <circle id='c1' cx='5' cy='5' r='10'/>
                <rect id='r1' width='5' height='5'/>
            </svg>",
        )
        .unwrap()
    }

    #[test]
    fn parsing_is_not_recorded() {
        let mut doc = doc();
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn set_attribute_records_prev_value() {
        let mut doc = doc();
        let c1 = doc.element_by_id("c1").unwrap().id();
        doc.set_attribute(c1, "cx", "7");

        assert_eq!(doc.get(c1).raw_attribute("cx"), Some("7"));
        assert_eq!(
            doc.take_mutations(),
            vec![Mutation::AttributeModified {
                element: c1,
                name: "cx".to_string(),
                prev: Some("5".to_string()),
                new: Some("7".to_string()),
            }]
        );
    }

    #[test]
    fn style_attribute_is_split() {
        let mut doc = doc();
        let r1 = doc.element_by_id("r1").unwrap().id();
        doc.set_attribute(r1, "style", "fill:red; stroke:blue");

        assert_eq!(doc.get(r1).raw_attribute("fill"), Some("red"));
        assert_eq!(
            doc.take_mutations(),
            vec![Mutation::StyleChanged {
                element: r1,
                properties: vec!["fill".to_string(), "stroke".to_string()],
            }]
        );
    }

    #[test]
    fn insert_and_remove() {
        let mut doc = doc();
        let root = doc.root_element().unwrap().id();
        let r1 = doc.element_by_id("r1").unwrap().id();

        let g = doc.create_element(SVG_NS, "g");
        doc.insert_before(root, g, Some(r1));
        let ids: Vec<_> = doc
            .get(root)
            .children()
            .filter_map(|n| n.tag_name())
            .collect();
        assert_eq!(ids, vec!["circle", "g", "rect"]);

        doc.remove_child(g);
        assert_eq!(doc.get(g).is_connected(), false);
        assert_eq!(doc.get(root).children().count(), 2);
        assert_eq!(
            doc.take_mutations(),
            vec![
                Mutation::NodeInserted { parent: root, child: g },
                Mutation::NodeRemoved { parent: root, child: g },
            ]
        );
    }

    #[test]
    fn removed_element_is_not_found_by_id() {
        let mut doc = doc();
        let c1 = doc.element_by_id("c1").unwrap().id();
        doc.remove_child(c1);
        assert!(doc.element_by_id("c1").is_none());
    }

    #[test]
    fn clones_are_not_linked() {
        let mut doc = doc();
        let c1 = doc.element_by_id("c1").unwrap().id();
        let copy = doc.clone_subtree(c1);
        assert_ne!(copy, c1);
        assert_eq!(doc.get(copy).raw_attribute("r"), Some("10"));
        assert_eq!(doc.element_by_id("c1").map(|n| n.id()), Some(c1));
    }
}
