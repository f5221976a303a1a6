// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Keeps a graphics-node tree in sync with document mutations.
//!
//! Mutations are recorded by the document and routed to the bridges
//! of the affected elements by an [`UpdateDispatcher`].
//! Elements that reference a changed element are notified as well.

use svgbridge_dom::{Document, Mutation, NodeId};
use svgbridge_gvt::{Node, Tree};

use crate::bridge::{container, use_node};
use crate::{builder, BridgeContext, BridgeError, Dynamic, Error};

pub mod manager;

/// A change of an element, as seen by its bridge.
#[derive(Clone, PartialEq, Debug)]
pub enum UpdateEvent {
    /// An attribute was added, changed or removed.
    Attribute {
        /// Attribute's name.
        name: String,
        /// A value before the change.
        prev: Option<String>,
        /// A value after the change.
        new: Option<String>,
    },
    /// Style properties were changed.
    Style {
        /// Changed properties.
        properties: Vec<String>,
    },
    /// A child node was inserted.
    ChildInserted {
        /// The new child.
        child: NodeId,
    },
    /// A child node was removed.
    ChildRemoved {
        /// The removed child.
        child: NodeId,
    },
    /// Text content was changed.
    CharacterData,
    /// An element referenced by the `property` was changed.
    Dependency {
        /// The referencing property, like `fill` or `filter`.
        property: String,
    },
}

/// A part of a node that was updated in place.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[allow(missing_docs)]
pub enum Facet {
    Shape,
    Transform,
    Paint,
    Effects,
    Markers,
    Visibility,
    Children,
    Image,
    Viewport,
}

/// A bridge reaction to an [`UpdateEvent`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateOutcome {
    /// The node was updated in place.
    Updated(Facet),
    /// The event does not affect the node.
    Unchanged,
    /// The node has to be built again.
    Rebuild,
}

/// An update that failed.
///
/// The node keeps its last successfully built state.
#[derive(Clone, PartialEq, Debug)]
pub struct UpdateFailure {
    /// The element which update failed.
    pub element: NodeId,
    /// A stable error code.
    pub code: &'static str,
    /// A human-readable message.
    pub message: String,
}

/// A summary of one [`UpdateDispatcher::process`] pass.
#[derive(Clone, Default, Debug)]
pub struct UpdateReport {
    /// The number of processed mutations.
    pub mutations: usize,
    /// Nodes updated in place.
    pub updated: Vec<(NodeId, Facet)>,
    /// Elements which nodes were built again.
    pub rebuilt: Vec<NodeId>,
    /// The number of events that did not affect the tree.
    pub unchanged: usize,
    /// Failed updates.
    pub failures: Vec<UpdateFailure>,
}

impl UpdateReport {
    /// Checks that the tree was changed.
    pub fn has_changes(&self) -> bool {
        !self.updated.is_empty() || !self.rebuilt.is_empty()
    }
}

/// Owns a document, its tree and the context that binds them.
pub struct UpdateDispatcher {
    ctx: BridgeContext,
    doc: Document,
    tree: Tree,
}

impl UpdateDispatcher {
    /// Builds a document and starts recording its mutations.
    ///
    /// The context is switched to the dynamic mode.
    pub fn new(mut ctx: BridgeContext, mut doc: Document) -> Result<Self, Error> {
        ctx.opt.dynamic = Dynamic::Dynamic;

        doc.set_recording(false);
        let tree = builder::build_document(&mut ctx, &mut doc)?;
        doc.take_mutations();
        doc.set_recording(true);

        Ok(UpdateDispatcher { ctx, doc, tree })
    }

    /// Returns the document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Returns the document for modification.
    ///
    /// Changes are applied to the tree by [`process`](Self::process).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Returns the graphics tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the bridge context.
    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    /// Checks that there are unprocessed mutations.
    pub fn has_pending(&self) -> bool {
        self.doc.has_mutations()
    }

    /// Applies all recorded mutations to the tree.
    pub fn process(&mut self) -> UpdateReport {
        let mutations = self.doc.take_mutations();
        let mut report = UpdateReport {
            mutations: mutations.len(),
            ..UpdateReport::default()
        };

        let mut session = Session {
            ctx: &mut self.ctx,
            doc: &mut self.doc,
            tree: &mut self.tree,
            report: &mut report,
        };

        for mutation in mutations {
            session.dispatch(mutation);
        }

        // Mutations made by use expansion are internal.
        self.doc.take_mutations();

        if !report.failures.is_empty() {
            log::warn!("{} updates failed.", report.failures.len());
        }

        log::debug!(
            "Processed {} mutations: {} updated, {} rebuilt, {} unchanged.",
            report.mutations,
            report.updated.len(),
            report.rebuilt.len(),
            report.unchanged
        );

        report
    }
}

impl std::fmt::Debug for UpdateDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("UpdateDispatcher")
            .field("ctx", &self.ctx)
            .field("pending", &self.doc.has_mutations())
            .finish()
    }
}

struct Session<'a> {
    ctx: &'a mut BridgeContext,
    doc: &'a mut Document,
    tree: &'a mut Tree,
    report: &'a mut UpdateReport,
}

impl Session<'_> {
    fn dispatch(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::AttributeModified {
                element,
                name,
                prev,
                new,
            } => {
                if prev == new {
                    self.report.unchanged += 1;
                    return;
                }

                let is_use = self.doc.get(element).has_tag_name("use");
                if is_use && name == "href" {
                    use_node::reexpand(self.ctx, self.doc, element);
                    self.rebuild_bound(element);
                } else {
                    let is_viewport = container::VIEWPORT_ATTRIBUTES.contains(&name.as_str());
                    if is_viewport && self.is_root(element) {
                        self.update_root_viewport();
                    }

                    let event = UpdateEvent::Attribute {
                        name: name.clone(),
                        prev,
                        new,
                    };
                    self.notify(element, event);
                }

                if name == "id" {
                    self.retry_broken_uses();
                }

                self.propagate(element);
            }
            Mutation::StyleChanged {
                element,
                properties,
            } => {
                self.notify(element, UpdateEvent::Style { properties });
                self.propagate(element);
            }
            Mutation::NodeInserted { parent, child } => {
                // Shadow trees of a new subtree.
                let uses: Vec<NodeId> = self
                    .doc
                    .get(child)
                    .descendants()
                    .filter(|n| n.has_tag_name("use"))
                    .map(|n| n.id())
                    .collect();
                for id in uses {
                    use_node::reexpand(self.ctx, self.doc, id);
                }

                self.notify(parent, UpdateEvent::ChildInserted { child });
                self.retry_broken_uses();
                self.propagate(parent);
            }
            Mutation::NodeRemoved { parent, child } => {
                self.notify(parent, UpdateEvent::ChildRemoved { child });
                self.propagate(parent);
                // References to the removed subtree are broken now.
                self.propagate(child);
            }
            Mutation::CharacterDataModified { element } => {
                self.notify(element, UpdateEvent::CharacterData);
                self.propagate(element);
            }
        }
    }

    /// Routes an event to the bridge of an element.
    fn notify(&mut self, element: NodeId, event: UpdateEvent) {
        let node = self.ctx.node_for_element(element);
        let bridge = self.ctx.bridge_for_element(element);
        let (node, bridge) = match (node, bridge) {
            (Some(node), Some(bridge)) => (node, bridge),
            _ => return self.notify_unbound(element, event),
        };

        let graphics = match bridge.as_graphics() {
            Some(v) => v,
            None => return,
        };

        let svg = self.doc.get(element);
        let pushed = builder::enter_viewports(self.ctx, svg, false);
        let result = graphics.update(self.ctx, svg, &node, &event);
        builder::leave_viewports(self.ctx, pushed);

        match result {
            Ok(UpdateOutcome::Updated(facet)) => self.report.updated.push((element, facet)),
            Ok(UpdateOutcome::Unchanged) => self.report.unchanged += 1,
            Ok(UpdateOutcome::Rebuild) => self.rebuild(element, &node),
            Err(e) => self.fail(element, e),
        }
    }

    /// An element without a node can start producing one,
    /// like when `display` is no longer `none`.
    fn notify_unbound(&mut self, element: NodeId, event: UpdateEvent) {
        if matches!(event, UpdateEvent::Attribute { .. } | UpdateEvent::Style { .. }) {
            self.insert_into_parent(element);
        }
    }

    fn insert_into_parent(&mut self, element: NodeId) {
        let svg = self.doc.get(element);
        if !svg.is_connected() || builder::lookup(self.ctx, svg).is_none() {
            return;
        }

        let parent = match svg.parent_element() {
            Some(v) => v.id(),
            None => return,
        };

        let is_container = self
            .ctx
            .bridge_for_element(parent)
            .and_then(|b| b.as_graphics().map(|g| g.is_container()))
            .unwrap_or(false);
        if is_container {
            self.notify(parent, UpdateEvent::ChildInserted { child: element });
        }
    }

    fn rebuild(&mut self, element: NodeId, node: &Node) {
        let svg = self.doc.get(element);
        match builder::rebuild(self.ctx, svg, node) {
            Ok(_) => self.report.rebuilt.push(element),
            Err(e) => self.fail(element, e),
        }
    }

    fn rebuild_bound(&mut self, element: NodeId) {
        match self.ctx.node_for_element(element) {
            Some(node) => self.rebuild(element, &node),
            None => self.insert_into_parent(element),
        }
    }

    fn fail(&mut self, element: NodeId, error: BridgeError) {
        log::warn!("Failed to update an element cause {}.", error);
        self.report.failures.push(UpdateFailure {
            element,
            code: error.code(),
            message: error.to_string(),
        });
        self.ctx.report(error);
    }

    /// Notifies elements that reference the changed one.
    fn propagate(&mut self, element: NodeId) {
        for use_id in use_node::dependent_uses(self.ctx, self.doc.get(element)) {
            use_node::reexpand(self.ctx, self.doc, use_id);
            self.rebuild_bound(use_id);
        }

        let svg = self.doc.get(element);
        let mut targets = self.ctx.invalidate_fragments(svg);
        targets.extend(svg.ancestors().map(|n| n.id()));

        let mut refs = Vec::new();
        for target in targets {
            refs.extend_from_slice(self.ctx.style_refs.dependents(target));
        }
        refs.sort_by(|a, b| a.element.cmp(&b.element).then_with(|| a.property.cmp(&b.property)));
        refs.dedup();

        for r in refs {
            // Was removed by a previous notification.
            if self.ctx.node_for_element(r.element).is_none() {
                continue;
            }

            self.notify(r.element, UpdateEvent::Dependency {
                property: r.property,
            });
        }
    }

    /// Instantiates `use` elements that referenced a missing element.
    fn retry_broken_uses(&mut self) {
        let mut uses: Vec<NodeId> = self.ctx.use_errors.keys().copied().collect();
        uses.sort();

        for use_id in uses {
            use_node::reexpand(self.ctx, self.doc, use_id);
            if !self.ctx.use_errors.contains_key(&use_id) {
                self.rebuild_bound(use_id);
            }
        }
    }

    fn is_root(&self, element: NodeId) -> bool {
        self.doc.root_element().map(|n| n.id()) == Some(element)
    }

    fn update_root_viewport(&mut self) {
        let svg = match self.doc.root_element() {
            Some(v) => v,
            None => return,
        };

        if let Some((size, view_box)) = container::root_view_box(self.ctx, svg) {
            self.ctx.units.set_root_viewport(view_box.rect.size());
            self.tree.size = size;
            self.tree.view_box = view_box;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_gvt::NodeExt;

    fn dispatcher(text: &str) -> UpdateDispatcher {
        let doc = Document::parse_str(text).unwrap();
        UpdateDispatcher::new(BridgeContext::new(Options::default()), doc).unwrap()
    }

    fn id(d: &UpdateDispatcher, s: &str) -> NodeId {
        d.document().element_by_id(s).unwrap().id()
    }

    #[test]
    fn same_value_is_skipped() {
        let mut d = dispatcher(
            "<svg xmlns='http://www.w3.org/2000/svg'><rect id='r' width='10' height='10'/></svg>",
        );
        let r = id(&d, "r");
        d.document_mut().set_attribute(r, "width", "10");
        let report = d.process();
        assert!(!report.has_changes());
    }

    #[test]
    fn transform_is_updated_in_place() {
        let mut d = dispatcher(
            "<svg xmlns='http://www.w3.org/2000/svg'><rect id='r' width='10' height='10'/></svg>",
        );
        let r = id(&d, "r");
        let node = d.tree().node_by_id("r").unwrap();

        d.document_mut().set_attribute(r, "transform", "translate(5 5)");
        let report = d.process();

        assert_eq!(report.updated, vec![(r, Facet::Transform)]);
        assert!(node == d.tree().node_by_id("r").unwrap());
        assert_eq!(node.transform(), svgbridge_gvt::Transform::from_translate(5.0, 5.0));
    }

    #[test]
    fn display_toggles_the_node() {
        let mut d = dispatcher(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <g id='g'><rect id='r1' width='1' height='1'/><rect id='r2' width='1' height='1'/></g>
            </svg>",
        );
        let r1 = id(&d, "r1");

        d.document_mut().set_attribute(r1, "display", "none");
        let report = d.process();
        assert_eq!(report.rebuilt, vec![r1]);
        assert!(d.tree().node_by_id("r1").is_none());

        d.document_mut().set_attribute(r1, "display", "inline");
        let report = d.process();
        let g = id(&d, "g");
        assert_eq!(report.updated, vec![(g, Facet::Children)]);

        let g_node = d.tree().node_by_id("g").unwrap();
        let ids: Vec<String> = g_node.children().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, ["r1", "r2"]);
    }

    #[test]
    fn failed_update_keeps_the_node() {
        let mut d = dispatcher(
            "<svg xmlns='http://www.w3.org/2000/svg'><circle id='c' r='5'/></svg>",
        );
        let c = id(&d, "c");
        let bbox = d.tree().node_by_id("c").unwrap().bounding_box();

        d.document_mut().set_attribute(c, "r", "-5");
        let report = d.process();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].element, c);
        assert_eq!(report.failures[0].code, "attribute.illegal");
        assert_eq!(d.tree().node_by_id("c").unwrap().bounding_box(), bbox);
    }

    #[test]
    fn root_size_follows_attributes() {
        let mut d = dispatcher("<svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'/>");
        let svg = d.document().root_element().unwrap().id();

        d.document_mut().set_attribute(svg, "width", "30");
        d.process();
        assert_eq!(d.tree().size.width(), 30.0);
    }
}
