// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgbridge_dom::{Document, NodeId, SvgNode};
use svgbridge_gvt::Node;
use svgtypes::Length;

use super::{effects, BuildStatus, Bridge, GraphicsBridge};
use crate::reference::{self, element_uri, PathError, Reference, ResolutionPath};
use crate::update::{UpdateEvent, UpdateOutcome};
use crate::{BridgeContext, BridgeError, ResourceKind};

/// A bridge of `use`.
///
/// The referenced subtree is instantiated as a shadow tree before the build,
/// see [`expand_all`].
pub(crate) struct UseBridge;

impl Bridge for UseBridge {
    fn local_name(&self) -> &str {
        "use"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for UseBridge {
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        if let Some(e) = ctx.use_errors.get(&element.id()) {
            return Err(e.clone());
        }

        // A `use` without a link.
        if !ctx.shadow_roots.contains_key(&element.id()) {
            return Ok(BuildStatus::Suppressed);
        }

        let x = ctx.units.user_length(element, "x", Length::zero())?;
        let y = ctx.units.user_length(element, "y", Length::zero())?;
        let ts = node.borrow().transform().pre_translate(x, y);
        node.borrow_mut().set_transform(ts);

        Ok(BuildStatus::Built)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn child_elements<'a>(&self, ctx: &BridgeContext, element: SvgNode<'a>) -> Vec<SvgNode<'a>> {
        match ctx.shadow_roots.get(&element.id()) {
            Some(id) => vec![element.document().get(*id)],
            None => Vec::new(),
        }
    }

    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        match event {
            UpdateEvent::Attribute { name, .. } => match name.as_str() {
                "x" | "y" | "width" | "height" | "href" | "transform" => Ok(UpdateOutcome::Rebuild),
                _ => effects::update_common(ctx, element, node, event, true),
            },
            // Children of `use` are never rendered.
            UpdateEvent::ChildInserted { .. } | UpdateEvent::ChildRemoved { .. } => {
                Ok(UpdateOutcome::Unchanged)
            }
            _ => effects::update_common(ctx, element, node, event, true),
        }
    }
}

enum Target {
    Local(NodeId),
    External(Rc<Document>, NodeId),
}

/// Instantiates shadow trees of all `use` elements, including nested ones.
pub(crate) fn expand_all(ctx: &mut BridgeContext, doc: &mut Document) {
    let queue: Vec<NodeId> = doc
        .descendants()
        .filter(|n| n.has_tag_name("use"))
        .map(|n| n.id())
        .collect();
    expand_queue(ctx, doc, queue);
}

/// Instantiates the shadow tree of a `use` element again,
/// after its link or the referenced subtree was changed.
pub(crate) fn reexpand(ctx: &mut BridgeContext, doc: &mut Document, use_id: NodeId) {
    ctx.shadow_roots.remove(&use_id);
    for uses in ctx.use_targets.values_mut() {
        uses.retain(|id| *id != use_id);
    }

    expand_queue(ctx, doc, vec![use_id]);
}

/// Returns `use` elements which shadow trees contain a copy of `element`.
pub(crate) fn dependent_uses(ctx: &BridgeContext, element: SvgNode) -> Vec<NodeId> {
    let mut list: Vec<NodeId> = element
        .ancestors()
        .filter_map(|a| ctx.use_targets.get(&a.id()))
        .flatten()
        .copied()
        .collect();
    list.sort();
    list.dedup();
    list
}

fn expand_queue(ctx: &mut BridgeContext, doc: &mut Document, mut queue: Vec<NodeId>) {
    let mut idx = 0;
    while idx < queue.len() {
        let use_id = queue[idx];
        idx += 1;

        if let Some(shadow) = expand(ctx, doc, use_id) {
            queue.extend(
                doc.get(shadow)
                    .descendants()
                    .filter(|n| n.has_tag_name("use"))
                    .map(|n| n.id()),
            );
        }
    }
}

fn expand(ctx: &mut BridgeContext, doc: &mut Document, use_id: NodeId) -> Option<NodeId> {
    ctx.use_errors.remove(&use_id);

    let target = match resolve_target(ctx, doc.get(use_id)) {
        Ok(v) => v?,
        Err(e) => {
            ctx.use_errors.insert(use_id, e);
            return None;
        }
    };

    let shadow = match target {
        Target::Local(id) => {
            let uses = ctx.use_targets.entry(id).or_default();
            if !uses.contains(&use_id) {
                uses.push(use_id);
            }

            doc.clone_subtree(id)
        }
        Target::External(other, id) => doc.import_subtree(&other, id),
    };

    doc.set_shadow_host(shadow, use_id);
    ctx.shadow_roots.insert(use_id, shadow);
    Some(shadow)
}

fn resolve_target(ctx: &mut BridgeContext, node: SvgNode) -> Result<Option<Target>, BridgeError> {
    let href = match node.raw_attribute("href") {
        Some(v) => v,
        None => return Ok(None),
    };

    let target = match reference::resolve(ctx, node, "href", href, ResourceKind::Document)? {
        Reference::Local(target) => target,
        Reference::External {
            document,
            element: Some(id),
        } => return Ok(Some(Target::External(document, id))),
        // `use` must reference an element.
        Reference::External { element: None, .. } => {
            return Err(BridgeError::broken_reference(node, "href", href));
        }
    };

    // Copies of an element keep its `id`, so a recursive instantiation
    // shows up as a repeated URI among the ancestors.
    let mut path = ResolutionPath::new(ctx.opt.max_reference_depth);
    let mut ancestors: Vec<SvgNode> = node
        .ancestors()
        .filter(|n| n.is_element() && !n.element_id().is_empty())
        .collect();
    ancestors.reverse();

    for n in ancestors.into_iter().chain(std::iter::once(target)) {
        match path.visit(element_uri(n)) {
            Ok(()) => {}
            Err(PathError::Circular) | Err(PathError::TooDeep) => {
                return Err(BridgeError::circular_reference(node, "href", href));
            }
        }
    }

    Ok(Some(Target::Local(target.id())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder, Options};
    use svgbridge_gvt::{NodeExt, NodeKind, NonZeroRect, Transform};

    #[test]
    fn shadow_tree_is_parented_under_use() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <rect id='r' width='10' height='10'/>
                <use id='u' xlink:href='#r' fill='green'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        expand_all(&mut ctx, &mut doc);

        let use_id = doc.element_by_id("u").unwrap().id();
        let shadow = doc.get(ctx.shadow_roots[&use_id]);
        assert!(shadow.is_shadow_root());
        assert_eq!(shadow.parent().map(|n| n.id()), Some(use_id));
        assert_eq!(shadow.find_attribute::<&str>("fill"), Some("green"));

        let rect_id = doc.element_by_id("r").unwrap().id();
        assert_eq!(ctx.use_targets[&rect_id], vec![use_id]);
        assert_eq!(dependent_uses(&ctx, doc.get(rect_id)), vec![use_id]);
    }

    #[test]
    fn symbol_gets_use_size() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <symbol id='s' viewBox='0 0 10 10'><rect width='10' height='10'/></symbol>
                <use id='u' x='5' y='5' width='20' height='20' xlink:href='#s'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let tree = builder::build_document(&mut ctx, &mut doc).unwrap();

        let use_node = tree.node_by_id("u").unwrap();
        assert_eq!(use_node.transform(), Transform::from_translate(5.0, 5.0));

        let symbol = use_node.first_child().unwrap();
        assert_eq!(symbol.transform(), Transform::from_scale(2.0, 2.0));
        match *symbol.borrow() {
            NodeKind::Group(ref g) => {
                assert_eq!(g.clip_rect, NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0));
            }
            _ => panic!("a group is expected"),
        };
    }

    #[test]
    fn recursive_use_is_circular() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <g id='g1'><use id='u' xlink:href='#g1'/></g>
                <use id='u2' xlink:href='#u2'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        expand_all(&mut ctx, &mut doc);

        for id in ["u", "u2"] {
            let use_id = doc.element_by_id(id).unwrap().id();
            let e = &ctx.use_errors[&use_id];
            assert_eq!(e.code(), "xlink.href.circularDependencies");
        }
    }

    #[test]
    fn dangling_use_is_replaced_by_a_placeholder() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <use id='u' xlink:href='#missing'/>
                <rect id='r' width='10' height='10'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let tree = builder::build_document(&mut ctx, &mut doc).unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].code(), "uri.badTarget");
        assert_eq!(ctx.errors()[0].uri(), Some("#missing"));

        // The placeholder keeps the element's id, the sibling is untouched.
        assert!(tree.node_by_id("u").is_some());
        assert!(tree.node_by_id("r").is_some());
    }
}
