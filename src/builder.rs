// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Builds a graphics-node tree from a document.
//!
//! Each element is translated by the bridge registered for it.
//! A failing element never affects its already built siblings.

use std::rc::Rc;

use svgbridge_dom::{Document, NodeId, SvgNode};
use svgbridge_gvt::{Group, Node, NodeKind, NonZeroRect, Tree, Units};
use svgtypes::Length;

use crate::bridge::{conditional, container, effects, use_node};
use crate::bridge::{Bridge, BuildResult, BuildStatus};
use crate::svgnode_ext::SvgNodeExt;
use crate::{BridgeContext, BridgeError, Error};

/// Builds a tree of a whole document.
///
/// `use` shadow trees are instantiated in `doc` first.
/// All per-document state of `ctx` is reset.
pub fn build_document(ctx: &mut BridgeContext, doc: &mut Document) -> Result<Tree, Error> {
    ctx.reset();

    match doc.root_element() {
        Some(svg) if svg.has_tag_name("svg") => {}
        _ => return Err(Error::Dom(svgbridge_dom::Error::NoRootSvg)),
    }

    use_node::expand_all(ctx, doc);

    let doc: &Document = doc;
    let svg = doc
        .root_element()
        .ok_or(Error::Dom(svgbridge_dom::Error::NoRootSvg))?;
    let (size, view_box) = container::root_view_box(ctx, svg).ok_or(Error::InvalidSize)?;
    ctx.units.set_root_viewport(view_box.rect.size());

    let root = Node::new(NodeKind::Group(Group::default()));
    match build_element(ctx, svg) {
        BuildResult::Rendered(node) => root.append(node),
        BuildResult::Suppressed => {}
        BuildResult::Failed(e) => return Err(Error::Bridge(e)),
    }

    if ctx.user_agent.is_interrupted() {
        return Err(Error::Bridge(BridgeError::Interrupted));
    }

    log::debug!("Built {} bound elements.", ctx.bindings_count());
    Ok(Tree {
        size,
        view_box,
        root,
    })
}

/// Builds a single element and its subtree.
pub fn build_element(ctx: &mut BridgeContext, element: SvgNode) -> BuildResult {
    if ctx.user_agent.is_interrupted() {
        return BuildResult::Failed(BridgeError::Interrupted);
    }

    let bridge = match lookup(ctx, element) {
        Some(v) => v,
        None => return BuildResult::Suppressed,
    };

    let node = match bridge.as_graphics() {
        Some(graphics) => graphics.create_node(element),
        None => return BuildResult::Suppressed,
    };

    match populate(ctx, element, &bridge, &node) {
        Ok(BuildStatus::Built) => BuildResult::Rendered(node),
        Ok(BuildStatus::Suppressed) => BuildResult::Suppressed,
        Err(e) => fail(ctx, element, e, bridge),
    }
}

/// Fills a new node and builds its children.
fn populate(
    ctx: &mut BridgeContext,
    element: SvgNode,
    bridge: &Rc<dyn Bridge>,
    node: &Node,
) -> Result<BuildStatus, BridgeError> {
    let graphics = match bridge.as_graphics() {
        Some(v) => v,
        None => return Ok(BuildStatus::Suppressed),
    };

    if !is_rendered(ctx, element) {
        return Ok(BuildStatus::Suppressed);
    }

    // A non-invertible transform disables rendering.
    match element.parse_transform("transform")? {
        Some(ts) => node.borrow_mut().set_transform(ts),
        None => return Ok(BuildStatus::Suppressed),
    }

    match graphics.build(ctx, element, node) {
        Ok(BuildStatus::Built) => {}
        Ok(BuildStatus::Suppressed) => return Ok(BuildStatus::Suppressed),
        Err(e) => return Err(e.with_node(node)),
    }

    if effects::apply_effects(ctx, element, node)? == BuildStatus::Suppressed {
        return Ok(BuildStatus::Suppressed);
    }

    if graphics.is_container() {
        let viewport = graphics.viewport(ctx, element);
        if let Some(size) = viewport {
            ctx.units.push_viewport(size);
        }

        let children = graphics.child_elements(ctx, element);
        build_children(ctx, children, node);

        if viewport.is_some() {
            ctx.units.pop_viewport();
        }
    }

    if ctx.should_bind() {
        ctx.bind(element.id(), node, bridge.clone());
    }

    Ok(BuildStatus::Built)
}

/// Builds elements and appends their nodes to `parent`.
pub(crate) fn build_children<'a>(
    ctx: &mut BridgeContext,
    elements: impl IntoIterator<Item = SvgNode<'a>>,
    parent: &Node,
) {
    for element in elements {
        match build_element(ctx, element) {
            BuildResult::Rendered(node) => parent.append(node),
            BuildResult::Failed(BridgeError::Interrupted) => return,
            _ => {}
        }
    }
}

/// Builds a new child of a container and inserts it respecting the document order.
pub(crate) fn insert_child(ctx: &mut BridgeContext, element: SvgNode, node: &Node, child: NodeId) {
    let child = element.document().get(child);
    if !child.is_element() {
        return;
    }

    // Already inserted by an earlier mutation of the same batch.
    if let Some(n) = ctx.node_for_element(child.id()) {
        if n.parent().as_ref() == Some(node) {
            return;
        }
    }

    let new_node = match build_element(ctx, child) {
        BuildResult::Rendered(v) => v,
        _ => return,
    };

    // Insert before the first following sibling that was rendered.
    let mut sibling = child.next_sibling();
    while let Some(s) = sibling {
        if let Some(n) = ctx.node_for_element(s.id()) {
            if n.parent().as_ref() == Some(node) {
                n.insert_before(new_node);
                return;
            }
        }

        sibling = s.next_sibling();
    }

    node.append(new_node);
}

/// Removes the node of a removed child element.
pub(crate) fn remove_child(ctx: &mut BridgeContext, node: &Node, child: NodeId) {
    let child_node = match ctx.node_for_element(child) {
        Some(v) => v,
        None => return,
    };

    if child_node.parent().as_ref() != Some(node) {
        return;
    }

    let saved = ctx.unbind_subtree(&child_node);
    for element in saved.elements() {
        ctx.style_refs.remove_referencing(element);
    }

    child_node.detach();
}

/// Builds an element again on its `old` node.
///
/// The node is kept and only its payload and children are replaced.
/// It is swapped for a new one only when the element now produces
/// a different kind of node, like a placeholder.
///
/// Returns `Ok(None)` when the element is no longer rendered.
/// On error, the old node and its bindings are kept.
pub(crate) fn rebuild(
    ctx: &mut BridgeContext,
    element: SvgNode,
    old: &Node,
) -> Result<Option<Node>, BridgeError> {
    let saved = ctx.unbind_subtree(old);
    ctx.style_refs.remove_referencing(element.id());

    let pushed = enter_viewports(ctx, element, false);
    let result = build_element(ctx, element);
    leave_viewports(ctx, pushed);

    match result {
        BuildResult::Rendered(fresh) if is_same_kind(old, &fresh) => {
            adopt(ctx, element, old, &fresh);
            Ok(Some(old.clone()))
        }
        BuildResult::Rendered(fresh) => {
            old.insert_before(fresh.clone());
            old.detach();
            Ok(Some(fresh))
        }
        BuildResult::Suppressed => {
            old.detach();
            Ok(None)
        }
        BuildResult::Failed(e) => {
            ctx.restore_bindings(saved);
            Err(e)
        }
    }
}

fn is_same_kind(a: &Node, b: &Node) -> bool {
    std::mem::discriminant(&*a.borrow()) == std::mem::discriminant(&*b.borrow())
}

/// Moves the payload and the children of a freshly built node into `old`.
fn adopt(ctx: &mut BridgeContext, element: SvgNode, old: &Node, fresh: &Node) {
    for child in old.children().collect::<Vec<_>>() {
        child.detach();
    }

    for child in fresh.children().collect::<Vec<_>>() {
        child.detach();
        old.append(child);
    }

    std::mem::swap(&mut *old.borrow_mut(), &mut *fresh.borrow_mut());

    if let Some(bridge) = ctx.bridge_for_element(element.id()) {
        ctx.bind(element.id(), old, bridge);
    }
}

/// Restores viewports established by the element ancestors.
///
/// Returns the number of pushed viewports.
pub(crate) fn enter_viewports(ctx: &mut BridgeContext, element: SvgNode, inclusive: bool) -> usize {
    let mut chain: Vec<SvgNode> = element
        .ancestors()
        .skip(if inclusive { 0 } else { 1 })
        .filter(|n| n.is_element())
        .collect();
    chain.reverse();

    let mut pushed = 0;
    for n in chain {
        let viewport = lookup(ctx, n)
            .and_then(|b| b.as_graphics().and_then(|g| g.viewport(ctx, n)));
        if let Some(size) = viewport {
            ctx.units.push_viewport(size);
            pushed += 1;
        }
    }

    pushed
}

pub(crate) fn leave_viewports(ctx: &mut BridgeContext, count: usize) {
    for _ in 0..count {
        ctx.units.pop_viewport();
    }
}

/// Returns a bridge instance for an element.
pub(crate) fn lookup(ctx: &BridgeContext, element: SvgNode) -> Option<Rc<dyn Bridge>> {
    let name = element.tag_name()?;
    let prototype = ctx
        .registry
        .lookup(element.namespace().unwrap_or_default(), name)?;
    Some(prototype.instance().unwrap_or(prototype))
}

fn is_rendered(ctx: &BridgeContext, element: SvgNode) -> bool {
    element.raw_attribute("display").map(str::trim) != Some("none")
        && conditional::is_condition_passed(ctx, element)
}

/// Reports an error and replaces a recoverable failure with a placeholder.
fn fail(
    ctx: &mut BridgeContext,
    element: SvgNode,
    error: BridgeError,
    bridge: Rc<dyn Bridge>,
) -> BuildResult {
    ctx.report(error.clone());

    if !error.is_recoverable() || matches!(error, BridgeError::Interrupted) {
        return BuildResult::Failed(error);
    }

    let placeholder = ctx
        .user_agent
        .broken_link_node(&error, placeholder_bounds(ctx, element));
    let ts = element.parse_transform("transform").ok().flatten();
    placeholder.borrow_mut().set_transform(ts.unwrap_or_default());

    if ctx.should_bind() {
        ctx.bind(element.id(), &placeholder, bridge);
    }

    BuildResult::Rendered(placeholder)
}

fn placeholder_bounds(ctx: &BridgeContext, element: SvgNode) -> Option<NonZeroRect> {
    let w = ctx.units.try_length(element, "width", Units::UserSpaceOnUse).ok()??;
    let h = ctx.units.try_length(element, "height", Units::UserSpaceOnUse).ok()??;
    let x = ctx.units.user_length(element, "x", Length::zero()).unwrap_or(0.0);
    let y = ctx.units.user_length(element, "y", Length::zero()).unwrap_or(0.0);
    NonZeroRect::from_xywh(x, y, w, h)
}
