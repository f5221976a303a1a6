// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Facets shared by all graphics nodes: compositing effects, visibility and paint.

use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::filter::Filter;
use svgbridge_gvt::{ClipPath, Mask, Node, NodeExt, NodeKind, Opacity, Visibility};

use super::{BuildStatus, Fragment};
use crate::reference::{self, split_func_iri};
use crate::svgnode_ext::SvgNodeExt;
use crate::update::{Facet, UpdateEvent, UpdateOutcome};
use crate::{builder, style, BridgeContext, BridgeError, ResourceKind};

/// Sets opacity, blending, clip path, mask and filters of a built node.
///
/// A broken `clip-path` or `mask` link is an error, so the element is replaced
/// with a broken-link placeholder. An element with an unresolvable filter is not rendered.
pub(crate) fn apply_effects(
    ctx: &mut BridgeContext,
    element: SvgNode,
    node: &Node,
) -> Result<BuildStatus, BridgeError> {
    let clip_path = resolve_clip_path(ctx, element)?;
    if ctx.in_clip_path {
        // Only nested clip paths are allowed inside a `clipPath`.
        node.borrow_mut().effects_mut().clip_path = clip_path;
        return Ok(BuildStatus::Built);
    }

    let filters = match resolve_filters(ctx, element) {
        Ok(v) => v,
        Err(e) => {
            ctx.report(e);
            return Ok(BuildStatus::Suppressed);
        }
    };

    let mask = resolve_mask(ctx, element)?;

    let mut kind = node.borrow_mut();
    let effects = kind.effects_mut();
    effects.opacity = element.opacity("opacity").unwrap_or(Opacity::ONE);
    effects.blend_mode = element.keyword("mix-blend-mode").unwrap_or_default();
    effects.isolate = element.raw_attribute("isolation") == Some("isolate");
    effects.clip_path = clip_path;
    effects.mask = mask;
    effects.filters = filters;

    Ok(BuildStatus::Built)
}

pub(crate) fn resolve_clip_path(
    ctx: &mut BridgeContext,
    element: SvgNode,
) -> Result<Option<Rc<ClipPath>>, BridgeError> {
    match linked_fragment(ctx, element, "clip-path", "clipPath")? {
        Some(Fragment::ClipPath(clip)) => Ok(Some(clip)),
        _ => Ok(None),
    }
}

pub(crate) fn resolve_mask(
    ctx: &mut BridgeContext,
    element: SvgNode,
) -> Result<Option<Rc<Mask>>, BridgeError> {
    match linked_fragment(ctx, element, "mask", "mask")? {
        Some(Fragment::Mask(mask)) => Ok(Some(mask)),
        _ => Ok(None),
    }
}

// A link to an element of a wrong kind is ignored.
fn linked_fragment(
    ctx: &mut BridgeContext,
    element: SvgNode,
    attr: &str,
    tag_name: &str,
) -> Result<Option<Fragment>, BridgeError> {
    let uri = match element.raw_attribute(attr).and_then(split_func_iri) {
        Some((uri, _)) => uri,
        None => return Ok(None),
    };

    let reference = reference::resolve(ctx, element, attr, uri, ResourceKind::Document)?;
    let link = reference
        .element()
        .ok_or_else(|| BridgeError::broken_reference(element, attr, uri))?;

    if !link.has_tag_name(tag_name) {
        log::warn!(
            "'{}' cannot reference '{}' via '{}'.",
            element.tag_name().unwrap_or_default(),
            link.tag_name().unwrap_or_default(),
            attr
        );
        return Ok(None);
    }

    ctx.fragment(element, attr, link)
}

/// Resolves the `filter` attribute.
///
/// Unlike `clip-path` and `mask`, any invalid link is an error.
pub(crate) fn resolve_filters(
    ctx: &mut BridgeContext,
    element: SvgNode,
) -> Result<Vec<Rc<Filter>>, BridgeError> {
    let value = match element.raw_attribute("filter") {
        Some(v) => v,
        None => return Ok(Vec::new()),
    };

    let mut filters = Vec::new();
    for item in filter_items(value) {
        if let Some((uri, _)) = split_func_iri(item) {
            let reference = reference::resolve(ctx, element, "filter", uri, ResourceKind::Document)?;
            let link = reference
                .element()
                .filter(|n| n.has_tag_name("filter"))
                .ok_or_else(|| BridgeError::broken_reference(element, "filter", uri))?;

            match ctx.fragment(element, "filter", link)? {
                Some(Fragment::Filter(filter)) => filters.push(filter),
                _ => return Err(BridgeError::broken_reference(element, "filter", uri)),
            }
            continue;
        }

        match svgtypes::FilterValueListParser::from(item).next() {
            Some(Ok(_)) => log::warn!("Filter functions are not supported. Skipped."),
            Some(Err(e)) => {
                // Skip the whole attribute list on error.
                log::warn!("Failed to parse a filter value cause {}. Skipping.", e);
                return Ok(Vec::new());
            }
            None => {}
        }
    }

    Ok(filters)
}

// Splits a filter list into `name(...)` items.
fn filter_items(value: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = None;
    let mut depth = 0usize;
    for (idx, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(from) = start.take() {
                        items.push(&value[from..=idx]);
                    }
                    continue;
                }
            }
            _ => {}
        }

        if start.is_none() && !c.is_whitespace() {
            start = Some(idx);
        }
    }

    if let Some(from) = start {
        items.push(&value[from..]);
    }

    items
}

/// Updates a node after a mutation without rebuilding, when possible.
///
/// Used by bridges that do not handle the event themselves.
pub(crate) fn update_common(
    ctx: &mut BridgeContext,
    element: SvgNode,
    node: &Node,
    event: &UpdateEvent,
    is_container: bool,
) -> Result<UpdateOutcome, BridgeError> {
    match event {
        UpdateEvent::Attribute { name, .. } => update_property(ctx, element, node, name, is_container),
        UpdateEvent::Dependency { property } => {
            update_property(ctx, element, node, property, is_container)
        }
        UpdateEvent::Style { properties } => {
            let mut outcome = UpdateOutcome::Unchanged;
            for name in properties {
                match update_property(ctx, element, node, name, is_container)? {
                    UpdateOutcome::Rebuild => return Ok(UpdateOutcome::Rebuild),
                    UpdateOutcome::Unchanged => {}
                    updated => outcome = updated,
                }
            }

            Ok(outcome)
        }
        UpdateEvent::ChildInserted { child } if is_container => {
            builder::insert_child(ctx, element, node, *child);
            Ok(UpdateOutcome::Updated(Facet::Children))
        }
        UpdateEvent::ChildRemoved { child } if is_container => {
            builder::remove_child(ctx, node, *child);
            Ok(UpdateOutcome::Updated(Facet::Children))
        }
        _ => Ok(UpdateOutcome::Rebuild),
    }
}

fn update_property(
    ctx: &mut BridgeContext,
    element: SvgNode,
    node: &Node,
    name: &str,
    is_container: bool,
) -> Result<UpdateOutcome, BridgeError> {
    let outcome = match name {
        "transform" => {
            let ts = match element.parse_transform("transform")? {
                Some(ts) => ts,
                None => return Ok(UpdateOutcome::Rebuild),
            };

            if node.transform() == ts {
                UpdateOutcome::Unchanged
            } else {
                node.borrow_mut().set_transform(ts);
                UpdateOutcome::Updated(Facet::Transform)
            }
        }
        "opacity" | "mix-blend-mode" | "isolation" => {
            let mut kind = node.borrow_mut();
            let effects = kind.effects_mut();
            effects.opacity = element.opacity("opacity").unwrap_or(Opacity::ONE);
            effects.blend_mode = element.keyword("mix-blend-mode").unwrap_or_default();
            effects.isolate = element.raw_attribute("isolation") == Some("isolate");
            UpdateOutcome::Updated(Facet::Effects)
        }
        // Let the rebuild report an error.
        "clip-path" => match resolve_clip_path(ctx, element) {
            Ok(clip_path) => {
                node.borrow_mut().effects_mut().clip_path = clip_path;
                UpdateOutcome::Updated(Facet::Effects)
            }
            Err(_) => UpdateOutcome::Rebuild,
        },
        "mask" => match resolve_mask(ctx, element) {
            Ok(mask) => {
                node.borrow_mut().effects_mut().mask = mask;
                UpdateOutcome::Updated(Facet::Effects)
            }
            Err(_) => UpdateOutcome::Rebuild,
        },
        "filter" => match resolve_filters(ctx, element) {
            Ok(filters) => {
                node.borrow_mut().effects_mut().filters = filters;
                UpdateOutcome::Updated(Facet::Effects)
            }
            Err(_) => UpdateOutcome::Rebuild,
        },
        // Inherited properties of a container affect its whole subtree.
        _ if is_container => UpdateOutcome::Rebuild,
        "visibility" => {
            let visibility = element
                .find_keyword::<Visibility>("visibility")
                .unwrap_or_default();
            match *node.borrow_mut() {
                NodeKind::Shape(ref mut shape) => shape.visibility = visibility,
                NodeKind::Image(ref mut image) => image.visibility = visibility,
                NodeKind::Group(_) => return Ok(UpdateOutcome::Rebuild),
            }

            UpdateOutcome::Updated(Facet::Visibility)
        }
        "color" | "fill" | "fill-opacity" | "fill-rule" | "stroke" | "stroke-opacity"
        | "stroke-width" | "stroke-dasharray" | "stroke-dashoffset" | "stroke-linecap"
        | "stroke-linejoin" | "stroke-miterlimit" => update_paint(ctx, element, node),
        _ => UpdateOutcome::Rebuild,
    };

    Ok(outcome)
}

/// Resolves fill and stroke of a shape node again.
pub(crate) fn update_paint(ctx: &mut BridgeContext, element: SvgNode, node: &Node) -> UpdateOutcome {
    let has_markers = matches!(*node.borrow(), NodeKind::Shape(ref s) if s.markers.is_some());
    if has_markers {
        // Markers are scaled by the stroke width.
        return UpdateOutcome::Rebuild;
    }

    let has_bbox = node
        .bounding_box()
        .map(|r| r.width() > 0.0 && r.height() > 0.0)
        .unwrap_or(false);
    let fill = style::resolve_fill(ctx, element, has_bbox);
    let stroke = style::resolve_stroke(ctx, element, has_bbox);

    match *node.borrow_mut() {
        NodeKind::Shape(ref mut shape) => {
            shape.fill = fill;
            shape.stroke = stroke;
            UpdateOutcome::Updated(Facet::Paint)
        }
        _ => UpdateOutcome::Rebuild,
    }
}
