// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structural elements: `svg`, `g`, `a`, `switch` and `symbol`.

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{IsValidLength, Node, NodeKind, NonZeroRect, Size, Transform, Units, ViewBox};
use svgtypes::{Length, LengthUnit as Unit};

use super::{conditional, effects, BuildStatus, Bridge, GraphicsBridge};
use crate::svgnode_ext::SvgNodeExt;
use crate::update::{UpdateEvent, UpdateOutcome};
use crate::{BridgeContext, BridgeError};

/// Attributes that define a viewport.
pub(crate) const VIEWPORT_ATTRIBUTES: &[&str] = &[
    "x",
    "y",
    "width",
    "height",
    "viewBox",
    "preserveAspectRatio",
    "overflow",
    "transform",
];

/// A bridge of the root and nested `svg` elements.
pub(crate) struct SvgBridge;

impl Bridge for SvgBridge {
    fn local_name(&self) -> &str {
        "svg"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for SvgBridge {
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        if is_root(element) {
            let (size, view_box) = match root_view_box(ctx, element) {
                Some(v) => v,
                None => return Ok(BuildStatus::Suppressed),
            };

            let ts = node.borrow().transform().pre_concat(view_box.to_transform(size));
            node.borrow_mut().set_transform(ts);
            return Ok(BuildStatus::Built);
        }

        let (w, h) = viewport_size(ctx, element)?;
        if !w.is_valid_length() || !h.is_valid_length() {
            log::warn!("Nested 'svg' '{}' has an invalid size. Skipped.", element.element_id());
            return Ok(BuildStatus::Suppressed);
        }

        let x = ctx.units.user_length(element, "x", Length::zero())?;
        let y = ctx.units.user_length(element, "y", Length::zero())?;
        let vb_ts = viewbox_transform(element, w, h);

        let ts = node
            .borrow()
            .transform()
            .pre_translate(x, y)
            .pre_concat(vb_ts.unwrap_or_default());

        let mut kind = node.borrow_mut();
        kind.set_transform(ts);
        if let NodeKind::Group(ref mut g) = *kind {
            g.clip_rect = clip_rect(element, w, h, vb_ts);
        }

        Ok(BuildStatus::Built)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn viewport(&self, ctx: &BridgeContext, element: SvgNode) -> Option<Size> {
        if is_root(element) {
            return root_view_box(ctx, element).map(|(_, vb)| vb.rect.size());
        }

        match element.parse_viewbox() {
            Some(vb) => Some(vb.size()),
            None => {
                let (w, h) = viewport_size(ctx, element).ok()?;
                Size::from_wh(w, h)
            }
        }
    }

    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        update_viewport(ctx, element, node, event)
    }
}

/// A bridge of plain groups, like `g` and `a`.
pub(crate) struct GroupBridge(pub &'static str);

impl Bridge for GroupBridge {
    fn local_name(&self) -> &str {
        self.0
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for GroupBridge {
    fn build(
        &self,
        _: &mut BridgeContext,
        _: SvgNode,
        _: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        Ok(BuildStatus::Built)
    }

    fn is_container(&self) -> bool {
        true
    }
}

/// A bridge of `switch`, which renders only its first valid child.
pub(crate) struct SwitchBridge;

impl Bridge for SwitchBridge {
    fn local_name(&self) -> &str {
        "switch"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for SwitchBridge {
    fn build(
        &self,
        _: &mut BridgeContext,
        _: SvgNode,
        _: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        Ok(BuildStatus::Built)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn child_elements<'a>(&self, ctx: &BridgeContext, element: SvgNode<'a>) -> Vec<SvgNode<'a>> {
        element
            .element_children()
            .find(|n| conditional::is_condition_passed(ctx, *n))
            .into_iter()
            .collect()
    }

    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        match event {
            // A new child can become the selected one.
            UpdateEvent::ChildInserted { .. } | UpdateEvent::ChildRemoved { .. } => {
                Ok(UpdateOutcome::Rebuild)
            }
            _ => effects::update_common(ctx, element, node, event, true),
        }
    }
}

/// A bridge of `symbol`.
///
/// A symbol is rendered only as a `use` shadow tree root.
pub(crate) struct SymbolBridge;

impl Bridge for SymbolBridge {
    fn local_name(&self) -> &str {
        "symbol"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for SymbolBridge {
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        if !element.is_shadow_root() {
            return Ok(BuildStatus::Suppressed);
        }

        let (w, h) = viewport_size(ctx, element)?;
        if !w.is_valid_length() || !h.is_valid_length() {
            return Ok(BuildStatus::Suppressed);
        }

        let vb_ts = viewbox_transform(element, w, h);
        let ts = node.borrow().transform().pre_concat(vb_ts.unwrap_or_default());

        let mut kind = node.borrow_mut();
        kind.set_transform(ts);
        if let NodeKind::Group(ref mut g) = *kind {
            g.clip_rect = clip_rect(element, w, h, vb_ts);
        }

        Ok(BuildStatus::Built)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn viewport(&self, ctx: &BridgeContext, element: SvgNode) -> Option<Size> {
        match element.parse_viewbox() {
            Some(vb) => Some(vb.size()),
            None => {
                let (w, h) = viewport_size(ctx, element).ok()?;
                Size::from_wh(w, h)
            }
        }
    }

    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        update_viewport(ctx, element, node, event)
    }
}

fn update_viewport(
    ctx: &mut BridgeContext,
    element: SvgNode,
    node: &Node,
    event: &UpdateEvent,
) -> Result<UpdateOutcome, BridgeError> {
    match event {
        UpdateEvent::Attribute { name, .. } if VIEWPORT_ATTRIBUTES.contains(&name.as_str()) => {
            Ok(UpdateOutcome::Rebuild)
        }
        _ => effects::update_common(ctx, element, node, event, true),
    }
}

fn is_root(element: SvgNode) -> bool {
    element.parent_element().is_none() && !element.is_shadow_root()
}

/// Resolves the size and the view box of the root `svg` element.
///
/// Percentages are relative to the default size, not to the current viewport.
pub(crate) fn root_view_box(ctx: &BridgeContext, element: SvgNode) -> Option<(Size, ViewBox)> {
    let resolve = |name: &str, base: f32| match element.attribute::<Length>(name) {
        Some(Length {
            number,
            unit: Unit::Percent,
        }) => base * number as f32 / 100.0,
        Some(len) => ctx.units.convert_user_length(len, element, name),
        None => base,
    };

    let def = ctx.opt.default_size;
    let size = Size::from_wh(resolve("width", def.width()), resolve("height", def.height()))?;

    let view_box = ViewBox {
        rect: element
            .parse_viewbox()
            .unwrap_or_else(|| size.to_non_zero_rect(0.0, 0.0)),
        aspect: element.attribute("preserveAspectRatio").unwrap_or_default(),
    };

    Some((size, view_box))
}

/// Returns the viewport size of a nested `svg` or a `symbol`.
///
/// `width` and `height` of a referencing `use` element take precedence.
fn viewport_size(ctx: &BridgeContext, element: SvgNode) -> Result<(f32, f32), BridgeError> {
    let def = Length::new(100.0, Unit::Percent);
    let host = element.is_shadow_root().then(|| element.parent()).flatten();

    let resolve = |name: &str| -> Result<f32, BridgeError> {
        let from_use = match host {
            Some(u) => ctx.units.try_length(u, name, Units::UserSpaceOnUse)?,
            None => None,
        };

        match from_use {
            Some(n) => Ok(n),
            None => ctx.units.user_length(element, name, def),
        }
    };

    Ok((resolve("width")?, resolve("height")?))
}

fn viewbox_transform(element: SvgNode, w: f32, h: f32) -> Option<Transform> {
    let size = Size::from_wh(w, h)?;
    let view_box = ViewBox {
        rect: element.parse_viewbox()?,
        aspect: element.attribute("preserveAspectRatio").unwrap_or_default(),
    };

    Some(view_box.to_transform(size))
}

/// Returns a viewport clip in the content coordinates.
fn clip_rect(element: SvgNode, w: f32, h: f32, vb_ts: Option<Transform>) -> Option<NonZeroRect> {
    // No need to clip elements with overflow:visible.
    if matches!(element.raw_attribute("overflow"), Some("visible") | Some("auto")) {
        return None;
    }

    // A nested `svg` without a size is not clipped.
    if element.has_tag_name("svg")
        && !element.is_shadow_root()
        && !(element.has_attribute("width") && element.has_attribute("height"))
    {
        return None;
    }

    let ts = match vb_ts {
        Some(ts) => ts.invert()?,
        None => return NonZeroRect::from_xywh(0.0, 0.0, w, h),
    };

    // A view box transform is a scale and a translate.
    let (x1, y1) = (ts.tx, ts.ty);
    let (x2, y2) = (ts.sx * w + ts.tx, ts.sy * h + ts.ty);
    NonZeroRect::from_ltrb(x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder, Options};
    use svgbridge_dom::Document;
    use svgbridge_gvt::NodeExt;

    fn build(text: &str) -> svgbridge_gvt::Tree {
        let mut doc = Document::parse_str(text).unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        builder::build_document(&mut ctx, &mut doc).unwrap()
    }

    #[test]
    fn root_view_box_transform() {
        let tree = build(
            "<svg xmlns='http://www.w3.org/2000/svg' width='200' height='100' viewBox='0 0 20 10'/>",
        );
        assert_eq!(tree.size, Size::from_wh(200.0, 100.0).unwrap());

        let svg = tree.root.first_child().unwrap();
        assert_eq!(svg.transform(), Transform::from_scale(10.0, 10.0));
    }

    #[test]
    fn nested_svg_viewport() {
        let tree = build(
            "<svg xmlns='http://www.w3.org/2000/svg' width='100' height='100'>
                <svg id='inner' x='10' y='20' width='50' height='50' viewBox='0 0 10 10'>
                    <rect width='100%' height='100%'/>
                </svg>
            </svg>",
        );

        let inner = tree.node_by_id("inner").unwrap();
        assert_eq!(inner.transform(), Transform::from_row(5.0, 0.0, 0.0, 5.0, 10.0, 20.0));
        match *inner.borrow() {
            NodeKind::Group(ref g) => {
                assert_eq!(g.clip_rect, NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0));
            }
            _ => panic!("a group is expected"),
        }

        // Percentages resolve against the nested view box.
        let rect = inner.first_child().unwrap();
        let bbox = rect.bounding_box().unwrap();
        assert_eq!((bbox.width(), bbox.height()), (10.0, 10.0));
    }

    #[test]
    fn switch_renders_first_valid_child() {
        let tree = build(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <switch>
                    <rect id='r1' systemLanguage='ru' width='10' height='10'/>
                    <rect id='r2' width='10' height='10'/>
                    <rect id='r3' width='10' height='10'/>
                </switch>
            </svg>",
        );

        assert!(tree.node_by_id("r1").is_none());
        assert!(tree.node_by_id("r2").is_some());
        assert!(tree.node_by_id("r3").is_none());
    }

    #[test]
    fn standalone_symbol_is_not_rendered() {
        let tree = build(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <symbol id='s'><rect width='10' height='10'/></symbol>
            </svg>",
        );
        assert!(tree.node_by_id("s").is_none());
    }
}
