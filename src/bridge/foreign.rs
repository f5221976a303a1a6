// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `foreignObject` support.
//!
//! The content of a foreign object is not SVG, so it is delegated
//! to a handler registered for the content namespace.

use std::str::FromStr;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{IsValidLength, Node, NodeKind, NonZeroRect, Units};
use svgtypes::Length;

use super::{effects, BuildStatus, Bridge, GraphicsBridge};
use crate::update::{Facet, UpdateEvent, UpdateOutcome};
use crate::{BridgeContext, BridgeError};

/// A builder of foreign content.
pub trait ForeignObjectHandler {
    /// The namespace of handled content.
    fn namespace_uri(&self) -> &str;

    /// Builds nodes for a `foreignObject` child and appends them to `parent`.
    ///
    /// `parent` is already positioned and clipped to the object's viewport.
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        parent: &Node,
    ) -> Result<(), BridgeError>;
}

/// A bridge of `foreignObject`.
pub(crate) struct ForeignObjectBridge;

impl Bridge for ForeignObjectBridge {
    fn local_name(&self) -> &str {
        "foreignObject"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for ForeignObjectBridge {
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        let (w, h) = size(ctx, element)?;
        if !w.is_valid_length() || !h.is_valid_length() {
            return Ok(BuildStatus::Suppressed);
        }

        let content = match element.first_element_child() {
            Some(v) => v,
            None => return Ok(BuildStatus::Suppressed),
        };

        let x = ctx.units.user_length(element, "x", Length::zero())?;
        let y = ctx.units.user_length(element, "y", Length::zero())?;
        {
            let mut kind = node.borrow_mut();
            let ts = kind.transform().pre_translate(x, y);
            kind.set_transform(ts);
            if let NodeKind::Group(ref mut g) = *kind {
                g.clip_rect = NonZeroRect::from_xywh(0.0, 0.0, w, h);
            }
        }

        let ns = content.namespace().unwrap_or_default();
        match ctx.foreign_handler(ns) {
            Some(handler) => handler.build(ctx, content, node)?,
            None => {
                log::warn!("No handler for '{}' content of a 'foreignObject'. Skipped.", ns);
            }
        }

        Ok(BuildStatus::Built)
    }

    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        let (name, prev) = match event {
            UpdateEvent::Attribute { name, prev, .. } => (name.as_str(), prev.as_deref()),
            _ => return effects::update_common(ctx, element, node, event, false),
        };

        match name {
            "width" | "height" => {
                // Compare resolved values, so `10` and `10px` are the same.
                let old = prev.and_then(|v| svgtypes::Length::from_str(v).ok());
                let new = element.attribute::<Length>(name);
                match (old, new) {
                    (Some(old), Some(new)) => {
                        let old = ctx.units.convert_user_length(old, element, name);
                        let new = ctx.units.convert_user_length(new, element, name);
                        if old == new {
                            Ok(UpdateOutcome::Unchanged)
                        } else {
                            Ok(UpdateOutcome::Rebuild)
                        }
                    }
                    _ => Ok(UpdateOutcome::Rebuild),
                }
            }
            "x" | "y" | "transform" => Ok(UpdateOutcome::Rebuild),
            _ => match effects::update_common(ctx, element, node, event, false)? {
                // Foreign content is opaque.
                UpdateOutcome::Updated(Facet::Visibility) => Ok(UpdateOutcome::Rebuild),
                outcome => Ok(outcome),
            },
        }
    }
}

fn size(ctx: &BridgeContext, element: SvgNode) -> Result<(f32, f32), BridgeError> {
    let w = ctx.units.required_length(element, "width", Units::UserSpaceOnUse)?;
    let h = ctx.units.required_length(element, "height", Units::UserSpaceOnUse)?;
    for (name, value) in [("width", w), ("height", h)] {
        if value < 0.0 {
            let raw = element.raw_attribute(name).unwrap_or_default();
            return Err(BridgeError::illegal_value(element, name, raw));
        }
    }

    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{builder, Options};
    use svgbridge_dom::Document;
    use svgbridge_gvt::{NodeExt, Shape};

    const XHTML: &str = "http://www.w3.org/1999/xhtml";

    struct BoxHandler;

    impl ForeignObjectHandler for BoxHandler {
        fn namespace_uri(&self) -> &str {
            XHTML
        }

        fn build(&self, _: &mut BridgeContext, _: SvgNode, parent: &Node) -> Result<(), BridgeError> {
            parent.append(Node::new(NodeKind::Shape(Shape::default())));
            Ok(())
        }
    }

    #[test]
    fn content_is_built_by_a_handler() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <foreignObject id='f' x='10' y='20' width='30' height='40'>
                    <div xmlns='http://www.w3.org/1999/xhtml'>text</div>
                </foreignObject>
                <foreignObject id='empty' width='30' height='40'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        ctx.register_foreign_handler(Rc::new(BoxHandler));
        let tree = builder::build_document(&mut ctx, &mut doc).unwrap();

        let node = tree.node_by_id("f").unwrap();
        assert_eq!(node.children().count(), 1);
        assert_eq!(node.transform(), svgbridge_gvt::Transform::from_translate(10.0, 20.0));
        assert!(tree.node_by_id("empty").is_none());
    }

    #[test]
    fn width_is_required() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <foreignObject height='40'><div xmlns='http://www.w3.org/1999/xhtml'/></foreignObject>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        builder::build_document(&mut ctx, &mut doc).unwrap();

        assert_eq!(ctx.errors()[0].code(), "attribute.missing");
        assert_eq!(ctx.errors()[0].attribute(), Some("width"));
    }
}
