// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{Group, Mask, MaskType, Node, NodeKind, NonZeroRect, Units};
use svgtypes::{Length, LengthUnit as Unit};

use super::{Bridge, Fragment, FragmentBridge};
use crate::error::OptionLog;
use crate::reference::resolve_local_link;
use crate::svgnode_ext::SvgNodeExt;
use crate::{builder, BridgeContext, BridgeError};

pub(crate) struct MaskBridge;

impl Bridge for MaskBridge {
    fn local_name(&self) -> &str {
        "mask"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for MaskBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert(ctx, element)?.map(|m| Fragment::Mask(Rc::new(m))))
    }
}

fn convert(ctx: &mut BridgeContext, element: SvgNode) -> Result<Option<Mask>, BridgeError> {
    let units = element.units("maskUnits", Units::ObjectBoundingBox)?;
    let content_units = element.units("maskContentUnits", Units::UserSpaceOnUse)?;

    let rect = NonZeroRect::from_xywh(
        ctx.units.length(element, "x", units, Length::new(-10.0, Unit::Percent))?,
        ctx.units.length(element, "y", units, Length::new(-10.0, Unit::Percent))?,
        ctx.units.length(element, "width", units, Length::new(120.0, Unit::Percent))?,
        ctx.units.length(element, "height", units, Length::new(120.0, Unit::Percent))?,
    );
    let rect = match rect.log_none(|| {
        log::warn!("Mask '{}' has an invalid size. Skipped.", element.element_id())
    }) {
        Some(v) => v,
        None => return Ok(None),
    };

    // A linked mask must be valid.
    let mask = match resolve_local_link(element, "mask")? {
        Some(link) if link.has_tag_name("mask") => match ctx.fragment(element, "mask", link)? {
            Some(Fragment::Mask(mask)) => Some(mask),
            _ => return Ok(None),
        },
        Some(_) => return Ok(None),
        None => None,
    };

    let root = Node::new(NodeKind::Group(Group::default()));
    builder::build_children(ctx, element.element_children(), &root);

    // A mask without children masks everything out.
    Ok(Some(Mask {
        id: element.element_id().to_string(),
        units,
        content_units,
        rect,
        kind: element.keyword("mask-type").unwrap_or(MaskType::Luminance),
        mask,
        root,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;

    fn mask(text: &str) -> Option<Mask> {
        let doc = Document::parse_str(text).unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let element = doc.element_by_id("m").unwrap();
        match ctx.fragment(element, "mask", element).unwrap() {
            Some(Fragment::Mask(mask)) => Some((*mask).clone()),
            _ => None,
        }
    }

    #[test]
    fn default_region() {
        let mask = mask(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m'><rect width='10' height='10' fill='white'/></mask>
            </svg>",
        )
        .unwrap();

        assert_eq!(mask.units, Units::ObjectBoundingBox);
        assert_eq!(mask.content_units, Units::UserSpaceOnUse);
        assert_eq!(mask.rect, NonZeroRect::from_xywh(-0.1, -0.1, 1.2, 1.2).unwrap());
        assert_eq!(mask.kind, MaskType::Luminance);
        assert_eq!(mask.root.children().count(), 1);
    }

    #[test]
    fn alpha_mask_with_a_nested_mask() {
        let mask = mask(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='inner'><rect width='10' height='10'/></mask>
                <mask id='m' mask-type='alpha' mask='url(#inner)' maskUnits='userSpaceOnUse'
                      x='0' y='0' width='50' height='50'>
                    <rect width='10' height='10'/>
                </mask>
            </svg>",
        )
        .unwrap();

        assert_eq!(mask.kind, MaskType::Alpha);
        assert_eq!(mask.rect, NonZeroRect::from_xywh(0.0, 0.0, 50.0, 50.0).unwrap());
        assert_eq!(mask.mask.as_ref().map(|m| m.id.as_str()), Some("inner"));
    }

    #[test]
    fn zero_sized_mask_is_skipped() {
        let mask = mask(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <mask id='m' width='0'><rect width='10' height='10'/></mask>
            </svg>",
        );
        assert!(mask.is_none());
    }
}
