// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{ClipPath, Group, Node, NodeKind, Units};

use super::{shapes, Bridge, Fragment, FragmentBridge};
use crate::reference::resolve_local_link;
use crate::svgnode_ext::SvgNodeExt;
use crate::{builder, BridgeContext, BridgeError};

pub(crate) struct ClipPathBridge;

impl Bridge for ClipPathBridge {
    fn local_name(&self) -> &str {
        "clipPath"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for ClipPathBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert(ctx, element)?.map(|c| Fragment::ClipPath(Rc::new(c))))
    }
}

fn convert(ctx: &mut BridgeContext, element: SvgNode) -> Result<Option<ClipPath>, BridgeError> {
    // The whole clip path should be ignored when a transform is invalid.
    let transform = match element.parse_transform("transform")? {
        Some(ts) => ts,
        None => {
            log::warn!("Clip path '{}' has an invalid transform. Skipped.", element.element_id());
            return Ok(None);
        }
    };

    // A linked clip path must be valid.
    let clip_path = match resolve_local_link(element, "clip-path")? {
        Some(link) if link.has_tag_name("clipPath") => {
            match ctx.fragment(element, "clip-path", link)? {
                Some(Fragment::ClipPath(clip)) => Some(clip),
                _ => return Ok(None),
            }
        }
        Some(_) => return Ok(None),
        None => None,
    };

    let root = Node::new(NodeKind::Group(Group::default()));
    let children = element.element_children().filter(|n| is_clip_child(*n));

    let in_clip_path = std::mem::replace(&mut ctx.in_clip_path, true);
    builder::build_children(ctx, children, &root);
    ctx.in_clip_path = in_clip_path;

    // A clip path without children clips everything out.
    Ok(Some(ClipPath {
        id: element.element_id().to_string(),
        units: element.units("clipPathUnits", Units::UserSpaceOnUse)?,
        transform,
        clip_path,
        root,
    }))
}

fn is_clip_child(node: SvgNode) -> bool {
    match node.tag_name() {
        Some("text") | Some("use") => true,
        Some(name) => shapes::SHAPES.contains(&name),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;
    use svgbridge_gvt::NodeExt;

    fn clip_path(text: &str, id: &str) -> Result<Option<ClipPath>, BridgeError> {
        let doc = Document::parse_str(text).unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let element = doc.element_by_id(id).unwrap();
        match ctx.fragment(element, "clip-path", element)? {
            Some(Fragment::ClipPath(clip)) => Ok(Some((*clip).clone())),
            _ => Ok(None),
        }
    }

    #[test]
    fn only_shapes_contribute() {
        let clip = clip_path(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c' clipPathUnits='objectBoundingBox'>
                    <rect width='1' height='1' fill='red' stroke='blue'/>
                    <g><rect width='1' height='1'/></g>
                    <image width='1' height='1'/>
                </clipPath>
            </svg>",
            "c",
        )
        .unwrap()
        .unwrap();

        assert_eq!(clip.units, Units::ObjectBoundingBox);
        assert_eq!(clip.root.children().count(), 1);

        let rect = clip.root.first_child().unwrap();
        match *rect.borrow() {
            NodeKind::Shape(ref shape) => assert!(shape.stroke.is_none()),
            _ => panic!("a shape is expected"),
        };
        assert!(rect.bounding_box().is_some());
    }

    #[test]
    fn invalid_transform_disables_clip_path() {
        let clip = clip_path(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c' transform='scale(0)'><rect width='1' height='1'/></clipPath>
            </svg>",
            "c",
        )
        .unwrap();
        assert!(clip.is_none());
    }

    #[test]
    fn self_reference_is_circular() {
        let err = clip_path(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <clipPath id='c' clip-path='url(#c)'><rect width='1' height='1'/></clipPath>
            </svg>",
            "c",
        )
        .unwrap_err();
        assert_eq!(err.code(), "xlink.href.circularDependencies");
    }
}
