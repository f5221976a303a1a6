// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use svgbridge_dom::{Document, SvgNode};
use svgbridge_gvt::{
    Effects, Image, ImageFormat, ImageKind, ImageRendering, Node, NodeKind, NonZeroRect,
    Size, Transform, Units, ViewBox, Visibility,
};
use url::Url;

use super::{effects, BuildStatus, Bridge, GraphicsBridge};
use crate::error::OptionLog;
use crate::loader::ResourceData;
use crate::reference::{absolute_url, document_url};
use crate::svgnode_ext::SvgNodeExt;
use crate::update::{UpdateEvent, UpdateOutcome};
use crate::{builder, BridgeContext, BridgeError, Options, ResourceKind, SecurityPolicy};

/// A bridge of `image`.
pub(crate) struct ImageBridge;

impl Bridge for ImageBridge {
    fn local_name(&self) -> &str {
        "image"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for ImageBridge {
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        let x = ctx.units.user_length(element, "x", svgtypes::Length::zero())?;
        let y = ctx.units.user_length(element, "y", svgtypes::Length::zero())?;
        let width = ctx.units.required_length(element, "width", Units::UserSpaceOnUse)?;
        let height = ctx.units.required_length(element, "height", Units::UserSpaceOnUse)?;

        for (name, value) in [("width", width), ("height", height)] {
            if value < 0.0 {
                let raw = element.raw_attribute(name).unwrap_or_default();
                return Err(BridgeError::illegal_value(element, name, raw));
            }
        }

        // A zero size disables rendering.
        let rect = match NonZeroRect::from_xywh(x, y, width, height) {
            Some(v) => v,
            None => return Ok(BuildStatus::Suppressed),
        };

        let href = element
            .raw_attribute("href")
            .ok_or_else(|| BridgeError::missing_attribute(element, "href"))?;

        let view_box = ViewBox {
            rect,
            aspect: element.attribute("preserveAspectRatio").unwrap_or_default(),
        };

        let (kind, size) = load(ctx, element, href)?;
        if let ImageKind::Svg(ref root) = kind {
            let content = ViewBox {
                rect: size.to_non_zero_rect(0.0, 0.0),
                aspect: view_box.aspect,
            };
            let ts = Transform::from_translate(x, y).pre_concat(content.to_transform(rect.size()));
            root.borrow_mut().set_transform(ts);
        }

        let (uid, transform) = {
            let k = node.borrow();
            (k.uid(), k.transform())
        };

        *node.borrow_mut() = NodeKind::Image(Image {
            uid,
            id: element.element_id().to_string(),
            transform,
            effects: Effects::default(),
            visibility: element.find_keyword::<Visibility>("visibility").unwrap_or_default(),
            view_box,
            rendering_mode: element
                .find_keyword::<ImageRendering>("image-rendering")
                .unwrap_or(ctx.opt.image_rendering),
            kind,
        });

        Ok(BuildStatus::Built)
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
                "x" | "y" | "width" | "height" | "href" | "preserveAspectRatio"
                | "image-rendering" => Ok(UpdateOutcome::Rebuild),
                _ => effects::update_common(ctx, element, node, event, false),
            },
            _ => effects::update_common(ctx, element, node, event, false),
        }
    }
}

/// Loads an image referenced by an `href` value.
///
/// Raster images are not decoded, only their size is sniffed.
pub(crate) fn load_href(
    ctx: &mut BridgeContext,
    element: SvgNode,
    href: &str,
) -> Result<ImageKind, BridgeError> {
    load(ctx, element, href).map(|(kind, _)| kind)
}

fn load(
    ctx: &mut BridgeContext,
    element: SvgNode,
    href: &str,
) -> Result<(ImageKind, Size), BridgeError> {
    let href = href.trim();
    let doc = element.document();
    let broken = || BridgeError::broken_reference(element, "href", href);

    let url = absolute_url(doc, href, &ctx.opt).ok_or_else(broken)?;

    if let Err(e) =
        ctx.user_agent
            .check_load_external_resource(ResourceKind::Image, &url, document_url(doc, &ctx.opt).as_ref())
    {
        log::warn!("{}", e);
        return Err(BridgeError::security_denied(element, "href", href));
    }

    if ctx.user_agent.is_interrupted() {
        return Err(BridgeError::Interrupted);
    }

    let resource = ctx.loader.load_data(&url).map_err(|e| {
        log::warn!("Failed to load '{}' cause {}.", href, e);
        broken()
    })?;

    if is_svg(&url, &resource) {
        return load_sub_svg(&resource.data, &ctx.opt)
            .log_none(|| log::warn!("Failed to load subsvg image."))
            .ok_or_else(broken);
    }

    let format = match imagesize::image_type(&resource.data).ok() {
        Some(imagesize::ImageType::Png) => ImageFormat::PNG,
        Some(imagesize::ImageType::Jpeg) => ImageFormat::JPEG,
        Some(imagesize::ImageType::Gif) => ImageFormat::GIF,
        Some(imagesize::ImageType::Webp) => ImageFormat::WEBP,
        _ => {
            log::warn!("'{}' is not a PNG, JPEG, GIF, WebP or SVG(Z) image.", href);
            return Err(broken());
        }
    };

    let size = imagesize::blob_size(&resource.data)
        .ok()
        .and_then(|size| Size::from_wh(size.width as f32, size.height as f32))
        .log_none(|| log::warn!("Image has an invalid size. Skipped."))
        .ok_or_else(broken)?;

    let kind = ImageKind::Raster {
        format,
        size,
        data: Arc::new(resource.data),
    };

    Ok((kind, size))
}

fn is_svg(url: &Url, resource: &ResourceData) -> bool {
    match resource.mime.as_deref() {
        Some("image/svg+xml") => return true,
        Some(mime) if mime != "text/plain" => return false,
        _ => {}
    }

    let path = url.path().to_lowercase();
    if path.ends_with(".svg") || path.ends_with(".svgz") {
        return true;
    }

    let first = resource.data.iter().find(|c| !c.is_ascii_whitespace());
    resource.data.starts_with(&[0x1f, 0x8b]) || first == Some(&b'<')
}

/// Builds an SVG image in a separate context.
///
/// Like in browsers, the referenced SVG image cannot load any external resources by itself.
fn load_sub_svg(data: &[u8], opt: &Options) -> Option<(ImageKind, Size)> {
    let mut doc = Document::from_data(data).ok()?;

    let sub_opt = Options {
        resources_dir: None,
        dpi: opt.dpi,
        font_family: opt.font_family.clone(),
        font_size: opt.font_size,
        languages: opt.languages.clone(),
        shape_rendering: opt.shape_rendering,
        image_rendering: opt.image_rendering,
        default_size: opt.default_size,
        security: SecurityPolicy::NoExternal,
        max_reference_depth: opt.max_reference_depth,
        ..Options::default()
    };

    let mut ctx = BridgeContext::new(sub_opt);
    let tree = builder::build_document(&mut ctx, &mut doc).ok()?;
    Some((ImageKind::Svg(tree.root), tree.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgbridge_gvt::NodeExt;

    // A 1x1 PNG.
    const PNG: &str = "data:image/png;base64,\
        iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    fn build(text: &str) -> (svgbridge_gvt::Tree, BridgeContext) {
        let mut doc = Document::parse_str(text).unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let tree = builder::build_document(&mut ctx, &mut doc).unwrap();
        (tree, ctx)
    }

    #[test]
    fn embedded_raster_image() {
        let text = format!(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <image id='i' x='5' y='5' width='20' height='10' xlink:href='{}'/>
            </svg>",
            PNG
        );
        let (tree, _) = build(&text);

        let node = tree.node_by_id("i").unwrap();
        match *node.borrow() {
            NodeKind::Image(ref img) => {
                assert_eq!(img.view_box.rect, NonZeroRect::from_xywh(5.0, 5.0, 20.0, 10.0).unwrap());
                match img.kind {
                    ImageKind::Raster { format, size, .. } => {
                        assert_eq!(format, ImageFormat::PNG);
                        assert_eq!(size, Size::from_wh(1.0, 1.0).unwrap());
                    }
                    _ => panic!("a raster image is expected"),
                }
            }
            _ => panic!("an image is expected"),
        }
        assert!(node.bounding_box().is_some());
    }

    #[test]
    fn nested_svg_image() {
        let text = "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <image id='i' width='20' height='20' xlink:href=\"data:image/svg+xml;utf8,\
                &lt;svg xmlns='http://www.w3.org/2000/svg' width='10' height='10'>\
                &lt;rect width='10' height='10'/>&lt;/svg>\"/>
            </svg>";
        let (tree, _) = build(text);

        let node = tree.node_by_id("i").unwrap();
        match *node.borrow() {
            NodeKind::Image(ref img) => match img.kind {
                ImageKind::Svg(ref root) => {
                    assert_eq!(root.transform(), Transform::from_scale(2.0, 2.0));
                }
                _ => panic!("an SVG image is expected"),
            },
            _ => panic!("an image is expected"),
        };
    }

    #[test]
    fn size_is_required() {
        let text = format!(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <image id='i' width='20' xlink:href='{}'/>
                <image id='j' width='0' height='10' xlink:href='{}'/>
            </svg>",
            PNG, PNG
        );
        let (tree, ctx) = build(&text);

        assert!(tree.node_by_id("i").is_none());
        assert!(tree.node_by_id("j").is_none());
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].code(), "attribute.missing");
        assert_eq!(ctx.errors()[0].attribute(), Some("height"));
    }

    #[test]
    fn external_image_is_denied_without_an_origin() {
        let (tree, ctx) = build(
            "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
                <image id='i' width='20' height='20' xlink:href='http://example.com/a.png'/>
            </svg>",
        );

        assert_eq!(ctx.errors()[0].code(), "uri.unsecure");
        // Replaced by a placeholder.
        assert!(tree.node_by_id("i").is_some());
    }
}
