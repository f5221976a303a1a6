// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;
use std::str::FromStr;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::tiny_skia_path::{self, Path, PathBuilder};
use svgbridge_gvt::{
    ApproxEqUlps, Node, NodeExt, NodeKind, PaintOrder, Rect, Shape, ShapeRendering, Units,
    Visibility,
};
use svgtypes::Length;

use super::{effects, marker, BuildStatus, Bridge, GraphicsBridge};
use crate::svgnode_ext::SvgNodeExt;
use crate::update::{Facet, UpdateEvent, UpdateOutcome};
use crate::{style, BridgeContext, BridgeError};

pub(crate) const SHAPES: [&str; 7] = [
    "rect", "circle", "ellipse", "line", "polyline", "polygon", "path",
];

/// A bridge of a basic shape or a path.
pub(crate) struct ShapeBridge(pub &'static str);

impl Bridge for ShapeBridge {
    fn local_name(&self) -> &str {
        self.0
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for ShapeBridge {
    fn create_node(&self, element: SvgNode) -> Node {
        Node::new(NodeKind::Shape(Shape {
            id: element.element_id().to_string(),
            ..Shape::default()
        }))
    }

    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        let path = convert(ctx, element)?;
        let has_bbox = path.as_deref().map(has_bbox).unwrap_or(false);

        let fill = style::resolve_fill(ctx, element, has_bbox);
        let stroke = style::resolve_stroke(ctx, element, has_bbox);
        let markers = match path {
            Some(ref path) if !ctx.in_clip_path && marker::is_valid(element) => {
                marker::resolve_markers(ctx, element, path, stroke.as_ref())
            }
            _ => None,
        };

        let rendering_mode = element
            .find_keyword::<ShapeRendering>("shape-rendering")
            .unwrap_or(ctx.opt.shape_rendering);

        if let NodeKind::Shape(ref mut shape) = *node.borrow_mut() {
            shape.visibility = element.find_keyword::<Visibility>("visibility").unwrap_or_default();
            shape.fill = fill;
            shape.stroke = stroke;
            shape.markers = markers;
            shape.paint_order = paint_order(element);
            shape.rendering_mode = rendering_mode;
            shape.shape = path;
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
        let name = match event {
            UpdateEvent::Attribute { name, .. } => name.as_str(),
            UpdateEvent::Style { properties } if properties.iter().any(|p| p == "paint-order") => {
                "paint-order"
            }
            _ => return effects::update_common(ctx, element, node, event, false),
        };

        if is_geometry_attribute(self.0, name) {
            let has_markers = matches!(*node.borrow(), NodeKind::Shape(ref s) if s.markers.is_some());
            if has_markers {
                return Ok(UpdateOutcome::Rebuild);
            }

            let path = convert(ctx, element)?;
            let had_bbox = node.bounding_box().map(|r| has_rect_area(&r)).unwrap_or(false);
            let now_has_bbox = path.as_deref().map(has_bbox).unwrap_or(false);
            node.set_shape(path);

            // `objectBoundingBox` paint servers depend on the bbox presence.
            if had_bbox != now_has_bbox {
                effects::update_paint(ctx, element, node);
            }

            return Ok(UpdateOutcome::Updated(Facet::Shape));
        }

        match name {
            "paint-order" => {
                let order = paint_order(element);
                if let NodeKind::Shape(ref mut shape) = *node.borrow_mut() {
                    shape.paint_order = order;
                }

                Ok(UpdateOutcome::Updated(Facet::Paint))
            }
            "marker-start" | "marker-mid" | "marker-end" => Ok(UpdateOutcome::Rebuild),
            _ => effects::update_common(ctx, element, node, event, false),
        }
    }
}

fn is_geometry_attribute(tag_name: &str, name: &str) -> bool {
    match tag_name {
        "rect" => matches!(name, "x" | "y" | "width" | "height" | "rx" | "ry"),
        "circle" => matches!(name, "cx" | "cy" | "r"),
        "ellipse" => matches!(name, "cx" | "cy" | "rx" | "ry"),
        "line" => matches!(name, "x1" | "y1" | "x2" | "y2"),
        "polyline" | "polygon" => name == "points",
        "path" => name == "d",
        _ => false,
    }
}

fn has_bbox(path: &Path) -> bool {
    has_rect_area(&path.bounds())
}

fn has_rect_area(r: &Rect) -> bool {
    r.width() > 0.0 && r.height() > 0.0
}

fn paint_order(element: SvgNode) -> PaintOrder {
    let value = element
        .ancestors()
        .find(|n| n.has_attribute("paint-order"))
        .and_then(|n| n.raw_attribute("paint-order"));
    let order = match value.map(svgtypes::PaintOrder::from_str) {
        Some(Ok(v)) => v,
        _ => return PaintOrder::default(),
    };

    match (order.order[0], order.order[1]) {
        (svgtypes::PaintOrderKind::Stroke, _)
        | (svgtypes::PaintOrderKind::Markers, svgtypes::PaintOrderKind::Stroke) => {
            PaintOrder::StrokeAndFill
        }
        _ => PaintOrder::FillAndStroke,
    }
}

/// Converts shape geometry.
///
/// `Ok(None)` means that rendering is disabled.
pub(crate) fn convert(ctx: &BridgeContext, node: SvgNode) -> Result<Option<Rc<Path>>, BridgeError> {
    match node.tag_name().unwrap_or_default() {
        "rect" => convert_rect(ctx, node),
        "circle" => convert_circle(ctx, node),
        "ellipse" => convert_ellipse(ctx, node),
        "line" => convert_line(ctx, node),
        "polyline" => Ok(convert_polyline(node)),
        "polygon" => Ok(convert_polygon(node)),
        "path" => Ok(convert_path(node)),
        _ => Ok(None),
    }
}

pub(crate) fn convert_path(node: SvgNode) -> Option<Rc<Path>> {
    let value: &str = node.attribute("d")?;
    let mut builder = PathBuilder::new();
    for segment in svgtypes::SimplifyingPathParser::from(value) {
        let segment = match segment {
            Ok(v) => v,
            Err(_) => break,
        };

        match segment {
            svgtypes::SimplePathSegment::MoveTo { x, y } => {
                builder.move_to(x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::LineTo { x, y } => {
                builder.line_to(x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::Quadratic { x1, y1, x, y } => {
                builder.quad_to(x1 as f32, y1 as f32, x as f32, y as f32);
            }
            svgtypes::SimplePathSegment::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x,
                y,
            } => {
                builder.cubic_to(
                    x1 as f32, y1 as f32, x2 as f32, y2 as f32, x as f32, y as f32,
                );
            }
            svgtypes::SimplePathSegment::ClosePath => {
                builder.close();
            }
        }
    }

    builder.finish().map(Rc::new)
}

/// Resolves a required non-negative length.
///
/// A zero value is valid, it disables rendering.
fn non_negative_length(ctx: &BridgeContext, node: SvgNode, name: &str) -> Result<f32, BridgeError> {
    let n = ctx.units.required_length(node, name, Units::UserSpaceOnUse)?;
    if n.is_sign_negative() && n != 0.0 {
        let value = node.raw_attribute(name).unwrap_or_default();
        return Err(BridgeError::illegal_value(node, name, value));
    }

    Ok(n)
}

fn convert_rect(ctx: &BridgeContext, node: SvgNode) -> Result<Option<Rc<Path>>, BridgeError> {
    let width = non_negative_length(ctx, node, "width")?;
    let height = non_negative_length(ctx, node, "height")?;
    let (mut rx, mut ry) = resolve_rx_ry(ctx, node)?;

    // 'width' and 'height' attributes must be positive and non-zero.
    if width.approx_eq_ulps(&0.0, 4) || height.approx_eq_ulps(&0.0, 4) {
        log::warn!("Rect '{}' has a zero size. Rendering is disabled.", node.element_id());
        return Ok(None);
    }

    let x = ctx.units.user_length(node, "x", Length::zero())?;
    let y = ctx.units.user_length(node, "y", Length::zero())?;

    // Clamp rx/ry to the half of the width/height.
    //
    // Should be done only after resolving.
    if rx > width / 2.0 {
        rx = width / 2.0;
    }
    if ry > height / 2.0 {
        ry = height / 2.0;
    }

    // Conversion according to https://www.w3.org/TR/SVG11/shapes.html#RectElement
    let path = if rx.approx_eq_ulps(&0.0, 4) || ry.approx_eq_ulps(&0.0, 4) {
        Rect::from_xywh(x, y, width, height).map(PathBuilder::from_rect)
    } else {
        let mut builder = PathBuilder::new();
        builder.move_to(x + rx, y);

        builder.line_to(x + width - rx, y);
        builder.arc_to(rx, ry, 0.0, false, true, x + width, y + ry);

        builder.line_to(x + width, y + height - ry);
        builder.arc_to(rx, ry, 0.0, false, true, x + width - rx, y + height);

        builder.line_to(x + rx, y + height);
        builder.arc_to(rx, ry, 0.0, false, true, x, y + height - ry);

        builder.line_to(x, y + ry);
        builder.arc_to(rx, ry, 0.0, false, true, x + rx, y);

        builder.close();

        builder.finish()
    };

    Ok(path.map(Rc::new))
}

// An absent radius takes the value of the other one.
fn resolve_rx_ry(ctx: &BridgeContext, node: SvgNode) -> Result<(f32, f32), BridgeError> {
    let resolve = |name: &str| -> Result<Option<f32>, BridgeError> {
        if !node.has_attribute(name) {
            return Ok(None);
        }

        non_negative_length(ctx, node, name).map(Some)
    };

    let rx = resolve("rx")?;
    let ry = resolve("ry")?;
    Ok(match (rx, ry) {
        (None, None) => (0.0, 0.0),
        (Some(rx), None) => (rx, rx),
        (None, Some(ry)) => (ry, ry),
        (Some(rx), Some(ry)) => (rx, ry),
    })
}

fn convert_line(ctx: &BridgeContext, node: SvgNode) -> Result<Option<Rc<Path>>, BridgeError> {
    let x1 = ctx.units.user_length(node, "x1", Length::zero())?;
    let y1 = ctx.units.user_length(node, "y1", Length::zero())?;
    let x2 = ctx.units.user_length(node, "x2", Length::zero())?;
    let y2 = ctx.units.user_length(node, "y2", Length::zero())?;

    let mut builder = PathBuilder::new();
    builder.move_to(x1, y1);
    builder.line_to(x2, y2);
    Ok(builder.finish().map(Rc::new))
}

fn convert_polyline(node: SvgNode) -> Option<Rc<Path>> {
    let builder = points_to_path(node, "Polyline")?;
    builder.finish().map(Rc::new)
}

fn convert_polygon(node: SvgNode) -> Option<Rc<Path>> {
    let mut builder = points_to_path(node, "Polygon")?;
    builder.close();
    builder.finish().map(Rc::new)
}

fn points_to_path(node: SvgNode, eid: &str) -> Option<PathBuilder> {
    use svgtypes::PointsParser;

    let mut builder = PathBuilder::new();
    match node.attribute::<&str>("points") {
        Some(text) => {
            for (x, y) in PointsParser::from(text) {
                if builder.is_empty() {
                    builder.move_to(x as f32, y as f32);
                } else {
                    builder.line_to(x as f32, y as f32);
                }
            }
        }
        _ => {
            log::warn!(
                "{} '{}' has an invalid 'points' value. Skipped.",
                eid,
                node.element_id()
            );
            return None;
        }
    };

    // 'polyline' and 'polygon' elements must contain at least 2 points.
    if builder.len() < 2 {
        log::warn!(
            "{} '{}' has less than 2 points. Skipped.",
            eid,
            node.element_id()
        );
        return None;
    }

    Some(builder)
}

fn convert_circle(ctx: &BridgeContext, node: SvgNode) -> Result<Option<Rc<Path>>, BridgeError> {
    let r = non_negative_length(ctx, node, "r")?;
    if r.approx_eq_ulps(&0.0, 4) {
        log::warn!("Circle '{}' has a zero radius. Rendering is disabled.", node.element_id());
        return Ok(None);
    }

    let cx = ctx.units.user_length(node, "cx", Length::zero())?;
    let cy = ctx.units.user_length(node, "cy", Length::zero())?;
    Ok(ellipse_to_path(cx, cy, r, r))
}

fn convert_ellipse(ctx: &BridgeContext, node: SvgNode) -> Result<Option<Rc<Path>>, BridgeError> {
    let rx = non_negative_length(ctx, node, "rx")?;
    let ry = non_negative_length(ctx, node, "ry")?;
    if rx.approx_eq_ulps(&0.0, 4) || ry.approx_eq_ulps(&0.0, 4) {
        log::warn!("Ellipse '{}' has a zero radius. Rendering is disabled.", node.element_id());
        return Ok(None);
    }

    let cx = ctx.units.user_length(node, "cx", Length::zero())?;
    let cy = ctx.units.user_length(node, "cy", Length::zero())?;
    Ok(ellipse_to_path(cx, cy, rx, ry))
}

fn ellipse_to_path(cx: f32, cy: f32, rx: f32, ry: f32) -> Option<Rc<Path>> {
    let mut builder = PathBuilder::new();
    builder.move_to(cx + rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy + ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx - rx, cy);
    builder.arc_to(rx, ry, 0.0, false, true, cx, cy - ry);
    builder.arc_to(rx, ry, 0.0, false, true, cx + rx, cy);
    builder.close();
    builder.finish().map(Rc::new)
}

trait PathBuilderExt {
    #[allow(clippy::too_many_arguments)]
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    );
}

impl PathBuilderExt for tiny_skia_path::PathBuilder {
    fn arc_to(
        &mut self,
        rx: f32,
        ry: f32,
        x_axis_rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    ) {
        let prev = match self.last_point() {
            Some(v) => v,
            None => return,
        };

        let svg_arc = kurbo::SvgArc {
            from: kurbo::Point::new(prev.x as f64, prev.y as f64),
            to: kurbo::Point::new(x as f64, y as f64),
            radii: kurbo::Vec2::new(rx as f64, ry as f64),
            x_rotation: (x_axis_rotation as f64).to_radians(),
            large_arc,
            sweep,
        };

        match kurbo::Arc::from_svg_arc(&svg_arc) {
            Some(arc) => {
                arc.to_cubic_beziers(0.1, |p1, p2, p| {
                    self.cubic_to(
                        p1.x as f32,
                        p1.y as f32,
                        p2.x as f32,
                        p2.y as f32,
                        p.x as f32,
                        p.y as f32,
                    );
                });
            }
            None => {
                self.line_to(x, y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;

    fn shape(text: &str) -> Result<Option<Rc<Path>>, BridgeError> {
        let doc = Document::parse_str(text).unwrap();
        let ctx = BridgeContext::new(Options::default());
        let node = doc.element_by_id("s").unwrap();
        convert(&ctx, node)
    }

    #[test]
    fn rounded_rect_radii_are_clamped() {
        let path = shape(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <rect id='s' width='10' height='20' rx='50'/>
            </svg>",
        )
        .unwrap()
        .unwrap();
        let bounds = path.bounds();
        assert!((bounds.width() - 10.0).abs() < 0.01);
        assert!((bounds.height() - 20.0).abs() < 0.01);
    }

    #[test]
    fn negative_radius_is_illegal() {
        let err = shape(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <ellipse id='s' rx='-1' ry='5'/>
            </svg>",
        )
        .unwrap_err();
        assert_eq!(err.code(), "attribute.illegal");
        assert_eq!(err.attribute(), Some("rx"));
    }

    #[test]
    fn malformed_center_is_an_error() {
        let err = shape(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <circle id='s' cx='abc' r='5'/>
            </svg>",
        )
        .unwrap_err();
        assert_eq!(err.code(), "attribute.malformed");
        assert_eq!(err.attribute(), Some("cx"));
    }

    #[test]
    fn polyline_needs_two_points() {
        let path = shape(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <polyline id='s' points='10 10'/>
            </svg>",
        )
        .unwrap();
        assert!(path.is_none());
    }

    #[test]
    fn geometry_attributes() {
        assert!(is_geometry_attribute("circle", "r"));
        assert!(!is_geometry_attribute("circle", "fill"));
        assert!(is_geometry_attribute("path", "d"));
    }
}
