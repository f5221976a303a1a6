// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{
    ApproxEqUlps, Color, Fill, FillRule, LineCap, LineJoin, Opacity, Paint, Stroke,
    StrokeMiterlimit, StrokeWidth, Units,
};

use crate::bridge::{Fragment, ServerOrColor};
use crate::svgnode_ext::{is_paint_server, SvgColorExt, SvgNodeExt};
use crate::{reference, BridgeContext, BridgeError, ResourceKind};

/// Resolves the `fill` of a shape.
///
/// `has_bbox` tells whether the shape has a non-zero bounding box,
/// which `objectBoundingBox` paint servers require.
pub(crate) fn resolve_fill(ctx: &mut BridgeContext, node: SvgNode, has_bbox: bool) -> Option<Fill> {
    if ctx.in_clip_path {
        // A `clipPath` child can be filled only with a black color.
        return Some(Fill {
            paint: Paint::Color(Color::black()),
            opacity: Opacity::ONE,
            rule: node.find_keyword("clip-rule").unwrap_or_default(),
        });
    }

    let mut sub_opacity = Opacity::ONE;
    let paint = if let Some(n) = node.ancestors().find(|n| n.has_attribute("fill")) {
        convert_paint(ctx, node, n, "fill", has_bbox, &mut sub_opacity)?
    } else {
        Paint::Color(Color::black())
    };

    let fill_opacity = node
        .ancestors()
        .find(|n| n.has_attribute("fill-opacity"))
        .and_then(|n| n.opacity("fill-opacity"))
        .unwrap_or(Opacity::ONE);

    Some(Fill {
        paint,
        opacity: sub_opacity * fill_opacity,
        rule: node.find_keyword::<FillRule>("fill-rule").unwrap_or_default(),
    })
}

/// Resolves the `stroke` of a shape.
pub(crate) fn resolve_stroke(
    ctx: &mut BridgeContext,
    node: SvgNode,
    has_bbox: bool,
) -> Option<Stroke> {
    if ctx.in_clip_path {
        // A `clipPath` child cannot be stroked.
        return None;
    }

    let mut sub_opacity = Opacity::ONE;
    let paint = if let Some(n) = node.ancestors().find(|n| n.has_attribute("stroke")) {
        convert_paint(ctx, node, n, "stroke", has_bbox, &mut sub_opacity)?
    } else {
        return None;
    };

    let width = ctx.units.resolve_length(node, "stroke-width", 1.0);
    let width = StrokeWidth::new(width)?;

    // Must be bigger than 1.
    let miterlimit = node.find_attribute("stroke-miterlimit").unwrap_or(4.0);
    let miterlimit = if miterlimit < 1.0 { 1.0 } else { miterlimit };
    let miterlimit = StrokeMiterlimit::new(miterlimit);

    let stroke_opacity = node
        .ancestors()
        .find(|n| n.has_attribute("stroke-opacity"))
        .and_then(|n| n.opacity("stroke-opacity"))
        .unwrap_or(Opacity::ONE);

    Some(Stroke {
        paint,
        dasharray: conv_dasharray(ctx, node),
        dashoffset: ctx.units.resolve_length(node, "stroke-dashoffset", 0.0),
        miterlimit,
        opacity: sub_opacity * stroke_opacity,
        width,
        linecap: node.find_keyword::<LineCap>("stroke-linecap").unwrap_or_default(),
        linejoin: node.find_keyword::<LineJoin>("stroke-linejoin").unwrap_or_default(),
    })
}

// `shape` is the element being painted, `node` is the one that defines the paint.
fn convert_paint(
    ctx: &mut BridgeContext,
    shape: SvgNode,
    node: SvgNode,
    name: &str,
    has_bbox: bool,
    opacity: &mut Opacity,
) -> Option<Paint> {
    let value: &str = node.raw_attribute(name)?;
    let on_error = || {
        if name == "fill" {
            log::warn!("Failed to parse fill value: '{}'. Fallback to black.", value);
            Some(Paint::Color(Color::black()))
        } else {
            log::warn!("Failed to parse stroke value: '{}'. Fallback to no stroke.", value);
            None
        }
    };

    // `svgtypes` understands only same-document links.
    if let Some((uri, tail)) = reference::split_func_iri(value) {
        let fallback = match convert_fallback(tail) {
            Some(v) => v,
            None => return on_error(),
        };
        let server = PaintServerRef { shape, node, name, uri, fallback, has_bbox };
        return convert_paint_server(ctx, server, opacity);
    }

    let paint = match svgtypes::Paint::from_str(value) {
        Ok(v) => v,
        Err(_) => return on_error(),
    };

    match paint {
        svgtypes::Paint::None => None,
        svgtypes::Paint::Inherit => None, // already resolved by the DOM
        svgtypes::Paint::ContextFill | svgtypes::Paint::ContextStroke => {
            log::warn!("Context paint is not supported. Fallback to none.");
            None
        }
        svgtypes::Paint::CurrentColor => {
            let svg_color: svgtypes::Color = node
                .find_attribute("color")
                .unwrap_or_else(svgtypes::Color::black);
            let (color, alpha) = svg_color.split_alpha();
            *opacity = alpha;
            Some(Paint::Color(color))
        }
        svgtypes::Paint::Color(svg_color) => {
            let (color, alpha) = svg_color.split_alpha();
            *opacity = alpha;
            Some(Paint::Color(color))
        }
        svgtypes::Paint::FuncIRI(func_iri, fallback) => {
            let uri = format!("#{}", func_iri);
            let server = PaintServerRef { shape, node, name, uri: &uri, fallback, has_bbox };
            convert_paint_server(ctx, server, opacity)
        }
    }
}

// `None` when the text after `url(...)` is not a valid fallback.
fn convert_fallback(text: &str) -> Option<Option<svgtypes::PaintFallback>> {
    match text {
        "" => Some(None),
        "none" => Some(Some(svgtypes::PaintFallback::None)),
        "currentColor" => Some(Some(svgtypes::PaintFallback::CurrentColor)),
        _ => text
            .parse::<svgtypes::Color>()
            .ok()
            .map(|c| Some(svgtypes::PaintFallback::Color(c))),
    }
}

struct PaintServerRef<'a, 'b> {
    shape: SvgNode<'a>,
    node: SvgNode<'a>,
    name: &'b str,
    uri: &'b str,
    fallback: Option<svgtypes::PaintFallback>,
    has_bbox: bool,
}

fn convert_paint_server(
    ctx: &mut BridgeContext,
    server: PaintServerRef,
    opacity: &mut Opacity,
) -> Option<Paint> {
    let PaintServerRef { shape, node, name, uri, fallback, has_bbox } = server;

    let reference = match reference::resolve(ctx, shape, name, uri, ResourceKind::Document) {
        Ok(v) => v,
        Err(e) => {
            ctx.report(e);
            return from_fallback(node, fallback, opacity);
        }
    };
    let link = match reference.element() {
        Some(v) => v,
        None => {
            ctx.report(BridgeError::broken_reference(shape, name, uri));
            return from_fallback(node, fallback, opacity);
        }
    };

    if !is_paint_server(link) {
        log::warn!(
            "'{}' cannot be used to {} a shape.",
            link.tag_name().unwrap_or_default(),
            name
        );
        return None;
    }

    match ctx.fragment(shape, name, link) {
        Ok(Some(Fragment::Paint(ServerOrColor::Server(paint)))) => {
            // We can use a paint server node with ObjectBoundingBox units
            // for painting only when the shape itself has a bbox.
            //
            // See SVG spec 7.11 for details.
            if !has_bbox && paint.units() == Some(Units::ObjectBoundingBox) {
                from_fallback(node, fallback, opacity)
            } else {
                Some(paint)
            }
        }
        Ok(Some(Fragment::Paint(ServerOrColor::Color { color, opacity: so }))) => {
            *opacity = so;
            Some(Paint::Color(color))
        }
        Ok(_) => from_fallback(node, fallback, opacity),
        Err(e) => {
            ctx.report(e);
            from_fallback(node, fallback, opacity)
        }
    }
}

fn from_fallback(
    node: SvgNode,
    fallback: Option<svgtypes::PaintFallback>,
    opacity: &mut Opacity,
) -> Option<Paint> {
    match fallback? {
        svgtypes::PaintFallback::None => None,
        svgtypes::PaintFallback::CurrentColor => {
            let svg_color: svgtypes::Color = node
                .find_attribute("color")
                .unwrap_or_else(svgtypes::Color::black);
            let (color, alpha) = svg_color.split_alpha();
            *opacity = alpha;
            Some(Paint::Color(color))
        }
        svgtypes::PaintFallback::Color(svg_color) => {
            let (color, alpha) = svg_color.split_alpha();
            *opacity = alpha;
            Some(Paint::Color(color))
        }
    }
}

// Prepare the 'stroke-dasharray' according to:
// https://www.w3.org/TR/SVG11/painting.html#StrokeDasharrayProperty
fn conv_dasharray(ctx: &BridgeContext, node: SvgNode) -> Option<Vec<f32>> {
    let node = node
        .ancestors()
        .find(|n| n.has_attribute("stroke-dasharray"))?;
    let list = ctx.units.convert_list(node, "stroke-dasharray")?;

    // `A negative value is an error`
    if list.iter().any(|n| n.is_sign_negative()) {
        return None;
    }

    // `If the sum of the values is zero, then the stroke is rendered
    // as if a value of none were specified.`
    let sum: f32 = list.iter().sum();
    if sum.approx_eq_ulps(&0.0, 4) {
        return None;
    }

    // `If an odd number of values is provided, then the list of values
    // is repeated to yield an even number of values.`
    if list.len() % 2 != 0 {
        let mut tmp_list = list.clone();
        tmp_list.extend_from_slice(&list);
        return Some(tmp_list);
    }

    Some(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;

    #[test]
    fn dasharray_rules() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <rect id='odd' stroke-dasharray='5 10 15'/>
                <rect id='zero' stroke-dasharray='0 0'/>
                <rect id='neg' stroke-dasharray='5 -1'/>
            </svg>",
        )
        .unwrap();
        let ctx = BridgeContext::new(Options::default());

        let odd = conv_dasharray(&ctx, doc.element_by_id("odd").unwrap());
        assert_eq!(odd, Some(vec![5.0, 10.0, 15.0, 5.0, 10.0, 15.0]));
        assert_eq!(conv_dasharray(&ctx, doc.element_by_id("zero").unwrap()), None);
        assert_eq!(conv_dasharray(&ctx, doc.element_by_id("neg").unwrap()), None);
    }

    #[test]
    fn inherited_fill_and_invalid_stroke() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <g fill='#ff0000' fill-opacity='0.5'>
                    <rect id='r' stroke='bogus' stroke-width='2'/>
                    <rect id='w' stroke='black' stroke-width='0'/>
                </g>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let rect = doc.element_by_id("r").unwrap();

        let fill = resolve_fill(&mut ctx, rect, true).unwrap();
        assert_eq!(fill.paint, Paint::Color(Color::new_rgb(255, 0, 0)));
        assert_eq!(fill.opacity.get(), 0.5);
        assert!(resolve_stroke(&mut ctx, rect, true).is_none());

        let zero_width = doc.element_by_id("w").unwrap();
        assert!(resolve_stroke(&mut ctx, zero_width, true).is_none());
    }
}
