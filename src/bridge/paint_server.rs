// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{
    ApproxEqUlps, BaseGradient, Color, Group, IsValidLength, LinearGradient, Node, NodeKind,
    NonZeroRect, Opacity, Paint, Pattern, PositiveF32, RadialGradient, SpreadMethod, Stop,
    StopOffset, Transform, Units, ViewBox,
};
use svgtypes::{Length, LengthUnit as Unit};

use super::{Bridge, Fragment, FragmentBridge};
use crate::error::OptionLog;
use crate::reference::{href_chain, HrefChain};
use crate::svgnode_ext::{SvgColorExt, SvgNodeExt};
use crate::{builder, BridgeContext, BridgeError};

/// A resolved paint server.
///
/// Gradients with less than two stops are resolved into a plain color.
#[derive(Clone, Debug)]
pub enum ServerOrColor {
    /// A gradient or a pattern.
    Server(Paint),
    /// A solid color.
    Color {
        /// The color.
        color: Color,
        /// The color opacity.
        opacity: Opacity,
    },
}

pub(crate) struct LinearGradientBridge;

impl Bridge for LinearGradientBridge {
    fn local_name(&self) -> &str {
        "linearGradient"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for LinearGradientBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert_linear(ctx, element)?.map(Fragment::Paint))
    }
}

pub(crate) struct RadialGradientBridge;

impl Bridge for RadialGradientBridge {
    fn local_name(&self) -> &str {
        "radialGradient"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for RadialGradientBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert_radial(ctx, element)?.map(Fragment::Paint))
    }
}

pub(crate) struct PatternBridge;

impl Bridge for PatternBridge {
    fn local_name(&self) -> &str {
        "pattern"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for PatternBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert_pattern(ctx, element)?.map(Fragment::Paint))
    }
}

/// Walks the `href` chain and records every link as a dependency.
fn linked_chain(ctx: &mut BridgeContext, node: SvgNode) -> Result<HrefChain, BridgeError> {
    let chain = href_chain(ctx, node)?;
    for link in chain.nodes(node) {
        ctx.depend_on(link);
    }

    Ok(chain)
}

fn is_gradient(node: SvgNode) -> bool {
    node.is_one_of(&["linearGradient", "radialGradient"])
}

fn convert_linear(
    ctx: &mut BridgeContext,
    node: SvgNode,
) -> Result<Option<ServerOrColor>, BridgeError> {
    let links = linked_chain(ctx, node)?;
    let chain = links.nodes(node);
    let stops = match find_gradient_with_stops(&chain) {
        Some(n) => convert_stops(n),
        None => return Ok(None),
    };
    if stops.len() < 2 {
        return Ok(stops_to_color(&stops));
    }

    let units = convert_units(&chain, "gradientUnits", Units::ObjectBoundingBox)?;
    let transform = convert_transform(&chain, "gradientTransform")?;

    let gradient = LinearGradient {
        x1: resolve_number(ctx, &chain, "x1", units, Length::zero())?,
        y1: resolve_number(ctx, &chain, "y1", units, Length::zero())?,
        x2: resolve_number(ctx, &chain, "x2", units, Length::new(100.0, Unit::Percent))?,
        y2: resolve_number(ctx, &chain, "y2", units, Length::zero())?,
        base: BaseGradient {
            id: node.element_id().to_string(),
            units,
            transform,
            spread_method: convert_spread_method(&chain)?,
            stops,
        },
    };

    Ok(Some(ServerOrColor::Server(Paint::LinearGradient(Rc::new(gradient)))))
}

fn convert_radial(
    ctx: &mut BridgeContext,
    node: SvgNode,
) -> Result<Option<ServerOrColor>, BridgeError> {
    let links = linked_chain(ctx, node)?;
    let chain = links.nodes(node);
    let stops = match find_gradient_with_stops(&chain) {
        Some(n) => convert_stops(n),
        None => return Ok(None),
    };
    if stops.len() < 2 {
        return Ok(stops_to_color(&stops));
    }

    let units = convert_units(&chain, "gradientUnits", Units::ObjectBoundingBox)?;
    let r = resolve_number(ctx, &chain, "r", units, Length::new(50.0, Unit::Percent))?;

    // 'A value of zero will cause the area to be painted as a single color
    // using the color and opacity of the last gradient stop.'
    //
    // https://www.w3.org/TR/SVG11/pservers.html#RadialGradientElementRAttribute
    let r = match PositiveF32::new(r) {
        Some(r) if r.get().is_valid_length() => r,
        _ => {
            return Ok(stops.last().map(|stop| ServerOrColor::Color {
                color: stop.color,
                opacity: stop.opacity,
            }));
        }
    };

    let cx = resolve_number(ctx, &chain, "cx", units, Length::new(50.0, Unit::Percent))?;
    let cy = resolve_number(ctx, &chain, "cy", units, Length::new(50.0, Unit::Percent))?;
    let fx = resolve_number(ctx, &chain, "fx", units, Length::new_number(cx as f64))?;
    let fy = resolve_number(ctx, &chain, "fy", units, Length::new_number(cy as f64))?;
    let transform = convert_transform(&chain, "gradientTransform")?;

    let gradient = RadialGradient {
        cx,
        cy,
        r,
        fx,
        fy,
        base: BaseGradient {
            id: node.element_id().to_string(),
            units,
            transform,
            spread_method: convert_spread_method(&chain)?,
            stops,
        },
    };

    Ok(Some(ServerOrColor::Server(Paint::RadialGradient(Rc::new(gradient)))))
}

fn convert_pattern(
    ctx: &mut BridgeContext,
    node: SvgNode,
) -> Result<Option<ServerOrColor>, BridgeError> {
    let links = linked_chain(ctx, node)?;
    let chain = links.nodes(node);
    let node_with_children = match find_pattern_with_children(&chain) {
        Some(v) => v,
        None => return Ok(None),
    };

    let view_box = {
        let n1 = resolve_attr(&chain, "viewBox");
        let n2 = resolve_attr(&chain, "preserveAspectRatio");
        n1.parse_viewbox().map(|vb| ViewBox {
            rect: vb,
            aspect: n2.attribute("preserveAspectRatio").unwrap_or_default(),
        })
    };

    let units = convert_units(&chain, "patternUnits", Units::ObjectBoundingBox)?;
    let content_units = convert_units(&chain, "patternContentUnits", Units::UserSpaceOnUse)?;
    let transform = convert_transform(&chain, "patternTransform")?;

    let rect = NonZeroRect::from_xywh(
        resolve_number(ctx, &chain, "x", units, Length::zero())?,
        resolve_number(ctx, &chain, "y", units, Length::zero())?,
        resolve_number(ctx, &chain, "width", units, Length::zero())?,
        resolve_number(ctx, &chain, "height", units, Length::zero())?,
    );
    let rect = match rect.log_none(|| {
        log::warn!("Pattern '{}' has an invalid size. Skipped.", node.element_id())
    }) {
        Some(v) => v,
        None => return Ok(None),
    };

    let root = Node::new(NodeKind::Group(Group::default()));
    builder::build_children(ctx, node_with_children.element_children(), &root);
    if !root.has_children() {
        return Ok(None);
    }

    let pattern = Pattern {
        id: node.element_id().to_string(),
        units,
        content_units,
        transform,
        rect,
        view_box,
        root,
    };

    Ok(Some(ServerOrColor::Server(Paint::Pattern(Rc::new(pattern)))))
}

fn convert_spread_method(chain: &[SvgNode]) -> Result<SpreadMethod, BridgeError> {
    Ok(resolve_attr(chain, "spreadMethod")
        .strict_keyword("spreadMethod")?
        .unwrap_or_default())
}

fn convert_units(chain: &[SvgNode], name: &str, def: Units) -> Result<Units, BridgeError> {
    resolve_attr(chain, name).units(name, def)
}

/// Resolves an inherited transform.
///
/// A non-invertible transform is replaced with an identity one.
fn convert_transform(chain: &[SvgNode], name: &str) -> Result<Transform, BridgeError> {
    Ok(resolve_attr(chain, name)
        .parse_transform(name)?
        .unwrap_or_default())
}

fn resolve_number(
    ctx: &BridgeContext,
    chain: &[SvgNode],
    name: &str,
    units: Units,
    def: Length,
) -> Result<f32, BridgeError> {
    ctx.units.length(resolve_attr(chain, name), name, units, def)
}

fn find_gradient_with_stops<'a>(chain: &[SvgNode<'a>]) -> Option<SvgNode<'a>> {
    for link in chain {
        if !is_gradient(*link) {
            log::warn!(
                "Gradient '{}' cannot reference '{}' via 'xlink:href'.",
                chain[0].element_id(),
                link.tag_name().unwrap_or_default()
            );
            return None;
        }

        if link.element_children().any(|n| n.has_tag_name("stop")) {
            return Some(*link);
        }
    }

    None
}

fn find_pattern_with_children<'a>(chain: &[SvgNode<'a>]) -> Option<SvgNode<'a>> {
    for link in chain {
        if !link.has_tag_name("pattern") {
            log::warn!(
                "Pattern '{}' cannot reference '{}' via 'xlink:href'.",
                chain[0].element_id(),
                link.tag_name().unwrap_or_default()
            );
            return None;
        }

        if link.element_children().next().is_some() {
            return Some(*link);
        }
    }

    None
}

/// Finds the first chain member that defines an attribute.
///
/// Coordinates are inherited only from elements of the same kind,
/// other gradient attributes from any gradient.
pub(crate) fn resolve_attr<'a>(chain: &[SvgNode<'a>], name: &str) -> SvgNode<'a> {
    let start = chain[0];
    if start.has_attribute(name) {
        return start;
    }

    let start_tag = start.tag_name().unwrap_or_default();
    for link in &chain[1..] {
        let tag = link.tag_name().unwrap_or_default();
        let allowed = match start_tag {
            "linearGradient" | "radialGradient" => match name {
                "gradientUnits" | "spreadMethod" | "gradientTransform" => is_gradient(*link),
                _ => tag == start_tag,
            },
            _ => tag == start_tag,
        };

        if !allowed {
            break;
        }

        if link.has_attribute(name) {
            return *link;
        }
    }

    start
}

fn convert_stops(grad: SvgNode) -> Vec<Stop> {
    let mut stops = Vec::new();

    {
        let mut prev_offset = Length::zero();
        for stop in grad.element_children() {
            if !stop.has_tag_name("stop") {
                log::warn!("Invalid gradient child: '{}'.", stop.tag_name().unwrap_or_default());
                continue;
            }

            // `number` can be either a number or a percentage.
            let offset = stop.attribute("offset").unwrap_or(prev_offset);
            let offset = match offset.unit {
                Unit::None => offset.number,
                Unit::Percent => offset.number / 100.0,
                _ => prev_offset.number,
            };
            prev_offset = Length::new_number(offset);
            let offset = (offset as f32).clamp(0.0, 1.0);

            let (color, opacity) = stop
                .color("stop-color")
                .unwrap_or_else(svgtypes::Color::black)
                .split_alpha();

            let stop_opacity = stop.opacity("stop-opacity").unwrap_or(Opacity::ONE);
            stops.push(Stop {
                offset: StopOffset::new_clamped(offset),
                color,
                opacity: opacity * stop_opacity,
            });
        }
    }

    // Remove stops with equal offset.
    //
    // Example:
    // offset="0.5"
    // offset="0.7"
    // offset="0.7" <-- this one should be removed
    // offset="0.7"
    // offset="0.9"
    if stops.len() >= 3 {
        let mut i = 0;
        while i < stops.len() - 2 {
            let offset1 = stops[i].offset.get();
            let offset2 = stops[i + 1].offset.get();
            let offset3 = stops[i + 2].offset.get();

            if offset1.approx_eq_ulps(&offset2, 4) && offset2.approx_eq_ulps(&offset3, 4) {
                // Remove offset in the middle.
                stops.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    // Remove zeros.
    //
    // From:
    // offset="0.0"
    // offset="0.0"
    // offset="0.7"
    //
    // To:
    // offset="0.0"
    // offset="0.00000001"
    // offset="0.7"
    if stops.len() >= 2 {
        let mut i = 0;
        while i < stops.len() - 1 {
            let offset1 = stops[i].offset.get();
            let offset2 = stops[i + 1].offset.get();

            if offset1.approx_eq_ulps(&0.0, 4) && offset2.approx_eq_ulps(&0.0, 4) {
                stops[i + 1].offset = StopOffset::new_clamped(offset1 + f32::EPSILON);
            }

            i += 1;
        }
    }

    // Shift equal offsets.
    //
    // From:
    // offset="0.5"
    // offset="0.7"
    // offset="0.7"
    //
    // To:
    // offset="0.5"
    // offset="0.699999999"
    // offset="0.7"
    {
        let mut i = 1;
        while i < stops.len() {
            let offset1 = stops[i - 1].offset.get();
            let offset2 = stops[i].offset.get();

            // Next offset must be smaller then previous.
            if offset1 > offset2 || offset1.approx_eq_ulps(&offset2, 4) {
                // Make previous offset a bit smaller.
                let new_offset = offset1 - f32::EPSILON;
                stops[i - 1].offset = StopOffset::new_clamped(new_offset);
                stops[i].offset = StopOffset::new_clamped(offset1);
            }

            i += 1;
        }
    }

    stops
}

fn stops_to_color(stops: &[Stop]) -> Option<ServerOrColor> {
    stops.first().map(|stop| ServerOrColor::Color {
        color: stop.color,
        opacity: stop.opacity,
    })
}
