// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `filter` element and filter primitives.

use std::collections::HashSet;
use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::filter::*;
use svgbridge_gvt::{
    ApproxZeroUlps, BlendMode, Group, ImageRendering, Node, NodeKind, NonZeroRect, Opacity,
    PositiveF32, Units,
};
use svgtypes::{Length, LengthUnit as Unit};

use super::{image, Bridge, Fragment, FragmentBridge, FilterPrimitiveBridge};
use crate::error::OptionLog;
use crate::reference::{href_chain, resolve_local_link};
use crate::svgnode_ext::{SvgColorExt, SvgNodeExt};
use crate::{builder, BridgeContext, BridgeError};

/// The state of a filter primitive chain.
///
/// Primitives are evaluated in document order. Each one publishes its
/// output under a `result` name, which later primitives reference via `in` and `in2`.
///
/// Subregions depend on the bounding box of a filtered element,
/// so they are resolved later by [`Filter::subregions`].
#[derive(Clone, Debug)]
pub struct FilterChain {
    primitive_units: Units,
    results: HashSet<String>,
    previous: Option<String>,
    idx: usize,
}

impl FilterChain {
    /// Creates an empty chain.
    pub fn new(primitive_units: Units) -> Self {
        FilterChain {
            primitive_units,
            results: HashSet::new(),
            previous: None,
            idx: 1,
        }
    }

    /// Returns `primitiveUnits` of the filter.
    pub fn primitive_units(&self) -> Units {
        self.primitive_units
    }

    /// Checks that a result name was published.
    pub fn has_result(&self, name: &str) -> bool {
        self.results.contains(name)
    }

    /// Resolves the `in` or `in2` attribute of a primitive.
    ///
    /// A missing or unknown reference resolves to the previous result,
    /// or to `SourceGraphic` for the first primitive.
    pub fn resolve_input(&self, element: SvgNode, name: &str) -> Input {
        let fallback = || match self.previous {
            Some(ref result) => Input::Reference(result.clone()),
            None => Input::SourceGraphic,
        };

        match element.raw_attribute(name) {
            Some(s) => match parse_in(s) {
                Input::Reference(ref result) if !self.has_result(result) => fallback(),
                input => input,
            },
            None => fallback(),
        }
    }

    fn gen_result(&mut self, element: SvgNode) -> String {
        match element.raw_attribute("result") {
            Some(s) if !s.is_empty() => {
                self.idx += 1;
                s.to_string()
            }
            _ => loop {
                // Generate an unique name for `result`.
                let name = format!("result{}", self.idx);
                self.idx += 1;

                if !self.results.contains(&name) {
                    return name;
                }
            },
        }
    }

    fn publish(&mut self, result: &str) {
        self.results.insert(result.to_string());
        self.previous = Some(result.to_string());
    }
}

fn parse_in(s: &str) -> Input {
    match s {
        "SourceGraphic" => Input::SourceGraphic,
        "SourceAlpha" => Input::SourceAlpha,
        "BackgroundImage" | "BackgroundAlpha" | "FillPaint" | "StrokePaint" => {
            log::warn!("{} filter input isn't supported.", s);
            Input::SourceGraphic
        }
        _ => Input::Reference(s.to_string()),
    }
}

pub(crate) struct FilterBridge;

impl Bridge for FilterBridge {
    fn local_name(&self) -> &str {
        "filter"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for FilterBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(Some(Fragment::Filter(Rc::new(convert(ctx, element)?))))
    }
}

fn convert(ctx: &mut BridgeContext, element: SvgNode) -> Result<Filter, BridgeError> {
    let links = href_chain(ctx, element)?;
    let chain = links.nodes(element);
    for link in &chain[1..] {
        ctx.depend_on(*link);
    }

    // Attributes are inherited from any linked filter.
    let resolve = |name: &str| {
        chain
            .iter()
            .copied()
            .find(|n| n.has_attribute(name))
            .unwrap_or(element)
    };

    let units = resolve("filterUnits").units("filterUnits", Units::ObjectBoundingBox)?;
    let primitive_units = resolve("primitiveUnits").units("primitiveUnits", Units::UserSpaceOnUse)?;

    let length = |name: &str, def: Length| ctx.units.length(resolve(name), name, units, def);
    let rect = NonZeroRect::from_xywh(
        length("x", Length::new(-10.0, Unit::Percent))?,
        length("y", Length::new(-10.0, Unit::Percent))?,
        length("width", Length::new(120.0, Unit::Percent))?,
        length("height", Length::new(120.0, Unit::Percent))?,
    );
    let rect = rect
        .log_none(|| log::warn!("Filter '{}' has an invalid region.", element.element_id()))
        .ok_or_else(|| {
            BridgeError::illegal_value(
                element,
                "width",
                resolve("width").raw_attribute("width").unwrap_or_default(),
            )
        })?;

    let mut linked = None;
    for link in &chain {
        if !link.has_tag_name("filter") {
            log::warn!(
                "Filter '{}' cannot reference '{}' via 'xlink:href'.",
                element.element_id(),
                link.tag_name().unwrap_or_default()
            );
            break;
        }

        if link.element_children().next().is_some() {
            linked = Some(*link);
            break;
        }
    }

    // A filter without primitives disables rendering of the element.
    let with_primitives =
        linked.ok_or_else(|| BridgeError::broken_reference(element, "filter", "#"))?;

    let mut filter_chain = FilterChain::new(primitive_units);
    let mut primitives = Vec::new();
    for child in with_primitives.element_children() {
        let bridge = child
            .tag_name()
            .and_then(|name| ctx.registry.lookup(child.namespace().unwrap_or_default(), name));
        let bridge = match bridge {
            Some(v) if v.as_filter_primitive().is_some() => v,
            _ => {
                log::warn!(
                    "'{}' is not a supported filter primitive. Skipped.",
                    child.tag_name().unwrap_or_default()
                );
                continue;
            }
        };

        let kind = match bridge.as_filter_primitive() {
            Some(fb) => fb.create_primitive(ctx, child, &filter_chain)?,
            None => continue,
        };

        let subregion = |name: &str| ctx.units.try_length(child, name, primitive_units);
        let (x, y) = (subregion("x")?, subregion("y")?);
        let (width, height) = (subregion("width")?, subregion("height")?);
        for (name, value) in [("width", width), ("height", height)] {
            if value.map_or(false, |n| n <= 0.0) {
                log::warn!("'{}' has an invalid subregion {}.", kind.name(), name);
            }
        }

        let result = filter_chain.gen_result(child);
        filter_chain.publish(&result);

        primitives.push(Primitive {
            x,
            y,
            width,
            height,
            color_interpolation: child
                .find_keyword("color-interpolation-filters")
                .unwrap_or_default(),
            result,
            kind,
        });
    }

    if primitives.is_empty() {
        return Err(BridgeError::broken_reference(element, "filter", "#"));
    }

    Ok(Filter {
        id: element.element_id().to_string(),
        units,
        primitive_units,
        rect,
        primitives,
    })
}

type ConvertFn = fn(&mut BridgeContext, SvgNode, &FilterChain) -> Result<Kind, BridgeError>;

/// A bridge of a single filter primitive kind.
pub(crate) struct PrimitiveBridge {
    name: &'static str,
    convert: ConvertFn,
}

impl Bridge for PrimitiveBridge {
    fn local_name(&self) -> &str {
        self.name
    }

    fn as_filter_primitive(&self) -> Option<&dyn FilterPrimitiveBridge> {
        Some(self)
    }
}

impl FilterPrimitiveBridge for PrimitiveBridge {
    fn create_primitive(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        chain: &FilterChain,
    ) -> Result<Kind, BridgeError> {
        (self.convert)(ctx, element, chain)
    }
}

pub(crate) fn primitive_bridges() -> Vec<Rc<dyn Bridge>> {
    let list: [(&'static str, ConvertFn); 12] = [
        ("feBlend", convert_blend),
        ("feColorMatrix", convert_color_matrix),
        ("feComponentTransfer", convert_component_transfer),
        ("feComposite", convert_composite),
        ("feFlood", convert_flood),
        ("feGaussianBlur", convert_gaussian_blur),
        ("feImage", convert_image),
        ("feMerge", convert_merge),
        ("feMorphology", convert_morphology),
        ("feOffset", convert_offset),
        ("feTile", convert_tile),
        ("feTurbulence", convert_turbulence),
    ];

    list.into_iter()
        .map(|(name, convert)| Rc::new(PrimitiveBridge { name, convert }) as Rc<dyn Bridge>)
        .collect()
}

fn convert_blend(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    Ok(Kind::Blend(Blend {
        input1: chain.resolve_input(fe, "in"),
        input2: chain.resolve_input(fe, "in2"),
        mode: fe.keyword::<BlendMode>("mode").unwrap_or_default(),
    }))
}

fn convert_color_matrix(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    Ok(Kind::ColorMatrix(ColorMatrix {
        input: chain.resolve_input(fe, "in"),
        kind: convert_color_matrix_kind(fe).unwrap_or_default(),
    }))
}

fn convert_color_matrix_kind(fe: SvgNode) -> Option<ColorMatrixKind> {
    match fe.raw_attribute("type") {
        Some("saturate") => {
            let list = fe.attribute::<Vec<f32>>("values")?;
            let n = list.first().copied().unwrap_or(1.0).clamp(0.0, 1.0);
            PositiveF32::new(n).map(ColorMatrixKind::Saturate)
        }
        Some("hueRotate") => {
            let list = fe.attribute::<Vec<f32>>("values")?;
            Some(ColorMatrixKind::HueRotate(list.first().copied().unwrap_or(0.0)))
        }
        Some("luminanceToAlpha") => Some(ColorMatrixKind::LuminanceToAlpha),
        _ => {
            // Fallback to `matrix`.
            let list = fe.attribute::<Vec<f32>>("values")?;
            if list.len() == 20 {
                Some(ColorMatrixKind::Matrix(list))
            } else {
                None
            }
        }
    }
}

fn convert_component_transfer(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    let mut kind = ComponentTransfer {
        input: chain.resolve_input(fe, "in"),
        func_r: TransferFunction::Identity,
        func_g: TransferFunction::Identity,
        func_b: TransferFunction::Identity,
        func_a: TransferFunction::Identity,
    };

    for child in fe.element_children() {
        if let Some(func) = convert_transfer_function(child) {
            match child.tag_name() {
                Some("feFuncR") => kind.func_r = func,
                Some("feFuncG") => kind.func_g = func,
                Some("feFuncB") => kind.func_b = func,
                Some("feFuncA") => kind.func_a = func,
                _ => {}
            }
        }
    }

    Ok(Kind::ComponentTransfer(kind))
}

fn convert_transfer_function(node: SvgNode) -> Option<TransferFunction> {
    match node.raw_attribute("type")? {
        "identity" => Some(TransferFunction::Identity),
        "table" => Some(TransferFunction::Table(
            node.attribute::<Vec<f32>>("tableValues").unwrap_or_default(),
        )),
        "discrete" => Some(TransferFunction::Discrete(
            node.attribute::<Vec<f32>>("tableValues").unwrap_or_default(),
        )),
        "linear" => Some(TransferFunction::Linear {
            slope: node.attribute("slope").unwrap_or(1.0),
            intercept: node.attribute("intercept").unwrap_or(0.0),
        }),
        "gamma" => Some(TransferFunction::Gamma {
            amplitude: node.attribute("amplitude").unwrap_or(1.0),
            exponent: node.attribute("exponent").unwrap_or(1.0),
            offset: node.attribute("offset").unwrap_or(0.0),
        }),
        _ => None,
    }
}

fn convert_composite(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    let operator = match fe.raw_attribute("operator").unwrap_or("over") {
        "in" => CompositeOperator::In,
        "out" => CompositeOperator::Out,
        "atop" => CompositeOperator::Atop,
        "xor" => CompositeOperator::Xor,
        "arithmetic" => CompositeOperator::Arithmetic {
            k1: fe.attribute("k1").unwrap_or(0.0),
            k2: fe.attribute("k2").unwrap_or(0.0),
            k3: fe.attribute("k3").unwrap_or(0.0),
            k4: fe.attribute("k4").unwrap_or(0.0),
        },
        _ => CompositeOperator::Over,
    };

    Ok(Kind::Composite(Composite {
        input1: chain.resolve_input(fe, "in"),
        input2: chain.resolve_input(fe, "in2"),
        operator,
    }))
}

fn convert_flood(
    _: &mut BridgeContext,
    fe: SvgNode,
    _: &FilterChain,
) -> Result<Kind, BridgeError> {
    let (color, opacity) = fe
        .color("flood-color")
        .unwrap_or_else(svgtypes::Color::black)
        .split_alpha();

    let flood_opacity = fe.opacity("flood-opacity").unwrap_or(Opacity::ONE);

    Ok(Kind::Flood(Flood {
        color,
        opacity: opacity * flood_opacity,
    }))
}

fn convert_gaussian_blur(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    let text = fe.raw_attribute("stdDeviation").unwrap_or("0 0");
    let mut parser = svgtypes::NumberListParser::from(text);

    let n1 = parser.next().and_then(|n| n.ok());
    let n2 = parser.next().and_then(|n| n.ok());
    // `stdDeviation` must have no more than two values.
    // Otherwise we should fallback to `0 0`.
    let n3 = parser.next().and_then(|n| n.ok());

    let (std_dev_x, std_dev_y) = match (n1, n2, n3) {
        (Some(n1), Some(n2), None) => (n1 as f32, n2 as f32),
        (Some(n1), None, None) => (n1 as f32, n1 as f32),
        _ => (0.0, 0.0),
    };

    // A negative value is an error.
    let std_dev_x = PositiveF32::new(std_dev_x)
        .ok_or_else(|| BridgeError::illegal_value(fe, "stdDeviation", text))?;
    let std_dev_y = PositiveF32::new(std_dev_y)
        .ok_or_else(|| BridgeError::illegal_value(fe, "stdDeviation", text))?;

    Ok(Kind::GaussianBlur(GaussianBlur {
        input: chain.resolve_input(fe, "in"),
        std_dev_x,
        std_dev_y,
    }))
}

fn convert_image(
    ctx: &mut BridgeContext,
    fe: SvgNode,
    _: &FilterChain,
) -> Result<Kind, BridgeError> {
    let aspect = fe.attribute("preserveAspectRatio").unwrap_or_default();
    let rendering_mode = fe
        .find_keyword::<ImageRendering>("image-rendering")
        .unwrap_or(ctx.opt.image_rendering);

    let href = fe
        .raw_attribute("href")
        .ok_or_else(|| BridgeError::missing_attribute(fe, "href"))?;

    // A link to an element of the same document.
    if href.starts_with('#') {
        let link = resolve_local_link(fe, "href")?
            .ok_or_else(|| BridgeError::broken_reference(fe, "href", href))?;

        let root = Node::new(NodeKind::Group(Group::default()));
        builder::build_children(ctx, std::iter::once(link), &root);
        return Ok(Kind::Image(Image {
            aspect,
            rendering_mode,
            data: ImageKind::Use(root),
        }));
    }

    let data = image::load_href(ctx, fe, href)?;
    Ok(Kind::Image(Image {
        aspect,
        rendering_mode,
        data: ImageKind::Image(data),
    }))
}

fn convert_merge(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    let inputs = fe
        .element_children()
        .filter(|n| n.has_tag_name("feMergeNode"))
        .map(|n| chain.resolve_input(n, "in"))
        .collect();

    Ok(Kind::Merge(Merge { inputs }))
}

fn convert_morphology(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    let operator = match fe.raw_attribute("operator").unwrap_or("erode") {
        "dilate" => MorphologyOperator::Dilate,
        _ => MorphologyOperator::Erode,
    };

    let mut rx = 1.0;
    let mut ry = 1.0;
    if let Some(list) = fe.attribute::<Vec<f32>>("radius") {
        match list.as_slice() {
            [r] => {
                rx = *r;
                ry = *r;
            }
            [x, y] => {
                rx = *x;
                ry = *y;
            }
            _ => {}
        }
    }

    // A negative value is an error.
    if rx.is_sign_negative() || ry.is_sign_negative() {
        return Err(BridgeError::illegal_value(
            fe,
            "radius",
            fe.raw_attribute("radius").unwrap_or_default(),
        ));
    }

    // If only one of the values is zero, reset it to 1.0
    // This is not specified in the spec, but this is how Chrome and Safari work.
    if rx.approx_zero_ulps(4) != ry.approx_zero_ulps(4) {
        if rx.approx_zero_ulps(4) {
            rx = 1.0;
        } else {
            ry = 1.0;
        }
    }

    Ok(Kind::Morphology(Morphology {
        input: chain.resolve_input(fe, "in"),
        operator,
        radius_x: PositiveF32::new(rx).unwrap_or(PositiveF32::ZERO),
        radius_y: PositiveF32::new(ry).unwrap_or(PositiveF32::ZERO),
    }))
}

fn convert_offset(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    Ok(Kind::Offset(Offset {
        input: chain.resolve_input(fe, "in"),
        dx: fe.attribute("dx").unwrap_or(0.0),
        dy: fe.attribute("dy").unwrap_or(0.0),
    }))
}

fn convert_tile(
    _: &mut BridgeContext,
    fe: SvgNode,
    chain: &FilterChain,
) -> Result<Kind, BridgeError> {
    Ok(Kind::Tile(Tile {
        input: chain.resolve_input(fe, "in"),
    }))
}

fn convert_turbulence(
    _: &mut BridgeContext,
    fe: SvgNode,
    _: &FilterChain,
) -> Result<Kind, BridgeError> {
    let mut base_frequency_x = PositiveF32::ZERO;
    let mut base_frequency_y = PositiveF32::ZERO;
    if let Some(list) = fe.attribute::<Vec<f32>>("baseFrequency") {
        let (x, y) = match list.as_slice() {
            [n] => (*n, *n),
            [x, y] => (*x, *y),
            _ => (0.0, 0.0),
        };

        if let (Some(x), Some(y)) = (PositiveF32::new(x), PositiveF32::new(y)) {
            base_frequency_x = x;
            base_frequency_y = y;
        }
    }

    let num_octaves: f32 = fe.attribute("numOctaves").unwrap_or(1.0);
    let kind = match fe.raw_attribute("type").unwrap_or("turbulence") {
        "fractalNoise" => TurbulenceKind::FractalNoise,
        _ => TurbulenceKind::Turbulence,
    };

    Ok(Kind::Turbulence(Turbulence {
        base_frequency_x,
        base_frequency_y,
        num_octaves: num_octaves.max(0.0).round() as u32,
        seed: fe.attribute::<f32>("seed").unwrap_or(0.0).trunc() as i32,
        stitch_tiles: fe.raw_attribute("stitchTiles") == Some("stitch"),
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;

    fn filter(text: &str) -> Result<Filter, BridgeError> {
        let doc = Document::parse_str(text).unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let element = doc.element_by_id("f").unwrap();
        match ctx.fragment(element, "filter", element)? {
            Some(Fragment::Filter(filter)) => Ok((*filter).clone()),
            _ => panic!("a filter is expected"),
        }
    }

    #[test]
    fn inputs_default_to_the_previous_result() {
        let filter = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='f'>
                    <feGaussianBlur stdDeviation='2'/>
                    <feOffset dx='1' in='unknown'/>
                    <feBlend in='SourceAlpha' in2='result1' result='out'/>
                    <feFlood/>
                </filter>
            </svg>",
        )
        .unwrap();

        assert_eq!(filter.primitives.len(), 4);
        assert_eq!(filter.primitives[0].result, "result1");
        match filter.primitives[0].kind {
            Kind::GaussianBlur(ref fe) => assert_eq!(fe.input, Input::SourceGraphic),
            _ => panic!("a blur is expected"),
        }
        match filter.primitives[1].kind {
            Kind::Offset(ref fe) => assert_eq!(fe.input, Input::Reference("result1".into())),
            _ => panic!("an offset is expected"),
        }
        match filter.primitives[2].kind {
            Kind::Blend(ref fe) => {
                assert_eq!(fe.input1, Input::SourceAlpha);
                assert_eq!(fe.input2, Input::Reference("result1".into()));
            }
            _ => panic!("a blend is expected"),
        }
        assert_eq!(filter.primitives[2].result, "out");
        assert_eq!(filter.primitives[3].result, "result4");
    }

    #[test]
    fn default_region_and_subregions() {
        let filter = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='f' filterUnits='userSpaceOnUse' x='0' y='0' width='100' height='100'>
                    <feFlood x='10' y='10' width='20' height='20' result='a'/>
                    <feFlood x='50' y='50' width='20' height='20' result='b'/>
                    <feComposite in='a' in2='b'/>
                    <feOffset in='SourceGraphic'/>
                </filter>
            </svg>",
        )
        .unwrap();

        assert_eq!(filter.units, Units::UserSpaceOnUse);
        assert_eq!(filter.rect, NonZeroRect::from_xywh(0.0, 0.0, 100.0, 100.0).unwrap());
        let list = filter.subregions(None).unwrap();
        assert_eq!(list[2], NonZeroRect::from_xywh(10.0, 10.0, 60.0, 60.0).unwrap());
        assert_eq!(list[3], filter.rect);
    }

    #[test]
    fn bounding_box_regions_wait_for_the_user() {
        let filter = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='f'>
                    <feFlood x='10' result='a'/>
                </filter>
            </svg>",
        )
        .unwrap();

        assert_eq!(filter.units, Units::ObjectBoundingBox);
        assert_eq!(filter.primitives[0].x, Some(10.0));
        assert_eq!(filter.primitives[0].width, None);
        assert!(filter.subregions(None).is_none());

        let bbox = NonZeroRect::from_xywh(0.0, 0.0, 100.0, 50.0).unwrap();
        let list = filter.subregions(Some(bbox)).unwrap();
        assert_eq!(list[0], NonZeroRect::from_xywh(10.0, -5.0, 120.0, 60.0).unwrap());
    }

    #[test]
    fn primitives_are_inherited_via_href() {
        let filter = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='base' primitiveUnits='objectBoundingBox'>
                    <feOffset dx='5'/>
                </filter>
                <filter id='f' href='#base'/>
            </svg>",
        )
        .unwrap();

        assert_eq!(filter.id, "f");
        assert_eq!(filter.primitive_units, Units::ObjectBoundingBox);
        assert_eq!(filter.primitives.len(), 1);
    }

    #[test]
    fn failing_primitive_fails_the_filter() {
        let err = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='f'><feGaussianBlur stdDeviation='-1'/></filter>
            </svg>",
        )
        .unwrap_err();
        assert_eq!(err.code(), "attribute.illegal");
    }

    #[test]
    fn empty_filter_is_an_error() {
        assert!(filter("<svg xmlns='http://www.w3.org/2000/svg'><filter id='f'/></svg>").is_err());
    }

    #[test]
    fn mutual_href_is_circular() {
        let err = filter(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <filter id='f' href='#g'><feFlood/></filter>
                <filter id='g' href='#f'><feFlood/></filter>
            </svg>",
        )
        .unwrap_err();
        assert_eq!(err.code(), "xlink.href.circularDependencies");
    }
}
