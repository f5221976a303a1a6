// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::filter::ColorInterpolation;
use svgbridge_gvt::{
    BlendMode, Color, FillRule, ImageRendering, LineCap, LineJoin, MarkerUnits, MaskType,
    NonZeroRect, Opacity, ShapeRendering, SpreadMethod, Transform, Units, Visibility,
};

use crate::BridgeError;

/// A keyword attribute value.
pub(crate) trait Keyword: Sized {
    fn parse_keyword(value: &str) -> Option<Self>;
}

macro_rules! keywords {
    ($ty:ty, $($text:literal => $value:expr),+ $(,)?) => {
        impl Keyword for $ty {
            fn parse_keyword(value: &str) -> Option<Self> {
                match value {
                    $($text => Some($value),)+
                    _ => None,
                }
            }
        }
    };
}

keywords!(Units,
    "userSpaceOnUse" => Units::UserSpaceOnUse,
    "objectBoundingBox" => Units::ObjectBoundingBox,
);

keywords!(Visibility,
    "visible" => Visibility::Visible,
    "hidden" => Visibility::Hidden,
    "collapse" => Visibility::Collapse,
);

keywords!(ShapeRendering,
    "optimizeSpeed" => ShapeRendering::OptimizeSpeed,
    "crispEdges" => ShapeRendering::CrispEdges,
    "geometricPrecision" => ShapeRendering::GeometricPrecision,
);

keywords!(ImageRendering,
    "optimizeQuality" => ImageRendering::OptimizeQuality,
    "optimizeSpeed" => ImageRendering::OptimizeSpeed,
);

keywords!(BlendMode,
    "normal" => BlendMode::Normal,
    "multiply" => BlendMode::Multiply,
    "screen" => BlendMode::Screen,
    "overlay" => BlendMode::Overlay,
    "darken" => BlendMode::Darken,
    "lighten" => BlendMode::Lighten,
    "color-dodge" => BlendMode::ColorDodge,
    "color-burn" => BlendMode::ColorBurn,
    "hard-light" => BlendMode::HardLight,
    "soft-light" => BlendMode::SoftLight,
    "difference" => BlendMode::Difference,
    "exclusion" => BlendMode::Exclusion,
    "hue" => BlendMode::Hue,
    "saturation" => BlendMode::Saturation,
    "color" => BlendMode::Color,
    "luminosity" => BlendMode::Luminosity,
);

keywords!(SpreadMethod,
    "pad" => SpreadMethod::Pad,
    "reflect" => SpreadMethod::Reflect,
    "repeat" => SpreadMethod::Repeat,
);

keywords!(LineCap,
    "butt" => LineCap::Butt,
    "round" => LineCap::Round,
    "square" => LineCap::Square,
);

keywords!(LineJoin,
    "miter" => LineJoin::Miter,
    "miter-clip" => LineJoin::MiterClip,
    "round" => LineJoin::Round,
    "bevel" => LineJoin::Bevel,
);

keywords!(FillRule,
    "nonzero" => FillRule::NonZero,
    "evenodd" => FillRule::EvenOdd,
);

keywords!(MaskType,
    "luminance" => MaskType::Luminance,
    "alpha" => MaskType::Alpha,
);

keywords!(MarkerUnits,
    "strokeWidth" => MarkerUnits::StrokeWidth,
    "userSpaceOnUse" => MarkerUnits::UserSpaceOnUse,
);

keywords!(ColorInterpolation,
    "sRGB" => ColorInterpolation::SRGB,
    "linearRGB" => ColorInterpolation::LinearRGB,
);

/// Bridge-specific `SvgNode` methods.
pub(crate) trait SvgNodeExt<'a> {
    /// Parses a keyword attribute. Logs invalid values.
    fn keyword<T: Keyword>(&self, name: &str) -> Option<T>;

    /// Parses an inheritable keyword attribute.
    fn find_keyword<T: Keyword>(&self, name: &str) -> Option<T>;

    /// Parses a keyword attribute. An unknown keyword is an error.
    fn strict_keyword<T: Keyword>(&self, name: &str) -> Result<Option<T>, BridgeError>;

    /// Parses a `*Units` attribute.
    fn units(&self, name: &str, def: Units) -> Result<Units, BridgeError>;

    /// Parses an opacity-like attribute, which is a number or a percentage.
    fn opacity(&self, name: &str) -> Option<Opacity>;

    /// Parses `viewBox`.
    fn parse_viewbox(&self) -> Option<NonZeroRect>;

    /// Parses a transform attribute.
    ///
    /// A missing attribute is an identity transform. A non-invertible one
    /// is `None`, which disables rendering. An unparsable value is an error.
    fn parse_transform(&self, name: &str) -> Result<Option<Transform>, BridgeError>;

    /// Parses a color attribute, resolving `currentColor`.
    fn color(&self, name: &str) -> Option<svgtypes::Color>;

    /// Checks that the element is an SVG element with one of the names.
    fn is_one_of(&self, names: &[&str]) -> bool;
}

impl<'a> SvgNodeExt<'a> for SvgNode<'a> {
    fn keyword<T: Keyword>(&self, name: &str) -> Option<T> {
        let value = self.raw_attribute(name)?;
        let v = T::parse_keyword(value.trim());
        if v.is_none() {
            log::warn!("Failed to parse {} value: '{}'.", name, value);
        }

        v
    }

    fn find_keyword<T: Keyword>(&self, name: &str) -> Option<T> {
        let node = self.ancestors().find(|n| n.has_attribute(name))?;
        node.keyword(name)
    }

    fn strict_keyword<T: Keyword>(&self, name: &str) -> Result<Option<T>, BridgeError> {
        match self.raw_attribute(name) {
            Some(value) => T::parse_keyword(value.trim())
                .map(Some)
                .ok_or_else(|| BridgeError::malformed_attribute(*self, name, value)),
            None => Ok(None),
        }
    }

    fn units(&self, name: &str, def: Units) -> Result<Units, BridgeError> {
        Ok(self.strict_keyword(name)?.unwrap_or(def))
    }

    fn opacity(&self, name: &str) -> Option<Opacity> {
        let value = self.raw_attribute(name)?;
        let length = match svgtypes::Length::from_str(value) {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Failed to parse {} value: '{}'.", name, value);
                return None;
            }
        };

        let n = match length.unit {
            svgtypes::LengthUnit::Percent => length.number / 100.0,
            svgtypes::LengthUnit::None => length.number,
            _ => return None,
        };

        Some(Opacity::new_clamped(n as f32))
    }

    fn parse_viewbox(&self) -> Option<NonZeroRect> {
        let vb: svgtypes::ViewBox = self.attribute("viewBox")?;
        NonZeroRect::from_xywh(vb.x as f32, vb.y as f32, vb.w as f32, vb.h as f32)
    }

    fn parse_transform(&self, name: &str) -> Result<Option<Transform>, BridgeError> {
        // Do not use SvgNode::attribute::<Transform>, because it will always
        // return a valid transform.

        let attr = match self.raw_attribute(name) {
            Some(attr) => attr,
            None => return Ok(Some(Transform::default())),
        };

        let ts = svgtypes::Transform::from_str(attr)
            .map_err(|_| BridgeError::malformed_attribute(*self, name, attr))?;

        let ts = Transform::from_row(
            ts.a as f32,
            ts.b as f32,
            ts.c as f32,
            ts.d as f32,
            ts.e as f32,
            ts.f as f32,
        );

        if ts.is_valid() {
            Ok(Some(ts))
        } else {
            Ok(None)
        }
    }

    fn color(&self, name: &str) -> Option<svgtypes::Color> {
        match self.raw_attribute(name)?.trim() {
            "currentColor" => Some(
                self.find_attribute::<svgtypes::Color>("color")
                    .unwrap_or_else(svgtypes::Color::black),
            ),
            _ => self.attribute(name),
        }
    }

    fn is_one_of(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has_tag_name(name))
    }
}

pub(crate) trait SvgColorExt {
    fn split_alpha(self) -> (Color, Opacity);
}

impl SvgColorExt for svgtypes::Color {
    fn split_alpha(self) -> (Color, Opacity) {
        (
            Color::new_rgb(self.red, self.green, self.blue),
            Opacity::new_u8(self.alpha),
        )
    }
}

/// Elements that produce a graphics node.
pub(crate) fn is_graphic(node: SvgNode) -> bool {
    node.is_one_of(&[
        "a",
        "circle",
        "ellipse",
        "foreignObject",
        "g",
        "image",
        "line",
        "path",
        "polygon",
        "polyline",
        "rect",
        "svg",
        "switch",
        "text",
        "use",
    ])
}

/// Elements that paint a shape with `fill` and `stroke`.
pub(crate) fn is_paint_server(node: SvgNode) -> bool {
    node.is_one_of(&["linearGradient", "radialGradient", "pattern"])
}
