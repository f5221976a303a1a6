// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! SVG filter types.

use strict_num::PositiveF32;
use svgtypes::AspectRatio;

use crate::{BlendMode, Color, ImageRendering, Node, NonZeroRect, Opacity, Units};

/// A filter element.
///
/// `filter` element in the SVG.
#[derive(Clone, Debug)]
pub struct Filter {
    /// Element's ID.
    pub id: String,

    /// Region coordinate system units.
    ///
    /// `filterUnits` in the SVG.
    pub units: Units,

    /// Content coordinate system units.
    ///
    /// `primitiveUnits` in the SVG.
    pub primitive_units: Units,

    /// Filter region.
    ///
    /// `x`, `y`, `width` and `height` in the SVG.
    pub rect: NonZeroRect,

    /// A list of filter primitives in document order.
    pub primitives: Vec<Primitive>,
}

impl Filter {
    /// Resolves the filter region in user space.
    ///
    /// `bbox` is the bounding box of the filtered element.
    /// Returns `None` when `objectBoundingBox` units are used without one.
    pub fn region(&self, bbox: Option<NonZeroRect>) -> Option<NonZeroRect> {
        match self.units {
            Units::ObjectBoundingBox => Some(self.rect.bbox_transform(bbox?)),
            Units::UserSpaceOnUse => Some(self.rect),
        }
    }

    /// Resolves subregions of all primitives in user space.
    ///
    /// Each explicit `x`, `y`, `width` and `height` replaces the matching side
    /// of a default subregion. The default is the union of the input subregions,
    /// or the filter region for primitives without inputs and for ones
    /// reading a source graphic.
    pub fn subregions(&self, bbox: Option<NonZeroRect>) -> Option<Vec<NonZeroRect>> {
        let region = self.region(bbox)?;

        let mut list: Vec<NonZeroRect> = Vec::with_capacity(self.primitives.len());
        for (idx, fe) in self.primitives.iter().enumerate() {
            let published = &self.primitives[..idx];
            let default = default_subregion(&fe.kind, region, published, &list);

            let (x, y, width, height) = match self.primitive_units {
                Units::ObjectBoundingBox => {
                    let bbox = bbox?;
                    (
                        fe.x.map(|n| bbox.x() + n * bbox.width()),
                        fe.y.map(|n| bbox.y() + n * bbox.height()),
                        fe.width.map(|n| n * bbox.width()),
                        fe.height.map(|n| n * bbox.height()),
                    )
                }
                Units::UserSpaceOnUse => (fe.x, fe.y, fe.width, fe.height),
            };

            let rect = NonZeroRect::from_xywh(
                x.unwrap_or(default.x()),
                y.unwrap_or(default.y()),
                width.unwrap_or(default.width()),
                height.unwrap_or(default.height()),
            )
            .unwrap_or(default);
            list.push(rect);
        }

        Some(list)
    }
}

fn default_subregion(
    kind: &Kind,
    region: NonZeroRect,
    published: &[Primitive],
    subregions: &[NonZeroRect],
) -> NonZeroRect {
    let mut union: Option<NonZeroRect> = None;
    for input in kind.inputs() {
        let name = match input {
            Input::SourceGraphic | Input::SourceAlpha => return region,
            Input::Reference(ref name) => name,
        };

        // The latest primitive with the name wins.
        let r = published
            .iter()
            .rposition(|fe| fe.result == *name)
            .map(|idx| subregions[idx])
            .unwrap_or(region);

        union = Some(match union {
            Some(prev) => NonZeroRect::from_ltrb(
                prev.left().min(r.left()),
                prev.top().min(r.top()),
                prev.right().max(r.right()),
                prev.bottom().max(r.bottom()),
            )
            .unwrap_or(prev),
            None => r,
        });
    }

    union.unwrap_or(region)
}

/// A filter primitive element.
#[derive(Clone, Debug)]
pub struct Primitive {
    /// `x` in the SVG, in the `primitiveUnits` coordinate system.
    pub x: Option<f32>,

    /// `y` in the SVG, in the `primitiveUnits` coordinate system.
    pub y: Option<f32>,

    /// `width` in the SVG, in the `primitiveUnits` coordinate system.
    pub width: Option<f32>,

    /// `height` in the SVG, in the `primitiveUnits` coordinate system.
    pub height: Option<f32>,

    /// Color interpolation mode.
    ///
    /// `color-interpolation-filters` in the SVG.
    pub color_interpolation: ColorInterpolation,

    /// Assigned name for this filter primitive.
    ///
    /// `result` in the SVG. Always set, generated when missing.
    pub result: String,

    /// Filter primitive kind.
    pub kind: Kind,
}

/// A filter kind.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Kind {
    Blend(Blend),
    ColorMatrix(ColorMatrix),
    ComponentTransfer(ComponentTransfer),
    Composite(Composite),
    Flood(Flood),
    GaussianBlur(GaussianBlur),
    Image(Image),
    Merge(Merge),
    Morphology(Morphology),
    Offset(Offset),
    Tile(Tile),
    Turbulence(Turbulence),
}

impl Kind {
    /// Returns all inputs of the primitive.
    pub fn inputs(&self) -> impl Iterator<Item = &Input> {
        let list: Vec<&Input> = match self {
            Kind::Blend(ref fe) => vec![&fe.input1, &fe.input2],
            Kind::ColorMatrix(ref fe) => vec![&fe.input],
            Kind::ComponentTransfer(ref fe) => vec![&fe.input],
            Kind::Composite(ref fe) => vec![&fe.input1, &fe.input2],
            Kind::Flood(_) => Vec::new(),
            Kind::GaussianBlur(ref fe) => vec![&fe.input],
            Kind::Image(_) => Vec::new(),
            Kind::Merge(ref fe) => fe.inputs.iter().collect(),
            Kind::Morphology(ref fe) => vec![&fe.input],
            Kind::Offset(ref fe) => vec![&fe.input],
            Kind::Tile(ref fe) => vec![&fe.input],
            Kind::Turbulence(_) => Vec::new(),
        };

        list.into_iter()
    }

    /// Returns the SVG element name of the primitive.
    pub fn name(&self) -> &'static str {
        match self {
            Kind::Blend(_) => "feBlend",
            Kind::ColorMatrix(_) => "feColorMatrix",
            Kind::ComponentTransfer(_) => "feComponentTransfer",
            Kind::Composite(_) => "feComposite",
            Kind::Flood(_) => "feFlood",
            Kind::GaussianBlur(_) => "feGaussianBlur",
            Kind::Image(_) => "feImage",
            Kind::Merge(_) => "feMerge",
            Kind::Morphology(_) => "feMorphology",
            Kind::Offset(_) => "feOffset",
            Kind::Tile(_) => "feTile",
            Kind::Turbulence(_) => "feTurbulence",
        }
    }
}

/// Identifies input for a filter primitive.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub enum Input {
    SourceGraphic,
    SourceAlpha,
    Reference(String),
}

/// A color interpolation mode.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ColorInterpolation {
    SRGB,
    LinearRGB,
}

impl Default for ColorInterpolation {
    fn default() -> Self {
        ColorInterpolation::LinearRGB
    }
}

/// A blend filter primitive.
///
/// `feBlend` element in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Blend {
    pub input1: Input,
    pub input2: Input,
    pub mode: BlendMode,
}

/// A color matrix filter primitive.
///
/// `feColorMatrix` element in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct ColorMatrix {
    pub input: Input,
    pub kind: ColorMatrixKind,
}

/// A color matrix filter primitive kind.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum ColorMatrixKind {
    Matrix(Vec<f32>), // Guarantee to have 20 numbers.
    Saturate(PositiveF32),
    HueRotate(f32),
    LuminanceToAlpha,
}

impl Default for ColorMatrixKind {
    fn default() -> Self {
        ColorMatrixKind::Matrix(vec![
            1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
        ])
    }
}

/// A component-wise remapping filter primitive.
///
/// `feComponentTransfer` element in the SVG.
#[derive(Clone, Debug)]
pub struct ComponentTransfer {
    /// `in` in the SVG.
    pub input: Input,

    /// `feFuncR` in the SVG.
    pub func_r: TransferFunction,

    /// `feFuncG` in the SVG.
    pub func_g: TransferFunction,

    /// `feFuncB` in the SVG.
    pub func_b: TransferFunction,

    /// `feFuncA` in the SVG.
    pub func_a: TransferFunction,
}

/// A transfer function used by `ComponentTransfer`.
#[derive(Clone, PartialEq, Debug)]
pub enum TransferFunction {
    /// Keeps a component as is.
    Identity,

    /// Applies a linear interpolation to a component.
    ///
    /// The number list can be empty.
    Table(Vec<f32>),

    /// Applies a step function to a component.
    ///
    /// The number list can be empty.
    Discrete(Vec<f32>),

    /// Applies a linear shift to a component.
    #[allow(missing_docs)]
    Linear { slope: f32, intercept: f32 },

    /// Applies an exponential shift to a component.
    #[allow(missing_docs)]
    Gamma {
        amplitude: f32,
        exponent: f32,
        offset: f32,
    },
}

/// A composite filter primitive.
///
/// `feComposite` element in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Composite {
    pub input1: Input,
    pub input2: Input,
    pub operator: CompositeOperator,
}

/// An images compositing operation.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum CompositeOperator {
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic { k1: f32, k2: f32, k3: f32, k4: f32 },
}

/// A flood filter primitive.
///
/// `feFlood` element in the SVG.
#[derive(Clone, Copy, Debug)]
pub struct Flood {
    /// `flood-color` in the SVG.
    pub color: Color,

    /// `flood-opacity` in the SVG.
    pub opacity: Opacity,
}

/// A Gaussian blur filter primitive.
///
/// `feGaussianBlur` element in the SVG.
#[derive(Clone, Debug)]
pub struct GaussianBlur {
    /// `in` in the SVG.
    pub input: Input,

    /// A standard deviation along the X-axis.
    ///
    /// `stdDeviation` in the SVG.
    pub std_dev_x: PositiveF32,

    /// A standard deviation along the Y-axis.
    ///
    /// `stdDeviation` in the SVG.
    pub std_dev_y: PositiveF32,
}

/// An image filter primitive.
///
/// `feImage` element in the SVG.
#[derive(Clone, Debug)]
pub struct Image {
    /// Value of the `preserveAspectRatio` attribute.
    pub aspect: AspectRatio,

    /// `image-rendering` in SVG.
    pub rendering_mode: ImageRendering,

    /// Image data.
    pub data: ImageKind,
}

/// Kind of the `feImage` data.
#[derive(Clone, Debug)]
pub enum ImageKind {
    /// An image data.
    Image(crate::ImageKind),

    /// A referenced element built as a node.
    Use(Node),
}

/// A merge filter primitive.
///
/// `feMerge` element in the SVG.
#[derive(Clone, Debug)]
pub struct Merge {
    /// List of `feMergeNode`'s in the SVG.
    pub inputs: Vec<Input>,
}

/// A morphology filter primitive.
///
/// `feMorphology` element in the SVG.
#[derive(Clone, Debug)]
pub struct Morphology {
    /// `in` in the SVG.
    pub input: Input,

    /// `operator` in the SVG.
    pub operator: MorphologyOperator,

    /// A filter radius along the X-axis.
    ///
    /// A value of zero disables the effect of the given filter primitive.
    pub radius_x: PositiveF32,

    /// A filter radius along the Y-axis.
    ///
    /// A value of zero disables the effect of the given filter primitive.
    pub radius_y: PositiveF32,
}

/// A morphology operation.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MorphologyOperator {
    Erode,
    Dilate,
}

/// An offset filter primitive.
///
/// `feOffset` element in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct Offset {
    pub input: Input,
    pub dx: f32,
    pub dy: f32,
}

/// A tile filter primitive.
///
/// `feTile` element in the SVG.
#[derive(Clone, Debug)]
pub struct Tile {
    /// `in` in the SVG.
    pub input: Input,
}

/// A turbulence generation filter primitive.
///
/// `feTurbulence` element in the SVG.
#[derive(Clone, Copy, Debug)]
pub struct Turbulence {
    /// `baseFrequency` in the SVG.
    pub base_frequency_x: PositiveF32,

    /// `baseFrequency` in the SVG.
    pub base_frequency_y: PositiveF32,

    /// `numOctaves` in the SVG.
    pub num_octaves: u32,

    /// `seed` in the SVG.
    pub seed: i32,

    /// `stitchTiles` in the SVG.
    pub stitch_tiles: bool,

    /// `type` in the SVG.
    pub kind: TurbulenceKind,
}

/// A turbulence kind for the `feTurbulence` filter.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TurbulenceKind {
    FractalNoise,
    Turbulence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_inputs() {
        let kind = Kind::Merge(Merge {
            inputs: vec![Input::SourceAlpha, Input::Reference("blur".to_string())],
        });

        let inputs: Vec<&Input> = kind.inputs().collect();
        assert_eq!(inputs, vec![&Input::SourceAlpha, &Input::Reference("blur".to_string())]);
        assert_eq!(kind.name(), "feMerge");
    }

    fn primitive(result: &str, x: Option<f32>, kind: Kind) -> Primitive {
        Primitive {
            x,
            y: None,
            width: None,
            height: None,
            color_interpolation: ColorInterpolation::default(),
            result: result.to_string(),
            kind,
        }
    }

    fn flood() -> Kind {
        Kind::Flood(Flood {
            color: Color::black(),
            opacity: Opacity::ONE,
        })
    }

    fn offset(input: Input) -> Kind {
        Kind::Offset(Offset {
            input,
            dx: 0.0,
            dy: 0.0,
        })
    }

    fn filter(units: Units, primitive_units: Units, primitives: Vec<Primitive>) -> Filter {
        Filter {
            id: "f".to_string(),
            units,
            primitive_units,
            rect: NonZeroRect::from_xywh(-0.1, -0.1, 1.2, 1.2).unwrap(),
            primitives,
        }
    }

    #[test]
    fn subregions_with_default_units() {
        let filter = filter(
            Units::ObjectBoundingBox,
            Units::UserSpaceOnUse,
            vec![
                primitive("a", Some(10.0), flood()),
                primitive("b", None, offset(Input::Reference("a".to_string()))),
                primitive("c", None, offset(Input::SourceGraphic)),
            ],
        );
        let bbox = NonZeroRect::from_xywh(0.0, 0.0, 100.0, 50.0).unwrap();

        let region = filter.region(Some(bbox)).unwrap();
        assert_eq!(region, NonZeroRect::from_xywh(-10.0, -5.0, 120.0, 60.0).unwrap());

        let list = filter.subregions(Some(bbox)).unwrap();
        assert_eq!(list[0], NonZeroRect::from_xywh(10.0, -5.0, 120.0, 60.0).unwrap());
        assert_eq!(list[1], list[0]);
        assert_eq!(list[2], region);

        assert!(filter.subregions(None).is_none());
    }

    #[test]
    fn bounding_box_primitive_units() {
        let filter = filter(
            Units::ObjectBoundingBox,
            Units::ObjectBoundingBox,
            vec![primitive("a", Some(0.5), flood())],
        );
        let bbox = NonZeroRect::from_xywh(20.0, 0.0, 100.0, 50.0).unwrap();

        let list = filter.subregions(Some(bbox)).unwrap();
        assert_eq!(list[0], NonZeroRect::from_xywh(70.0, -5.0, 120.0, 60.0).unwrap());
    }
}
