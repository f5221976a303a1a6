// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgbridge-gvt` is a retained-mode graphics-node tree.

It is the output of the bridge layer and the input of a rasterizer.
Nodes are reference counted and mutable in place, which allows the bridge
to update a single facet of an already built tree.
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::too_many_arguments)]

pub mod filter;
mod geom;

use std::cell::Ref;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use strict_num::{self, ApproxEqUlps, NonZeroPositiveF32, NormalizedF32, PositiveF32};
pub use svgtypes::{Align, AspectRatio};
pub use tiny_skia_path;

pub use crate::geom::*;

/// An alias to `NormalizedF32`.
pub type Opacity = NormalizedF32;

/// A process-unique node identifier.
///
/// Assigned when a node payload is created and never reused.
/// The bridge layer keys its node-to-element binding by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct NodeUid(u64);

impl NodeUid {
    /// Allocates a new identifier.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeUid(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Default for NodeUid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeUid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An element units.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Units {
    UserSpaceOnUse,
    ObjectBoundingBox,
}

// `Units` cannot have a default value, because it changes depending on an element.

/// A visibility property.
///
/// `visibility` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Visibility {
    Visible,
    Hidden,
    Collapse,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Visible
    }
}

/// A shape rendering method.
///
/// `shape-rendering` attribute in the SVG.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum ShapeRendering {
    OptimizeSpeed,
    CrispEdges,
    GeometricPrecision,
}

impl Default for ShapeRendering {
    fn default() -> Self {
        Self::GeometricPrecision
    }
}

/// An image rendering method.
///
/// `image-rendering` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ImageRendering {
    OptimizeQuality,
    OptimizeSpeed,
}

impl Default for ImageRendering {
    fn default() -> Self {
        Self::OptimizeQuality
    }
}

/// A blending mode property.
///
/// `mix-blend-mode` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::Normal
    }
}

/// A spread method.
///
/// `spreadMethod` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum SpreadMethod {
    Pad,
    Reflect,
    Repeat,
}

impl Default for SpreadMethod {
    fn default() -> Self {
        Self::Pad
    }
}

/// A generic gradient.
#[derive(Clone, Debug)]
pub struct BaseGradient {
    /// Element's ID.
    pub id: String,

    /// Coordinate system units.
    ///
    /// `gradientUnits` in SVG.
    pub units: Units,

    /// Gradient transform.
    ///
    /// `gradientTransform` in SVG.
    pub transform: Transform,

    /// Gradient spreading method.
    ///
    /// `spreadMethod` in SVG.
    pub spread_method: SpreadMethod,

    /// A list of `stop` elements.
    ///
    /// Offsets are normalized and monotonic.
    pub stops: Vec<Stop>,
}

/// A linear gradient.
///
/// `linearGradient` element in SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct LinearGradient {
    /// Base gradient data.
    pub base: BaseGradient,

    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl std::ops::Deref for LinearGradient {
    type Target = BaseGradient;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// A radial gradient.
///
/// `radialGradient` element in SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub struct RadialGradient {
    /// Base gradient data.
    pub base: BaseGradient,

    pub cx: f32,
    pub cy: f32,
    pub r: PositiveF32,
    pub fx: f32,
    pub fy: f32,
}

impl std::ops::Deref for RadialGradient {
    type Target = BaseGradient;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// An alias to `NormalizedF32`.
pub type StopOffset = NormalizedF32;

/// Gradient's stop element.
///
/// `stop` element in SVG.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Stop {
    /// Gradient stop offset.
    ///
    /// `offset` in SVG.
    pub offset: StopOffset,

    /// Gradient stop color.
    ///
    /// `stop-color` in SVG.
    pub color: Color,

    /// Gradient stop opacity.
    ///
    /// `stop-opacity` in SVG.
    pub opacity: Opacity,
}

/// A pattern element.
///
/// `pattern` element in SVG.
#[derive(Clone, Debug)]
pub struct Pattern {
    /// Element's ID.
    pub id: String,

    /// Coordinate system units.
    ///
    /// `patternUnits` in SVG.
    pub units: Units,

    /// Content coordinate system units.
    ///
    /// `patternContentUnits` in SVG.
    pub content_units: Units,

    /// Pattern transform.
    ///
    /// `patternTransform` in SVG.
    pub transform: Transform,

    /// Pattern rectangle.
    ///
    /// `x`, `y`, `width` and `height` in SVG.
    pub rect: NonZeroRect,

    /// Pattern viewbox.
    pub view_box: Option<ViewBox>,

    /// Pattern children.
    ///
    /// The root node is always a `Group`.
    pub root: Node,
}

/// An alias to `NonZeroPositiveF32`.
pub type StrokeWidth = NonZeroPositiveF32;

/// A `stroke-miterlimit` value.
///
/// Just like `f32` but immutable and guarantee to be >=1.0.
#[derive(Clone, Copy, Debug)]
pub struct StrokeMiterlimit(f32);

impl StrokeMiterlimit {
    /// Creates a new `StrokeMiterlimit` value.
    #[inline]
    pub fn new(n: f32) -> Self {
        debug_assert!(n.is_finite());
        debug_assert!(n >= 1.0);

        let n = if !(n >= 1.0) { 1.0 } else { n };

        StrokeMiterlimit(n)
    }

    /// Returns an underlying value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Default for StrokeMiterlimit {
    #[inline]
    fn default() -> Self {
        StrokeMiterlimit::new(4.0)
    }
}

impl PartialEq for StrokeMiterlimit {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0.approx_eq_ulps(&other.0, 4)
    }
}

/// A line cap.
///
/// `stroke-linecap` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl Default for LineCap {
    fn default() -> Self {
        Self::Butt
    }
}

/// A line join.
///
/// `stroke-linejoin` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum LineJoin {
    Miter,
    MiterClip,
    Round,
    Bevel,
}

impl Default for LineJoin {
    fn default() -> Self {
        Self::Miter
    }
}

/// A stroke style.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Stroke {
    pub paint: Paint,
    pub dasharray: Option<Vec<f32>>,
    pub dashoffset: f32,
    pub miterlimit: StrokeMiterlimit,
    pub opacity: Opacity,
    pub width: StrokeWidth,
    pub linecap: LineCap,
    pub linejoin: LineJoin,
}

impl Stroke {
    /// Creates a stroke with default properties and the given width.
    pub fn new(paint: Paint, width: StrokeWidth) -> Self {
        Stroke {
            paint,
            dasharray: None,
            dashoffset: 0.0,
            miterlimit: StrokeMiterlimit::default(),
            opacity: Opacity::ONE,
            width,
            linecap: LineCap::default(),
            linejoin: LineJoin::default(),
        }
    }

    /// Converts into a `tiny_skia_path::Stroke` type.
    pub fn to_tiny_skia(&self) -> tiny_skia_path::Stroke {
        let mut stroke = tiny_skia_path::Stroke {
            width: self.width.get(),
            miter_limit: self.miterlimit.get(),
            line_cap: match self.linecap {
                LineCap::Butt => tiny_skia_path::LineCap::Butt,
                LineCap::Round => tiny_skia_path::LineCap::Round,
                LineCap::Square => tiny_skia_path::LineCap::Square,
            },
            line_join: match self.linejoin {
                LineJoin::Miter => tiny_skia_path::LineJoin::Miter,
                LineJoin::MiterClip => tiny_skia_path::LineJoin::MiterClip,
                LineJoin::Round => tiny_skia_path::LineJoin::Round,
                LineJoin::Bevel => tiny_skia_path::LineJoin::Bevel,
            },
            dash: None,
        };

        if let Some(ref list) = self.dasharray {
            stroke.dash = tiny_skia_path::StrokeDash::new(list.clone(), self.dashoffset);
        }

        stroke
    }
}

/// A fill rule.
///
/// `fill-rule` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

impl Default for FillRule {
    fn default() -> Self {
        Self::NonZero
    }
}

/// A fill style.
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Debug)]
pub struct Fill {
    pub paint: Paint,
    pub opacity: Opacity,
    pub rule: FillRule,
}

impl Fill {
    /// Creates a `Fill` from `Paint`.
    ///
    /// `opacity` and `rule` will be set to default values.
    pub fn from_paint(paint: Paint) -> Self {
        Fill {
            paint,
            ..Fill::default()
        }
    }
}

impl Default for Fill {
    fn default() -> Self {
        Fill {
            paint: Paint::Color(Color::black()),
            opacity: Opacity::ONE,
            rule: FillRule::default(),
        }
    }
}

/// A 8-bit RGB color.
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    /// Constructs a new `Color` from RGB values.
    #[inline]
    pub fn new_rgb(red: u8, green: u8, blue: u8) -> Color {
        Color { red, green, blue }
    }

    /// Constructs a new `Color` set to black.
    #[inline]
    pub fn black() -> Color {
        Color::new_rgb(0, 0, 0)
    }

    /// Constructs a new `Color` set to white.
    #[inline]
    pub fn white() -> Color {
        Color::new_rgb(255, 255, 255)
    }
}

/// A paint style.
///
/// `paint` value type in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum Paint {
    Color(Color),
    LinearGradient(Rc<LinearGradient>),
    RadialGradient(Rc<RadialGradient>),
    Pattern(Rc<Pattern>),
}

impl Paint {
    /// Returns paint server units.
    ///
    /// Returns `None` for `Color`.
    #[inline]
    pub fn units(&self) -> Option<Units> {
        match self {
            Self::Color(_) => None,
            Self::LinearGradient(ref lg) => Some(lg.units),
            Self::RadialGradient(ref rg) => Some(rg.units),
            Self::Pattern(ref patt) => Some(patt.units),
        }
    }
}

impl PartialEq for Paint {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Color(lc), Self::Color(rc)) => lc == rc,
            (Self::LinearGradient(ref lg1), Self::LinearGradient(ref lg2)) => Rc::ptr_eq(lg1, lg2),
            (Self::RadialGradient(ref rg1), Self::RadialGradient(ref rg2)) => Rc::ptr_eq(rg1, rg2),
            (Self::Pattern(ref p1), Self::Pattern(ref p2)) => Rc::ptr_eq(p1, p2),
            _ => false,
        }
    }
}

/// A clip-path element.
///
/// `clipPath` element in SVG.
#[derive(Clone, Debug)]
pub struct ClipPath {
    /// Element's ID.
    pub id: String,

    /// Coordinate system units.
    ///
    /// `clipPathUnits` in SVG.
    pub units: Units,

    /// Clip path transform.
    ///
    /// `transform` in SVG.
    pub transform: Transform,

    /// Additional clip path.
    ///
    /// `clip-path` in SVG.
    pub clip_path: Option<Rc<ClipPath>>,

    /// Clip path children.
    ///
    /// The root node is always a `Group`.
    pub root: Node,
}

/// A mask type.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MaskType {
    /// Indicates that the luminance values of the mask should be used.
    Luminance,
    /// Indicates that the alpha values of the mask should be used.
    Alpha,
}

impl Default for MaskType {
    fn default() -> Self {
        Self::Luminance
    }
}

/// A mask element.
///
/// `mask` element in SVG.
#[derive(Clone, Debug)]
pub struct Mask {
    /// Element's ID.
    pub id: String,

    /// Coordinate system units.
    ///
    /// `maskUnits` in SVG.
    pub units: Units,

    /// Content coordinate system units.
    ///
    /// `maskContentUnits` in SVG.
    pub content_units: Units,

    /// Mask rectangle.
    ///
    /// `x`, `y`, `width` and `height` in SVG.
    pub rect: NonZeroRect,

    /// Mask type.
    ///
    /// `mask-type` in SVG.
    pub kind: MaskType,

    /// Additional mask.
    ///
    /// `mask` in SVG.
    pub mask: Option<Rc<Mask>>,

    /// Mask children.
    ///
    /// The root node is always a `Group`.
    pub root: Node,
}

/// Marker units.
///
/// `markerUnits` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MarkerUnits {
    StrokeWidth,
    UserSpaceOnUse,
}

/// Marker orientation.
///
/// `orient` attribute in the SVG.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum MarkerOrient {
    Auto,
    AutoStartReverse,
    Angle(f32),
}

/// A marker element.
///
/// `marker` element in SVG.
#[derive(Clone, Debug)]
pub struct Marker {
    /// Element's ID.
    pub id: String,

    /// `markerUnits` in SVG.
    pub units: MarkerUnits,

    /// `refX` and `refY` in SVG.
    pub ref_point: (f32, f32),

    /// `markerWidth` and `markerHeight` in SVG.
    pub size: Size,

    /// `orient` in SVG.
    pub orient: MarkerOrient,

    /// `viewBox` and `preserveAspectRatio` in SVG.
    pub view_box: Option<ViewBox>,

    /// Clipping rectangle, set when `overflow` clips the content.
    pub clip_rect: Option<NonZeroRect>,

    /// Marker children.
    ///
    /// The root node is always a `Group`.
    pub root: Node,
}

/// Markers resolved for a single shape.
#[derive(Clone, Debug)]
pub struct MarkerSet {
    /// `marker-start` in SVG.
    pub start: Option<Rc<Marker>>,

    /// `marker-mid` in SVG.
    pub mid: Option<Rc<Marker>>,

    /// `marker-end` in SVG.
    pub end: Option<Rc<Marker>>,

    /// Marker instances placed at the shape vertices.
    ///
    /// A `Group` with one child group per vertex.
    pub root: Node,
}

/// Node's kind.
#[allow(missing_docs)]
#[derive(Clone, Debug)]
pub enum NodeKind {
    Group(Group),
    Shape(Shape),
    Image(Image),
}

impl NodeKind {
    /// Returns node's unique identifier.
    pub fn uid(&self) -> NodeUid {
        match self {
            NodeKind::Group(ref e) => e.uid,
            NodeKind::Shape(ref e) => e.uid,
            NodeKind::Image(ref e) => e.uid,
        }
    }

    /// Returns node's ID.
    pub fn id(&self) -> &str {
        match self {
            NodeKind::Group(ref e) => e.id.as_str(),
            NodeKind::Shape(ref e) => e.id.as_str(),
            NodeKind::Image(ref e) => e.id.as_str(),
        }
    }

    /// Returns node's transform.
    pub fn transform(&self) -> Transform {
        match self {
            NodeKind::Group(ref e) => e.transform,
            NodeKind::Shape(ref e) => e.transform,
            NodeKind::Image(ref e) => e.transform,
        }
    }

    /// Sets node's transform.
    pub fn set_transform(&mut self, ts: Transform) {
        match self {
            NodeKind::Group(ref mut e) => e.transform = ts,
            NodeKind::Shape(ref mut e) => e.transform = ts,
            NodeKind::Image(ref mut e) => e.transform = ts,
        }
    }

    /// Returns node's compositing effects.
    pub fn effects(&self) -> &Effects {
        match self {
            NodeKind::Group(ref e) => &e.effects,
            NodeKind::Shape(ref e) => &e.effects,
            NodeKind::Image(ref e) => &e.effects,
        }
    }

    /// Returns node's compositing effects for modification.
    pub fn effects_mut(&mut self) -> &mut Effects {
        match self {
            NodeKind::Group(ref mut e) => &mut e.effects,
            NodeKind::Shape(ref mut e) => &mut e.effects,
            NodeKind::Image(ref mut e) => &mut e.effects,
        }
    }

    /// Returns a short kind name.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Group(_) => "group",
            NodeKind::Shape(_) => "shape",
            NodeKind::Image(_) => "image",
        }
    }
}

/// Compositing effects shared by all node kinds.
#[derive(Clone, Debug)]
pub struct Effects {
    /// Node opacity.
    ///
    /// After the node is rendered we should combine
    /// it with a parent node using the specified opacity.
    pub opacity: Opacity,

    /// `mix-blend-mode` in SVG.
    pub blend_mode: BlendMode,

    /// `isolation` in SVG.
    pub isolate: bool,

    /// Element's clip path.
    pub clip_path: Option<Rc<ClipPath>>,

    /// Element's mask.
    pub mask: Option<Rc<Mask>>,

    /// Element's filters.
    pub filters: Vec<Rc<filter::Filter>>,
}

impl Default for Effects {
    fn default() -> Self {
        Effects {
            opacity: Opacity::ONE,
            blend_mode: BlendMode::Normal,
            isolate: false,
            clip_path: None,
            mask: None,
            filters: Vec::new(),
        }
    }
}

impl Effects {
    /// Checks if the node should be rendered onto a separate layer.
    pub fn should_isolate(&self) -> bool {
        self.isolate
            || self.opacity != Opacity::ONE
            || self.clip_path.is_some()
            || self.mask.is_some()
            || !self.filters.is_empty()
            || self.blend_mode != BlendMode::Normal
    }
}

/// A group container.
///
/// `g`, `svg`, `use`, `switch` and other container elements in SVG.
#[derive(Clone, Debug)]
pub struct Group {
    /// Node's unique identifier.
    pub uid: NodeUid,

    /// Element's ID.
    ///
    /// Taken from the SVG itself.
    /// Isn't automatically generated.
    /// Can be empty.
    pub id: String,

    /// Element transform.
    pub transform: Transform,

    /// Compositing effects.
    pub effects: Effects,

    /// Viewport clipping rectangle.
    ///
    /// Set by `svg`, `symbol` and `foreignObject` when `overflow` is not visible.
    pub clip_rect: Option<NonZeroRect>,
}

impl Default for Group {
    fn default() -> Self {
        Group {
            uid: NodeUid::new(),
            id: String::new(),
            transform: Transform::default(),
            effects: Effects::default(),
            clip_rect: None,
        }
    }
}

/// Representation of the [`paint-order`] property.
///
/// [`paint-order`]: https://www.w3.org/TR/SVG2/painting.html#PaintOrder
#[derive(Clone, Copy, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum PaintOrder {
    FillAndStroke,
    StrokeAndFill,
}

impl Default for PaintOrder {
    fn default() -> Self {
        Self::FillAndStroke
    }
}

/// A shape element.
///
/// `rect`, `circle`, `ellipse`, `line`, `polyline`, `polygon` and `path` in SVG.
#[derive(Clone, Debug)]
pub struct Shape {
    /// Node's unique identifier.
    pub uid: NodeUid,

    /// Element's ID.
    pub id: String,

    /// Element transform.
    pub transform: Transform,

    /// Compositing effects.
    pub effects: Effects,

    /// Element visibility.
    pub visibility: Visibility,

    /// Fill style.
    pub fill: Option<Fill>,

    /// Stroke style.
    pub stroke: Option<Stroke>,

    /// Resolved markers.
    pub markers: Option<MarkerSet>,

    /// Fill and stroke paint order.
    ///
    /// `paint-order` in SVG.
    pub paint_order: PaintOrder,

    /// Rendering mode.
    ///
    /// `shape-rendering` in SVG.
    pub rendering_mode: ShapeRendering,

    /// Shape geometry in user space.
    ///
    /// `None` means that rendering is disabled,
    /// like for a zero-sized `rect` or a zero-radius `circle`.
    pub shape: Option<Rc<tiny_skia_path::Path>>,
}

impl Default for Shape {
    fn default() -> Self {
        Shape {
            uid: NodeUid::new(),
            id: String::new(),
            transform: Transform::default(),
            effects: Effects::default(),
            visibility: Visibility::Visible,
            fill: None,
            stroke: None,
            markers: None,
            paint_order: PaintOrder::default(),
            rendering_mode: ShapeRendering::default(),
            shape: None,
        }
    }
}

impl Shape {
    /// Calculates shape's stroke bounding box.
    ///
    /// This operation is expensive.
    pub fn stroke_bounding_box(&self) -> Option<NonZeroRect> {
        let path = self.shape.as_ref()?;
        let stroke = self.stroke.as_ref()?;
        let mut stroke = stroke.to_tiny_skia();
        // Dashes are not part of the bounding box.
        stroke.dash = None;

        path.stroke(&stroke, 1.0)?
            .compute_tight_bounds()
            .and_then(|r| r.to_non_zero_rect())
    }
}

/// A raster image format.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ImageFormat {
    PNG,
    JPEG,
    GIF,
    WEBP,
}

/// An embedded image kind.
#[derive(Clone)]
pub enum ImageKind {
    /// Raw image data. Should be decoded by the caller.
    Raster {
        /// Encoding of `data`.
        format: ImageFormat,
        /// Intrinsic size in pixels.
        size: Size,
        /// Encoded data.
        data: Arc<Vec<u8>>,
    },
    /// A built SVG tree. The node is always a `Group`.
    Svg(Node),
}

impl std::fmt::Debug for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ImageKind::Raster { format, size, .. } => {
                write!(f, "ImageKind::Raster({:?}, {}x{})", format, size.width(), size.height())
            }
            ImageKind::Svg(_) => f.write_str("ImageKind::Svg(..)"),
        }
    }
}

/// An image element.
///
/// `image` element in SVG.
#[derive(Clone, Debug)]
pub struct Image {
    /// Node's unique identifier.
    pub uid: NodeUid,

    /// Element's ID.
    pub id: String,

    /// Element transform.
    pub transform: Transform,

    /// Compositing effects.
    pub effects: Effects,

    /// Element visibility.
    pub visibility: Visibility,

    /// An image rectangle in which it should be fit.
    ///
    /// Combination of the `x`, `y`, `width`, `height` and `preserveAspectRatio`
    /// attributes.
    pub view_box: ViewBox,

    /// Rendering mode.
    ///
    /// `image-rendering` in SVG.
    pub rendering_mode: ImageRendering,

    /// Image data.
    pub kind: ImageKind,
}

/// Alias for `rctree::Node<NodeKind>`.
pub type Node = rctree::Node<NodeKind>;

/// A nodes tree container.
#[derive(Clone, Debug)]
pub struct Tree {
    /// Image size.
    ///
    /// `width` and `height` in SVG.
    pub size: Size,

    /// SVG viewbox.
    ///
    /// `viewBox` and `preserveAspectRatio` in SVG.
    pub view_box: ViewBox,

    /// The root element of the tree.
    ///
    /// The root node is always a `Group`.
    pub root: Node,
}

impl Tree {
    /// Returns a node by ID.
    ///
    /// If an empty ID is provided, than this method will always return `None`.
    pub fn node_by_id(&self, id: &str) -> Option<Node> {
        if id.is_empty() {
            return None;
        }

        self.root.descendants().find(|node| &*node.id() == id)
    }

    /// Returns a node by its unique identifier.
    pub fn node_by_uid(&self, uid: NodeUid) -> Option<Node> {
        self.root.descendants().find(|node| node.uid() == uid)
    }
}

/// Additional `Node` methods.
///
/// This is the interface a rasterizer consumes.
pub trait NodeExt {
    /// Returns node's unique identifier.
    fn uid(&self) -> NodeUid;

    /// Returns node's ID.
    fn id(&self) -> Ref<str>;

    /// Returns node's transform.
    fn transform(&self) -> Transform;

    /// Returns node's absolute transform.
    fn abs_transform(&self) -> Transform;

    /// Appends `kind` as a node child.
    fn append_kind(&self, kind: NodeKind) -> Node;

    /// Calculates node's bounding box in its own user space.
    ///
    /// The node's own transform is not applied, children transforms are.
    /// Returns `None` for nodes without geometry.
    fn bounding_box(&self) -> Option<Rect>;

    /// Calculates node's bounding box in the root coordinate system.
    fn abs_bounding_box(&self) -> Option<Rect>;

    /// Returns node's outline in its own user space.
    fn outline(&self) -> Option<tiny_skia_path::Path>;

    /// Returns shape geometry.
    ///
    /// Always `None` for groups and images.
    fn shape(&self) -> Option<Rc<tiny_skia_path::Path>>;

    /// Sets shape geometry.
    ///
    /// Returns `false` when the node is not a shape.
    fn set_shape(&self, shape: Option<Rc<tiny_skia_path::Path>>) -> bool;

    /// Checks that the node is a group.
    fn is_group(&self) -> bool;
}

impl NodeExt for Node {
    #[inline]
    fn uid(&self) -> NodeUid {
        self.borrow().uid()
    }

    #[inline]
    fn id(&self) -> Ref<str> {
        Ref::map(self.borrow(), |v| v.id())
    }

    #[inline]
    fn transform(&self) -> Transform {
        self.borrow().transform()
    }

    fn abs_transform(&self) -> Transform {
        let mut ts_list = Vec::new();
        for p in self.ancestors() {
            ts_list.push(p.transform());
        }

        let mut abs_ts = Transform::default();
        for ts in ts_list.iter().rev() {
            abs_ts = abs_ts.pre_concat(*ts);
        }

        abs_ts
    }

    #[inline]
    fn append_kind(&self, kind: NodeKind) -> Node {
        let new_node = Node::new(kind);
        self.append(new_node.clone());
        new_node
    }

    fn bounding_box(&self) -> Option<Rect> {
        calc_node_bbox(self, Transform::default())
    }

    fn abs_bounding_box(&self) -> Option<Rect> {
        calc_node_bbox(self, self.abs_transform())
    }

    fn outline(&self) -> Option<tiny_skia_path::Path> {
        calc_node_outline(self, Transform::default())
    }

    fn shape(&self) -> Option<Rc<tiny_skia_path::Path>> {
        match *self.borrow() {
            NodeKind::Shape(ref shape) => shape.shape.clone(),
            _ => None,
        }
    }

    fn set_shape(&self, shape: Option<Rc<tiny_skia_path::Path>>) -> bool {
        match *self.borrow_mut() {
            NodeKind::Shape(ref mut s) => {
                s.shape = shape;
                true
            }
            _ => false,
        }
    }

    fn is_group(&self) -> bool {
        matches!(*self.borrow(), NodeKind::Group(_))
    }
}

fn calc_node_bbox(node: &Node, ts: Transform) -> Option<Rect> {
    match *node.borrow() {
        NodeKind::Shape(ref shape) => {
            let path = shape.shape.as_ref()?;
            let bounds = path
                .compute_tight_bounds()
                .unwrap_or_else(|| path.bounds());
            if ts.is_identity() {
                Some(bounds)
            } else {
                bounds.transform(ts)
            }
        }
        NodeKind::Image(ref img) => img.view_box.rect.transform(ts).map(|r| r.to_rect()),
        NodeKind::Group(_) => node
            .children()
            .filter_map(|child| calc_node_bbox(&child, ts.pre_concat(child.transform())))
            .reduce(rect_union),
    }
}

fn calc_node_outline(node: &Node, ts: Transform) -> Option<tiny_skia_path::Path> {
    match *node.borrow() {
        NodeKind::Shape(ref shape) => {
            let path = shape.shape.as_ref()?;
            (**path).clone().transform(ts)
        }
        NodeKind::Image(ref img) => {
            tiny_skia_path::PathBuilder::from_rect(img.view_box.rect.to_rect()).transform(ts)
        }
        NodeKind::Group(_) => {
            let mut builder = tiny_skia_path::PathBuilder::new();
            for child in node.children() {
                let child_ts = ts.pre_concat(child.transform());
                if let Some(path) = calc_node_outline(&child, child_ts) {
                    builder.push_path(&path);
                }
            }

            builder.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_shape(x: f32, y: f32, w: f32, h: f32) -> NodeKind {
        let rect = Rect::from_xywh(x, y, w, h).unwrap();
        NodeKind::Shape(Shape {
            shape: Some(Rc::new(tiny_skia_path::PathBuilder::from_rect(rect))),
            ..Shape::default()
        })
    }

    #[test]
    fn uids_are_unique() {
        assert_ne!(NodeUid::new(), NodeUid::new());
        assert_ne!(Group::default().uid, Group::default().uid);
    }

    #[test]
    fn group_bbox_folds_child_transforms() {
        let root = Node::new(NodeKind::Group(Group::default()));
        root.append_kind(rect_shape(0.0, 0.0, 10.0, 10.0));
        let moved = root.append_kind(rect_shape(0.0, 0.0, 10.0, 10.0));
        moved
            .borrow_mut()
            .set_transform(Transform::from_translate(20.0, 5.0));

        assert_eq!(root.bounding_box(), Rect::from_xywh(0.0, 0.0, 30.0, 15.0));
        assert_eq!(moved.bounding_box(), Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
        assert_eq!(moved.abs_bounding_box(), Rect::from_xywh(20.0, 5.0, 10.0, 10.0));
    }

    #[test]
    fn disabled_shape_has_no_bbox() {
        let root = Node::new(NodeKind::Group(Group::default()));
        let shape = root.append_kind(NodeKind::Shape(Shape::default()));
        assert!(shape.bounding_box().is_none());
        assert!(shape.outline().is_none());
        assert!(root.bounding_box().is_none());
    }

    #[test]
    fn set_shape_on_group_is_refused() {
        let root = Node::new(NodeKind::Group(Group::default()));
        assert!(!root.set_shape(None));
        assert!(root.is_group());
    }

    #[test]
    fn stroke_extends_the_bbox() {
        let kind = rect_shape(0.0, 0.0, 10.0, 10.0);
        let shape = match kind {
            NodeKind::Shape(mut shape) => {
                let width = StrokeWidth::new(2.0).unwrap();
                shape.stroke = Some(Stroke::new(Paint::Color(Color::black()), width));
                shape
            }
            _ => unreachable!(),
        };

        let bbox = shape.stroke_bounding_box().unwrap();
        assert!((bbox.x() + 1.0).abs() < 0.001);
        assert!((bbox.width() - 12.0).abs() < 0.001);
        assert!(!shape.effects.should_isolate());
    }

    #[test]
    fn nodes_are_found_by_uid() {
        let root = Node::new(NodeKind::Group(Group::default()));
        let child = root.append_kind(rect_shape(0.0, 0.0, 10.0, 10.0));
        let tree = Tree {
            size: Size::from_wh(10.0, 10.0).unwrap(),
            view_box: ViewBox {
                rect: NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap(),
                aspect: AspectRatio::default(),
            },
            root,
        };

        assert!(tree.node_by_uid(child.uid()) == Some(child));
        assert!(tree.node_by_uid(NodeUid::new()).is_none());
    }

    #[test]
    fn paint_servers_compare_by_pointer() {
        let grad = Rc::new(LinearGradient {
            base: BaseGradient {
                id: "lg".to_string(),
                units: Units::ObjectBoundingBox,
                transform: Transform::default(),
                spread_method: SpreadMethod::Pad,
                stops: Vec::new(),
            },
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 0.0,
        });

        let copy = Rc::new((*grad).clone());
        assert_eq!(Paint::LinearGradient(grad.clone()), Paint::LinearGradient(grad.clone()));
        assert_ne!(Paint::LinearGradient(grad), Paint::LinearGradient(copy));
    }
}
