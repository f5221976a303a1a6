// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use svgbridge_dom::SvgNode;
use svgbridge_gvt::tiny_skia_path::{self, Point};
use svgbridge_gvt::{
    ApproxEqUlps, ApproxZeroUlps, AspectRatio, Group, Marker, MarkerOrient, MarkerSet,
    MarkerUnits, Node, NodeKind, NodeUid, Size, Stroke, Transform, Units, ViewBox,
};
use svgtypes::Length;

use super::{Bridge, Fragment, FragmentBridge};
use crate::reference::resolve_local_link;
use crate::svgnode_ext::SvgNodeExt;
use crate::{builder, BridgeContext, BridgeError};

// Similar to `tiny_skia_path::PathSegment`, but without the `QuadTo`.
#[derive(Copy, Clone, Debug)]
enum Segment {
    MoveTo(Point),
    LineTo(Point),
    CubicTo(Point, Point, Point),
    Close,
}

#[derive(Clone, Copy)]
enum MarkerKind {
    Start,
    Middle,
    End,
}

const PROPERTIES: [(&str, MarkerKind); 3] = [
    ("marker-start", MarkerKind::Start),
    ("marker-mid", MarkerKind::Middle),
    ("marker-end", MarkerKind::End),
];

pub(crate) struct MarkerBridge;

impl Bridge for MarkerBridge {
    fn local_name(&self) -> &str {
        "marker"
    }

    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        Some(self)
    }
}

impl FragmentBridge for MarkerBridge {
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        Ok(convert(ctx, element)?.map(|m| Fragment::Marker(Rc::new(m))))
    }
}

fn convert(ctx: &mut BridgeContext, element: SvgNode) -> Result<Option<Marker>, BridgeError> {
    let width = ctx.units.length(
        element,
        "markerWidth",
        Units::UserSpaceOnUse,
        Length::new_number(3.0),
    )?;
    let height = ctx.units.length(
        element,
        "markerHeight",
        Units::UserSpaceOnUse,
        Length::new_number(3.0),
    )?;

    if width < 0.0 {
        return Err(BridgeError::illegal_value(
            element,
            "markerWidth",
            element.raw_attribute("markerWidth").unwrap_or_default(),
        ));
    }

    if height < 0.0 {
        return Err(BridgeError::illegal_value(
            element,
            "markerHeight",
            element.raw_attribute("markerHeight").unwrap_or_default(),
        ));
    }

    // A zero size disables rendering of the marker.
    let size = match Size::from_wh(width, height) {
        Some(v) => v,
        None => return Ok(None),
    };

    let view_box = element.parse_viewbox().map(|rect| ViewBox {
        rect,
        aspect: element
            .attribute::<AspectRatio>("preserveAspectRatio")
            .unwrap_or_default(),
    });

    // `overflow` is `hidden` by default.
    let clip_rect = match element.raw_attribute("overflow") {
        None | Some("hidden") | Some("scroll") => match view_box {
            Some(vb) => Some(vb.rect),
            None => Some(size.to_non_zero_rect(0.0, 0.0)),
        },
        _ => None,
    };

    let viewport = match view_box {
        Some(vb) => vb.rect.size(),
        None => size,
    };

    let root = Node::new(NodeKind::Group(Group::default()));
    ctx.units.push_viewport(viewport);
    builder::build_children(ctx, element.element_children(), &root);
    ctx.units.pop_viewport();

    Ok(Some(Marker {
        id: element.element_id().to_string(),
        units: element
            .strict_keyword("markerUnits")?
            .unwrap_or(MarkerUnits::StrokeWidth),
        ref_point: (
            ctx.units.user_length(element, "refX", Length::zero())?,
            ctx.units.user_length(element, "refY", Length::zero())?,
        ),
        size,
        orient: convert_orientation(element),
        view_box,
        clip_rect,
        root,
    }))
}

fn convert_orientation(node: SvgNode) -> MarkerOrient {
    match node.raw_attribute("orient") {
        Some("auto") => MarkerOrient::Auto,
        Some("auto-start-reverse") => MarkerOrient::AutoStartReverse,
        _ => match node.attribute::<svgtypes::Angle>("orient") {
            Some(angle) => MarkerOrient::Angle(angle.to_degrees() as f32),
            None => MarkerOrient::Angle(0.0),
        },
    }
}

/// Checks that a shape references at least one marker.
pub(crate) fn is_valid(element: SvgNode) -> bool {
    // `marker-*` attributes cannot be set on shapes inside a `clipPath`.
    if element.ancestors().any(|n| n.has_tag_name("clipPath")) {
        return false;
    }

    PROPERTIES
        .iter()
        .any(|(name, _)| element.ancestors().any(|n| n.has_attribute(name)))
}

/// Resolves markers of a shape and places their instances at the path vertices.
///
/// Returns `None` when no marker could be resolved.
pub(crate) fn resolve_markers(
    ctx: &mut BridgeContext,
    element: SvgNode,
    path: &Rc<tiny_skia_path::Path>,
    stroke: Option<&Stroke>,
) -> Option<MarkerSet> {
    let mut markers: [Option<Rc<Marker>>; 3] = [None, None, None];
    for (i, (name, _)) in PROPERTIES.iter().enumerate() {
        markers[i] = resolve_marker(ctx, element, name);
    }

    if markers.iter().all(|m| m.is_none()) {
        return None;
    }

    let stroke_width = match stroke {
        Some(stroke) => stroke.width.get(),
        None => ctx.units.resolve_length(element, "stroke-width", 1.0),
    };

    let segments = to_segments(path);
    let root = Node::new(NodeKind::Group(Group::default()));
    for (marker, (_, kind)) in markers.iter().zip(PROPERTIES.iter()) {
        if let Some(marker) = marker {
            let scale = match marker.units {
                MarkerUnits::UserSpaceOnUse => 1.0,
                MarkerUnits::StrokeWidth => stroke_width,
            };

            if scale <= 0.0 || !scale.is_finite() {
                continue;
            }

            draw_markers(&segments, *kind, |p, idx| {
                place_instance(&root, marker, &segments, p, idx, scale)
            });
        }
    }

    let [start, mid, end] = markers;
    Some(MarkerSet {
        start,
        mid,
        end,
        root,
    })
}

fn resolve_marker(ctx: &mut BridgeContext, element: SvgNode, name: &str) -> Option<Rc<Marker>> {
    let defined_by = element.ancestors().find(|n| n.has_attribute(name))?;
    let link = match resolve_local_link(defined_by, name) {
        Ok(v) => v?,
        Err(e) => {
            ctx.report(e);
            return None;
        }
    };

    if !link.has_tag_name("marker") {
        log::warn!("'{}' cannot be used as a marker.", link.tag_name().unwrap_or_default());
        return None;
    }

    match ctx.fragment(element, name, link) {
        Ok(Some(Fragment::Marker(marker))) => Some(marker),
        Ok(_) => None,
        Err(e) => {
            ctx.report(e);
            None
        }
    }
}

fn place_instance(
    root: &Node,
    marker: &Marker,
    segments: &[Segment],
    p: Point,
    idx: usize,
    scale: f32,
) {
    let mut ts = Transform::from_translate(p.x, p.y);

    let angle = match marker.orient {
        MarkerOrient::AutoStartReverse if idx == 0 => {
            (calc_vertex_angle(segments, idx) + 180.0) % 360.0
        }
        MarkerOrient::Auto | MarkerOrient::AutoStartReverse => calc_vertex_angle(segments, idx),
        MarkerOrient::Angle(angle) => angle,
    };

    if !angle.approx_zero_ulps(4) {
        ts = ts.pre_rotate(angle);
    }

    match marker.view_box {
        Some(vb) => {
            let size = Size::from_wh(marker.size.width() * scale, marker.size.height() * scale);
            if let Some(size) = size {
                let (sx, sy) = vb.to_transform(size).get_scale();
                ts = ts.pre_scale(sx, sy);
            }
        }
        None => ts = ts.pre_scale(scale, scale),
    }

    ts = ts.pre_translate(-marker.ref_point.0, -marker.ref_point.1);

    let instance = Node::new(NodeKind::Group(Group {
        transform: ts,
        clip_rect: marker.clip_rect,
        ..Group::default()
    }));

    for child in marker.root.children() {
        instance.append(copy_subtree(&child));
    }

    if instance.has_children() {
        root.append(instance);
    }
}

// Marker content is shared by all instances, but every node must have its own uid.
fn copy_subtree(node: &Node) -> Node {
    let mut kind = node.borrow().clone();
    match kind {
        NodeKind::Group(ref mut g) => g.uid = NodeUid::new(),
        NodeKind::Shape(ref mut s) => s.uid = NodeUid::new(),
        NodeKind::Image(ref mut i) => i.uid = NodeUid::new(),
    }

    let copy = Node::new(kind);
    for child in node.children() {
        copy.append(copy_subtree(&child));
    }

    copy
}

fn to_segments(path: &tiny_skia_path::Path) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::with_capacity(path.len());
    let mut prev = Point::zero();
    let mut prev_move = Point::zero();
    for seg in path.segments() {
        match seg {
            tiny_skia_path::PathSegment::MoveTo(p) => {
                segments.push(Segment::MoveTo(p));
                prev = p;
                prev_move = p;
            }
            tiny_skia_path::PathSegment::LineTo(p) => {
                segments.push(Segment::LineTo(p));
                prev = p;
            }
            tiny_skia_path::PathSegment::QuadTo(p1, p) => {
                let (p1, p2, p) = quad_to_curve(prev, p1, p);
                segments.push(Segment::CubicTo(p1, p2, p));
                prev = p;
            }
            tiny_skia_path::PathSegment::CubicTo(p1, p2, p) => {
                segments.push(Segment::CubicTo(p1, p2, p));
                prev = p;
            }
            tiny_skia_path::PathSegment::Close => {
                segments.push(Segment::Close);
                prev = prev_move;
            }
        }
    }

    segments
}

fn draw_markers<P>(path: &[Segment], kind: MarkerKind, mut draw_marker: P)
where
    P: FnMut(Point, usize),
{
    if path.is_empty() {
        return;
    }

    match kind {
        MarkerKind::Start => {
            if let Some(Segment::MoveTo(p)) = path.first().cloned() {
                draw_marker(p, 0);
            }
        }
        MarkerKind::Middle => {
            let total = path.len() - 1;
            let mut i = 1;
            while i < total {
                let p = match path[i] {
                    Segment::MoveTo(p) => p,
                    Segment::LineTo(p) => p,
                    Segment::CubicTo(_, _, p) => p,
                    _ => {
                        i += 1;
                        continue;
                    }
                };

                draw_marker(p, i);

                i += 1;
            }
        }
        MarkerKind::End => {
            let idx = path.len() - 1;
            match path.last().cloned() {
                Some(Segment::LineTo(p)) => {
                    draw_marker(p, idx);
                }
                Some(Segment::CubicTo(_, _, p)) => {
                    draw_marker(p, idx);
                }
                Some(Segment::Close) => {
                    let p = get_subpath_start(path, idx);
                    draw_marker(p, idx);
                }
                _ => {}
            }
        }
    }
}

fn calc_vertex_angle(path: &[Segment], idx: usize) -> f32 {
    if idx == 0 {
        // First segment.

        if path.len() < 2 {
            return 0.0;
        }

        match (path[0], path[1]) {
            (Segment::MoveTo(pm), Segment::LineTo(p)) => calc_line_angle(pm.x, pm.y, p.x, p.y),
            (Segment::MoveTo(pm), Segment::CubicTo(p1, _, p)) => {
                if pm.x.approx_eq_ulps(&p1.x, 4) && pm.y.approx_eq_ulps(&p1.y, 4) {
                    calc_line_angle(pm.x, pm.y, p.x, p.y)
                } else {
                    calc_line_angle(pm.x, pm.y, p1.x, p1.y)
                }
            }
            _ => 0.0,
        }
    } else if idx == path.len() - 1 {
        // Last segment.

        match (path[idx - 1], path[idx]) {
            (_, Segment::MoveTo(_)) => 0.0,
            (_, Segment::LineTo(p)) => {
                let prev = get_prev_vertex(path, idx);
                calc_line_angle(prev.x, prev.y, p.x, p.y)
            }
            (_, Segment::CubicTo(p1, p2, p)) => {
                if p2.x.approx_eq_ulps(&p.x, 4) && p2.y.approx_eq_ulps(&p.y, 4) {
                    calc_line_angle(p1.x, p1.y, p.x, p.y)
                } else {
                    calc_line_angle(p2.x, p2.y, p.x, p.y)
                }
            }
            (Segment::LineTo(p), Segment::Close) => {
                let next = get_subpath_start(path, idx);
                calc_line_angle(p.x, p.y, next.x, next.y)
            }
            (Segment::CubicTo(_, p2, p), Segment::Close) => {
                let prev = get_prev_vertex(path, idx);
                let next = get_subpath_start(path, idx);
                calc_curves_angle(
                    prev.x, prev.y, p2.x, p2.y, p.x, p.y, next.x, next.y, next.x, next.y,
                )
            }
            (_, Segment::Close) => 0.0,
        }
    } else {
        // Middle segments.

        match (path[idx], path[idx + 1]) {
            (Segment::MoveTo(pm), Segment::LineTo(p)) => calc_line_angle(pm.x, pm.y, p.x, p.y),
            (Segment::MoveTo(pm), Segment::CubicTo(p1, _, _)) => {
                calc_line_angle(pm.x, pm.y, p1.x, p1.y)
            }
            (Segment::LineTo(p1), Segment::LineTo(p2)) => {
                let prev = get_prev_vertex(path, idx);
                calc_angle(prev.x, prev.y, p1.x, p1.y, p1.x, p1.y, p2.x, p2.y)
            }
            (Segment::CubicTo(_, c1_p2, c1_p), Segment::CubicTo(c2_p1, _, c2_p)) => {
                let prev = get_prev_vertex(path, idx);
                calc_curves_angle(
                    prev.x, prev.y, c1_p2.x, c1_p2.y, c1_p.x, c1_p.y, c2_p1.x, c2_p1.y, c2_p.x,
                    c2_p.y,
                )
            }
            (Segment::LineTo(pl), Segment::CubicTo(p1, _, p)) => {
                let prev = get_prev_vertex(path, idx);
                calc_curves_angle(
                    prev.x, prev.y, prev.x, prev.y, pl.x, pl.y, p1.x, p1.y, p.x, p.y,
                )
            }
            (Segment::CubicTo(_, p2, p), Segment::LineTo(pl)) => {
                let prev = get_prev_vertex(path, idx);
                calc_curves_angle(prev.x, prev.y, p2.x, p2.y, p.x, p.y, pl.x, pl.y, pl.x, pl.y)
            }
            (Segment::LineTo(p), Segment::MoveTo(_)) => {
                let prev = get_prev_vertex(path, idx);
                calc_line_angle(prev.x, prev.y, p.x, p.y)
            }
            (Segment::CubicTo(_, p2, p), Segment::MoveTo(_)) => {
                if p.x.approx_eq_ulps(&p2.x, 4) && p.y.approx_eq_ulps(&p2.y, 4) {
                    let prev = get_prev_vertex(path, idx);
                    calc_line_angle(prev.x, prev.y, p.x, p.y)
                } else {
                    calc_line_angle(p2.x, p2.y, p.x, p.y)
                }
            }
            (Segment::LineTo(p), Segment::Close) => {
                let prev = get_prev_vertex(path, idx);
                let next = get_subpath_start(path, idx);
                calc_angle(prev.x, prev.y, p.x, p.y, p.x, p.y, next.x, next.y)
            }
            (_, Segment::Close) => {
                let prev = get_prev_vertex(path, idx);
                let next = get_subpath_start(path, idx);
                calc_line_angle(prev.x, prev.y, next.x, next.y)
            }
            (_, Segment::MoveTo(_)) | (Segment::Close, _) => 0.0,
        }
    }
}

fn calc_line_angle(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    calc_angle(x1, y1, x2, y2, x1, y1, x2, y2)
}

fn calc_curves_angle(
    px: f32,
    py: f32, // previous vertex
    cx1: f32,
    cy1: f32, // previous control point
    x: f32,
    y: f32, // current vertex
    cx2: f32,
    cy2: f32, // next control point
    nx: f32,
    ny: f32, // next vertex
) -> f32 {
    if cx1.approx_eq_ulps(&x, 4) && cy1.approx_eq_ulps(&y, 4) {
        calc_angle(px, py, x, y, x, y, cx2, cy2)
    } else if x.approx_eq_ulps(&cx2, 4) && y.approx_eq_ulps(&cy2, 4) {
        calc_angle(cx1, cy1, x, y, x, y, nx, ny)
    } else {
        calc_angle(cx1, cy1, x, y, x, y, cx2, cy2)
    }
}

fn calc_angle(x1: f32, y1: f32, x2: f32, y2: f32, x3: f32, y3: f32, x4: f32, y4: f32) -> f32 {
    use std::f32::consts::*;

    fn normalize(rad: f32) -> f32 {
        let v = rad % (PI * 2.0);
        if v < 0.0 {
            v + PI * 2.0
        } else {
            v
        }
    }

    fn vector_angle(vx: f32, vy: f32) -> f32 {
        let rad = vy.atan2(vx);
        if rad.is_nan() {
            0.0
        } else {
            normalize(rad)
        }
    }

    let in_a = vector_angle(x2 - x1, y2 - y1);
    let out_a = vector_angle(x4 - x3, y4 - y3);
    let d = (out_a - in_a) * 0.5;

    let mut angle = in_a + d;
    if FRAC_PI_2 < d.abs() {
        angle -= PI;
    }

    normalize(angle).to_degrees()
}

fn get_subpath_start(segments: &[Segment], idx: usize) -> Point {
    let offset = segments.len() - idx;
    for seg in segments.iter().rev().skip(offset) {
        if let Segment::MoveTo(p) = *seg {
            return p;
        }
    }

    Point::zero()
}

fn get_prev_vertex(segments: &[Segment], idx: usize) -> Point {
    match segments[idx - 1] {
        Segment::MoveTo(p) => p,
        Segment::LineTo(p) => p,
        Segment::CubicTo(_, _, p) => p,
        Segment::Close => get_subpath_start(segments, idx),
    }
}

fn quad_to_curve(prev: Point, p1: Point, p: Point) -> (Point, Point, Point) {
    #[inline]
    fn calc(n1: f32, n2: f32) -> f32 {
        (n1 + n2 * 2.0) / 3.0
    }

    (
        Point::from_xy(calc(prev.x, p1.x), calc(prev.y, p1.y)),
        Point::from_xy(calc(p.x, p1.x), calc(p.y, p1.y)),
        p,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Options;
    use svgbridge_dom::Document;
    use svgbridge_gvt::tiny_skia_path::PathBuilder;

    fn polyline() -> Rc<tiny_skia_path::Path> {
        let mut builder = PathBuilder::new();
        builder.move_to(0.0, 0.0);
        builder.line_to(10.0, 0.0);
        builder.line_to(10.0, 10.0);
        Rc::new(builder.finish().unwrap())
    }

    #[test]
    fn markers_are_placed_at_vertices() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <marker id='m' markerWidth='4' markerHeight='4' markerUnits='userSpaceOnUse'>
                    <rect width='2' height='2'/>
                </marker>
                <path id='p' d='M 0 0 L 10 0 L 10 10' marker-start='url(#m)'
                      marker-mid='url(#m)' marker-end='url(#m)'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let path = doc.element_by_id("p").unwrap();
        assert!(is_valid(path));

        let set = resolve_markers(&mut ctx, path, &polyline(), None).unwrap();
        assert!(set.start.is_some() && set.mid.is_some() && set.end.is_some());
        assert_eq!(set.root.children().count(), 3);

        let first = set.root.first_child().unwrap();
        assert_eq!(first.borrow().transform(), Transform::default());
    }

    #[test]
    fn zero_sized_marker_is_skipped() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <marker id='m' markerWidth='0'><rect width='2' height='2'/></marker>
                <path id='p' d='M 0 0 L 10 0' marker-start='url(#m)'/>
            </svg>",
        )
        .unwrap();
        let mut ctx = BridgeContext::new(Options::default());
        let path = doc.element_by_id("p").unwrap();
        assert!(resolve_markers(&mut ctx, path, &polyline(), None).is_none());
    }

    #[test]
    fn orientation_keywords() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'>
                <marker id='a' orient='auto'/>
                <marker id='b' orient='45'/>
                <marker id='c' orient='bogus'/>
            </svg>",
        )
        .unwrap();
        assert_eq!(convert_orientation(doc.element_by_id("a").unwrap()), MarkerOrient::Auto);
        assert_eq!(
            convert_orientation(doc.element_by_id("b").unwrap()),
            MarkerOrient::Angle(45.0)
        );
        assert_eq!(
            convert_orientation(doc.element_by_id("c").unwrap()),
            MarkerOrient::Angle(0.0)
        );
    }

    #[test]
    fn vertex_angle_of_a_corner() {
        let segments = to_segments(&polyline());
        assert!(calc_vertex_angle(&segments, 0).approx_zero_ulps(4));
        assert!((calc_vertex_angle(&segments, 1) - 45.0).abs() < 0.01);
        assert!((calc_vertex_angle(&segments, 2) - 90.0).abs() < 0.01);
    }
}
