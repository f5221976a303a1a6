// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A human-readable dump of a graphics-node tree.

use std::fmt::Display;

use svgbridge_gvt::{
    Color, ImageKind, Node, NodeExt, NodeKind, NonZeroRect, Paint, Rect, Transform, Tree,
};
use xmlwriter::{Indent, XmlWriter};

/// Tree dump options.
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Include bounding boxes.
    ///
    /// Default: true
    pub bounding_boxes: bool,

    /// Set the numeric precision.
    ///
    /// Default: 3
    pub precision: u8,

    /// Use single quote marks instead of double quote.
    ///
    /// Default: disabled
    pub use_single_quote: bool,

    /// Set XML nodes indention.
    ///
    /// Default: 2 spaces
    pub indent: Indent,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            bounding_boxes: true,
            precision: 3,
            use_single_quote: false,
            indent: Indent::Spaces(2),
        }
    }
}

/// Node kinds become element names. Ids, transforms, bounding boxes,
/// paints and effects become attributes.
pub(crate) fn convert(tree: &Tree, opt: &WriteOptions) -> String {
    let mut xml = XmlWriter::new(xmlwriter::Options {
        use_single_quote: opt.use_single_quote,
        indent: opt.indent,
        attributes_indent: Indent::None,
    });

    xml.start_element("tree");
    xml.write_num("width", tree.size.width(), opt);
    xml.write_num("height", tree.size.height(), opt);
    xml.write_rect("viewBox", tree.view_box.rect.to_rect(), opt);

    for child in tree.root.children() {
        write_node(&child, opt, &mut xml);
    }

    xml.end_document()
}

fn write_node(node: &Node, opt: &WriteOptions, xml: &mut XmlWriter) {
    let kind = node.borrow();
    xml.start_element(kind.name());

    if !kind.id().is_empty() {
        xml.write_attribute("id", kind.id());
    }

    xml.write_transform("transform", kind.transform(), opt);

    if opt.bounding_boxes {
        if let Some(bbox) = node.bounding_box() {
            xml.write_rect("bbox", bbox, opt);
        }
    }

    let effects = kind.effects();
    if effects.opacity.get() != 1.0 {
        xml.write_num("opacity", effects.opacity.get(), opt);
    }
    if let Some(ref clip) = effects.clip_path {
        xml.write_attribute("clip-path", &clip.id);
    }
    if let Some(ref mask) = effects.mask {
        xml.write_attribute("mask", &mask.id);
    }
    if !effects.filters.is_empty() {
        let ids: Vec<&str> = effects.filters.iter().map(|f| f.id.as_str()).collect();
        xml.write_attribute("filter", &ids.join(" "));
    }

    match *kind {
        NodeKind::Group(ref g) => {
            if let Some(rect) = g.clip_rect {
                xml.write_non_zero_rect("clip", rect, opt);
            }
        }
        NodeKind::Shape(ref shape) => {
            match shape.fill {
                Some(ref fill) => xml.write_paint("fill", &fill.paint),
                None => xml.write_attribute("fill", "none"),
            }

            if let Some(ref stroke) = shape.stroke {
                xml.write_paint("stroke", &stroke.paint);
                xml.write_num("stroke-width", stroke.width.get(), opt);
            }

            if shape.shape.is_none() {
                xml.write_attribute("disabled", "true");
            }

            if let Some(ref markers) = shape.markers {
                let count = markers.root.children().count();
                xml.write_attribute("markers", &count);
            }
        }
        NodeKind::Image(ref img) => {
            xml.write_non_zero_rect("rect", img.view_box.rect, opt);
            match img.kind {
                ImageKind::Raster { format, size, .. } => {
                    xml.write_attribute_fmt("format", format_args!("{:?}", format));
                    xml.write_attribute_fmt(
                        "size",
                        format_args!("{}x{}", size.width(), size.height()),
                    );
                }
                ImageKind::Svg(_) => xml.write_attribute("format", "SVG"),
            }
        }
    }

    let nested = match *kind {
        NodeKind::Image(ref img) => match img.kind {
            ImageKind::Svg(ref root) => Some(root.clone()),
            _ => None,
        },
        _ => None,
    };
    drop(kind);

    if let Some(root) = nested {
        write_node(&root, opt, xml);
    }

    for child in node.children() {
        write_node(&child, opt, xml);
    }

    xml.end_element();
}

trait XmlWriterExt {
    fn write_num(&mut self, name: &str, n: f32, opt: &WriteOptions);
    fn write_rect(&mut self, name: &str, rect: Rect, opt: &WriteOptions);
    fn write_non_zero_rect(&mut self, name: &str, rect: NonZeroRect, opt: &WriteOptions);
    fn write_transform(&mut self, name: &str, ts: Transform, opt: &WriteOptions);
    fn write_paint(&mut self, name: &str, paint: &Paint);
}

impl XmlWriterExt for XmlWriter {
    fn write_num(&mut self, name: &str, n: f32, opt: &WriteOptions) {
        self.write_attribute_raw(name, |buf| write_num(n, opt.precision, buf));
    }

    fn write_rect(&mut self, name: &str, rect: Rect, opt: &WriteOptions) {
        self.write_attribute_raw(name, |buf| {
            write_list(
                &[rect.x(), rect.y(), rect.width(), rect.height()],
                opt.precision,
                buf,
            )
        });
    }

    fn write_non_zero_rect(&mut self, name: &str, rect: NonZeroRect, opt: &WriteOptions) {
        self.write_rect(name, rect.to_rect(), opt);
    }

    fn write_transform(&mut self, name: &str, ts: Transform, opt: &WriteOptions) {
        if ts.is_identity() {
            return;
        }

        self.write_attribute_raw(name, |buf| {
            buf.extend_from_slice(b"matrix(");
            write_list(&[ts.sx, ts.ky, ts.kx, ts.sy, ts.tx, ts.ty], opt.precision, buf);
            buf.push(b')');
        });
    }

    fn write_paint(&mut self, name: &str, paint: &Paint) {
        match paint {
            Paint::Color(c) => self.write_attribute(name, &ColorHex(*c)),
            Paint::LinearGradient(ref lg) => {
                self.write_attribute_fmt(name, format_args!("linearGradient({})", lg.base.id))
            }
            Paint::RadialGradient(ref rg) => {
                self.write_attribute_fmt(name, format_args!("radialGradient({})", rg.base.id))
            }
            Paint::Pattern(ref patt) => {
                self.write_attribute_fmt(name, format_args!("pattern({})", patt.id))
            }
        }
    }
}

struct ColorHex(Color);

impl Display for ColorHex {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0.red, self.0.green, self.0.blue)
    }
}

fn write_list(list: &[f32], precision: u8, buf: &mut Vec<u8>) {
    for (i, n) in list.iter().enumerate() {
        if i != 0 {
            buf.push(b' ');
        }

        write_num(*n, precision, buf);
    }
}

fn write_num(n: f32, precision: u8, buf: &mut Vec<u8>) {
    use std::io::Write;

    let factor = 10f64.powi(precision as i32);
    let n = (n as f64 * factor).round() / factor;
    // Avoid "-0".
    let n = if n == 0.0 { 0.0 } else { n };
    let _ = write!(buf, "{}", n);
}
