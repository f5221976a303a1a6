// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgtypes::{Length, LengthUnit as Unit};

use svgbridge_dom::SvgNode;
use svgbridge_gvt::{Size, Units};

use crate::{BridgeError, Options};

/// Converts lengths into user space values.
///
/// Percentages are resolved against the innermost viewport,
/// which is maintained as a stack by viewport-establishing bridges.
#[derive(Clone, Debug)]
pub struct UnitResolver {
    dpi: f32,
    font_size: f32,
    viewports: Vec<Size>,
}

impl UnitResolver {
    /// Creates a resolver with the default viewport size.
    pub fn new(opt: &Options) -> Self {
        UnitResolver {
            dpi: opt.dpi,
            font_size: opt.font_size,
            viewports: vec![opt.default_size],
        }
    }

    /// Returns the current viewport size.
    pub fn viewport(&self) -> Size {
        // The stack always has the initial viewport.
        self.viewports[self.viewports.len() - 1]
    }

    /// Enters a nested viewport.
    pub fn push_viewport(&mut self, size: Size) {
        self.viewports.push(size);
    }

    /// Leaves a nested viewport.
    ///
    /// The initial viewport is never removed.
    pub fn pop_viewport(&mut self) {
        if self.viewports.len() > 1 {
            self.viewports.pop();
        }
    }

    /// Replaces the initial viewport, like after the root `svg` size was resolved.
    pub fn set_root_viewport(&mut self, size: Size) {
        self.viewports.truncate(1);
        self.viewports[0] = size;
    }

    /// Returns the number of nested viewports, including the initial one.
    pub fn depth(&self) -> usize {
        self.viewports.len()
    }

    /// Converts a length into a value in `object_units`.
    ///
    /// `name` selects the viewport dimension percentages are resolved against.
    #[inline(never)]
    pub fn convert_length(
        &self,
        length: Length,
        node: SvgNode,
        name: &str,
        object_units: Units,
    ) -> f32 {
        let dpi = self.dpi;
        let n = length.number as f32;
        match length.unit {
            Unit::None | Unit::Px => n,
            Unit::Em => n * self.resolve_font_size(node),
            Unit::Ex => n * self.resolve_font_size(node) / 2.0,
            Unit::In => n * dpi,
            Unit::Cm => n * dpi / 2.54,
            Unit::Mm => n * dpi / 25.4,
            Unit::Pt => n * dpi / 72.0,
            Unit::Pc => n * dpi / 6.0,
            Unit::Percent => {
                if object_units == Units::ObjectBoundingBox {
                    n / 100.0
                } else {
                    let view_box = self.viewport();

                    match name {
                        "cx" | "dx" | "fx" | "markerWidth" | "refX" | "rx" | "width" | "x"
                        | "x1" | "x2" => convert_percent(length, view_box.width()),
                        "cy" | "dy" | "fy" | "height" | "markerHeight" | "refY" | "ry" | "y"
                        | "y1" | "y2" => convert_percent(length, view_box.height()),
                        _ => {
                            let mut vb_len =
                                view_box.width().powi(2) + view_box.height().powi(2);
                            vb_len = (vb_len / 2.0).sqrt();
                            convert_percent(length, vb_len)
                        }
                    }
                }
            }
        }
    }

    /// Converts a length in user space units.
    pub fn convert_user_length(&self, length: Length, node: SvgNode, name: &str) -> f32 {
        self.convert_length(length, node, name, Units::UserSpaceOnUse)
    }

    /// Converts an attribute or a default value.
    ///
    /// A missing attribute resolves to the default, an unparsable value is an error.
    pub fn length(
        &self,
        node: SvgNode,
        name: &str,
        object_units: Units,
        def: Length,
    ) -> Result<f32, BridgeError> {
        match node.raw_attribute(name) {
            Some(value) => self.parsed_length(node, name, value, object_units),
            None => Ok(self.convert_length(def, node, name, object_units)),
        }
    }

    /// Converts a user space attribute or a default value.
    pub fn user_length(&self, node: SvgNode, name: &str, def: Length) -> Result<f32, BridgeError> {
        self.length(node, name, Units::UserSpaceOnUse, def)
    }

    /// Converts an attribute, if present.
    pub fn try_length(
        &self,
        node: SvgNode,
        name: &str,
        object_units: Units,
    ) -> Result<Option<f32>, BridgeError> {
        match node.raw_attribute(name) {
            Some(value) => self.parsed_length(node, name, value, object_units).map(Some),
            None => Ok(None),
        }
    }

    /// Converts a required attribute.
    ///
    /// A missing attribute and an unparsable value are errors.
    pub fn required_length(
        &self,
        node: SvgNode,
        name: &str,
        object_units: Units,
    ) -> Result<f32, BridgeError> {
        let value = node
            .raw_attribute(name)
            .ok_or_else(|| BridgeError::missing_attribute(node, name))?;
        self.parsed_length(node, name, value, object_units)
    }

    fn parsed_length(
        &self,
        node: SvgNode,
        name: &str,
        value: &str,
        object_units: Units,
    ) -> Result<f32, BridgeError> {
        let length: Length = node
            .try_attribute(name)
            .ok_or_else(|| BridgeError::malformed_attribute(node, name, value))?;
        Ok(self.convert_length(length, node, name, object_units))
    }

    /// Resolves an inheritable length, like `stroke-width`.
    pub fn resolve_length(&self, node: SvgNode, name: &str, def: f32) -> f32 {
        debug_assert!(name != "font-size", "font-size cannot be resolved via this function");

        if let Some(n) = node.ancestors().find(|n| n.has_attribute(name)) {
            if let Some(length) = n.attribute(name) {
                return self.convert_user_length(length, n, name);
            }
        }

        def
    }

    /// Converts a list of lengths, like `stroke-dasharray`.
    ///
    /// Unparsable items are skipped.
    #[inline(never)]
    pub fn convert_list(&self, node: SvgNode, name: &str) -> Option<Vec<f32>> {
        if let Some(text) = node.attribute::<&str>(name) {
            let mut num_list = Vec::new();
            for length in svgtypes::LengthListParser::from(text).flatten() {
                num_list.push(self.convert_user_length(length, node, name));
            }

            Some(num_list)
        } else {
            None
        }
    }

    /// Resolves `font-size` through the ancestors.
    #[inline(never)]
    pub fn resolve_font_size(&self, node: SvgNode) -> f32 {
        let nodes: Vec<_> = node.ancestors().filter(|n| n.is_element()).collect();
        let mut font_size = self.font_size;
        for n in nodes.iter().rev() {
            if let Some(length) = n.try_attribute::<Length>("font-size") {
                let dpi = self.dpi;
                let n = length.number as f32;
                font_size = match length.unit {
                    Unit::None | Unit::Px => n,
                    Unit::Em => n * font_size,
                    Unit::Ex => n * font_size / 2.0,
                    Unit::In => n * dpi,
                    Unit::Cm => n * dpi / 2.54,
                    Unit::Mm => n * dpi / 25.4,
                    Unit::Pt => n * dpi / 72.0,
                    Unit::Pc => n * dpi / 6.0,
                    Unit::Percent => {
                        // If `font-size` has percent units that it's value
                        // is relative to the parent node `font-size`.
                        length.number as f32 * font_size * 0.01
                    }
                }
            } else if let Some(name) = n.attribute("font-size") {
                font_size = convert_named_font_size(name, font_size);
            }
        }

        font_size
    }
}

fn convert_percent(length: Length, base: f32) -> f32 {
    base * (length.number as f32) / 100.0
}

fn convert_named_font_size(name: &str, parent_font_size: f32) -> f32 {
    let factor = match name {
        "xx-small" => -3,
        "x-small" => -2,
        "small" => -1,
        "medium" => 0,
        "large" => 1,
        "x-large" => 2,
        "xx-large" => 3,
        "smaller" => -1,
        "larger" => 1,
        _ => {
            log::warn!("Invalid 'font-size' value: '{}'.", name);
            0
        }
    };

    // 'On a computer screen a scaling factor of 1.2 is suggested between adjacent indexes.'
    parent_font_size * 1.2f32.powi(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgbridge_dom::Document;

    fn doc() -> Document {
        Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg' font-size='20'>
                <rect id='r' x='50%' y='25%' width='2em' height='1in' rx='bad'/>
            </svg>",
        )
        .unwrap()
    }

    #[test]
    fn percentages_follow_the_viewport_stack() {
        let doc = doc();
        let rect = doc.element_by_id("r").unwrap();
        let mut units = UnitResolver::new(&Options::default());

        assert_eq!(units.user_length(rect, "x", Length::zero()).unwrap(), 50.0);

        units.push_viewport(Size::from_wh(200.0, 40.0).unwrap());
        assert_eq!(units.user_length(rect, "x", Length::zero()).unwrap(), 100.0);
        assert_eq!(units.user_length(rect, "y", Length::zero()).unwrap(), 10.0);

        units.pop_viewport();
        units.pop_viewport();
        assert_eq!(units.depth(), 1);
        assert_eq!(units.user_length(rect, "x", Length::zero()).unwrap(), 50.0);
    }

    #[test]
    fn absolute_and_font_relative_units() {
        let doc = doc();
        let rect = doc.element_by_id("r").unwrap();
        let units = UnitResolver::new(&Options::default());

        assert_eq!(units.user_length(rect, "width", Length::zero()).unwrap(), 40.0);
        assert_eq!(units.user_length(rect, "height", Length::zero()).unwrap(), 96.0);
    }

    #[test]
    fn object_bounding_box_percentages() {
        let doc = doc();
        let rect = doc.element_by_id("r").unwrap();
        let units = UnitResolver::new(&Options::default());
        assert_eq!(units.length(rect, "x", Units::ObjectBoundingBox, Length::zero()).unwrap(), 0.5);
    }

    #[test]
    fn required_and_malformed_lengths() {
        let doc = doc();
        let rect = doc.element_by_id("r").unwrap();
        let units = UnitResolver::new(&Options::default());

        let err = units
            .required_length(rect, "ry", Units::UserSpaceOnUse)
            .unwrap_err();
        assert_eq!(err.code(), "attribute.missing");

        let err = units
            .length(rect, "rx", Units::UserSpaceOnUse, Length::zero())
            .unwrap_err();
        assert_eq!(err.code(), "attribute.malformed");
        assert_eq!(err.attribute(), Some("rx"));

        let err = units.try_length(rect, "rx", Units::UserSpaceOnUse).unwrap_err();
        assert_eq!(err.code(), "attribute.malformed");
        assert_eq!(units.try_length(rect, "ry", Units::UserSpaceOnUse).unwrap(), None);
    }
}
