// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use svgbridge_gvt::tiny_skia_path::PathBuilder;
use svgbridge_gvt::{Color, Fill, Group, Node, NodeKind, NonZeroRect, Paint, Shape, Stroke};
use url::Url;

use crate::{BridgeError, Options, ResourceKind, SecurityPolicy, SecurityViolation};

// Full list can be found here: https://www.w3.org/TR/SVG11/feature.html
static FEATURES: &[&str] = &[
    "http://www.w3.org/TR/SVG11/feature#SVGDOM-static",
    "http://www.w3.org/TR/SVG11/feature#SVG-static",
    "http://www.w3.org/TR/SVG11/feature#SVGDOM-dynamic",
    "http://www.w3.org/TR/SVG11/feature#SVG-dynamic",
    "http://www.w3.org/TR/SVG11/feature#CoreAttribute",
    "http://www.w3.org/TR/SVG11/feature#Structure",
    "http://www.w3.org/TR/SVG11/feature#BasicStructure",
    "http://www.w3.org/TR/SVG11/feature#ContainerAttribute",
    "http://www.w3.org/TR/SVG11/feature#ConditionalProcessing",
    "http://www.w3.org/TR/SVG11/feature#Image",
    "http://www.w3.org/TR/SVG11/feature#Style",
    "http://www.w3.org/TR/SVG11/feature#ViewportAttribute",
    "http://www.w3.org/TR/SVG11/feature#Shape",
    "http://www.w3.org/TR/SVG11/feature#PaintAttribute",
    "http://www.w3.org/TR/SVG11/feature#BasicPaintAttribute",
    "http://www.w3.org/TR/SVG11/feature#OpacityAttribute",
    "http://www.w3.org/TR/SVG11/feature#GraphicsAttribute",
    "http://www.w3.org/TR/SVG11/feature#BasicGraphicsAttribute",
    "http://www.w3.org/TR/SVG11/feature#Marker",
    "http://www.w3.org/TR/SVG11/feature#Gradient",
    "http://www.w3.org/TR/SVG11/feature#Pattern",
    "http://www.w3.org/TR/SVG11/feature#Clip",
    "http://www.w3.org/TR/SVG11/feature#BasicClip",
    "http://www.w3.org/TR/SVG11/feature#Mask",
    "http://www.w3.org/TR/SVG11/feature#Filter",
    "http://www.w3.org/TR/SVG11/feature#BasicFilter",
    "http://www.w3.org/TR/SVG11/feature#XlinkAttribute", // only xlink:href
    "http://www.w3.org/TR/SVG11/feature#Extensibility",
];

/// The host application.
///
/// Receives diagnostics, decides which resources can be loaded and
/// provides placeholders for broken references.
pub trait UserAgent {
    /// Reports an error.
    fn display_error(&self, error: &BridgeError);

    /// Reports an informational message.
    fn display_message(&self, message: &str);

    /// Checks that an external resource can be loaded by a document.
    fn check_load_external_resource(
        &self,
        kind: ResourceKind,
        resource: &Url,
        document: Option<&Url>,
    ) -> Result<(), SecurityViolation>;

    /// Returns a node that replaces an element that failed with a recoverable error.
    ///
    /// `bounds` is the element's own viewport, when it has one.
    fn broken_link_node(&self, error: &BridgeError, bounds: Option<NonZeroRect>) -> Node;

    /// Returns user languages, like `en-US`.
    fn languages(&self) -> Vec<String>;

    /// Checks that a `requiredFeatures` string is supported.
    fn has_feature(&self, feature: &str) -> bool;

    /// Checks that the current operation should be cancelled.
    fn is_interrupted(&self) -> bool;
}

/// A user agent that logs diagnostics.
#[derive(Debug)]
pub struct DefaultUserAgent {
    policy: SecurityPolicy,
    languages: Vec<String>,
    interrupted: Arc<AtomicBool>,
}

impl DefaultUserAgent {
    /// Creates a user agent from options.
    pub fn new(opt: &Options) -> Self {
        DefaultUserAgent {
            policy: opt.security,
            languages: opt.languages.clone(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns a flag that cancels loading when set.
    ///
    /// Can be set from any thread.
    pub fn interrupter(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Wraps the user agent into a shared pointer.
    pub fn into_rc(self) -> Rc<dyn UserAgent> {
        Rc::new(self)
    }
}

impl UserAgent for DefaultUserAgent {
    fn display_error(&self, error: &BridgeError) {
        log::warn!("{} [{}]", error, error.code());
    }

    fn display_message(&self, message: &str) {
        log::info!("{}", message);
    }

    fn check_load_external_resource(
        &self,
        kind: ResourceKind,
        resource: &Url,
        document: Option<&Url>,
    ) -> Result<(), SecurityViolation> {
        self.policy.check(kind, resource, document)
    }

    fn broken_link_node(&self, error: &BridgeError, bounds: Option<NonZeroRect>) -> Node {
        let id = error
            .element()
            .map(|e| e.id.clone())
            .unwrap_or_default();
        let root = Node::new(NodeKind::Group(Group {
            id,
            ..Group::default()
        }));

        let rect = bounds
            .or_else(|| NonZeroRect::from_xywh(0.0, 0.0, 10.0, 10.0))
            .map(|r| r.to_rect());
        if let Some(rect) = rect {
            let grey = Paint::Color(Color::new_rgb(200, 200, 200));
            let width = svgbridge_gvt::StrokeWidth::new(1.0);
            root.append(Node::new(NodeKind::Shape(Shape {
                fill: Some(Fill::from_paint(grey)),
                stroke: width
                    .map(|w| Stroke::new(Paint::Color(Color::new_rgb(128, 128, 128)), w)),
                shape: Some(Rc::new(PathBuilder::from_rect(rect))),
                ..Shape::default()
            })));
        }

        root
    }

    fn languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn has_feature(&self, feature: &str) -> bool {
        FEATURES.contains(&feature)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgbridge_gvt::NodeExt;

    #[test]
    fn placeholder_covers_the_element_bounds() {
        let ua = DefaultUserAgent::new(&Options::default());
        let bounds = NonZeroRect::from_xywh(5.0, 5.0, 20.0, 30.0);
        let node = ua.broken_link_node(&BridgeError::Interrupted, bounds);
        assert!(node.is_group());
        assert_eq!(node.bounding_box().map(|r| r.width()), Some(20.0));
    }

    #[test]
    fn interruption_flag() {
        let ua = DefaultUserAgent::new(&Options::default());
        assert!(!ua.is_interrupted());
        ua.interrupter().store(true, Ordering::Relaxed);
        assert!(ua.is_interrupted());
    }
}
