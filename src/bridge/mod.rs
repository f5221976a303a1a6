// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-element bridges.

use std::rc::Rc;

use svgbridge_dom::{SvgNode, SVG_NS};
use svgbridge_gvt::filter::Kind;
use svgbridge_gvt::{ClipPath, Group, Marker, Mask, Node, NodeKind, Size};

use crate::update::{UpdateEvent, UpdateOutcome};
use crate::{BridgeContext, BridgeError};

pub(crate) mod clippath;
pub(crate) mod conditional;
pub(crate) mod container;
pub(crate) mod effects;
pub(crate) mod filter;
pub mod foreign;
pub(crate) mod image;
pub(crate) mod marker;
pub(crate) mod mask;
pub(crate) mod paint_server;
pub(crate) mod shapes;
pub(crate) mod use_node;

pub use filter::FilterChain;
pub use paint_server::ServerOrColor;

/// A translator of one element kind.
///
/// A bridge is registered once per namespace and local name and
/// exposes the capabilities it implements.
pub trait Bridge {
    /// The namespace of handled elements.
    fn namespace_uri(&self) -> &str {
        SVG_NS
    }

    /// The local name of handled elements.
    fn local_name(&self) -> &str;

    /// Returns a fresh instance for a single element.
    ///
    /// Stateless bridges return `None` and the registered prototype is used.
    fn instance(&self) -> Option<Rc<dyn Bridge>> {
        None
    }

    /// Returns the graphics capability.
    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        None
    }

    /// Returns the fragment capability.
    fn as_fragment(&self) -> Option<&dyn FragmentBridge> {
        None
    }

    /// Returns the filter primitive capability.
    fn as_filter_primitive(&self) -> Option<&dyn FilterPrimitiveBridge> {
        None
    }
}

/// An outcome of [`GraphicsBridge::build`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BuildStatus {
    /// The node was populated.
    Built,
    /// The element has no visual output.
    Suppressed,
}

/// An outcome of building an element.
#[derive(Clone, Debug)]
pub enum BuildResult {
    /// A node was built.
    Rendered(Node),
    /// The element has no visual output. Not an error.
    Suppressed,
    /// The element cannot be built.
    Failed(BridgeError),
}

impl BuildResult {
    /// Returns the built node.
    pub fn node(self) -> Option<Node> {
        match self {
            BuildResult::Rendered(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the error.
    pub fn error(&self) -> Option<&BridgeError> {
        match self {
            BuildResult::Failed(ref e) => Some(e),
            _ => None,
        }
    }
}

/// A bridge that produces a graphics node.
pub trait GraphicsBridge {
    /// Allocates an empty node of the correct kind.
    fn create_node(&self, element: SvgNode) -> Node {
        Node::new(NodeKind::Group(Group {
            id: element.element_id().to_string(),
            ..Group::default()
        }))
    }

    /// Populates the node from the element.
    ///
    /// Children are built afterwards by the builder.
    fn build(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError>;

    /// Checks that the builder should build children.
    fn is_container(&self) -> bool {
        false
    }

    /// Returns a viewport established for children.
    fn viewport(&self, _ctx: &BridgeContext, _element: SvgNode) -> Option<Size> {
        None
    }

    /// Returns elements that contribute a child node.
    fn child_elements<'a>(&self, _ctx: &BridgeContext, element: SvgNode<'a>) -> Vec<SvgNode<'a>> {
        element.element_children().collect()
    }

    /// Updates a node after an element mutation.
    fn update(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
        event: &UpdateEvent,
    ) -> Result<UpdateOutcome, BridgeError> {
        effects::update_common(ctx, element, node, event, self.is_container())
    }
}

/// A value computed by a referenced element.
#[derive(Clone, Debug)]
pub enum Fragment {
    /// A gradient, a pattern or a color.
    Paint(ServerOrColor),
    /// A clip path.
    ClipPath(Rc<ClipPath>),
    /// A mask.
    Mask(Rc<Mask>),
    /// A filter.
    Filter(Rc<svgbridge_gvt::filter::Filter>),
    /// A marker.
    Marker(Rc<Marker>),
}

/// A bridge of an element that is only used through references.
pub trait FragmentBridge {
    /// Computes a fragment.
    ///
    /// `Ok(None)` means that the element is valid but produces nothing,
    /// like a gradient without stops.
    fn create_fragment(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError>;
}

/// A bridge of a filter primitive.
pub trait FilterPrimitiveBridge {
    /// Computes a primitive from the element and the chain state.
    fn create_primitive(
        &self,
        ctx: &mut BridgeContext,
        element: SvgNode,
        chain: &FilterChain,
    ) -> Result<Kind, BridgeError>;
}

/// Returns all built-in bridges.
pub(crate) fn builtin_bridges() -> Vec<Rc<dyn Bridge>> {
    let mut list: Vec<Rc<dyn Bridge>> = vec![
        Rc::new(container::SvgBridge),
        Rc::new(container::GroupBridge("g")),
        Rc::new(container::GroupBridge("a")),
        Rc::new(container::SwitchBridge),
        Rc::new(container::SymbolBridge),
        Rc::new(use_node::UseBridge),
        Rc::new(image::ImageBridge),
        Rc::new(foreign::ForeignObjectBridge),
        Rc::new(clippath::ClipPathBridge),
        Rc::new(mask::MaskBridge),
        Rc::new(marker::MarkerBridge),
        Rc::new(filter::FilterBridge),
        Rc::new(paint_server::LinearGradientBridge),
        Rc::new(paint_server::RadialGradientBridge),
        Rc::new(paint_server::PatternBridge),
    ];

    for name in shapes::SHAPES {
        list.push(Rc::new(shapes::ShapeBridge(name)));
    }

    for p in filter::primitive_bridges() {
        list.push(p);
    }

    list
}
