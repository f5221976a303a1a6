// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`svgbridge` translates an SVG document into a retained graphics-node tree
and keeps that tree in sync with document mutations.

Every element kind is handled by a *bridge* registered by namespace and local name.
The builder walks the document, asks the bridge of each element for a node
and assembles them into a [`Tree`](svgbridge_gvt::Tree).
In the dynamic mode elements stay bound to their nodes, so an
[`UpdateDispatcher`](update::UpdateDispatcher) can route document mutations
to bridges, which update a node in place or rebuild it.

## Features

- Shapes, containers, nested viewports, `switch`, `use` shadow trees, images
  and `foreignObject` with pluggable content handlers
- Gradients, patterns, clip paths, masks, markers and filters,
  cached and tracked, so a change of a referenced element reaches every user
- Same- and cross-document references with cycle detection
  and a configurable security policy
- Recoverable errors are replaced with a placeholder from the user agent
- An update thread with a repaint ticker

## Limitations

- No text layout, scripting, animations or fonts
- Nodes are not rasterized
*/

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::too_many_arguments)]

pub mod bridge;
mod builder;
mod context;
mod error;
mod loader;
mod options;
pub mod reference;
mod registry;
mod security;
mod style;
mod style_refs;
mod svgnode_ext;
mod units;
pub mod update;
mod user_agent;
mod writer;

pub use svgbridge_dom;
pub use svgbridge_gvt;

pub use builder::{build_document, build_element};
pub use context::BridgeContext;
pub use error::{BridgeError, ElementInfo, Error, ErrorContext};
pub use loader::{DocumentLoader, LoadError, ResourceData};
pub use options::{Dynamic, Options, MIN_REPAINT_INTERVAL};
pub use registry::{register_default_bridge, BridgeExtension, BridgeFactory, BridgeRegistry};
pub use security::{ResourceKind, SecurityPolicy, SecurityViolation};
pub use style_refs::{StyleReference, StyleReferenceTracker};
pub use units::UnitResolver;
pub use user_agent::{DefaultUserAgent, UserAgent};
pub use writer::WriteOptions;

/// A trait to dump a graphics tree as text.
pub trait TreeWriting {
    /// Writes a tree as XML-like text.
    fn to_string(&self, opt: &WriteOptions) -> String;
}

impl TreeWriting for svgbridge_gvt::Tree {
    fn to_string(&self, opt: &WriteOptions) -> String {
        writer::convert(self, opt)
    }
}

/// Builds a tree of a document in a fresh context.
///
/// A shorthand for [`BridgeContext::new`] and [`build_document`].
/// Recoverable errors are only logged.
pub fn build(doc: &mut svgbridge_dom::Document, opt: &Options) -> Result<svgbridge_gvt::Tree, Error> {
    let mut ctx = BridgeContext::new(opt.clone());
    build_document(&mut ctx, doc)
}
