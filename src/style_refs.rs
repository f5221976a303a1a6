// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use svgbridge_dom::NodeId;

/// A property of a graphics element that references a style-defining element.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct StyleReference {
    /// The referencing element.
    pub element: NodeId,
    /// The referencing property, like `fill` or `clip-path`.
    pub property: String,
}

/// Tracks which elements depend on gradients, patterns, clip paths,
/// masks, filters and markers.
///
/// When a style-defining element changes, every dependent gets
/// a notification with the referencing property.
#[derive(Clone, Default, Debug)]
pub struct StyleReferenceTracker {
    refs: HashMap<NodeId, Vec<StyleReference>>,
}

impl StyleReferenceTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `reference` depends on `target`.
    ///
    /// Duplicates are ignored.
    pub fn add(&mut self, target: NodeId, reference: StyleReference) {
        let list = self.refs.entry(target).or_default();
        if !list.contains(&reference) {
            list.push(reference);
        }
    }

    /// Returns all references to `target`.
    pub fn dependents(&self, target: NodeId) -> &[StyleReference] {
        self.refs.get(&target).map(|v| v.as_slice()).unwrap_or_default()
    }

    /// Forgets references made by an element, like after it was rebuilt or removed.
    pub fn remove_referencing(&mut self, element: NodeId) {
        for list in self.refs.values_mut() {
            list.retain(|r| r.element != element);
        }

        self.refs.retain(|_, list| !list.is_empty());
    }

    /// Returns the number of referenced elements.
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Checks that nothing is referenced.
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}
