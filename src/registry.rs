// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Mutex;

use crate::bridge::{self, Bridge};

/// A function that creates a bridge prototype.
///
/// Bridges are `Rc` based and cannot be shared between threads,
/// so the process-wide registry stores factories instead.
pub type BridgeFactory = fn() -> Rc<dyn Bridge>;

static DEFAULT_FACTORIES: Mutex<Vec<BridgeFactory>> = Mutex::new(Vec::new());

/// Registers a bridge for every registry created afterwards.
///
/// Registered bridges override the built-in ones with the same
/// namespace and local name.
pub fn register_default_bridge(factory: BridgeFactory) {
    DEFAULT_FACTORIES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(factory);
}

fn default_factories() -> Vec<BridgeFactory> {
    DEFAULT_FACTORIES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

type BridgeMap = HashMap<String, HashMap<String, Rc<dyn Bridge>>>;

/// A bundle of bridges installed on a registry.
pub trait BridgeExtension {
    /// Extensions are installed in ascending priority order,
    /// so an extension with a higher priority wins a conflict.
    fn priority(&self) -> i32;

    /// Feature names matched by the `requiredExtensions` attribute.
    fn feature_names(&self) -> Vec<String>;

    /// Registers extension bridges.
    fn register_tags(&self, registry: &mut BridgeRegistry);
}

/// Maps a namespace and a local name to a bridge prototype.
///
/// Has two scopes: defaults, populated on creation, and an overlay,
/// populated by [`BridgeRegistry::register`]. The overlay takes precedence.
#[derive(Default)]
pub struct BridgeRegistry {
    defaults: BridgeMap,
    overlay: BridgeMap,
    features: Vec<String>,
}

impl BridgeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in bridges and the process-wide ones.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for bridge in bridge::builtin_bridges() {
            insert(&mut registry.defaults, bridge);
        }

        for factory in default_factories() {
            insert(&mut registry.defaults, factory());
        }

        registry
    }

    /// Registers a bridge under its own namespace and local name.
    ///
    /// Replaces a previous registration in the overlay.
    pub fn register(&mut self, bridge: Rc<dyn Bridge>) {
        insert(&mut self.overlay, bridge);
    }

    /// Registers a bridge under an explicit namespace and local name.
    pub fn register_as(&mut self, namespace: &str, local_name: &str, bridge: Rc<dyn Bridge>) {
        self.overlay
            .entry(namespace.to_string())
            .or_default()
            .insert(local_name.to_string(), bridge);
    }

    /// Removes a bridge.
    ///
    /// The overlay is checked first, so the first call removes an override
    /// and the second one removes the default.
    pub fn unregister(&mut self, namespace: &str, local_name: &str) -> Option<Rc<dyn Bridge>> {
        remove(&mut self.overlay, namespace, local_name)
            .or_else(|| remove(&mut self.defaults, namespace, local_name))
    }

    /// Returns a bridge prototype.
    pub fn lookup(&self, namespace: &str, local_name: &str) -> Option<Rc<dyn Bridge>> {
        get(&self.overlay, namespace, local_name)
            .or_else(|| get(&self.defaults, namespace, local_name))
            .cloned()
    }

    /// Checks that a bridge is registered.
    pub fn contains(&self, namespace: &str, local_name: &str) -> bool {
        get(&self.overlay, namespace, local_name).is_some()
            || get(&self.defaults, namespace, local_name).is_some()
    }

    /// Installs extensions in ascending priority order.
    pub fn install_extensions(&mut self, mut extensions: Vec<Box<dyn BridgeExtension>>) {
        // Stable, so equal priorities keep their order.
        extensions.sort_by_key(|e| e.priority());
        for ext in extensions {
            log::debug!("Installing an extension with priority {}.", ext.priority());
            ext.register_tags(self);
            for name in ext.feature_names() {
                if !self.features.contains(&name) {
                    self.features.push(name);
                }
            }
        }
    }

    /// Returns feature names of the installed extensions.
    pub fn feature_names(&self) -> &[String] {
        &self.features
    }
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let count = |map: &BridgeMap| map.values().map(|m| m.len()).sum::<usize>();
        f.debug_struct("BridgeRegistry")
            .field("defaults", &count(&self.defaults))
            .field("overlay", &count(&self.overlay))
            .field("features", &self.features)
            .finish()
    }
}

fn insert(map: &mut BridgeMap, bridge: Rc<dyn Bridge>) {
    map.entry(bridge.namespace_uri().to_string())
        .or_default()
        .insert(bridge.local_name().to_string(), bridge);
}

fn get<'a>(map: &'a BridgeMap, namespace: &str, local_name: &str) -> Option<&'a Rc<dyn Bridge>> {
    map.get(namespace)?.get(local_name)
}

fn remove(map: &mut BridgeMap, namespace: &str, local_name: &str) -> Option<Rc<dyn Bridge>> {
    let names = map.get_mut(namespace)?;
    let bridge = names.remove(local_name);
    if names.is_empty() {
        map.remove(namespace);
    }

    bridge
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgbridge_dom::SVG_NS;

    struct Named(&'static str, &'static str);

    impl Bridge for Named {
        fn namespace_uri(&self) -> &str {
            self.0
        }

        fn local_name(&self) -> &str {
            self.1
        }
    }

    #[test]
    fn overlay_takes_precedence() {
        let mut registry = BridgeRegistry::with_defaults();
        let default = registry.lookup(SVG_NS, "rect").unwrap();
        assert!(default.as_graphics().is_some());

        registry.register(Rc::new(Named(SVG_NS, "rect")));
        let overridden = registry.lookup(SVG_NS, "rect").unwrap();
        assert!(overridden.as_graphics().is_none());

        assert!(registry.unregister(SVG_NS, "rect").is_some());
        assert!(registry.lookup(SVG_NS, "rect").unwrap().as_graphics().is_some());

        assert!(registry.unregister(SVG_NS, "rect").is_some());
        assert!(!registry.contains(SVG_NS, "rect"));
    }

    #[test]
    fn unknown_tags() {
        let registry = BridgeRegistry::with_defaults();
        assert!(registry.lookup(SVG_NS, "defs").is_none());
        assert!(registry.lookup("http://example.com/ns", "rect").is_none());
    }

    struct Ext(i32, &'static str);

    impl BridgeExtension for Ext {
        fn priority(&self) -> i32 {
            self.0
        }

        fn feature_names(&self) -> Vec<String> {
            vec![self.1.to_string()]
        }

        fn register_tags(&self, registry: &mut BridgeRegistry) {
            registry.register_as("http://example.com/ext", "star", Rc::new(Named(SVG_NS, self.1)));
        }
    }

    #[test]
    fn extensions_are_installed_by_priority() {
        let mut registry = BridgeRegistry::new();
        registry.install_extensions(vec![Box::new(Ext(10, "high")), Box::new(Ext(1, "low"))]);

        let bridge = registry.lookup("http://example.com/ext", "star").unwrap();
        assert_eq!(bridge.local_name(), "high");
        assert_eq!(registry.feature_names(), &["low".to_string(), "high".to_string()]);
    }
}
