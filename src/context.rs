// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;

use svgbridge_dom::{NodeId, SvgNode};
use svgbridge_gvt::{Node, NodeExt, NodeKind, NodeUid};
use url::Url;

use crate::bridge::foreign::ForeignObjectHandler;
use crate::bridge::{Bridge, Fragment};
use crate::loader::document_key;
use crate::style_refs::{StyleReference, StyleReferenceTracker};
use crate::user_agent::{DefaultUserAgent, UserAgent};
use crate::{BridgeError, BridgeRegistry, DocumentLoader, Options, UnitResolver};

type WeakNode = rctree::WeakNode<NodeKind>;

/// Element and node bindings.
#[derive(Default)]
pub(crate) struct Bindings {
    node_by_element: HashMap<NodeId, WeakNode>,
    element_by_uid: HashMap<NodeUid, NodeId>,
    bridge_by_element: HashMap<NodeId, Rc<dyn Bridge>>,
}

/// Bindings removed from a subtree, which can be put back.
pub(crate) struct SavedBindings(Vec<(NodeId, Node, Rc<dyn Bridge>)>);

impl SavedBindings {
    /// Returns elements that were bound.
    pub(crate) fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.iter().map(|(element, _, _)| *element)
    }
}

impl Bindings {
    fn bind(&mut self, element: NodeId, node: &Node, bridge: Rc<dyn Bridge>) {
        if let Some(old) = self.node_by_element.get(&element).and_then(|n| n.upgrade()) {
            self.element_by_uid.remove(&old.uid());
        }

        self.node_by_element.insert(element, node.downgrade());
        self.element_by_uid.insert(node.uid(), element);
        self.bridge_by_element.insert(element, bridge);
    }

    fn unbind(&mut self, element: NodeId) -> Option<(Node, Rc<dyn Bridge>)> {
        let node = self.node_by_element.remove(&element)?.upgrade();
        if let Some(ref node) = node {
            self.element_by_uid.remove(&node.uid());
        }

        let bridge = self.bridge_by_element.remove(&element)?;
        Some((node?, bridge))
    }

    fn node(&self, element: NodeId) -> Option<Node> {
        self.node_by_element.get(&element)?.upgrade()
    }
}

// Elements of loaded documents are keyed by the document URL.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
struct FragmentKey {
    document: Option<String>,
    node: NodeId,
}

#[derive(Clone)]
struct CachedFragment {
    fragment: Option<Fragment>,
    deps: Vec<NodeId>,
}

/// Document-scoped state shared by all bridges.
///
/// Lives as long as one document's build and update session.
pub struct BridgeContext {
    pub(crate) opt: Options,
    pub(crate) registry: BridgeRegistry,
    pub(crate) units: UnitResolver,
    pub(crate) user_agent: Rc<dyn UserAgent>,
    pub(crate) loader: DocumentLoader,
    pub(crate) style_refs: StyleReferenceTracker,
    pub(crate) bindings: Bindings,
    /// `use` element to its shadow tree root.
    pub(crate) shadow_roots: HashMap<NodeId, NodeId>,
    /// A referenced element to the `use` elements that instantiate it.
    pub(crate) use_targets: HashMap<NodeId, Vec<NodeId>>,
    /// `use` elements that cannot be instantiated.
    pub(crate) use_errors: HashMap<NodeId, BridgeError>,
    /// Set while building `clipPath` children.
    pub(crate) in_clip_path: bool,
    fragments: HashMap<FragmentKey, CachedFragment>,
    in_progress: Vec<FragmentKey>,
    dep_stack: Vec<Vec<NodeId>>,
    foreign_handlers: HashMap<String, Rc<dyn ForeignObjectHandler>>,
    errors: Vec<BridgeError>,
}

impl BridgeContext {
    /// Creates a context with the default user agent and the default bridges.
    pub fn new(opt: Options) -> Self {
        let ua = DefaultUserAgent::new(&opt).into_rc();
        Self::with_user_agent(opt, ua)
    }

    /// Creates a context with a custom user agent.
    pub fn with_user_agent(opt: Options, user_agent: Rc<dyn UserAgent>) -> Self {
        BridgeContext {
            units: UnitResolver::new(&opt),
            opt,
            registry: BridgeRegistry::with_defaults(),
            user_agent,
            loader: DocumentLoader::new(),
            style_refs: StyleReferenceTracker::new(),
            bindings: Bindings::default(),
            shadow_roots: HashMap::new(),
            use_targets: HashMap::new(),
            use_errors: HashMap::new(),
            in_clip_path: false,
            fragments: HashMap::new(),
            in_progress: Vec::new(),
            dep_stack: Vec::new(),
            foreign_handlers: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Returns processing options.
    pub fn options(&self) -> &Options {
        &self.opt
    }

    /// Returns the active bridge registry.
    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    /// Returns the active bridge registry for per-context overrides.
    pub fn registry_mut(&mut self) -> &mut BridgeRegistry {
        &mut self.registry
    }

    /// Returns the user agent.
    pub fn user_agent(&self) -> &Rc<dyn UserAgent> {
        &self.user_agent
    }

    /// Returns the unit resolver.
    pub fn units(&self) -> &UnitResolver {
        &self.units
    }

    /// Returns the document loader.
    pub fn loader_mut(&mut self) -> &mut DocumentLoader {
        &mut self.loader
    }

    /// Returns the style reference tracker.
    pub fn style_references(&self) -> &StyleReferenceTracker {
        &self.style_refs
    }

    /// Checks that the tree follows document mutations.
    pub fn is_dynamic(&self) -> bool {
        self.opt.dynamic == crate::Dynamic::Dynamic
    }

    /// Registers a `foreignObject` content handler for a namespace.
    pub fn register_foreign_handler(&mut self, handler: Rc<dyn ForeignObjectHandler>) {
        self.foreign_handlers
            .insert(handler.namespace_uri().to_string(), handler);
    }

    pub(crate) fn foreign_handler(&self, namespace: &str) -> Option<Rc<dyn ForeignObjectHandler>> {
        self.foreign_handlers.get(namespace).cloned()
    }

    /// Checks that an installed extension implements a feature.
    pub fn has_extension(&self, name: &str) -> bool {
        self.registry.feature_names().iter().any(|n| n == name)
    }

    /// Returns a node bound to an element.
    pub fn node_for_element(&self, element: NodeId) -> Option<Node> {
        self.bindings.node(element)
    }

    /// Returns an element bound to a node.
    pub fn element_for_node(&self, node: &Node) -> Option<NodeId> {
        self.bindings.element_by_uid.get(&node.uid()).copied()
    }

    /// Returns a bridge that handles element updates.
    pub fn bridge_for_element(&self, element: NodeId) -> Option<Rc<dyn Bridge>> {
        self.bindings.bridge_by_element.get(&element).cloned()
    }

    /// Returns the number of bound elements.
    pub fn bindings_count(&self) -> usize {
        self.bindings.node_by_element.len()
    }

    /// Checks that new nodes should be bound to their elements.
    ///
    /// Content of clip paths, masks, markers and patterns is never bound.
    pub(crate) fn should_bind(&self) -> bool {
        self.opt.dynamic.keeps_bindings() && self.dep_stack.is_empty()
    }

    pub(crate) fn bind(&mut self, element: NodeId, node: &Node, bridge: Rc<dyn Bridge>) {
        self.bindings.bind(element, node, bridge);
    }

    pub(crate) fn unbind(&mut self, element: NodeId) {
        self.bindings.unbind(element);
    }

    /// Removes bindings of a node and its descendants.
    pub(crate) fn unbind_subtree(&mut self, node: &Node) -> SavedBindings {
        let mut saved = Vec::new();
        for n in node.descendants() {
            if let Some(element) = self.element_for_node(&n) {
                if let Some((bound, bridge)) = self.bindings.unbind(element) {
                    saved.push((element, bound, bridge));
                }
            }
        }

        SavedBindings(saved)
    }

    pub(crate) fn restore_bindings(&mut self, saved: SavedBindings) {
        for (element, node, bridge) in saved.0 {
            self.bindings.bind(element, &node, bridge);
        }
    }

    /// Reports an error to the user agent and remembers it.
    pub fn report(&mut self, error: BridgeError) {
        self.user_agent.display_error(&error);
        self.errors.push(error);
    }

    /// Returns all reported errors.
    pub fn errors(&self) -> &[BridgeError] {
        &self.errors
    }

    /// Drains reported errors.
    pub fn take_errors(&mut self) -> Vec<BridgeError> {
        std::mem::take(&mut self.errors)
    }

    fn fragment_key(&self, node: SvgNode) -> FragmentKey {
        FragmentKey {
            document: self.loader.key_of(node.document()).map(str::to_string),
            node: node.id(),
        }
    }

    /// Records that the fragment being built depends on an element.
    ///
    /// Elements of loaded documents never change, so they are skipped.
    pub(crate) fn depend_on(&mut self, element: SvgNode) {
        if self.loader.key_of(element.document()).is_some() {
            return;
        }

        if let Some(frame) = self.dep_stack.last_mut() {
            if !frame.contains(&element.id()) {
                frame.push(element.id());
            }
        }
    }

    /// Returns a fragment produced by the bridge of `target`,
    /// requested by the `property` of `referencing`.
    ///
    /// Fragments are cached per target element of a document. Everything
    /// a fragment was built from is recorded as a style reference of `referencing`.
    pub(crate) fn fragment(
        &mut self,
        referencing: SvgNode,
        property: &str,
        target: SvgNode,
    ) -> Result<Option<Fragment>, BridgeError> {
        let key = self.fragment_key(target);
        if self.in_progress.contains(&key) {
            let uri = format!("#{}", target.element_id());
            return Err(BridgeError::circular_reference(referencing, property, &uri));
        }

        let (fragment, deps) = match self.fragments.get(&key) {
            Some(cached) => (cached.fragment.clone(), cached.deps.clone()),
            None => {
                let bridge = target
                    .tag_name()
                    .and_then(|name| {
                        self.registry
                            .lookup(target.namespace().unwrap_or_default(), name)
                    });
                let bridge = match bridge {
                    Some(v) => v,
                    None => return Ok(None),
                };

                if bridge.as_fragment().is_none() {
                    return Ok(None);
                }

                let external = key.document.is_some();
                self.in_progress.push(key.clone());
                self.dep_stack
                    .push(if external { Vec::new() } else { vec![target.id()] });
                let in_clip_path = std::mem::replace(&mut self.in_clip_path, false);

                let result = match bridge.as_fragment() {
                    Some(fb) => fb.create_fragment(self, target),
                    None => Ok(None),
                };

                self.in_clip_path = in_clip_path;
                let deps = self.dep_stack.pop().unwrap_or_default();
                self.in_progress.pop();

                let fragment = result?;
                let same_document = std::ptr::eq(target.document(), referencing.document());
                if external || (same_document && target.is_connected()) {
                    self.fragments.insert(
                        key,
                        CachedFragment {
                            fragment: fragment.clone(),
                            deps: deps.clone(),
                        },
                    );
                }

                (fragment, deps)
            }
        };

        if !self.dep_stack.is_empty() {
            if let Some(frame) = self.dep_stack.last_mut() {
                for dep in deps {
                    if !frame.contains(&dep) {
                        frame.push(dep);
                    }
                }
            }
        } else if self.opt.dynamic.keeps_bindings() {
            for dep in deps {
                self.style_refs.add(
                    dep,
                    StyleReference {
                        element: referencing.id(),
                        property: property.to_string(),
                    },
                );
            }
        }

        Ok(fragment)
    }

    /// Drops cached fragments that depend on an element or on its ancestors.
    ///
    /// Returns the targets of dropped fragments.
    pub(crate) fn invalidate_fragments(&mut self, element: SvgNode) -> Vec<NodeId> {
        let chain: Vec<NodeId> = element.ancestors().map(|n| n.id()).collect();
        let mut dropped: Vec<FragmentKey> = self
            .fragments
            .iter()
            .filter(|(_, f)| f.deps.iter().any(|d| chain.contains(d)))
            .map(|(key, _)| key.clone())
            .collect();
        dropped.sort_by_key(|key| key.node);

        for key in &dropped {
            self.fragments.remove(key);
        }

        dropped.into_iter().map(|key| key.node).collect()
    }

    /// Checks that a fragment of `target` is cached.
    ///
    /// `target` is an element of the document being built.
    pub fn has_cached_fragment(&self, target: NodeId) -> bool {
        self.fragments.contains_key(&FragmentKey {
            document: None,
            node: target,
        })
    }

    /// Checks that a fragment of an element of a loaded document is cached.
    pub fn has_cached_external_fragment(&self, url: &Url, target: NodeId) -> bool {
        self.fragments.contains_key(&FragmentKey {
            document: Some(document_key(url)),
            node: target,
        })
    }

    /// Forgets all per-document state, keeping options, the registry and the user agent.
    pub(crate) fn reset(&mut self) {
        self.units = UnitResolver::new(&self.opt);
        self.style_refs = StyleReferenceTracker::new();
        self.bindings = Bindings::default();
        self.shadow_roots.clear();
        self.use_targets.clear();
        self.use_errors.clear();
        self.in_clip_path = false;
        self.fragments.clear();
        self.in_progress.clear();
        self.dep_stack.clear();
    }
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("dynamic", &self.opt.dynamic)
            .field("registry", &self.registry)
            .field("bindings", &self.bindings.node_by_element.len())
            .field("fragments", &self.fragments.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}
