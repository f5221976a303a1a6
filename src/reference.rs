// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! URI references resolving.

use std::rc::Rc;

use svgbridge_dom::{Document, NodeId, SvgNode};
use url::Url;

use crate::loader::document_key;
use crate::{BridgeContext, BridgeError, Options, ResourceKind};

/// An ordered set of absolute URIs visited along a single reference chain.
#[derive(Clone, Debug)]
pub struct ResolutionPath {
    visited: Vec<String>,
    max_depth: usize,
}

/// Why an URI cannot be added to a [`ResolutionPath`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PathError {
    /// The URI was already visited.
    Circular,
    /// The chain is longer than allowed.
    TooDeep,
}

impl ResolutionPath {
    /// Creates an empty path.
    pub fn new(max_depth: usize) -> Self {
        ResolutionPath {
            visited: Vec::new(),
            max_depth,
        }
    }

    /// Appends an URI to the path.
    pub fn visit(&mut self, uri: String) -> Result<(), PathError> {
        if self.contains(&uri) {
            return Err(PathError::Circular);
        }

        if self.visited.len() >= self.max_depth {
            return Err(PathError::TooDeep);
        }

        self.visited.push(uri);
        Ok(())
    }

    /// Removes the last URI.
    pub fn leave(&mut self) {
        self.visited.pop();
    }

    /// Checks that an URI was visited.
    pub fn contains(&self, uri: &str) -> bool {
        self.visited.iter().any(|v| v == uri)
    }

    /// Returns the number of visited URIs.
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    /// Checks that the path is empty.
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    /// Returns visited URIs in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(|s| s.as_str())
    }
}

/// A resolved reference.
#[derive(Clone)]
pub enum Reference<'a> {
    /// An element of the referencing document.
    Local(SvgNode<'a>),

    /// Another document and, when the URI has a fragment, one of its elements.
    External {
        /// The loaded document.
        document: Rc<Document>,
        /// The referenced element.
        element: Option<NodeId>,
    },
}

impl Reference<'_> {
    /// Returns the referenced element, if any.
    pub fn element(&self) -> Option<SvgNode> {
        match self {
            Reference::Local(node) => Some(*node),
            Reference::External { document, element } => element.map(|id| document.get(id)),
        }
    }
}

impl std::fmt::Debug for Reference<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Reference::Local(node) => write!(f, "Local({})", node.id()),
            Reference::External { document, element } => {
                write!(f, "External({:?}, {:?})", document.url(), element)
            }
        }
    }
}

/// Returns an absolute URI that identifies an element.
///
/// Elements without an `id` are identified by their position in the arena.
pub fn element_uri(node: SvgNode) -> String {
    let doc_url = node.document().url().unwrap_or_default();
    let id = node.element_id();
    if id.is_empty() {
        format!("{}#node({})", doc_url, node.id())
    } else {
        format!("{}#{}", doc_url, id)
    }
}

/// Returns the base URL of a document.
pub fn document_url(doc: &Document, opt: &Options) -> Option<Url> {
    if let Some(url) = doc.url() {
        return Url::parse(url).ok();
    }

    let dir = opt.resources_dir.as_ref()?;
    let dir = if dir.is_absolute() {
        dir.clone()
    } else {
        std::env::current_dir().ok()?.join(dir)
    };
    Url::from_directory_path(dir).ok()
}

/// Resolves an URI string against the document location.
pub fn absolute_url(doc: &Document, uri: &str, opt: &Options) -> Option<Url> {
    if let Ok(url) = Url::parse(uri) {
        return Some(url);
    }

    match document_url(doc, opt) {
        Some(base) => base.join(uri).ok(),
        None => {
            // No base. Treat it as a path.
            let path = opt.get_abs_path(std::path::Path::new(uri));
            let path = if path.is_absolute() {
                path
            } else {
                std::env::current_dir().ok()?.join(path)
            };
            Url::from_file_path(path).ok()
        }
    }
}

/// Extracts an element ID from an URI fragment.
///
/// Supports `#id` and `#xpointer(id('id'))`.
fn fragment_id(fragment: &str) -> &str {
    fragment
        .strip_prefix("xpointer(id(")
        .and_then(|s| s.strip_suffix("))"))
        .map(|s| s.trim_matches(|c| c == '\'' || c == '"'))
        .unwrap_or(fragment)
}

/// Splits a `url(...)` value into the URI and the remaining text.
///
/// Unlike `svgtypes::FuncIRI`, accepts references to other documents.
pub fn split_func_iri(value: &str) -> Option<(&str, &str)> {
    let rest = value.trim_start().strip_prefix("url(")?;
    let end = rest.find(')')?;
    let uri = rest[..end].trim().trim_matches(|c| c == '\'' || c == '"').trim();
    if uri.is_empty() {
        return None;
    }

    Some((uri, rest[end + 1..].trim()))
}

/// Resolves an URI referenced by `base`.
///
/// Same-document fragments are simple lookups. Other documents are checked
/// against the security policy and loaded through the context's loader.
pub fn resolve<'a>(
    ctx: &mut BridgeContext,
    base: SvgNode<'a>,
    attr: &str,
    uri: &str,
    kind: ResourceKind,
) -> Result<Reference<'a>, BridgeError> {
    let uri = uri.trim();
    let doc = base.document();

    if let Some(fragment) = uri.strip_prefix('#') {
        return doc
            .element_by_id(fragment_id(fragment))
            .map(Reference::Local)
            .ok_or_else(|| BridgeError::broken_reference(base, attr, uri));
    }

    let url = absolute_url(doc, uri, &ctx.opt)
        .ok_or_else(|| BridgeError::broken_reference(base, attr, uri))?;
    let doc_url = document_url(doc, &ctx.opt);

    // A reference to the current document with an explicit location.
    if doc_url.as_ref().map(document_key) == Some(document_key(&url)) {
        let fragment = url.fragment().unwrap_or_default();
        return doc
            .element_by_id(fragment_id(fragment))
            .map(Reference::Local)
            .ok_or_else(|| BridgeError::broken_reference(base, attr, uri));
    }

    if let Err(e) = ctx
        .user_agent
        .check_load_external_resource(kind, &url, doc_url.as_ref())
    {
        log::warn!("{}", e);
        return Err(BridgeError::security_denied(base, attr, uri));
    }

    if ctx.user_agent.is_interrupted() {
        return Err(BridgeError::Interrupted);
    }

    let document = match ctx.loader.load_document(&url) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("Failed to load '{}' cause {}.", url, e);
            return Err(BridgeError::broken_reference(base, attr, uri));
        }
    };

    let element = match url.fragment() {
        Some(fragment) => Some(
            document
                .element_by_id(fragment_id(fragment))
                .map(|n| n.id())
                .ok_or_else(|| BridgeError::broken_reference(base, attr, uri))?,
        ),
        None => None,
    };

    Ok(Reference::External { document, element })
}

/// Resolves a same-document IRI or FuncIRI attribute.
///
/// Returns `Ok(None)` when the attribute is absent or is not a link, like `fill="red"`.
pub fn resolve_local_link<'a>(
    node: SvgNode<'a>,
    attr: &str,
) -> Result<Option<SvgNode<'a>>, BridgeError> {
    let value = match node.raw_attribute(attr) {
        Some(v) => v,
        None => return Ok(None),
    };

    let id = if attr == "href" {
        match svgtypes::IRI::from_str(value) {
            Ok(v) => v.0,
            Err(_) => return Ok(None),
        }
    } else {
        match svgtypes::FuncIRI::from_str(value) {
            Ok(v) => v.0,
            Err(_) => return Ok(None),
        }
    };

    node.document()
        .element_by_id(id)
        .map(Some)
        .ok_or_else(|| BridgeError::broken_reference(node, attr, value))
}

/// Elements of an `href` chain, starting with the element the walk began with.
///
/// Keeps the other documents the chain passes through alive.
#[derive(Clone, Debug)]
pub struct HrefChain {
    // `None` stands for the document of the first element.
    links: Vec<(Option<Rc<Document>>, NodeId)>,
}

impl HrefChain {
    /// Returns chain elements in order.
    pub fn nodes<'a>(&'a self, start: SvgNode<'a>) -> Vec<SvgNode<'a>> {
        self.links
            .iter()
            .map(|(doc, id)| match doc {
                Some(doc) => doc.get(*id),
                None => start.document().get(*id),
            })
            .collect()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Always `false`, since a chain contains at least its first element.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Walks an `href` chain, starting with `start` itself.
///
/// Used by elements that inherit attributes or content from the referenced one,
/// like gradients and filters. Links are resolved relative to the document
/// of the element that holds them, so a chain may pass through other documents.
///
/// Fails with a circular reference error when the chain loops,
/// and with a broken reference error when a link cannot be resolved.
pub fn href_chain(ctx: &mut BridgeContext, start: SvgNode) -> Result<HrefChain, BridgeError> {
    let mut path = ResolutionPath::new(ctx.opt.max_reference_depth);
    // The very first visit cannot be circular.
    let _ = path.visit(element_uri(start));

    let mut links: Vec<(Option<Rc<Document>>, NodeId)> = vec![(None, start.id())];
    loop {
        let (doc, id) = match links.last() {
            Some(v) => v.clone(),
            None => break,
        };
        let current = match doc {
            Some(ref doc) => doc.get(id),
            None => start.document().get(id),
        };
        let href = match current.raw_attribute("href") {
            Some(v) => v,
            None => break,
        };

        let next = match resolve(ctx, current, "href", href, ResourceKind::Document)? {
            Reference::Local(node) => (doc.clone(), node.id()),
            Reference::External {
                document,
                element: Some(id),
            } => (Some(document), id),
            Reference::External { element: None, .. } => {
                return Err(BridgeError::broken_reference(current, "href", href));
            }
        };

        let uri = match next.0 {
            Some(ref doc) => element_uri(doc.get(next.1)),
            None => element_uri(start.document().get(next.1)),
        };
        match path.visit(uri) {
            Ok(()) => {}
            Err(PathError::Circular) => {
                return Err(BridgeError::circular_reference(current, "href", href));
            }
            Err(PathError::TooDeep) => {
                log::warn!("'{}' has a too long reference chain.", start.element_id());
                return Err(BridgeError::circular_reference(current, "href", href));
            }
        }

        links.push(next);
    }

    Ok(HrefChain { links })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_detects_repeats() {
        let mut path = ResolutionPath::new(3);
        assert_eq!(path.visit("doc.svg#a".to_string()), Ok(()));
        assert_eq!(path.visit("doc.svg#b".to_string()), Ok(()));
        assert_eq!(path.visit("doc.svg#a".to_string()), Err(PathError::Circular));
        assert_eq!(path.visit("doc.svg#c".to_string()), Ok(()));
        assert_eq!(path.visit("doc.svg#d".to_string()), Err(PathError::TooDeep));

        path.leave();
        assert_eq!(path.len(), 2);
        assert_eq!(path.iter().collect::<Vec<_>>(), vec!["doc.svg#a", "doc.svg#b"]);
    }

    #[test]
    fn func_iri_values() {
        assert_eq!(split_func_iri("url(#lg)"), Some(("#lg", "")));
        assert_eq!(
            split_func_iri(" url( 'shapes.svg#lg' ) red"),
            Some(("shapes.svg#lg", "red"))
        );
        assert_eq!(split_func_iri("url()"), None);
        assert_eq!(split_func_iri("red"), None);
    }

    #[test]
    fn xpointer_fragments() {
        assert_eq!(fragment_id("xpointer(id('a'))"), "a");
        assert_eq!(fragment_id("b"), "b");
    }

    #[test]
    fn element_uris() {
        let mut doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'><g id='g'><rect/></g></svg>",
        )
        .unwrap();
        doc.set_url(Some("file:///tmp/a.svg".to_string()));

        let g = doc.element_by_id("g").unwrap();
        assert_eq!(element_uri(g), "file:///tmp/a.svg#g");

        let rect = g.first_element_child().unwrap();
        assert!(element_uri(rect).starts_with("file:///tmp/a.svg#node("));
    }
}
