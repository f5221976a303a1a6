// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use svgbridge_dom::{NodeId, SvgNode};
use svgbridge_gvt::Node;

/// A short description of the element an error originates from.
#[derive(Clone, PartialEq, Debug)]
pub struct ElementInfo {
    /// Element's local name.
    pub tag_name: String,
    /// Element's `id` attribute. Can be empty.
    pub id: String,
    /// Element's DOM identifier.
    pub node_id: NodeId,
}

impl ElementInfo {
    /// Captures an element.
    pub fn new(node: SvgNode) -> Self {
        ElementInfo {
            tag_name: node.tag_name().unwrap_or_default().to_string(),
            id: node.element_id().to_string(),
            node_id: node.id(),
        }
    }
}

impl std::fmt::Display for ElementInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.id.is_empty() {
            write!(f, "<{}> ({})", self.tag_name, self.node_id)
        } else {
            write!(f, "<{} id='{}'> ({})", self.tag_name, self.id, self.node_id)
        }
    }
}

/// Diagnostic context attached to every [`BridgeError`].
#[derive(Clone, Default, Debug)]
pub struct ErrorContext {
    /// The offending element.
    pub element: Option<ElementInfo>,
    /// The offending attribute.
    pub attribute: Option<String>,
    /// The graphics node built so far, if any.
    pub node: Option<Node>,
}

impl ErrorContext {
    /// Creates a context for an element.
    pub fn element(node: SvgNode) -> Self {
        ErrorContext {
            element: Some(ElementInfo::new(node)),
            attribute: None,
            node: None,
        }
    }

    /// Creates a context for an element attribute.
    pub fn attribute(node: SvgNode, name: &str) -> Self {
        ErrorContext {
            element: Some(ElementInfo::new(node)),
            attribute: Some(name.to_string()),
            node: None,
        }
    }
}

/// Bridge errors.
///
/// Construction and update failures are reported with this type.
/// Recoverable errors are substituted with a broken-link placeholder,
/// other errors disable the element's own subtree.
#[derive(Clone, Debug)]
pub enum BridgeError {
    /// A required attribute is missing.
    MissingAttribute(ErrorContext),

    /// An attribute value cannot be parsed.
    MalformedAttribute {
        /// Where it happened.
        context: ErrorContext,
        /// The unparsable value.
        value: String,
    },

    /// An attribute value is parsable but not allowed, like a negative radius.
    IllegalValue {
        /// Where it happened.
        context: ErrorContext,
        /// The illegal value.
        value: String,
    },

    /// A reference cannot be resolved.
    BrokenReference {
        /// Where it happened.
        context: ErrorContext,
        /// The offending URI.
        uri: String,
    },

    /// A reference chain loops back onto itself.
    CircularReference {
        /// Where it happened.
        context: ErrorContext,
        /// The URI that was visited twice.
        uri: String,
    },

    /// The security policy refused to load a resource.
    SecurityDenied {
        /// Where it happened.
        context: ErrorContext,
        /// The refused URI.
        uri: String,
    },

    /// The operation was cancelled.
    Interrupted,
}

impl BridgeError {
    /// Creates a `MissingAttribute` error.
    pub fn missing_attribute(node: SvgNode, name: &str) -> Self {
        BridgeError::MissingAttribute(ErrorContext::attribute(node, name))
    }

    /// Creates a `MalformedAttribute` error.
    pub fn malformed_attribute(node: SvgNode, name: &str, value: &str) -> Self {
        BridgeError::MalformedAttribute {
            context: ErrorContext::attribute(node, name),
            value: value.to_string(),
        }
    }

    /// Creates an `IllegalValue` error.
    pub fn illegal_value(node: SvgNode, name: &str, value: &str) -> Self {
        BridgeError::IllegalValue {
            context: ErrorContext::attribute(node, name),
            value: value.to_string(),
        }
    }

    /// Creates a `BrokenReference` error.
    pub fn broken_reference(node: SvgNode, name: &str, uri: &str) -> Self {
        BridgeError::BrokenReference {
            context: ErrorContext::attribute(node, name),
            uri: uri.to_string(),
        }
    }

    /// Creates a `CircularReference` error.
    pub fn circular_reference(node: SvgNode, name: &str, uri: &str) -> Self {
        BridgeError::CircularReference {
            context: ErrorContext::attribute(node, name),
            uri: uri.to_string(),
        }
    }

    /// Creates a `SecurityDenied` error.
    pub fn security_denied(node: SvgNode, name: &str, uri: &str) -> Self {
        BridgeError::SecurityDenied {
            context: ErrorContext::attribute(node, name),
            uri: uri.to_string(),
        }
    }

    /// Returns a stable error code.
    ///
    /// Codes are used as keys by the user agent, e.g. to select a broken-link image.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingAttribute(_) => "attribute.missing",
            BridgeError::MalformedAttribute { .. } => "attribute.malformed",
            BridgeError::IllegalValue { .. } => "attribute.illegal",
            BridgeError::BrokenReference { .. } => "uri.badTarget",
            BridgeError::CircularReference { .. } => "xlink.href.circularDependencies",
            BridgeError::SecurityDenied { .. } => "uri.unsecure",
            BridgeError::Interrupted => "interrupted",
        }
    }

    /// Checks that the error should be replaced by a placeholder
    /// instead of disabling the element.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::BrokenReference { .. }
                | BridgeError::CircularReference { .. }
                | BridgeError::SecurityDenied { .. }
                | BridgeError::Interrupted
        )
    }

    /// Returns the offending URI, if any.
    pub fn uri(&self) -> Option<&str> {
        match self {
            BridgeError::BrokenReference { uri, .. }
            | BridgeError::CircularReference { uri, .. }
            | BridgeError::SecurityDenied { uri, .. } => Some(uri),
            _ => None,
        }
    }

    /// Returns the offending attribute name, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.context()?.attribute.as_deref()
    }

    /// Returns the offending element, if any.
    pub fn element(&self) -> Option<&ElementInfo> {
        self.context()?.element.as_ref()
    }

    /// Returns the diagnostic context.
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            BridgeError::MissingAttribute(ref context)
            | BridgeError::MalformedAttribute { ref context, .. }
            | BridgeError::IllegalValue { ref context, .. }
            | BridgeError::BrokenReference { ref context, .. }
            | BridgeError::CircularReference { ref context, .. }
            | BridgeError::SecurityDenied { ref context, .. } => Some(context),
            BridgeError::Interrupted => None,
        }
    }

    /// Attaches the node built so far.
    pub fn with_node(mut self, node: &Node) -> Self {
        match self {
            BridgeError::MissingAttribute(ref mut context)
            | BridgeError::MalformedAttribute {
                ref mut context, ..
            }
            | BridgeError::IllegalValue {
                ref mut context, ..
            }
            | BridgeError::BrokenReference {
                ref mut context, ..
            }
            | BridgeError::CircularReference {
                ref mut context, ..
            }
            | BridgeError::SecurityDenied {
                ref mut context, ..
            } => {
                if context.node.is_none() {
                    context.node = Some(node.clone());
                }
            }
            BridgeError::Interrupted => {}
        }

        self
    }
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(element) = self.element() {
            write!(f, "{}: ", element)?;
        }

        let attr = self.attribute().unwrap_or_default();
        match self {
            BridgeError::MissingAttribute(_) => {
                write!(f, "the '{}' attribute is required", attr)
            }
            BridgeError::MalformedAttribute { value, .. } => {
                write!(f, "the '{}' attribute has a malformed value '{}'", attr, value)
            }
            BridgeError::IllegalValue { value, .. } => {
                write!(f, "the '{}' attribute has an illegal value '{}'", attr, value)
            }
            BridgeError::BrokenReference { uri, .. } => {
                write!(f, "cannot resolve '{}'", uri)
            }
            BridgeError::CircularReference { uri, .. } => {
                write!(f, "'{}' is a part of a circular reference chain", uri)
            }
            BridgeError::SecurityDenied { uri, .. } => {
                write!(f, "loading of '{}' is not allowed", uri)
            }
            BridgeError::Interrupted => write!(f, "the operation was interrupted"),
        }
    }
}

impl std::error::Error for BridgeError {}

/// List of all errors.
#[derive(Debug)]
pub enum Error {
    /// The document cannot be parsed.
    Dom(svgbridge_dom::Error),

    /// The root element cannot be built.
    Bridge(BridgeError),

    /// SVG doesn't have a valid size.
    ///
    /// Occurs when width and/or height are <= 0.
    ///
    /// Also occurs if width, height and viewBox are not set.
    InvalidSize,
}

impl From<svgbridge_dom::Error> for Error {
    fn from(e: svgbridge_dom::Error) -> Self {
        Error::Dom(e)
    }
}

impl From<BridgeError> for Error {
    fn from(e: BridgeError) -> Self {
        Error::Bridge(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Error::Dom(ref e) => write!(f, "{}", e),
            Error::Bridge(ref e) => write!(f, "{}", e),
            Error::InvalidSize => write!(f, "SVG has an invalid size"),
        }
    }
}

impl std::error::Error for Error {}

pub(crate) trait OptionLog {
    fn log_none<F: FnOnce()>(self, f: F) -> Self;
}

impl<T> OptionLog for Option<T> {
    #[inline]
    fn log_none<F: FnOnce()>(self, f: F) -> Self {
        self.or_else(|| {
            f();
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgbridge_dom::Document;

    #[test]
    fn codes_and_recoverability() {
        let doc = Document::parse_str(
            "<svg xmlns='http://www.w3.org/2000/svg'><circle id='c'/></svg>",
        )
        .unwrap();
        let circle = doc.element_by_id("c").unwrap();

        let err = BridgeError::missing_attribute(circle, "r");
        assert_eq!(err.code(), "attribute.missing");
        assert_eq!(err.attribute(), Some("r"));
        assert!(!err.is_recoverable());
        assert_eq!(err.element().map(|e| e.tag_name.as_str()), Some("circle"));

        let err = BridgeError::circular_reference(circle, "href", "#c");
        assert!(err.is_recoverable());
        assert_eq!(err.uri(), Some("#c"));
        assert!(err.to_string().contains("circular"));
    }
}
