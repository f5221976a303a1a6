// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use url::Url;

/// A kind of an externally referenced resource.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResourceKind {
    /// An SVG document referenced by `use`, a paint server or a filter.
    Document,
    /// A raster or an SVG image.
    Image,
    /// A font.
    Font,
    /// A script.
    Script,
}

/// A policy applied before loading an external resource.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SecurityPolicy {
    /// Nothing external is loaded, not even `data:` URLs.
    NoExternal,
    /// Only `data:` URLs are loaded.
    EmbeddedOnly,
    /// `data:` URLs and resources from the document's origin are loaded.
    ///
    /// All `file:` URLs share a single origin.
    SameOrigin,
    /// Everything is loaded.
    Unrestricted,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        SecurityPolicy::SameOrigin
    }
}

impl std::str::FromStr for SecurityPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SecurityPolicy::NoExternal),
            "embedded" => Ok(SecurityPolicy::EmbeddedOnly),
            "same-origin" => Ok(SecurityPolicy::SameOrigin),
            "all" => Ok(SecurityPolicy::Unrestricted),
            _ => Err("invalid security policy"),
        }
    }
}

/// A refused resource load.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SecurityViolation {
    /// The refused resource.
    pub resource: String,
    /// Why it was refused.
    pub reason: &'static str,
}

impl std::fmt::Display for SecurityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "'{}' was refused: {}", self.resource, self.reason)
    }
}

impl std::error::Error for SecurityViolation {}

impl SecurityPolicy {
    /// Checks that `resource` can be loaded by a document located at `document`.
    pub fn check(
        &self,
        kind: ResourceKind,
        resource: &Url,
        document: Option<&Url>,
    ) -> Result<(), SecurityViolation> {
        let deny = |reason| {
            Err(SecurityViolation {
                resource: resource.to_string(),
                reason,
            })
        };

        if kind == ResourceKind::Script && *self != SecurityPolicy::Unrestricted {
            return deny("scripts are not allowed");
        }

        let embedded = resource.scheme() == "data";
        match self {
            SecurityPolicy::NoExternal => deny("external resources are disabled"),
            SecurityPolicy::EmbeddedOnly if embedded => Ok(()),
            SecurityPolicy::EmbeddedOnly => deny("only embedded resources are allowed"),
            SecurityPolicy::SameOrigin if embedded => Ok(()),
            SecurityPolicy::SameOrigin => match document {
                Some(document) if is_same_origin(resource, document) => Ok(()),
                Some(_) => deny("the resource has a different origin"),
                // A document without a location has no origin to compare against.
                None => deny("the document has no origin"),
            },
            SecurityPolicy::Unrestricted => Ok(()),
        }
    }
}

fn is_same_origin(a: &Url, b: &Url) -> bool {
    // `file:` origins are opaque in the URL standard, so they are never equal.
    if a.scheme() == "file" || b.scheme() == "file" {
        return a.scheme() == b.scheme();
    }

    a.origin() == b.origin()
}
