// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::rc::Rc;

use svgbridge_dom::Document;
use url::Url;

/// A resource loading error.
#[derive(Debug)]
pub enum LoadError {
    /// Only `file:` and `data:` URLs can be loaded.
    UnsupportedScheme(String),

    /// A file cannot be read.
    Io(std::io::Error),

    /// A `data:` URL cannot be decoded.
    MalformedData,

    /// A document cannot be parsed.
    Parsing(svgbridge_dom::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            LoadError::UnsupportedScheme(ref scheme) => {
                write!(f, "'{}' URLs are not supported", scheme)
            }
            LoadError::Io(ref e) => write!(f, "{}", e),
            LoadError::MalformedData => write!(f, "malformed data URL"),
            LoadError::Parsing(ref e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoadError {}

/// Raw resource data.
#[derive(Clone, Debug)]
pub struct ResourceData {
    /// A MIME type from a `data:` URL. `None` for files.
    pub mime: Option<String>,
    /// Decoded content.
    pub data: Vec<u8>,
}

/// Loads and caches external documents.
///
/// Documents are keyed by their absolute URL without a fragment,
/// so resolving the same reference twice yields the same document.
#[derive(Default)]
pub struct DocumentLoader {
    documents: HashMap<String, Rc<Document>>,
}

impl DocumentLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cached document or loads one.
    pub fn load_document(&mut self, url: &Url) -> Result<Rc<Document>, LoadError> {
        let key = document_key(url);
        if let Some(doc) = self.documents.get(&key) {
            return Ok(doc.clone());
        }

        let resource = self.load_data(url)?;
        let mut doc = Document::from_data(&resource.data).map_err(LoadError::Parsing)?;
        if url.scheme() != "data" {
            doc.set_url(Some(key.clone()));
        }

        log::debug!("Loaded '{}'.", key);
        let doc = Rc::new(doc);
        self.documents.insert(key, doc.clone());
        Ok(doc)
    }

    /// Registers an already parsed document under a URL.
    ///
    /// Useful for documents that do not come from the file system.
    pub fn insert(&mut self, url: &Url, mut doc: Document) -> Rc<Document> {
        let key = document_key(url);
        doc.set_url(Some(key.clone()));
        let doc = Rc::new(doc);
        self.documents.insert(key, doc.clone());
        doc
    }

    /// Checks that a document is cached.
    pub fn contains(&self, url: &Url) -> bool {
        self.documents.contains_key(&document_key(url))
    }

    /// Returns the key of a cached document.
    ///
    /// `None` means the document was not loaded by this loader.
    pub fn key_of(&self, doc: &Document) -> Option<&str> {
        self.documents
            .iter()
            .find(|(_, d)| std::ptr::eq(d.as_ref(), doc))
            .map(|(key, _)| key.as_str())
    }

    /// Returns the number of cached documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Checks that no documents were loaded yet.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Loads raw data. The result is not cached.
    pub fn load_data(&self, url: &Url) -> Result<ResourceData, LoadError> {
        match url.scheme() {
            "data" => {
                let data_url =
                    data_url::DataUrl::process(url.as_str()).map_err(|_| LoadError::MalformedData)?;
                let (data, _) = data_url
                    .decode_to_vec()
                    .map_err(|_| LoadError::MalformedData)?;

                let mime = format!(
                    "{}/{}",
                    data_url.mime_type().type_.as_str(),
                    data_url.mime_type().subtype.as_str()
                );

                Ok(ResourceData {
                    mime: Some(mime),
                    data,
                })
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| LoadError::UnsupportedScheme(url.scheme().to_string()))?;
                let data = std::fs::read(path).map_err(LoadError::Io)?;
                Ok(ResourceData { mime: None, data })
            }
            scheme => Err(LoadError::UnsupportedScheme(scheme.to_string())),
        }
    }
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list().entries(self.documents.keys()).finish()
    }
}

/// Returns an URL without the fragment.
pub(crate) fn document_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_are_cached_by_url_without_fragment() {
        let mut loader = DocumentLoader::new();
        let url = Url::parse("data:image/svg+xml,%3Csvg%20xmlns='http://www.w3.org/2000/svg'/%3E")
            .unwrap();

        let doc1 = loader.load_document(&url).unwrap();
        let doc2 = loader.load_document(&url).unwrap();
        assert!(Rc::ptr_eq(&doc1, &doc2));
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn preloaded_documents() {
        let mut loader = DocumentLoader::new();
        let url = Url::parse("http://example.com/lib.svg").unwrap();
        let doc = Document::parse_str("<svg xmlns='http://www.w3.org/2000/svg'/>").unwrap();
        let doc = loader.insert(&url, doc);

        let with_fragment = Url::parse("http://example.com/lib.svg#grad").unwrap();
        assert!(loader.contains(&with_fragment));
        assert!(Rc::ptr_eq(&doc, &loader.load_document(&with_fragment).unwrap()));
        assert_eq!(doc.url(), Some("http://example.com/lib.svg"));
    }

    #[test]
    fn unsupported_scheme() {
        let loader = DocumentLoader::new();
        let url = Url::parse("http://example.com/lib.svg").unwrap();
        assert!(matches!(
            loader.load_data(&url),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }
}
