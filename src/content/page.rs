//! Structured content extracted from a page.

use std::collections::BTreeMap;

use axum::body::Bytes;

use crate::template::Bindings;

/// Title, head and body of an HTML page plus any extra named properties.
///
/// Always carries the original bytes, so a caller can fall back to sending
/// the page untouched when extraction fails.
#[derive(Debug, Clone)]
pub struct StructuredContent {
    title: String,
    head: String,
    body: String,
    properties: BTreeMap<String, String>,
    original: Bytes,
    extracted: bool,
}

impl StructuredContent {
    pub(crate) fn new(
        title: String,
        head: String,
        body: String,
        properties: BTreeMap<String, String>,
        original: Bytes,
    ) -> Self {
        Self {
            title,
            head,
            body,
            properties,
            original,
            extracted: true,
        }
    }

    /// Content for input that could not be parsed: empty fields, original bytes kept.
    pub fn unparsed(original: Bytes) -> Self {
        Self {
            title: String::new(),
            head: String::new(),
            body: String::new(),
            properties: BTreeMap::new(),
            original,
            extracted: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn head(&self) -> &str {
        &self.head
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Extra property by key, e.g. `meta.author` or `page.sidebar`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn original_bytes(&self) -> &Bytes {
        &self.original
    }

    /// False when extraction failed and only the original bytes are usable.
    pub fn is_extracted(&self) -> bool {
        self.extracted
    }

    /// Variables handed to the template engine. Core keys win over extras.
    pub fn to_bindings(&self) -> Bindings {
        let mut bindings = self.properties.clone();
        bindings.insert("title".to_string(), self.title.clone());
        bindings.insert("head".to_string(), self.head.clone());
        bindings.insert("body".to_string(), self.body.clone());
        bindings
    }
}
