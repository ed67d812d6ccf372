//! The seam between the scraping pipeline and a live browser page.
//!
//! Every pipeline stage receives a `&dyn PageDriver` explicitly; there is no
//! global page. Element reads go through [`ElementQuery`], which describes a
//! container selector plus the fields to read from each matching element, so
//! a driver can satisfy a whole extraction in one round-trip.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser connection lost: {0}")]
    Disconnected(String),
}

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Operations the pipeline needs from "the page I can act on".
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait until the document is ready
    async fn goto(&self, url: &str) -> PageResult<()>;

    /// URL the page ended up on, after redirects
    async fn current_url(&self) -> PageResult<String>;

    /// Number of elements currently matching `selector`
    async fn count(&self, selector: &str) -> PageResult<usize>;

    /// Click the first visible element matching `selector`.
    ///
    /// Returns `false` when nothing visible matched.
    async fn click_first_visible(&self, selector: &str) -> PageResult<bool>;

    /// Scroll the viewport to the bottom of the document
    async fn scroll_to_bottom(&self) -> PageResult<()>;

    async fn extract(&self, query: &ElementQuery) -> PageResult<Vec<ExtractedElement>>;
}

/// Where a field's value is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    Text,
    Attribute { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    /// Sub-selector relative to the container; `None` reads the container itself
    pub selector: Option<String>,
    pub source: FieldSource,
}

/// Fields to read from every element matching `container`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementQuery {
    pub container: String,
    pub fields: Vec<FieldSpec>,
}

impl ElementQuery {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            fields: Vec::new(),
        }
    }

    /// Read the text of the first `selector` match inside the container
    pub fn text(mut self, name: &str, selector: Option<&str>) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            selector: selector.map(str::to_string),
            source: FieldSource::Text,
        });
        self
    }

    /// Read an attribute of the first `selector` match inside the container
    pub fn attr(mut self, name: &str, selector: Option<&str>, attribute: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            selector: selector.map(str::to_string),
            source: FieldSource::Attribute {
                name: attribute.to_string(),
            },
        });
        self
    }
}

/// Field values read from one matching element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedElement {
    fields: HashMap<String, Option<String>>,
}

impl ExtractedElement {
    pub fn new(fields: HashMap<String, Option<String>>) -> Self {
        Self { fields }
    }

    /// Trimmed, non-empty value of a field
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExtractedElement {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }
}
