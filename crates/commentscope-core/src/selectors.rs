//! Typed registry of DOM selectors, loaded from a JSON file.
//!
//! The file maps logical element names to CSS (or `xpath=`-prefixed XPath)
//! selectors, plus an optional `attributes` object naming the DOM attributes
//! that carry platform identifiers:
//!
//! ```json
//! {
//!   "feed_page": "div.scaffold-finite-scroll",
//!   "post_list_item": "div.feed-shared-update-v2",
//!   "attributes": { "post_urn": "data-urn", "comment_urn": "data-id" }
//! }
//! ```
//!
//! Unknown names are rejected so a typo in the file fails at startup instead
//! of surfacing as an element that never appears.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Logical page elements the pipeline looks up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SelectorKey {
    /// Present on the home feed only when logged in
    FeedPage,
    PostListItem,
    /// Permalink anchor of a post, whose text is the age label
    PostTimestampAndLink,
    CommentSection,
    LoadMoreCommentsButton,
    LoadMoreRepliesButton,
    CommentItem,
    CommenterLink,
    CommenterName,
    CommentTimestamp,
    ProfileHeadline,
}

impl SelectorKey {
    pub const ALL: [SelectorKey; 11] = [
        SelectorKey::FeedPage,
        SelectorKey::PostListItem,
        SelectorKey::PostTimestampAndLink,
        SelectorKey::CommentSection,
        SelectorKey::LoadMoreCommentsButton,
        SelectorKey::LoadMoreRepliesButton,
        SelectorKey::CommentItem,
        SelectorKey::CommenterLink,
        SelectorKey::CommenterName,
        SelectorKey::CommentTimestamp,
        SelectorKey::ProfileHeadline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKey::FeedPage => "feed_page",
            SelectorKey::PostListItem => "post_list_item",
            SelectorKey::PostTimestampAndLink => "post_timestamp_and_link",
            SelectorKey::CommentSection => "comment_section",
            SelectorKey::LoadMoreCommentsButton => "load_more_comments_button",
            SelectorKey::LoadMoreRepliesButton => "load_more_replies_button",
            SelectorKey::CommentItem => "comment_item",
            SelectorKey::CommenterLink => "commenter_link",
            SelectorKey::CommenterName => "commenter_name",
            SelectorKey::CommentTimestamp => "comment_timestamp",
            SelectorKey::ProfileHeadline => "profile_headline",
        }
    }

    /// Fallback used when an optional key is absent from the file
    fn default_selector(&self) -> Option<&'static str> {
        match self {
            SelectorKey::LoadMoreRepliesButton => {
                Some("button.comments-comment-item__replies-list-load-more")
            }
            SelectorKey::CommenterName => Some(".comments-comment-meta__description-title"),
            SelectorKey::CommentTimestamp => Some("time"),
            _ => None,
        }
    }
}

impl fmt::Display for SelectorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SelectorKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::InvalidSelectors(format!("unknown selector name '{}'", s)))
    }
}

/// DOM attributes carrying platform identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    /// On post list items, e.g. `data-urn="urn:li:activity:..."`
    PostUrn,
    /// On comment items, e.g. `data-id="urn:li:comment:(activity:...,...)"`
    CommentUrn,
}

impl AttributeKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKey::PostUrn => "post_urn",
            AttributeKey::CommentUrn => "comment_urn",
        }
    }

    fn default_attribute(&self) -> &'static str {
        match self {
            AttributeKey::PostUrn => "data-urn",
            AttributeKey::CommentUrn => "data-id",
        }
    }
}

impl FromStr for AttributeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "post_urn" => Ok(AttributeKey::PostUrn),
            "comment_urn" => Ok(AttributeKey::CommentUrn),
            other => Err(Error::InvalidSelectors(format!(
                "unknown attribute name '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectorRegistry {
    selectors: HashMap<SelectorKey, String>,
    attributes: HashMap<AttributeKey, String>,
}

impl SelectorRegistry {
    /// Read and validate a selector file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Reading selector file from: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let registry = Self::from_str(&content)?;
        tracing::info!(
            "Loaded {} selectors from {}",
            registry.selectors.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse a selector document from a JSON string
    pub fn from_str(content: &str) -> Result<Self> {
        let document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(content)?;

        let mut selectors = HashMap::new();
        let mut attributes = HashMap::new();

        for (name, value) in document {
            if name == "attributes" {
                let map = value.as_object().ok_or_else(|| {
                    Error::InvalidSelectors("'attributes' must be an object".to_string())
                })?;
                for (attr_name, attr_value) in map {
                    let key: AttributeKey = attr_name.parse()?;
                    attributes.insert(key, non_empty_string(attr_name, attr_value)?);
                }
                continue;
            }

            let key: SelectorKey = name.parse()?;
            selectors.insert(key, non_empty_string(&name, &value)?);
        }

        for key in SelectorKey::ALL {
            if selectors.contains_key(&key) {
                continue;
            }
            match key.default_selector() {
                Some(default) => {
                    tracing::debug!("Selector '{}' not configured, using default", key);
                    selectors.insert(key, default.to_string());
                }
                None => {
                    return Err(Error::InvalidSelectors(format!(
                        "missing required selector '{}'",
                        key
                    )));
                }
            }
        }

        for key in [AttributeKey::PostUrn, AttributeKey::CommentUrn] {
            attributes
                .entry(key)
                .or_insert_with(|| key.default_attribute().to_string());
        }

        Ok(Self {
            selectors,
            attributes,
        })
    }

    pub fn get(&self, key: SelectorKey) -> &str {
        // Every key is populated by construction
        self.selectors.get(&key).map(String::as_str).unwrap_or_default()
    }

    pub fn attribute(&self, key: AttributeKey) -> &str {
        self.attributes
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_attribute())
    }
}

fn non_empty_string(name: &str, value: &serde_json::Value) -> Result<String> {
    match value.as_str().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        Some(_) => Err(Error::InvalidSelectors(format!("'{}' is empty", name))),
        None => Err(Error::InvalidSelectors(format!("'{}' must be a string", name))),
    }
}
