//! The item being resolved.

use serde::{Deserialize, Serialize};

/// A resolvable item, typically one channel entry of a playlist.
///
/// Only [`url`](Self::url) takes part in resolution. Name, logo and group are
/// carried through untouched for callers that display them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// Opaque URL or identifier handed to the extraction provider.
    pub url: String,
    /// Display name.
    pub name: String,
    /// Optional logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Optional group title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl SourceRef {
    /// Creates a source with the given URL and display name.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            logo: None,
            group: None,
        }
    }

    /// Creates a source whose name is its URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(url.clone(), url)
    }

    /// Sets the logo.
    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.logo = Some(logo.into());
        self
    }

    /// Sets the group.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Cache key for this source.
    pub fn key(&self) -> &str {
        self.url.trim()
    }
}
