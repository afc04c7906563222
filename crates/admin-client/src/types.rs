//! Core admin API types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which quarantined-media feed to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Media uploaded to this homeserver
    Local,
    /// Media cached from federated homeservers
    Remote,
}

impl MediaKind {
    /// Value of the `kind` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Local => "local",
            MediaKind::Remote => "remote",
        }
    }

    /// Maximum page size requested for this feed
    pub fn page_limit(&self) -> u32 {
        match self {
            MediaKind::Local => 1000,
            MediaKind::Remote => 250,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of the quarantined media listing
///
/// Synapse may omit either field; both default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarantinedMediaPage {
    /// Media identifiers, usually `mxc://` URIs
    #[serde(default)]
    pub media: Vec<String>,
    /// Pagination token for the next page, empty when there is none
    #[serde(default)]
    pub next_batch: String,
}

impl QuarantinedMediaPage {
    /// Whether the server supplied a next-page token
    pub fn has_next_batch(&self) -> bool {
        !self.next_batch.is_empty()
    }
}

/// Matrix content URI (`mxc://<server>/<media_id>`)
///
/// # Examples
/// ```
/// use admin_client::MxcUri;
///
/// let uri = MxcUri::new("mxc://example.org/abc123");
/// assert_eq!(uri.download_path(), "example.org/abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MxcUri(String);

impl MxcUri {
    /// URI scheme prefix
    pub const SCHEME: &'static str = "mxc://";

    /// Wrap a media identifier as returned by the listing endpoint
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The full identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<server>/<media_id>` part used by the download endpoint
    ///
    /// Identifiers without the `mxc://` scheme are used verbatim.
    pub fn download_path(&self) -> &str {
        self.0.strip_prefix(Self::SCHEME).unwrap_or(&self.0)
    }
}

impl fmt::Display for MxcUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MxcUri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MxcUri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
