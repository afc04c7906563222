//! Admin API client implementation
//!
//! This module implements the HTTP side of the exchange: listing quarantined
//! media page by page and downloading individual media items with the
//! quarantine bypassed. Every request carries the admin bearer token.
//!
//! Requests are never retried. Any response other than `200 OK` is returned
//! as [`Error::Api`] so the caller can abort the whole fetch cycle.

use crate::types::{MediaKind, MxcUri, QuarantinedMediaPage};
use crate::{Error, Result};
use reqwest::{Client as ReqwestClient, Response as ReqwestResponse, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Path of the quarantined media listing endpoint
pub const QUARANTINED_MEDIA_PATH: &str = "/_synapse/admin/v1/media/quarantined";

/// Path prefix of the authenticated media download endpoint
pub const MEDIA_DOWNLOAD_PATH: &str = "/_matrix/client/v1/media/download";

// =============================================================================
// Client Configuration
// =============================================================================

/// Configuration for the admin API client
#[derive(Debug, Clone)]
pub struct AdminClientConfig {
    /// Base homeserver URL (e.g., "https://matrix.example.org")
    pub base_url: String,
    /// Request timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
}

impl Default for AdminClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8008".to_string(),
            timeout: None,
            user_agent: format!("synapse-quarantine-exchange/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
        }
    }
}

impl AdminClientConfig {
    /// Create a new config with a base URL
    ///
    /// A trailing `/` is dropped so paths can be appended directly.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Set a request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Error Response Format
// =============================================================================

/// Standard Matrix error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixErrorResponse {
    /// Error code (e.g., "M_FORBIDDEN")
    pub errcode: String,
    /// Error message
    #[serde(default)]
    pub error: String,
}

// =============================================================================
// Admin Client
// =============================================================================

/// Client for the Synapse admin and media endpoints
///
/// # Examples
/// ```
/// use admin_client::{AdminClient, AdminClientConfig, MediaKind};
///
/// async fn example() -> Result<(), Box<dyn std::error::Error>> {
///     let config = AdminClientConfig::new("https://matrix.example.org");
///     let client = AdminClient::new(config, "syt_admin_token")?;
///
///     let page = client.list_quarantined(MediaKind::Local, "0").await?;
///     for mxc in &page.media {
///         println!("{}", mxc);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct AdminClient {
    client: ReqwestClient,
    config: AdminClientConfig,
    access_token: String,
}

impl fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClient")
            .field("config", &self.config)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl AdminClient {
    /// Create a new admin API client
    pub fn new(config: AdminClientConfig, access_token: impl Into<String>) -> Result<Self> {
        let access_token: String = access_token.into();
        if access_token.is_empty() {
            return Err(Error::InvalidInput("access token is empty".to_string()));
        }

        let mut builder = ReqwestClient::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            config,
            access_token,
        })
    }

    /// List one page of quarantined media of the given kind
    ///
    /// `from` is the opaque pagination cursor; `"0"` starts from the beginning.
    /// The page size is [`MediaKind::page_limit`].
    pub async fn list_quarantined(&self, kind: MediaKind, from: &str) -> Result<QuarantinedMediaPage> {
        let url = format!("{}{}", self.config.base_url, QUARANTINED_MEDIA_PATH);
        let limit = kind.page_limit().to_string();

        tracing::debug!(kind = kind.as_str(), from, limit = %limit, "listing quarantined media");

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("kind", kind.as_str()), ("from", from), ("limit", limit.as_str())])
            .send()
            .await?;

        let response = Self::check_status(response, "Failed to fetch media").await?;
        let body = response.text().await?;
        let page: QuarantinedMediaPage = serde_json::from_str(&body)?;

        tracing::debug!(
            kind = kind.as_str(),
            count = page.media.len(),
            next_batch = %page.next_batch,
            "received quarantined media page"
        );

        Ok(page)
    }

    /// Download a media item, bypassing its quarantine
    pub async fn download_media(&self, mxc: &MxcUri) -> Result<Vec<u8>> {
        let url = self.download_url(mxc);

        tracing::debug!(mxc = %mxc, "downloading quarantined media");

        let response = self
            .authorized(self.client.get(&url))
            .query(&[("admin_unsafely_bypass_quarantine", "true")])
            .send()
            .await?;

        let response = Self::check_status(response, "Failed to download media").await?;
        let bytes = response.bytes().await?;

        Ok(bytes.to_vec())
    }

    /// Build the download URL for a media item (without query string)
    pub fn download_url(&self, mxc: &MxcUri) -> String {
        format!(
            "{}{}/{}",
            self.config.base_url,
            MEDIA_DOWNLOAD_PATH,
            mxc.download_path()
        )
    }

    fn authorized(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }
        req.bearer_auth(&self.access_token)
    }

    /// Turn any response other than `200 OK` into [`Error::Api`]
    ///
    /// Other 2xx codes (204, 206) are errors too.
    async fn check_status(response: ReqwestResponse, context: &str) -> Result<ReqwestResponse> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<MatrixErrorResponse>(&body) {
            Ok(err) if err.error.is_empty() => err.errcode,
            Ok(err) => format!("{}: {}", err.errcode, err.error),
            Err(_) => body,
        };

        Err(Error::Api {
            status: status.as_u16(),
            message: format!("{}: {}", context, detail),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = AdminClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8008");
        assert_eq!(config.timeout, None);
        assert!(config.user_agent.starts_with("synapse-quarantine-exchange/"));
    }

    #[test]
    fn test_client_config_builder() {
        let config = AdminClientConfig::new("https://matrix.example.org/")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("CustomAgent/1.0")
            .with_header("X-Custom", "value");

        assert_eq!(config.base_url, "https://matrix.example.org");
        assert_eq!(config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(config.user_agent, "CustomAgent/1.0");
        assert_eq!(
            config.default_headers.get("X-Custom"),
            Some(&"value".to_string())
        );
    }

    #[test]
    fn test_client_rejects_empty_token() {
        let result = AdminClient::new(AdminClientConfig::default(), "");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_download_url() {
        let client =
            AdminClient::new(AdminClientConfig::new("https://matrix.example.org"), "token").unwrap();
        let url = client.download_url(&MxcUri::new("mxc://example.org/abc"));
        assert_eq!(
            url,
            "https://matrix.example.org/_matrix/client/v1/media/download/example.org/abc"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = AdminClient::new(AdminClientConfig::default(), "super-secret").unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
