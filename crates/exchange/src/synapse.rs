//! Synapse quarantined-media exchange
//!
//! Pulls media from a Synapse homeserver's quarantined-media listing so it can
//! be downloaded and hashed locally before the host files the hashes into a
//! content bank.
//!
//! Each cycle reads one page from the local feed and one page from the remote
//! (federated) feed, advances both cursors, and hashes every listed item with
//! the requested signal types. Any response other than 200 aborts the cycle
//! without a delta, so the checkpoint never moves past unprocessed media.

use crate::api::{CollabConfig, FetchCheckpoint, FetchDelta, FetchedSignalMetadata, SignalExchangeApi};
use crate::credentials::{CredentialHelper, CredentialResolver, EnvVarResolver, FileResolver};
use crate::cursor::{next_cursor, INITIAL_CURSOR};
use crate::{ExchangeError, Result};
use admin_client::{AdminClient, AdminClientConfig, MediaKind, MxcUri};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use signal_types::SignalType;
use std::collections::HashMap;
use std::fmt;

/// Name this exchange registers under
pub const API_NAME: &str = "synapse_quarantined";

/// Environment variable holding the admin access token
pub const ACCESS_TOKEN_ENV_VAR: &str = "SYNAPSE_ADMIN_ACCESS_TOKEN";

/// File holding the admin access token, consulted after the environment
pub const ACCESS_TOKEN_FILE: &str = "~/.synapse_admin_access_token";

// =============================================================================
// Config, Checkpoint, Metadata, Credentials
// =============================================================================

/// Which Synapse admin API to poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynapseQuarantinedCollabConfig {
    /// Collaboration name used by the host
    pub name: String,
    /// Base URL of the homeserver's admin API
    pub admin_api_url: String,
}

impl SynapseQuarantinedCollabConfig {
    /// Create a new config
    pub fn new(name: impl Into<String>, admin_api_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin_api_url: admin_api_url.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.admin_api_url.trim().is_empty() {
            return Err(ExchangeError::InvalidConfig(format!(
                "collaboration '{}' has an empty admin_api_url",
                self.name
            )));
        }
        Ok(())
    }
}

impl CollabConfig for SynapseQuarantinedCollabConfig {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Where the last cycle left off in each feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynapseQuarantinedCheckpoint {
    /// Cursor into the local media feed
    pub local_from_token: String,
    /// Cursor into the remote media feed
    pub remote_from_token: String,
}

impl Default for SynapseQuarantinedCheckpoint {
    fn default() -> Self {
        Self::new(INITIAL_CURSOR, INITIAL_CURSOR)
    }
}

impl SynapseQuarantinedCheckpoint {
    /// Create a checkpoint from two cursors
    pub fn new(local_from_token: impl Into<String>, remote_from_token: impl Into<String>) -> Self {
        Self {
            local_from_token: local_from_token.into(),
            remote_from_token: remote_from_token.into(),
        }
    }
}

impl FetchCheckpoint for SynapseQuarantinedCheckpoint {
    // A stale checkpoint would be discarded by the host and the feeds refetched.
    fn is_stale(&self) -> bool {
        false
    }
}

/// Provenance of one fetched signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynapseQuarantinedSignalMetadata {
    /// Media identifier the signal was computed from
    pub mxc_uri: String,
}

impl FetchedSignalMetadata for SynapseQuarantinedSignalMetadata {}

/// Admin access token for the Synapse admin API
#[derive(Clone, PartialEq, Eq)]
pub struct SynapseQuarantinedCredentials {
    access_token: String,
}

impl SynapseQuarantinedCredentials {
    /// Wrap an access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// The bearer token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for SynapseQuarantinedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynapseQuarantinedCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

impl CredentialHelper for SynapseQuarantinedCredentials {
    fn from_secret(secret: &str) -> Self {
        Self::new(secret.trim())
    }

    fn are_valid(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn default_resolvers() -> Vec<Box<dyn CredentialResolver>> {
        vec![
            Box::new(EnvVarResolver::new(ACCESS_TOKEN_ENV_VAR)),
            Box::new(FileResolver::new(ACCESS_TOKEN_FILE)),
        ]
    }
}

// =============================================================================
// Exchange
// =============================================================================

/// Signal exchange over Synapse's quarantined media
#[derive(Debug, Clone)]
pub struct SynapseQuarantinedExchangeApi {
    collab: SynapseQuarantinedCollabConfig,
    client: AdminClient,
}

impl SynapseQuarantinedExchangeApi {
    /// Create an exchange from a config and an access token
    pub fn new(collab: SynapseQuarantinedCollabConfig, access_token: impl Into<String>) -> Result<Self> {
        collab.validate()?;
        let client = AdminClient::new(AdminClientConfig::new(&collab.admin_api_url), access_token)?;
        Ok(Self { collab, client })
    }

    /// The collaboration this exchange polls
    pub fn collab(&self) -> &SynapseQuarantinedCollabConfig {
        &self.collab
    }

    /// List one page from a feed and derive that feed's next cursor
    async fn fetch_feed(&self, kind: MediaKind, from: &str) -> Result<(Vec<String>, String)> {
        let page = self.client.list_quarantined(kind, from).await?;
        let cursor = next_cursor(from, &page.next_batch);
        Ok((page.media, cursor))
    }

    /// Hash one media item with every capable signal type
    ///
    /// The media is downloaded once, and only if some signal type can hash
    /// bytes. Returns `(signal type name, hash)` pairs.
    async fn hash_media(&self, mxc: &MxcUri, signal_types: &[&dyn SignalType]) -> Result<Vec<(String, String)>> {
        let hashers: Vec<_> = signal_types
            .iter()
            .filter_map(|signal_type| signal_type.as_bytes_hasher().map(|h| (signal_type.name(), h)))
            .collect();

        if hashers.is_empty() {
            return Ok(Vec::new());
        }

        let bytes = self.client.download_media(mxc).await?;

        let mut hashes = Vec::with_capacity(hashers.len());
        for (name, hasher) in hashers {
            match hasher.hash_from_bytes(&bytes) {
                Ok(hash) if hash.is_empty() => {}
                Ok(hash) => hashes.push((name.to_string(), hash)),
                // Encrypted or non-image media
                Err(e) if e.is_unrecognized() => {
                    tracing::debug!(mxc = %mxc, signal_type = name, "Skipping unrecognized media: {}", e);
                }
                Err(e) => {
                    return Err(ExchangeError::Hash {
                        signal_type: name.to_string(),
                        source: e,
                    })
                }
            }
        }

        Ok(hashes)
    }
}

#[async_trait]
impl SignalExchangeApi for SynapseQuarantinedExchangeApi {
    type Config = SynapseQuarantinedCollabConfig;
    type Checkpoint = SynapseQuarantinedCheckpoint;
    type Metadata = SynapseQuarantinedSignalMetadata;
    type Credentials = SynapseQuarantinedCredentials;

    fn api_name() -> &'static str {
        API_NAME
    }

    fn for_collab(config: Self::Config, credentials: Option<Self::Credentials>) -> Result<Self> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => SynapseQuarantinedCredentials::get()?,
        };
        Self::new(config, credentials.access_token)
    }

    async fn fetch_delta(
        &self,
        signal_types: &[&dyn SignalType],
        checkpoint: Option<&Self::Checkpoint>,
    ) -> Result<FetchDelta<(String, String), Self::Metadata, Self::Checkpoint>> {
        let start = checkpoint.cloned().unwrap_or_default();

        let (local_media, local_token) = self.fetch_feed(MediaKind::Local, &start.local_from_token).await?;
        let (remote_media, remote_token) =
            self.fetch_feed(MediaKind::Remote, &start.remote_from_token).await?;

        let media_count = local_media.len() + remote_media.len();
        let mut updates = HashMap::new();

        for media in local_media.into_iter().chain(remote_media) {
            let mxc = MxcUri::new(media);
            for key in self.hash_media(&mxc, signal_types).await? {
                updates.insert(
                    key,
                    SynapseQuarantinedSignalMetadata {
                        mxc_uri: mxc.as_str().to_string(),
                    },
                );
            }
        }

        let checkpoint = SynapseQuarantinedCheckpoint::new(local_token, remote_token);

        tracing::info!(
            collab = %self.collab.name,
            media = media_count,
            signals = updates.len(),
            local_from_token = %checkpoint.local_from_token,
            remote_from_token = %checkpoint.remote_from_token,
            "Fetched quarantined media"
        );

        Ok(FetchDelta::new(updates, checkpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_types::{BytesHasher, HashError, Md5Signal, UrlSignal};

    mockall::mock! {
        pub Hasher {}
        impl BytesHasher for Hasher {
            fn hash_from_bytes(&self, bytes: &[u8]) -> signal_types::Result<String>;
        }
    }

    struct MockSignal {
        name: &'static str,
        hasher: MockHasher,
    }

    impl SignalType for MockSignal {
        fn name(&self) -> &str {
            self.name
        }

        fn as_bytes_hasher(&self) -> Option<&dyn BytesHasher> {
            Some(&self.hasher)
        }
    }

    fn exchange_for(url: &str) -> SynapseQuarantinedExchangeApi {
        SynapseQuarantinedExchangeApi::new(SynapseQuarantinedCollabConfig::new("test", url), "token").unwrap()
    }

    #[test]
    fn test_checkpoint_default_and_staleness() {
        let checkpoint = SynapseQuarantinedCheckpoint::default();
        assert_eq!(checkpoint.local_from_token, "0");
        assert_eq!(checkpoint.remote_from_token, "0");
        assert!(!checkpoint.is_stale());
    }

    #[test]
    fn test_checkpoint_serde() {
        let checkpoint = SynapseQuarantinedCheckpoint::new("100-0", "200-0");
        let json = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(json["local_from_token"], "100-0");
        assert_eq!(json["remote_from_token"], "200-0");
        let back: SynapseQuarantinedCheckpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, checkpoint);
    }

    #[test]
    fn test_credentials_trim_and_validate() {
        let credentials = SynapseQuarantinedCredentials::from_secret("  syt_abc\n");
        assert_eq!(credentials.access_token(), "syt_abc");
        assert!(credentials.are_valid());
        assert!(!SynapseQuarantinedCredentials::from_secret(" \n").are_valid());
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let credentials = SynapseQuarantinedCredentials::new("syt_secret");
        assert!(!format!("{:?}", credentials).contains("syt_secret"));
    }

    #[test]
    fn test_default_resolver_order() {
        let sources: Vec<String> = SynapseQuarantinedCredentials::default_resolvers()
            .iter()
            .map(|r| r.source())
            .collect();
        assert_eq!(
            sources,
            vec!["$SYNAPSE_ADMIN_ACCESS_TOKEN", "~/.synapse_admin_access_token"]
        );
    }

    #[test]
    fn test_for_collab_with_explicit_credentials() {
        let exchange = SynapseQuarantinedExchangeApi::for_collab(
            SynapseQuarantinedCollabConfig::new("matrix", "https://matrix.example.org/"),
            Some(SynapseQuarantinedCredentials::new("syt_abc")),
        )
        .unwrap();
        assert_eq!(exchange.collab().name(), "matrix");
        assert_eq!(SynapseQuarantinedExchangeApi::api_name(), "synapse_quarantined");
    }

    #[test]
    fn test_empty_admin_url_rejected() {
        let result = SynapseQuarantinedExchangeApi::for_collab(
            SynapseQuarantinedCollabConfig::new("matrix", ""),
            Some(SynapseQuarantinedCredentials::new("syt_abc")),
        );
        assert!(matches!(result, Err(ExchangeError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_explicit_token_rejected() {
        let result = SynapseQuarantinedExchangeApi::for_collab(
            SynapseQuarantinedCollabConfig::new("matrix", "https://matrix.example.org"),
            Some(SynapseQuarantinedCredentials::new("")),
        );
        assert!(matches!(result, Err(ExchangeError::Client(_))));
    }

    #[test]
    fn test_for_collab_resolves_default_credentials() {
        use crate::credentials::CredentialError;

        let home = tempfile::tempdir().unwrap();
        std::env::remove_var(ACCESS_TOKEN_ENV_VAR);
        std::env::set_var("HOME", home.path());

        let config = SynapseQuarantinedCollabConfig::new("matrix", "https://matrix.example.org");
        let result = SynapseQuarantinedExchangeApi::for_collab(config.clone(), None);
        match result {
            Err(ExchangeError::Credentials(CredentialError::Missing { tried })) => {
                assert!(tried.contains("$SYNAPSE_ADMIN_ACCESS_TOKEN"));
                assert!(tried.contains("~/.synapse_admin_access_token"));
            }
            other => panic!("expected missing credentials, got {:?}", other),
        }

        std::fs::write(home.path().join(".synapse_admin_access_token"), "syt_file\n").unwrap();
        assert!(SynapseQuarantinedExchangeApi::for_collab(config, None).is_ok());
    }

    #[tokio::test]
    async fn test_hash_media_without_capable_types_skips_download() {
        // Nothing listens here; a download attempt would fail the test.
        let exchange = exchange_for("http://127.0.0.1:9");
        let url = UrlSignal;
        let signal_types: [&dyn SignalType; 1] = [&url];
        let hashes = exchange
            .hash_media(&MxcUri::new("mxc://example.org/a"), &signal_types)
            .await
            .unwrap();
        assert!(hashes.is_empty());
    }

    #[tokio::test]
    async fn test_hash_media_skips_empty_and_unrecognized() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_matrix/client/v1/media/download/example.org/a"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let mut empty = MockHasher::new();
        empty.expect_hash_from_bytes().returning(|_| Ok(String::new()));
        let mut unrecognized = MockHasher::new();
        unrecognized
            .expect_hash_from_bytes()
            .returning(|_| Err(HashError::UnrecognizedImage("cannot identify".into())));

        let empty = MockSignal { name: "empty", hasher: empty };
        let unrecognized = MockSignal { name: "photo", hasher: unrecognized };
        let md5 = Md5Signal;
        let signal_types: [&dyn SignalType; 3] = [&empty, &unrecognized, &md5];

        let hashes = exchange_for(&server.uri())
            .hash_media(&MxcUri::new("mxc://example.org/a"), &signal_types)
            .await
            .unwrap();

        assert_eq!(
            hashes,
            vec![("md5".to_string(), Md5Signal.hash_from_bytes(b"payload").unwrap())]
        );
    }

    #[tokio::test]
    async fn test_hash_media_other_errors_abort() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"payload".to_vec()))
            .mount(&server)
            .await;

        let mut broken = MockHasher::new();
        broken
            .expect_hash_from_bytes()
            .returning(|_| Err(HashError::Hashing("out of memory".into())));
        let broken = MockSignal { name: "broken", hasher: broken };
        let signal_types: [&dyn SignalType; 1] = [&broken];

        let err = exchange_for(&server.uri())
            .hash_media(&MxcUri::new("mxc://example.org/a"), &signal_types)
            .await
            .unwrap_err();

        match err {
            ExchangeError::Hash { signal_type, .. } => assert_eq!(signal_type, "broken"),
            other => panic!("Expected hash error, got {:?}", other),
        }
    }
}
