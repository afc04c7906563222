//! Host-facing signal exchange contract
//!
//! The host platform drives every exchange the same way: it builds a config,
//! resolves credentials, asks for a delta from its last checkpoint, stores the
//! returned updates and persists the new checkpoint. These traits are that
//! contract; an exchange names its own config, checkpoint, metadata and
//! credential types through associated types.

use crate::credentials::CredentialHelper;
use crate::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use signal_types::SignalType;
use std::collections::HashMap;
use std::hash::Hash;

/// Configuration of one collaboration (one upstream to poll)
pub trait CollabConfig: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// Name the host uses for this collaboration
    fn name(&self) -> &str;
}

/// Saved position of an incremental fetch
pub trait FetchCheckpoint: Clone + Send + Sync + Serialize + DeserializeOwned {
    /// Whether the host should drop this checkpoint and refetch from scratch
    fn is_stale(&self) -> bool;
}

/// Provenance kept alongside each produced signal value
pub trait FetchedSignalMetadata: Clone + Send + Sync + Serialize + DeserializeOwned {}

/// One fetch cycle's output: new signal values plus the next checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct FetchDelta<K, M, C>
where
    K: Eq + Hash,
{
    /// New signal values keyed by the exchange's key type
    pub updates: HashMap<K, M>,
    /// Where the next cycle should resume
    pub checkpoint: C,
}

impl<K, M, C> FetchDelta<K, M, C>
where
    K: Eq + Hash,
{
    /// Create a new delta
    pub fn new(updates: HashMap<K, M>, checkpoint: C) -> Self {
        Self { updates, checkpoint }
    }

    /// Number of updates in this delta
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether the cycle found nothing new
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// A pluggable content source the host can fetch signals from
#[async_trait]
pub trait SignalExchangeApi: Sized + Send + Sync {
    /// Collaboration config type
    type Config: CollabConfig;
    /// Checkpoint type
    type Checkpoint: FetchCheckpoint;
    /// Per-item metadata type
    type Metadata: FetchedSignalMetadata;
    /// Credential type
    type Credentials: CredentialHelper;

    /// Stable name of this exchange
    fn api_name() -> &'static str;

    /// Build an exchange for a collaboration
    ///
    /// When `credentials` is `None` they are resolved through
    /// [`CredentialHelper::get`]; failing to find any is an error here, at
    /// configuration time, never at fetch time.
    fn for_collab(config: Self::Config, credentials: Option<Self::Credentials>) -> Result<Self>;

    /// Run one fetch cycle from `checkpoint` (or from the start)
    async fn fetch_delta(
        &self,
        signal_types: &[&dyn SignalType],
        checkpoint: Option<&Self::Checkpoint>,
    ) -> Result<FetchDelta<(String, String), Self::Metadata, Self::Checkpoint>>;
}
