//! Signal exchange plugin for Synapse quarantined media
//!
//! This crate implements the host platform's signal-exchange contract on top of
//! the Synapse admin API. Each fetch cycle lists newly quarantined local and
//! remote media from a checkpoint, downloads each item, hashes it with the
//! requested signal types, and hands back one delta plus the next checkpoint.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod credentials;
pub mod cursor;
pub mod synapse;

pub use api::{CollabConfig, FetchCheckpoint, FetchDelta, FetchedSignalMetadata, SignalExchangeApi};
pub use credentials::{
    CredentialError, CredentialHelper, CredentialResolver, EnvVarResolver, FileResolver,
};
pub use synapse::{
    SynapseQuarantinedCheckpoint, SynapseQuarantinedCollabConfig, SynapseQuarantinedCredentials,
    SynapseQuarantinedExchangeApi, SynapseQuarantinedSignalMetadata,
};

use signal_types::HashError;

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Error types for exchange operations
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// No usable credentials
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// Admin API call failed
    #[error("Admin API error: {0}")]
    Client(#[from] admin_client::Error),

    /// A signal type failed on a payload it should have handled
    #[error("Signal type {signal_type} failed: {source}")]
    Hash {
        /// Signal type name
        signal_type: String,
        /// Underlying hashing error
        #[source]
        source: HashError,
    },

    /// Collaboration config is unusable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
