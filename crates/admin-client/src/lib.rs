//! Synapse admin API client
//!
//! This crate provides a small async client for the two Synapse endpoints the
//! quarantined-media exchange needs: listing quarantined media and downloading
//! media with the quarantine bypassed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod types;

pub use client::{AdminClient, AdminClientConfig};
pub use types::{MediaKind, MxcUri, QuarantinedMediaPage};

/// Result type for admin API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for admin API operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// API error with status code and message
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
    },
}

impl Error {
    /// HTTP status of an API error, if this is one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
