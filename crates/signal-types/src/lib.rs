//! Signal types for the quarantined-media exchange
//!
//! A signal type is a named hashing scheme. Some signal types can compute a
//! hash straight from downloaded bytes; that capability is exposed through
//! [`SignalType::as_bytes_hasher`] and checked at runtime per type.
//!
//! The crate also ships reference signal types: a perceptual photo hash,
//! an MD5 digest, and a URL type that cannot hash bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod digest;
pub mod photo;
pub mod url;

pub use digest::Md5Signal;
pub use photo::{hamming_distance, PhotoPHashSignal};
pub use url::UrlSignal;

use thiserror::Error;

/// Errors that can occur while hashing media
#[derive(Debug, Error)]
pub enum HashError {
    /// The payload is not an image this hasher can decode
    ///
    /// Callers treat this as "no signal" for the item.
    #[error("Unrecognized image: {0}")]
    UnrecognizedImage(String),

    /// Any other hashing failure
    #[error("Hashing failed: {0}")]
    Hashing(String),
}

impl HashError {
    /// Whether the payload simply was not a decodable image
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, HashError::UnrecognizedImage(_))
    }
}

/// Result type for hashing operations
pub type Result<T> = std::result::Result<T, HashError>;

/// Capability: compute a signal value directly from raw bytes
pub trait BytesHasher: Send + Sync {
    /// Hash the payload
    ///
    /// An empty string means the payload produced no signal.
    fn hash_from_bytes(&self, bytes: &[u8]) -> Result<String>;
}

/// A named hashing scheme requested by the host
pub trait SignalType: Send + Sync {
    /// Stable signal type name, used as half of each delta key
    fn name(&self) -> &str;

    /// The bytes-hashing capability, if this type has it
    fn as_bytes_hasher(&self) -> Option<&dyn BytesHasher> {
        None
    }
}

/// All reference signal types shipped with this crate
pub fn builtin() -> Vec<Box<dyn SignalType>> {
    vec![
        Box::new(PhotoPHashSignal::new()),
        Box::new(Md5Signal),
        Box::new(UrlSignal),
    ]
}

/// Look up a reference signal type by name
pub fn by_name(name: &str) -> Option<Box<dyn SignalType>> {
    builtin().into_iter().find(|signal_type| signal_type.name() == name)
}
