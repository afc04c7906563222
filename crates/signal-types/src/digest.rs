//! Digest signals

use crate::{BytesHasher, Result, SignalType};

/// Exact-match signal: lowercase hex MD5 of the raw payload
///
/// Works for any payload, including video and encrypted media.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Signal;

impl SignalType for Md5Signal {
    fn name(&self) -> &str {
        "md5"
    }

    fn as_bytes_hasher(&self) -> Option<&dyn BytesHasher> {
        Some(self)
    }
}

impl BytesHasher for Md5Signal {
    fn hash_from_bytes(&self, bytes: &[u8]) -> Result<String> {
        Ok(format!("{:x}", md5::compute(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(
            Md5Signal.hash_from_bytes(b"").unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            Md5Signal.hash_from_bytes(b"abc").unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }
}
