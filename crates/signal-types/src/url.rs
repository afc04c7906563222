//! URL signal

use crate::SignalType;

/// Signal type matched on URLs
///
/// It has no bytes-hashing capability, so the exchange never produces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSignal;

impl SignalType for UrlSignal {
    fn name(&self) -> &str {
        "url"
    }
}
