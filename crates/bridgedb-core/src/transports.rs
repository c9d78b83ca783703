//! Pluggable transport whitelist and the runtime `SUPPORTED_TRANSPORTS` map.
//!
//! Two different questions are answered here:
//!
//! - [`is_known_transport`]: is a token a transport name the request grammar
//!   accepts at all? This is a fixed list.
//! - [`TransportRegistry::is_supported`]: is the distributor currently
//!   handing out bridges for that transport? This is operator configuration
//!   and may change at runtime.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

/// Transport names accepted after a `transport` command.
pub const KNOWN_TRANSPORTS: [&str; 6] = ["obfs2", "obfs3", "obfs4", "fte", "scramblesuit", "vanilla"];

/// The plain, non-obfuscated bridge type. Always supported.
pub const VANILLA: &str = "vanilla";

/// Case-insensitive membership test against [`KNOWN_TRANSPORTS`].
pub fn is_known_transport(token: &str) -> bool {
    KNOWN_TRANSPORTS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(token))
}

/// Map of transport name → "currently supported".
pub type SupportedTransports = HashMap<String, bool>;

/// Process-wide, read-mostly view of which transports are being distributed.
///
/// The map is never mutated in place: [`set_supported`](Self::set_supported)
/// swaps in a whole new `Arc`, so a reader holding a snapshot never sees a
/// half-applied update. The registry is `Clone` and cheap to share.
#[derive(Debug, Clone, Default)]
pub struct TransportRegistry {
    inner: Arc<RwLock<Arc<SupportedTransports>>>,
}

impl TransportRegistry {
    pub fn new(supported: SupportedTransports) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(normalize(supported)))),
        }
    }

    /// Current snapshot of the map.
    pub fn supported(&self) -> Arc<SupportedTransports> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole map.
    pub fn set_supported(&self, supported: SupportedTransports) {
        let supported = Arc::new(normalize(supported));
        info!(transports = supported.len(), "supported transports updated");
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = supported;
    }

    /// Whether bridges of this type are currently handed out.
    ///
    /// `vanilla` is always supported; any other name must be present and
    /// set to `true`.
    pub fn is_supported(&self, transport: &str) -> bool {
        if transport.eq_ignore_ascii_case(VANILLA) {
            return true;
        }
        self.supported()
            .get(&transport.to_ascii_lowercase())
            .copied()
            .unwrap_or(false)
    }
}

fn normalize(supported: SupportedTransports) -> SupportedTransports {
    supported
        .into_iter()
        .map(|(name, on)| (name.to_ascii_lowercase(), on))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_map() -> SupportedTransports {
        [
            ("obfs2", false),
            ("obfs3", true),
            ("obfs4", true),
            ("scramblesuit", true),
            ("fte", true),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn known_transports_ignore_case() {
        assert!(is_known_transport("obfs4"));
        assert!(is_known_transport("SCRAMBLESUIT"));
        assert!(!is_known_transport("whack"));
        assert!(!is_known_transport(""));
    }

    #[test]
    fn supported_lookup() {
        let registry = TransportRegistry::new(default_map());
        assert!(registry.is_supported("obfs4"));
        assert!(registry.is_supported("OBFS3"));
        assert!(!registry.is_supported("obfs2"));
        assert!(!registry.is_supported("xxx"));
        assert!(registry.is_supported("vanilla"));
    }

    #[test]
    fn replacement_is_wholesale() {
        let registry = TransportRegistry::new(default_map());
        let before = registry.supported();

        registry.set_supported(HashMap::new());
        assert!(!registry.is_supported("obfs4"));
        assert!(registry.is_supported("vanilla"));

        // The old snapshot is untouched by the swap.
        assert_eq!(before.get("obfs4"), Some(&true));

        registry.set_supported(default_map());
        assert!(registry.is_supported("obfs4"));
    }

    #[test]
    fn clones_share_state() {
        let registry = TransportRegistry::new(default_map());
        let other = registry.clone();
        other.set_supported(HashMap::new());
        assert!(!registry.is_supported("obfs4"));
    }
}
