//! Per-channel request recorders.

use std::collections::BTreeMap;

use tracing::debug;

use bridgedb_core::{Channel, TransportRegistry, VANILLA};
use bridgedb_request::BridgeRequest;

use crate::counters::{MetricsCounters, create_key};

/// Country component used when the client's country is unknown.
pub const UNKNOWN_COUNTRY: &str = "zz";

/// Transport component used for transports we do not distribute.
pub const OTHER_TRANSPORT: &str = "other";

/// What a single request contributes to a metric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    /// First requested transport, if any.
    pub transport: Option<String>,
    /// Country code (HTTPS, moat) or email provider (email).
    pub region: String,
    /// Free-form qualifier, e.g. an anomaly marker.
    pub extra: Option<String>,
}

impl RequestEvent {
    /// An HTTPS request from a client in `country`.
    pub fn https(request: &BridgeRequest, country: Option<&str>) -> Self {
        Self {
            transport: request.transports().first().cloned(),
            region: country.unwrap_or(UNKNOWN_COUNTRY).to_string(),
            extra: None,
        }
    }

    /// A moat request from a client in `country`.
    pub fn moat(request: &BridgeRequest, country: Option<&str>) -> Self {
        Self::https(request, country)
    }

    /// An email request. The region is the sender's provider, i.e. the first
    /// label of the address's domain (`gmail` for `foo@gmail.com`).
    pub fn email(request: &BridgeRequest, sender: &str) -> Self {
        Self {
            transport: request.transports().first().cloned(),
            region: email_provider(sender).unwrap_or_default(),
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

/// Extract the provider from `user@provider.tld` or `Name <user@provider.tld>`.
fn email_provider(sender: &str) -> Option<String> {
    let address = match (sender.rfind('<'), sender.rfind('>')) {
        (Some(open), Some(close)) if open < close => &sender[open + 1..close],
        _ => sender,
    };
    let (_, domain) = address.trim().rsplit_once('@')?;
    let label = domain.split('.').next()?;
    (!label.is_empty()).then(|| label.to_lowercase())
}

/// Counters for one client-facing distribution channel.
#[derive(Debug)]
pub struct ChannelMetrics {
    channel: Channel,
    counters: MetricsCounters,
    transports: TransportRegistry,
}

impl ChannelMetrics {
    pub fn new(channel: Channel, transports: TransportRegistry) -> Self {
        Self {
            channel,
            counters: MetricsCounters::new(),
            transports,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// The underlying counters.
    pub fn counters(&self) -> &MetricsCounters {
        &self.counters
    }

    /// Key this channel would record `event` under.
    ///
    /// A missing transport is `vanilla`; one we do not distribute is
    /// recorded as `other` so the key space stays bounded.
    pub fn key_for(&self, event: &RequestEvent, success: bool) -> String {
        let transport = match event.transport.as_deref() {
            None => VANILLA,
            Some(t) if self.transports.is_supported(t) => t,
            Some(_) => OTHER_TRANSPORT,
        };
        create_key(
            self.channel.as_str(),
            transport,
            &event.region,
            success,
            event.extra.as_deref(),
        )
    }

    /// Record a request that was answered with bridges.
    pub fn record_valid(&self, event: &RequestEvent) {
        self.record(event, true);
    }

    /// Record a request that was rejected.
    pub fn record_invalid(&self, event: &RequestEvent) {
        self.record(event, false);
    }

    fn record(&self, event: &RequestEvent, success: bool) {
        let key = self.key_for(event, success);
        debug!(channel = %self.channel, %key, "recording request");
        self.counters.inc(&key);
    }

    pub fn rotate(&self) {
        self.counters.rotate();
    }

    pub fn reset(&self) {
        self.counters.reset();
    }

    pub fn get_metrics(&self) -> Vec<String> {
        self.counters.get_metrics()
    }

    pub fn hot_snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.hot_snapshot()
    }

    pub fn cold_snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.cold_snapshot()
    }
}
