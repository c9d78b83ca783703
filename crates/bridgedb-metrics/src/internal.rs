//! Operator-only handout statistics.
//!
//! Unlike the per-channel counters these values are exact: they are not
//! published per client and binning would hide the distribution we want to
//! see. The only exception is the empty-response counters, which track
//! client request volume and are therefore binned like channel metrics.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use tracing::debug;

use bridgedb_core::Channel;
use bridgedb_request::BridgeRequest;

use crate::counters::{Counts, MetricsCounters, lock, sanitize};

const PREFIX: &str = "internal";
const EMPTY_RESPONSE: &str = "empty-response";

/// Summary of how often each bridge was handed out during one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoutStats {
    pub unique_bridges: u64,
    pub min: u64,
    pub max: u64,
    /// For an even number of bridges, the lower of the two middle values.
    pub median: u64,
    /// Population standard deviation, rounded to the nearest integer.
    pub stdev: u64,
}

impl HandoutStats {
    /// `None` when nothing was handed out.
    pub fn from_counts<I: IntoIterator<Item = u64>>(counts: I) -> Option<Self> {
        let mut sorted: Vec<u64> = counts.into_iter().collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable();

        let n = sorted.len();
        let total = sorted.iter().fold(0u64, |acc, &c| acc.saturating_add(c));
        let mean = total as f64 / n as f64;
        let variance = sorted
            .iter()
            .map(|&c| (c as f64 - mean).powi(2))
            .sum::<f64>()
            / n as f64;

        Some(Self {
            unique_bridges: n as u64,
            min: sorted[0],
            max: sorted[n - 1],
            median: sorted[(n - 1) / 2],
            stdev: variance.sqrt().round() as u64,
        })
    }

    fn write_to(&self, hot: &mut Counts) {
        for (name, value) in [
            ("min", self.min),
            ("max", self.max),
            ("median", self.median),
            ("stdev", self.stdev),
            ("unique-bridges", self.unique_bridges),
        ] {
            hot.insert(internal_key(&["handouts", name]), value);
        }
    }
}

/// `internal.{part}.{part}...` with every part sanitized.
fn internal_key(parts: &[&str]) -> String {
    std::iter::once(PREFIX.to_string())
        .chain(parts.iter().map(|p| sanitize(p)))
        .collect::<Vec<_>>()
        .join(".")
}

fn empty_response_key(channel: Channel) -> String {
    internal_key(&[channel.as_str(), EMPTY_RESPONSE])
}

/// Only the per-distributor empty-response counters are binned.
fn is_binned(key: &str) -> bool {
    Channel::DISTRIBUTORS
        .iter()
        .any(|&channel| key == empty_response_key(channel))
}

/// Internal, unsanitized-by-channel statistics.
#[derive(Debug, Default)]
pub struct InternalMetrics {
    counters: MetricsCounters,
    /// Bridge id → handouts this window. Only locked while the counters'
    /// hot lock is held.
    handouts_per_bridge: Mutex<HashMap<String, u64>>,
}

impl InternalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one handout of every bridge in `bridges`, plus one handout
    /// for the request's address family.
    ///
    /// A missing request or empty bridge list records nothing.
    pub fn record_handouts_per_bridge<B: AsRef<str>>(
        &self,
        request: Option<&BridgeRequest>,
        bridges: &[B],
    ) {
        let Some(request) = request else { return };
        if bridges.is_empty() {
            return;
        }

        self.counters.update(|hot| {
            let mut per_bridge = lock(&self.handouts_per_bridge);
            for bridge in bridges {
                *per_bridge.entry(bridge.as_ref().to_string()).or_insert(0) += 1;
            }
            let family = internal_key(&["handouts", request.ip_version().label()]);
            *hot.entry(family).or_insert(0) += 1;
        });
        debug!(bridges = bridges.len(), "recorded bridge handouts");
    }

    /// Gauge for the number of bridges in one of a channel's hashrings.
    ///
    /// Empty channel or hashring names record nothing, and neither does a
    /// hashring named like the empty-response counter it would clobber.
    pub fn record_bridges_in_hashring(&self, channel: &str, hashring: &str, count: u64) {
        if channel.is_empty() || hashring.is_empty() {
            return;
        }
        if sanitize(hashring) == EMPTY_RESPONSE {
            debug!(channel, hashring, "ignoring hashring named like a counter");
            return;
        }
        self.counters.set(&internal_key(&[channel, hashring]), count);
    }

    pub fn record_empty_email_response(&self) {
        self.record_empty_response(Channel::Email);
    }

    pub fn record_empty_moat_response(&self) {
        self.record_empty_response(Channel::Moat);
    }

    pub fn record_empty_https_response(&self) {
        self.record_empty_response(Channel::Https);
    }

    fn record_empty_response(&self, channel: Channel) {
        self.counters.inc(&empty_response_key(channel));
    }

    /// Freeze the window: derive the handout statistics, clear the
    /// per-bridge counts, and rotate.
    pub fn rotate(&self) {
        self.counters.rotate_with(|hot| {
            let mut per_bridge = lock(&self.handouts_per_bridge);
            if let Some(stats) = HandoutStats::from_counts(per_bridge.values().copied()) {
                debug!(?stats, "computed handout statistics");
                stats.write_to(hot);
            }
            per_bridge.clear();
        });
    }

    /// Cold window as `"{key} {value}"` lines; only empty-response counts
    /// are binned.
    pub fn get_metrics(&self) -> Vec<String> {
        self.counters.render(is_binned)
    }

    /// Per-bridge handout counts of the current window.
    pub fn handouts_snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.update(|_| {
            lock(&self.handouts_per_bridge)
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect()
        })
    }

    pub fn hot_snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.hot_snapshot()
    }

    pub fn cold_snapshot(&self) -> BTreeMap<String, u64> {
        self.counters.cold_snapshot()
    }

    pub fn reset(&self) {
        self.counters.update(|_| lock(&self.handouts_per_bridge).clear());
        self.counters.reset();
    }
}
