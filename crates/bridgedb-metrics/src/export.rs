//! The bridgedb-metrics export document and the rotation loop.
//!
//! ```text
//! bridgedb-metrics-end <unix-timestamp>
//! bridgedb-metrics-version <n>
//! bridgedb-metric-count <key> <value>
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use bridgedb_core::{Channel, TransportRegistry};

use crate::channel::ChannelMetrics;
use crate::internal::InternalMetrics;

/// Format version written to every export document.
pub const METRICS_VERSION: u32 = 1;

/// All metrics of one BridgeDB process: one counters instance per channel
/// plus the internal statistics. Owned by the composition root and handed
/// to request handlers.
#[derive(Debug)]
pub struct MetricsRegistry {
    pub https: ChannelMetrics,
    pub email: ChannelMetrics,
    pub moat: ChannelMetrics,
    pub internal: InternalMetrics,
}

impl MetricsRegistry {
    pub fn new(transports: TransportRegistry) -> Self {
        Self {
            https: ChannelMetrics::new(Channel::Https, transports.clone()),
            email: ChannelMetrics::new(Channel::Email, transports.clone()),
            moat: ChannelMetrics::new(Channel::Moat, transports),
            internal: InternalMetrics::new(),
        }
    }

    /// Counters for a client-facing channel. `None` for [`Channel::Internal`].
    pub fn channel(&self, channel: Channel) -> Option<&ChannelMetrics> {
        match channel {
            Channel::Https => Some(&self.https),
            Channel::Email => Some(&self.email),
            Channel::Moat => Some(&self.moat),
            Channel::Internal => None,
        }
    }

    /// Rotate every channel and the internal statistics.
    pub fn rotate(&self) {
        for channel in Channel::DISTRIBUTORS {
            if let Some(metrics) = self.channel(channel) {
                metrics.rotate();
            }
        }
        self.internal.rotate();
    }

    /// Back to the initial, empty state.
    pub fn reset(&self) {
        for channel in Channel::DISTRIBUTORS {
            if let Some(metrics) = self.channel(channel) {
                metrics.reset();
            }
        }
        self.internal.reset();
    }

    /// `"{key} {value}"` lines of every cold window, channel by channel.
    pub fn metric_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for channel in Channel::DISTRIBUTORS {
            if let Some(metrics) = self.channel(channel) {
                lines.extend(metrics.get_metrics());
            }
        }
        lines.extend(self.internal.get_metrics());
        lines
    }

    /// Write one export document for the cold windows, stamped with
    /// `end_timestamp` (seconds since the Unix epoch).
    pub fn export<W: Write>(&self, sink: &mut W, end_timestamp: u64) -> std::io::Result<()> {
        let lines = self.metric_lines();
        writeln!(sink, "bridgedb-metrics-end {end_timestamp}")?;
        writeln!(sink, "bridgedb-metrics-version {METRICS_VERSION}")?;
        for line in &lines {
            writeln!(sink, "bridgedb-metric-count {line}")?;
        }
        debug!(metrics = lines.len(), "metrics exported");
        Ok(())
    }

    /// Rotate and append an export document to `path`.
    pub fn rotate_and_export(&self, path: &Path) -> anyhow::Result<()> {
        self.rotate();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        self.export(&mut file, epoch_secs())?;
        file.flush()?;
        Ok(())
    }

    /// Run the rotate/export loop until shutdown signal.
    pub async fn run(
        &self,
        interval: Duration,
        output: PathBuf,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(
            interval_secs = interval.as_secs(),
            output = %output.display(),
            "metrics rotation started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.rotate_and_export(&output) {
                        tracing::warn!(error = %e, "metrics export failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("metrics rotation shutting down");
                    // Final export before exit.
                    if let Err(e) = self.rotate_and_export(&output) {
                        tracing::warn!(error = %e, "final metrics export failed");
                    }
                    break;
                }
            }
        }
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
