//! bridgedb-metrics — privacy-preserving distribution metrics.
//!
//! Counts how bridges are requested and handed out, per distribution
//! channel, and periodically publishes the counts with small values
//! rounded up so individual users cannot be picked out.
//!
//! # Architecture
//!
//! ```text
//! MetricsRegistry
//!   ├── https / email / moat: ChannelMetrics
//!   │     └── record_valid() / record_invalid() ← called per request
//!   ├── internal: InternalMetrics
//!   │     ├── record_handouts_per_bridge() ← called per handout
//!   │     └── record_empty_*_response()
//!   ├── rotate() → hot window becomes the exported cold window
//!   ├── export() → bridgedb-metrics document
//!   └── run() → periodic rotate + export loop
//! ```

pub mod channel;
pub mod counters;
pub mod export;
pub mod internal;

pub use channel::{ChannelMetrics, RequestEvent};
pub use counters::{BIN_SIZE, MetricsCounters, bin, create_key};
pub use export::{METRICS_VERSION, MetricsRegistry};
pub use internal::{HandoutStats, InternalMetrics};
