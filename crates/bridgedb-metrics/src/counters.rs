//! Keyed counters with hot/cold windows and binned rendering.
//!
//! Producers increment the *hot* window while the previous, frozen *cold*
//! window is what gets published. [`MetricsCounters::rotate`] swaps them
//! under the same lock every producer takes, so each increment lands in
//! exactly one window.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Published counts are rounded up to a multiple of this.
pub const BIN_SIZE: u64 = 10;

/// Metric key → count.
pub type Counts = HashMap<String, u64>;

/// Round `value` up to the next multiple of [`BIN_SIZE`]. Zero stays zero;
/// values too close to `u64::MAX` saturate.
pub fn bin(value: u64) -> u64 {
    value.div_ceil(BIN_SIZE).saturating_mul(BIN_SIZE)
}

/// Build a per-channel metric key:
/// `{channel}.{transport}.{country}.{success|fail}.{extra}`.
///
/// Every component is lowercased and reduced to `[a-z0-9-]`; `extra`
/// defaults to `none`.
pub fn create_key(
    channel: &str,
    transport: &str,
    country: &str,
    success: bool,
    extra: Option<&str>,
) -> String {
    let outcome = if success { "success" } else { "fail" };
    [
        sanitize(channel),
        sanitize(transport),
        sanitize(country),
        outcome.to_string(),
        sanitize(extra.unwrap_or("none")),
    ]
    .join(".")
}

/// Lowercase, replace anything outside `[a-z0-9-]` with `-`, and map an
/// empty component to `none`.
pub fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .trim()
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "none".to_string()
    } else {
        cleaned
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One channel's counters.
#[derive(Debug, Default)]
pub struct MetricsCounters {
    /// Current observation window.
    hot: Mutex<Counts>,
    /// Previous window, the one that is exported.
    cold: Mutex<Counts>,
}

impl MetricsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to `key` in the hot window.
    pub fn inc(&self, key: &str) {
        self.update(|hot| {
            let count = hot.entry(key.to_string()).or_insert(0);
            *count = count.saturating_add(1);
        });
    }

    /// Overwrite `key` in the hot window.
    pub fn set(&self, key: &str, value: u64) {
        self.update(|hot| {
            hot.insert(key.to_string(), value);
        });
    }

    /// Run `f` with the hot window locked.
    ///
    /// Anything `f` locks must only ever be locked while the hot lock is
    /// held, never the other way round.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut Counts) -> R) -> R {
        f(&mut *lock(&self.hot))
    }

    /// Move the hot window to cold and start an empty hot window.
    pub fn rotate(&self) {
        self.rotate_with(|_| {});
    }

    /// Like [`rotate`](Self::rotate), letting `finalize` add derived values
    /// to the hot window just before it is frozen.
    pub(crate) fn rotate_with(&self, finalize: impl FnOnce(&mut Counts)) {
        let mut hot = lock(&self.hot);
        finalize(&mut *hot);
        let frozen = std::mem::take(&mut *hot);
        debug!(keys = frozen.len(), "rotated metrics window");
        *lock(&self.cold) = frozen;
    }

    /// Render the cold window as sorted `"{key} {value}"` lines, binned and
    /// without zero values.
    pub fn get_metrics(&self) -> Vec<String> {
        self.render(|_| true)
    }

    /// Render the cold window, binning only the keys `should_bin` selects.
    pub(crate) fn render(&self, should_bin: impl Fn(&str) -> bool) -> Vec<String> {
        self.cold_snapshot()
            .into_iter()
            .filter(|(_, value)| *value > 0)
            .map(|(key, value)| {
                let value = if should_bin(&key) { bin(value) } else { value };
                format!("{key} {value}")
            })
            .collect()
    }

    /// Copy of the hot window.
    pub fn hot_snapshot(&self) -> BTreeMap<String, u64> {
        lock(&self.hot).iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Copy of the cold window.
    pub fn cold_snapshot(&self) -> BTreeMap<String, u64> {
        lock(&self.cold).iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Drop both windows.
    pub fn reset(&self) {
        let mut hot = lock(&self.hot);
        hot.clear();
        lock(&self.cold).clear();
    }
}
