//! Moka store metrics.
//!
//! Enabled by the `metrics` feature. Every series carries a `backend` label.
//!
//! - `stashbox_moka_entries` (gauge): live entries, refreshed after each
//!   write and removal
//! - `stashbox_moka_weight` (gauge): summed entry weight, in bytes for
//!   byte-bounded stores
//! - `stashbox_moka_removals_total` (counter): entries moka dropped, by
//!   `cause`

use moka::notification::RemovalCause;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    static ref ENTRIES: &'static str = {
        metrics::describe_gauge!("stashbox_moka_entries", "Live entries in a Moka store.");
        "stashbox_moka_entries"
    };
    static ref WEIGHT: &'static str = {
        metrics::describe_gauge!(
            "stashbox_moka_weight",
            "Summed entry weight of a Moka store."
        );
        "stashbox_moka_weight"
    };
    static ref REMOVALS: &'static str = {
        metrics::describe_counter!(
            "stashbox_moka_removals_total",
            "Entries removed from a Moka store, by cause."
        );
        "stashbox_moka_removals_total"
    };
}

/// Label value for a removal cause.
pub fn cause_label(cause: RemovalCause) -> &'static str {
    match cause {
        RemovalCause::Expired => "expired",
        RemovalCause::Explicit => "explicit",
        RemovalCause::Replaced => "replaced",
        RemovalCause::Size => "size",
    }
}

/// Sets the occupancy gauges of `backend`.
#[inline]
pub fn record_occupancy(backend: &str, entries: u64, weight: u64) {
    #[cfg(feature = "metrics")]
    {
        metrics::gauge!(*ENTRIES, "backend" => backend.to_string()).set(entries as f64);
        metrics::gauge!(*WEIGHT, "backend" => backend.to_string()).set(weight as f64);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (backend, entries, weight);
}

/// Counts one entry dropped by moka.
#[inline]
pub fn record_removal(backend: &str, cause: RemovalCause) {
    #[cfg(feature = "metrics")]
    {
        metrics::counter!(
            *REMOVALS,
            "backend" => backend.to_string(),
            "cause" => cause_label(cause)
        )
        .increment(1);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (backend, cause);
}
