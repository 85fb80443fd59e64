//! Store and codec metrics.
//!
//! Recording compiles to nothing unless the `metrics` feature is enabled.
//! The label helpers are always available; [`CacheBackend`] also uses them
//! in its log events.
//!
//! | name | kind | labels |
//! |------|------|--------|
//! | `stashbox_store_operations_total` | counter | `backend`, `op`, `outcome` |
//! | `stashbox_store_operation_seconds` | histogram | `backend`, `op` |
//! | `stashbox_store_bytes_total` | counter | `backend`, `op` |
//! | `stashbox_codec_seconds` | histogram | `format`, `op` |
//! | `stashbox_codec_rejections_total` | counter | `backend`, `format`, `reason` |
//!
//! [`CacheBackend`]: crate::CacheBackend

use std::time::Duration;

#[cfg(feature = "metrics")]
use std::time::Instant;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::format::{FormatError, FormatTypeId};

#[cfg(feature = "metrics")]
const STORE_OPERATIONS: &str = "stashbox_store_operations_total";
#[cfg(feature = "metrics")]
const STORE_OPERATION_SECONDS: &str = "stashbox_store_operation_seconds";
#[cfg(feature = "metrics")]
const STORE_BYTES: &str = "stashbox_store_bytes_total";
#[cfg(feature = "metrics")]
const CODEC_SECONDS: &str = "stashbox_codec_seconds";
#[cfg(feature = "metrics")]
const CODEC_REJECTIONS: &str = "stashbox_codec_rejections_total";

#[cfg(feature = "metrics")]
lazy_static! {
    static ref DESCRIBED: () = {
        metrics::describe_counter!(
            STORE_OPERATIONS,
            "Raw store operations by backend, operation and outcome."
        );
        metrics::describe_histogram!(
            STORE_OPERATION_SECONDS,
            metrics::Unit::Seconds,
            "Time spent in raw store operations."
        );
        metrics::describe_counter!(
            STORE_BYTES,
            metrics::Unit::Bytes,
            "Encoded bytes moved to or from a store."
        );
        metrics::describe_histogram!(
            CODEC_SECONDS,
            metrics::Unit::Seconds,
            "Time spent encoding or decoding cached responses."
        );
        metrics::describe_counter!(
            CODEC_REJECTIONS,
            "Entries the codec refused, by reason."
        );
    };
}

#[cfg(feature = "metrics")]
fn describe() {
    lazy_static::initialize(&DESCRIBED);
}

/// Raw store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// [`Backend::read`](crate::Backend::read)
    Read,
    /// [`Backend::write`](crate::Backend::write)
    Write,
    /// [`Backend::remove`](crate::Backend::remove)
    Remove,
}

impl StoreOp {
    /// Label value for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            StoreOp::Read => "read",
            StoreOp::Write => "write",
            StoreOp::Remove => "remove",
        }
    }
}

/// How a raw store operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was read, written or removed.
    Done,
    /// Nothing was stored under the key.
    Absent,
    /// The store returned an error.
    Failed,
}

impl Outcome {
    /// Label value for this outcome.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Absent => "absent",
            Outcome::Failed => "failed",
        }
    }
}

/// Codec direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecOp {
    /// Response to bytes.
    Encode,
    /// Bytes to response.
    Decode,
}

impl CodecOp {
    /// Label value for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            CodecOp::Encode => "encode",
            CodecOp::Decode => "decode",
        }
    }
}

/// Label value for a codec.
pub fn format_label(format: FormatTypeId) -> &'static str {
    match format {
        FormatTypeId::Binary => "binary",
        FormatTypeId::Json => "json",
        FormatTypeId::Custom(name) => name,
    }
}

/// Label value for a codec failure.
///
/// Entries from a newer schema and cut-off entries are reported apart from
/// bytes that are simply not an entry.
pub fn rejection_reason(error: &FormatError) -> &'static str {
    match error {
        FormatError::Serialize(_) => "encode_failed",
        FormatError::Deserialize(_) => "malformed",
        FormatError::UnsupportedVersion { .. } => "unsupported_version",
        FormatError::Truncated => "truncated",
    }
}

/// Measures an operation.
///
/// Without the `metrics` feature it holds nothing and always reads zero.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    #[cfg(feature = "metrics")]
    started: Instant,
}

impl Stopwatch {
    /// Starts measuring.
    #[inline]
    pub fn start() -> Self {
        Self {
            #[cfg(feature = "metrics")]
            started: Instant::now(),
        }
    }

    /// Time since [`start`](Self::start).
    #[inline]
    pub fn stop(self) -> Duration {
        #[cfg(feature = "metrics")]
        {
            self.started.elapsed()
        }
        #[cfg(not(feature = "metrics"))]
        {
            Duration::ZERO
        }
    }
}

/// Records one raw store operation.
#[inline]
pub fn record_store_op(backend: &str, op: StoreOp, outcome: Outcome, elapsed: Duration) {
    #[cfg(feature = "metrics")]
    {
        describe();
        metrics::counter!(
            STORE_OPERATIONS,
            "backend" => backend.to_string(),
            "op" => op.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        metrics::histogram!(
            STORE_OPERATION_SECONDS,
            "backend" => backend.to_string(),
            "op" => op.as_str()
        )
        .record(elapsed.as_secs_f64());
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (backend, op, outcome, elapsed);
}

/// Records encoded bytes read from or written to a store.
#[inline]
pub fn record_bytes(backend: &str, op: StoreOp, bytes: usize) {
    #[cfg(feature = "metrics")]
    {
        describe();
        metrics::counter!(
            STORE_BYTES,
            "backend" => backend.to_string(),
            "op" => op.as_str()
        )
        .increment(bytes as u64);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (backend, op, bytes);
}

/// Records the time one encode or decode took.
#[inline]
pub fn record_codec(format: FormatTypeId, op: CodecOp, elapsed: Duration) {
    #[cfg(feature = "metrics")]
    {
        describe();
        metrics::histogram!(
            CODEC_SECONDS,
            "format" => format_label(format),
            "op" => op.as_str()
        )
        .record(elapsed.as_secs_f64());
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (format, op, elapsed);
}

/// Records an entry the codec refused.
#[inline]
pub fn record_rejection(backend: &str, format: FormatTypeId, error: &FormatError) {
    #[cfg(feature = "metrics")]
    {
        describe();
        metrics::counter!(
            CODEC_REJECTIONS,
            "backend" => backend.to_string(),
            "format" => format_label(format),
            "reason" => rejection_reason(error)
        )
        .increment(1);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = (backend, format, error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_told_apart() {
        let newer = FormatError::UnsupportedVersion {
            found: 9,
            supported: 1,
        };
        assert_eq!(rejection_reason(&newer), "unsupported_version");
        assert_eq!(rejection_reason(&FormatError::Truncated), "truncated");
        assert_eq!(
            rejection_reason(&FormatError::malformed("bad tag")),
            "malformed"
        );
    }

    #[test]
    fn custom_formats_keep_their_name() {
        assert_eq!(format_label(FormatTypeId::Binary), "binary");
        assert_eq!(format_label(FormatTypeId::Json), "json");
        assert_eq!(format_label(FormatTypeId::Custom("msgpack")), "msgpack");
    }

    #[test]
    fn recording_accepts_every_label() {
        for op in [StoreOp::Read, StoreOp::Write, StoreOp::Remove] {
            for outcome in [Outcome::Done, Outcome::Absent, Outcome::Failed] {
                record_store_op("test", op, outcome, Stopwatch::start().stop());
            }
        }
        record_codec(FormatTypeId::Json, CodecOp::Decode, Duration::ZERO);
        record_rejection("test", FormatTypeId::Binary, &FormatError::Truncated);
    }
}
