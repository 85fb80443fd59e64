//! Response codecs.
//!
//! A [`Format`] turns a [`CachedResponse`] into the opaque bytes a backend
//! stores and back. Two formats ship with the crate:
//!
//! - [`BinaryFormat`] - compact, versioned, tagged fields (the default)
//! - [`JsonFormat`] - self-describing, handy for inspecting a store by hand
//!
//! Both are additive: fields they do not know are skipped and fields they
//! miss are defaulted, so entries written by an older release stay readable.

use stashbox_core::{CachedResponse, Raw};
use thiserror::Error;

mod binary;
mod json;

pub use binary::BinaryFormat;
pub use json::JsonFormat;

/// Codec failure.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Encoding failed.
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send>),

    /// The bytes are not a valid entry.
    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send>),

    /// The entry was written by a newer, incompatible schema.
    #[error("unsupported schema version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version byte found in the entry.
        found: u8,
        /// Highest version this decoder reads.
        supported: u8,
    },

    /// The entry ends in the middle of a field.
    #[error("truncated cache entry")]
    Truncated,
}

impl FormatError {
    pub(crate) fn malformed(message: &'static str) -> Self {
        FormatError::Deserialize(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            message,
        )))
    }
}

/// Unique identifier for format types, used to compare format equality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTypeId {
    /// [`BinaryFormat`]
    Binary,
    /// [`JsonFormat`]
    Json,
    /// For user-defined custom formats. The string should be a unique identifier.
    Custom(&'static str),
}

/// Serializes cached responses to bytes and back.
///
/// Implementations must satisfy `decode(encode(x)) == x`.
pub trait Format: std::fmt::Debug + Send + Sync {
    /// Encode a response snapshot.
    fn encode(&self, value: &CachedResponse) -> Result<Raw, FormatError>;

    /// Decode a response snapshot.
    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError>;

    /// Clone this format into a box.
    fn clone_box(&self) -> Box<dyn Format>;

    /// Identifier of the format.
    fn format_type_id(&self) -> FormatTypeId;
}

impl Clone for Box<dyn Format> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Format for Box<dyn Format> {
    fn encode(&self, value: &CachedResponse) -> Result<Raw, FormatError> {
        (**self).encode(value)
    }

    fn decode(&self, data: &[u8]) -> Result<CachedResponse, FormatError> {
        (**self).decode(data)
    }

    fn clone_box(&self) -> Box<dyn Format> {
        (**self).clone_box()
    }

    fn format_type_id(&self) -> FormatTypeId {
        (**self).format_type_id()
    }
}
