//! Protocol-level snapshot of a cached HTTP response.
//!
//! [`CachedResponse`] is what backends store (after encoding) and what
//! adapters rebuild live responses from. It holds no request data: a cached
//! entry is only tied to a request again when an adapter reattaches it at
//! serve time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// HTTP protocol version as `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpVersion {
    /// Major version number.
    pub major: u8,
    /// Minor version number.
    pub minor: u8,
}

impl HttpVersion {
    /// HTTP/1.0
    pub const HTTP_10: HttpVersion = HttpVersion::new(1, 0);
    /// HTTP/1.1
    pub const HTTP_11: HttpVersion = HttpVersion::new(1, 1);
    /// HTTP/2
    pub const HTTP_2: HttpVersion = HttpVersion::new(2, 0);
    /// HTTP/3
    pub const HTTP_3: HttpVersion = HttpVersion::new(3, 0);

    /// Creates a version from its parts.
    pub const fn new(major: u8, minor: u8) -> Self {
        HttpVersion { major, minor }
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        HttpVersion::HTTP_11
    }
}

/// Ordered multimap of header names to their values.
///
/// Names keep their first-seen order and every value of a repeated header
/// (for example several `Set-Cookie` lines) is kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderList(Vec<(String, Vec<String>)>);

impl HeaderList {
    /// Creates an empty list.
    pub fn new() -> Self {
        HeaderList(Vec::new())
    }

    /// Appends one value to `name`, creating the entry on first use.
    ///
    /// Names are matched ASCII case-insensitively.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, values)) => values.push(value.into()),
            None => self.0.push((name.to_owned(), vec![value.into()])),
        }
    }

    /// Pushes a whole `(name, values)` entry without merging.
    pub fn push(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.0.push((name.into(), values));
    }

    /// Returns the values stored for `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Iterates entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no header is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total bytes of names and values.
    pub fn byte_len(&self) -> usize {
        self.0
            .iter()
            .map(|(n, v)| n.len() + v.iter().map(String::len).sum::<usize>())
            .sum()
    }
}

impl From<Vec<(String, Vec<String>)>> for HeaderList {
    fn from(entries: Vec<(String, Vec<String>)>) -> Self {
        HeaderList(entries)
    }
}

impl IntoIterator for HeaderList {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a (String, Vec<String>);
    type IntoIter = std::slice::Iter<'a, (String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Immutable snapshot of an HTTP response as stored in the cache.
///
/// Transport headers and content headers are kept apart so that a response
/// can be rebuilt with each header in the collection it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase as received, possibly non-canonical.
    #[serde(default)]
    pub reason: String,
    /// Protocol version.
    #[serde(default)]
    pub version: HttpVersion,
    /// Transport headers, without hop-by-hop and content headers.
    #[serde(default)]
    pub headers: HeaderList,
    /// Content headers (`Content-Type`, `Content-Length`, ...).
    #[serde(default)]
    pub content_headers: HeaderList,
    /// Body bytes, stored verbatim.
    #[serde(default)]
    pub body: Bytes,
}

impl CachedResponse {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        CachedResponse {
            status,
            reason: String::new(),
            version: HttpVersion::default(),
            headers: HeaderList::new(),
            content_headers: HeaderList::new(),
            body: Bytes::new(),
        }
    }

    /// Sets the reason phrase.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Sets the protocol version.
    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = version;
        self
    }

    /// Appends a transport header value.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends a content header value.
    pub fn with_content_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.content_headers.append(name, value);
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Approximate in-memory size, used as a weight by byte-bounded stores.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.reason.len()
            + self.headers.byte_len()
            + self.content_headers.byte_len()
            + self.body.len()
    }
}
