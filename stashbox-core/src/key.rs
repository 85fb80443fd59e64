//! Cache key type.
//!
//! A [`CacheKey`] identifies one cached response. It is built from the HTTP
//! method and the absolute request URI and renders as the two concatenated
//! with no separator:
//!
//! ```
//! use stashbox_core::CacheKey;
//!
//! let key = CacheKey::new("GET", "http://host/path?q=1");
//! assert_eq!(key.as_str(), "GEThttp://host/path?q=1");
//!
//! // An optional namespace is prepended verbatim.
//! let key = CacheKey::with_prefix("cfb", "GET", "http://host/path");
//! assert_eq!(key.to_string(), "cfbGEThttp://host/path");
//! ```
//!
//! Keys are compared byte for byte. Casing and trailing slashes are never
//! normalized, so `http://host/A` and `http://host/a` are distinct entries.
//!
//! Cloning a key is cheap: the rendered form is shared behind an `Arc`.

use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct CacheKeyInner {
    prefix: Option<SmolStr>,
    method: SmolStr,
    uri: String,
    rendered: String,
}

/// Key of a cached response: optional prefix, HTTP method and absolute URI.
#[derive(Clone)]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl CacheKey {
    /// Creates a key without a namespace prefix.
    pub fn new(method: impl Into<SmolStr>, uri: impl Into<String>) -> Self {
        Self::build(None, method.into(), uri.into())
    }

    /// Creates a key with a namespace prefix prepended to the rendered form.
    pub fn with_prefix(
        prefix: impl Into<SmolStr>,
        method: impl Into<SmolStr>,
        uri: impl Into<String>,
    ) -> Self {
        let prefix = prefix.into();
        let prefix = (!prefix.is_empty()).then_some(prefix);
        Self::build(prefix, method.into(), uri.into())
    }

    fn build(prefix: Option<SmolStr>, method: SmolStr, uri: String) -> Self {
        let mut rendered = String::with_capacity(
            prefix.as_ref().map_or(0, SmolStr::len) + method.len() + uri.len(),
        );
        if let Some(prefix) = &prefix {
            rendered.push_str(prefix);
        }
        rendered.push_str(&method);
        rendered.push_str(&uri);
        CacheKey {
            inner: Arc::new(CacheKeyInner {
                prefix,
                method,
                uri,
                rendered,
            }),
        }
    }

    /// Returns the namespace prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.inner.prefix.as_deref()
    }

    /// Returns the HTTP method the key was built from.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Returns the request URI the key was built from.
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// Returns the rendered key as stored in a backend.
    pub fn as_str(&self) -> &str {
        &self.inner.rendered
    }

    /// Returns the same URI and prefix keyed under another method.
    pub fn for_method(&self, method: impl Into<SmolStr>) -> Self {
        Self::build(self.inner.prefix.clone(), method.into(), self.inner.uri.clone())
    }

    /// Estimated heap usage of the key in bytes.
    ///
    /// Used by byte-bounded in-memory backends as part of the entry weight.
    pub fn memory_size(&self) -> usize {
        std::mem::size_of::<CacheKeyInner>()
            + self.inner.prefix.as_ref().map_or(0, SmolStr::len)
            + self.inner.method.len()
            + self.inner.uri.capacity()
            + self.inner.rendered.capacity()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.rendered == other.inner.rendered
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.rendered.hash(state);
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CacheKey").field(&self.inner.rendered).finish()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.rendered)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn renders_method_and_uri_without_separator() {
        let key = CacheKey::new("GET", "http://host/path?q=1");
        assert_eq!(key.as_str(), "GEThttp://host/path?q=1");
        assert_eq!(key.method(), "GET");
        assert_eq!(key.uri(), "http://host/path?q=1");
        assert_eq!(key.prefix(), None);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let upper = CacheKey::new("GET", "http://host/A");
        let lower = CacheKey::new("GET", "http://host/a");
        assert_ne!(upper, lower);

        let set: HashSet<_> = [upper, lower].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn trailing_slash_is_not_normalized() {
        assert_ne!(
            CacheKey::new("GET", "http://host/a"),
            CacheKey::new("GET", "http://host/a/")
        );
    }

    #[test]
    fn prefix_partitions_keys() {
        let plain = CacheKey::new("GET", "http://host/");
        let prefixed = CacheKey::with_prefix("cfb", "GET", "http://host/");
        assert_ne!(plain, prefixed);
        assert_eq!(prefixed.as_str(), "cfbGEThttp://host/");
        assert_eq!(prefixed.prefix(), Some("cfb"));
    }

    #[test]
    fn empty_prefix_is_no_prefix() {
        let key = CacheKey::with_prefix("", "HEAD", "http://host/");
        assert_eq!(key.prefix(), None);
        assert_eq!(key, CacheKey::new("HEAD", "http://host/"));
    }

    #[test]
    fn for_method_keeps_prefix_and_uri() {
        let get = CacheKey::with_prefix("p:", "GET", "http://host/x");
        let head = get.for_method("HEAD");
        assert_eq!(head.as_str(), "p:HEADhttp://host/x");
    }
}
