//! Header classification.
//!
//! Stored responses keep transport headers and content headers in separate
//! lists. Hop-by-hop headers describe one connection and are never stored.
//!
//! A value that is not visible ASCII (`obs-text`, such as a Latin-1
//! filename) is stored as a NUL followed by one `char` per byte. NUL never
//! occurs in a header value, so [`extend`] can restore the exact bytes.

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use stashbox_core::HeaderList;
use tracing::debug;

/// Where a header goes when a response is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderClass {
    /// Describes the payload (`Content-*`, `Expires`, `Last-Modified`, `Allow`).
    Content,
    /// Only meaningful for a single connection; dropped.
    HopByHop,
    /// Everything else.
    Transport,
}

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

const CONTENT: [HeaderName; 3] = [header::EXPIRES, header::LAST_MODIFIED, header::ALLOW];

/// Classifies a header by name.
pub fn classify(name: &HeaderName) -> HeaderClass {
    if HOP_BY_HOP.contains(name) {
        HeaderClass::HopByHop
    } else if name.as_str().starts_with("content-") || CONTENT.contains(name) {
        HeaderClass::Content
    } else {
        HeaderClass::Transport
    }
}

/// Splits `headers` into transport and content header lists.
///
/// Hop-by-hop headers are dropped, and so is every header listed in
/// `Connection`.
pub fn split(headers: &HeaderMap) -> (HeaderList, HeaderList) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    let mut transport = HeaderList::new();
    let mut content = HeaderList::new();
    for (name, value) in headers {
        let target = match classify(name) {
            HeaderClass::HopByHop => continue,
            _ if listed.iter().any(|token| token == name.as_str()) => continue,
            HeaderClass::Content => &mut content,
            HeaderClass::Transport => &mut transport,
        };
        target.append(name.as_str(), encode_value(value));
    }
    (transport, content)
}

/// Appends every entry of `list` to `headers`, skipping invalid ones.
pub fn extend(headers: &mut HeaderMap, list: &HeaderList) {
    for (name, values) in list {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            debug!(name, "Skipping stored header with invalid name");
            continue;
        };
        for value in values {
            match decode_value(value) {
                Some(value) => {
                    headers.append(name.clone(), value);
                }
                None => debug!(%name, "Skipping stored header with invalid value"),
            }
        }
    }
}

const RAW_TAG: char = '\0';

fn encode_value(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_owned(),
        Err(_) => std::iter::once(RAW_TAG)
            .chain(value.as_bytes().iter().map(|&byte| char::from(byte)))
            .collect(),
    }
}

fn decode_value(stored: &str) -> Option<HeaderValue> {
    match stored.strip_prefix(RAW_TAG) {
        Some(raw) => {
            let bytes = raw
                .chars()
                .map(|c| u8::try_from(c).ok())
                .collect::<Option<Vec<u8>>>()?;
            HeaderValue::from_bytes(&bytes).ok()
        }
        None => HeaderValue::from_bytes(stored.as_bytes()).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(classify(&header::CONTENT_TYPE), HeaderClass::Content);
        assert_eq!(classify(&header::CONTENT_LENGTH), HeaderClass::Content);
        assert_eq!(classify(&header::EXPIRES), HeaderClass::Content);
        assert_eq!(classify(&header::TRANSFER_ENCODING), HeaderClass::HopByHop);
        assert_eq!(
            classify(&HeaderName::from_static("keep-alive")),
            HeaderClass::HopByHop
        );
        assert_eq!(classify(&header::SET_COOKIE), HeaderClass::Transport);
        assert_eq!(classify(&header::CACHE_CONTROL), HeaderClass::Transport);
    }

    #[test]
    fn split_keeps_duplicates_and_drops_connection_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(header::CONNECTION, HeaderValue::from_static("close, x-trace"));
        headers.append("x-trace", HeaderValue::from_static("abc"));
        headers.append("x-request-id", HeaderValue::from_static("42"));

        let (transport, content) = split(&headers);

        assert_eq!(
            transport.get("set-cookie").unwrap(),
            &["a=1".to_owned(), "b=2".to_owned()]
        );
        assert_eq!(transport.get("x-request-id").unwrap(), &["42".to_owned()]);
        assert!(transport.get("x-trace").is_none());
        assert!(transport.get("connection").is_none());
        assert_eq!(content.get("content-type").unwrap(), &["text/plain".to_owned()]);
        assert_eq!(content.len(), 1);
    }

    #[test]
    fn extend_skips_invalid_entries() {
        let mut list = HeaderList::new();
        list.append("x-ok", "1");
        list.append("bad name", "2");
        list.append("x-bad-value", "line\nbreak");

        let mut headers = HeaderMap::new();
        extend(&mut headers, &list);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-ok"], "1");
    }

    #[test]
    fn opaque_values_keep_their_bytes() {
        let latin1 = HeaderValue::from_bytes(b"inline; filename=na\xefve.txt").unwrap();
        let mut headers = HeaderMap::new();
        headers.append(header::CONTENT_DISPOSITION, latin1.clone());
        headers.append(header::CONTENT_LANGUAGE, HeaderValue::from_static("fr"));

        let (_, content) = split(&headers);
        let stored = content.get("content-disposition").unwrap();
        assert!(stored[0].starts_with(RAW_TAG));
        assert_eq!(content.get("content-language").unwrap(), &["fr".to_owned()]);

        let mut rebuilt = HeaderMap::new();
        extend(&mut rebuilt, &content);
        assert_eq!(rebuilt[header::CONTENT_DISPOSITION], latin1);
        assert_eq!(rebuilt[header::CONTENT_LANGUAGE], "fr");
    }

    #[test]
    fn utf8_written_by_hand_is_restored() {
        let mut list = HeaderList::new();
        list.append("x-city", "Zürich");
        list.append("x-wide", "\0\u{20ac}");

        let mut headers = HeaderMap::new();
        extend(&mut headers, &list);
        assert_eq!(headers["x-city"].as_bytes(), "Zürich".as_bytes());
        assert!(headers.get("x-wide").is_none());
    }
}
