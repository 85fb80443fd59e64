use std::io;

use bytes::Bytes;
use futures::stream;
use http::{HeaderValue, Method, Response, StatusCode, Uri, Version};
use http_body::Frame;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::ext::ReasonPhrase;
use stashbox_backend::format::{BinaryFormat, Format, JsonFormat};
use stashbox_core::{CacheKey, CachePolicy, CacheableResponse, CachedResponse, HttpVersion};
use stashbox_http::{BufferedBody, CacheableHttpResponse, DEFAULT_CACHE_STATUS_HEADER, RequestOrigin};

type Body = Full<Bytes>;

fn response(builder: http::response::Builder, body: &'static str) -> CacheableHttpResponse<Body> {
    let response = builder
        .body(BufferedBody::passthrough(Full::new(Bytes::from_static(body.as_bytes()))))
        .unwrap();
    CacheableHttpResponse::from_response(response)
}

async fn snapshot<B>(response: CacheableHttpResponse<B>) -> CachedResponse
where
    B: hyper::body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Send,
{
    match response.into_cached().await {
        CachePolicy::Cacheable(cached) => cached,
        CachePolicy::NonCacheable(_) => panic!("expected a cacheable response"),
    }
}

#[tokio::test]
async fn snapshot_splits_and_filters_headers() {
    let builder = Response::builder()
        .status(200)
        .version(Version::HTTP_10)
        .header("content-type", "application/json")
        .header("last-modified", "Wed, 21 Oct 2015 07:28:00 GMT")
        .header("set-cookie", "a=1")
        .header("set-cookie", "b=2")
        .header("transfer-encoding", "chunked")
        .header("keep-alive", "timeout=5");
    let cached = snapshot(response(builder, r#"{"ok":true}"#)).await;

    assert_eq!(cached.status, 200);
    assert_eq!(cached.reason, "OK");
    assert_eq!(cached.version, HttpVersion::HTTP_10);
    assert_eq!(cached.body, r#"{"ok":true}"#);
    assert_eq!(
        cached.headers.get("set-cookie").unwrap(),
        &["a=1".to_owned(), "b=2".to_owned()]
    );
    assert!(cached.headers.get("transfer-encoding").is_none());
    assert!(cached.headers.get("keep-alive").is_none());
    assert_eq!(cached.content_headers.len(), 2);
    assert!(cached.content_headers.get("content-type").is_some());
    assert!(cached.content_headers.get("last-modified").is_some());
}

#[tokio::test]
async fn custom_reason_phrase_survives_storage() {
    let mut response = response(Response::builder().status(200), "fine");
    response
        .parts
        .extensions
        .insert(ReasonPhrase::from_static(b"Everything Fine"));
    let cached = snapshot(response).await;
    assert_eq!(cached.reason, "Everything Fine");

    let key = CacheKey::new("GET", "http://host/status");
    let encoded = BinaryFormat.encode(&cached).unwrap();
    let decoded = BinaryFormat.decode(&encoded).unwrap();
    let rebuilt = CacheableHttpResponse::<Body>::from_cached(decoded, &key);

    let reason = rebuilt.parts.extensions.get::<ReasonPhrase>().unwrap();
    assert_eq!(reason.as_bytes(), b"Everything Fine");
}

#[tokio::test]
async fn non_utf8_header_values_come_back_byte_for_byte() {
    let disposition = HeaderValue::from_bytes(b"attachment; filename=caf\xe9.txt").unwrap();
    let builder = Response::builder()
        .status(200)
        .header("content-disposition", disposition.clone())
        .header("x-owner", HeaderValue::from_bytes(b"J\xfcrgen").unwrap());
    let cached = snapshot(response(builder, "menu")).await;

    let key = CacheKey::new("GET", "http://host/menu.txt");
    let formats: [&dyn Format; 2] = [&BinaryFormat, &JsonFormat];
    for format in formats {
        let decoded = format.decode(&format.encode(&cached).unwrap()).unwrap();
        let rebuilt = CacheableHttpResponse::<Body>::from_cached(decoded, &key);

        assert_eq!(rebuilt.parts.headers["content-disposition"], disposition);
        assert_eq!(rebuilt.parts.headers["x-owner"].as_bytes(), b"J\xfcrgen");
    }
}

#[tokio::test]
async fn canonical_reason_is_not_reattached() {
    let cached = CachedResponse::new(404).with_reason("Not Found");
    let rebuilt =
        CacheableHttpResponse::<Body>::from_cached(cached, &CacheKey::new("GET", "http://h/"));
    assert_eq!(rebuilt.parts.status, StatusCode::NOT_FOUND);
    assert!(rebuilt.parts.extensions.get::<ReasonPhrase>().is_none());
}

#[tokio::test]
async fn rebuilt_response_matches_the_original() {
    let builder = Response::builder()
        .status(201)
        .header("content-type", "text/plain")
        .header("x-request-id", "42")
        .header("set-cookie", "a=1")
        .header("set-cookie", "b=2");
    let cached = snapshot(response(builder, "created")).await;

    let key = CacheKey::new("GET", "http://api.test/items?page=2");
    let rebuilt = CacheableHttpResponse::<Body>::from_cached(cached, &key);

    assert_eq!(rebuilt.parts.status, StatusCode::CREATED);
    assert_eq!(rebuilt.parts.version, Version::HTTP_11);
    assert_eq!(rebuilt.parts.headers["x-request-id"], "42");
    assert_eq!(rebuilt.parts.headers["content-type"], "text/plain");
    let cookies: Vec<_> = rebuilt.parts.headers.get_all("set-cookie").iter().collect();
    assert_eq!(cookies, ["a=1", "b=2"]);

    assert_eq!(
        rebuilt.origin(),
        Some(&RequestOrigin {
            method: Method::GET,
            uri: Uri::from_static("http://api.test/items?page=2"),
        })
    );

    let body = rebuilt.into_response().into_body().collect().await.unwrap();
    assert_eq!(body, "created");
}

#[tokio::test]
async fn body_error_makes_response_non_cacheable() {
    let frames: Vec<Result<Frame<Bytes>, io::Error>> = vec![
        Ok(Frame::data(Bytes::from_static(b"half"))),
        Err(io::Error::other("connection reset")),
    ];
    let response = Response::builder()
        .status(200)
        .header("x-keep", "me")
        .body(BufferedBody::passthrough(StreamBody::new(stream::iter(frames))))
        .unwrap();
    let response = CacheableHttpResponse::from_response(response);

    let CachePolicy::NonCacheable(returned) = response.into_cached().await else {
        panic!("a failed body must not be cached");
    };
    assert_eq!(returned.parts.headers["x-keep"], "me");
    let error = BodyExt::collect(returned.into_response().into_body())
        .await
        .unwrap_err();
    assert_eq!(error.to_string(), "connection reset");
}

#[test]
fn invalid_stored_status_becomes_server_error() {
    let rebuilt = CacheableHttpResponse::<Body>::from_cached(
        CachedResponse::new(42),
        &CacheKey::new("GET", "http://h/"),
    );
    assert_eq!(rebuilt.status(), 500);
}

#[test]
fn cache_status_header_is_upper_case() {
    let mut rebuilt = CacheableHttpResponse::<Body>::from_cached(
        CachedResponse::new(200),
        &CacheKey::new("GET", "http://h/"),
    );
    rebuilt.set_cache_status(stashbox_core::CacheStatus::Hit, &DEFAULT_CACHE_STATUS_HEADER);
    assert_eq!(rebuilt.parts.headers["x-cache-status"], "HIT");
}
