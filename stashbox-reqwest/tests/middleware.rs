//! Integration tests for the reqwest middlewares using wiremock.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use stashbox::{CacheAside, FallbackRace, StatsValue};
use stashbox_backend::CacheBackend;
use stashbox_core::{CacheKey, CachedResponse};
use stashbox_moka::MokaBackend;
use stashbox_reqwest::{CacheMiddleware, FallbackMiddleware};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cache_aside() -> CacheAside<MokaBackend> {
    CacheAside::builder()
        .backend(MokaBackend::builder().max_entries(100).build())
        .build()
        .unwrap()
}

fn fallback(max_timeout: Duration) -> FallbackRace<MokaBackend> {
    FallbackRace::builder()
        .backend(MokaBackend::builder().max_entries(100).build())
        .max_timeout(max_timeout)
        .build()
        .unwrap()
}

fn fallback_client(handler: FallbackRace<MokaBackend>) -> ClientWithMiddleware {
    let inner = Client::new();
    ClientBuilder::new(inner.clone())
        .with(FallbackMiddleware::new(handler, inner).with_status_header())
        .build()
}

async fn body(response: reqwest::Response) -> String {
    String::from_utf8(response.bytes().await.unwrap().to_vec()).unwrap()
}

#[tokio::test]
async fn cache_miss_then_hit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .expect(1)
        .mount(&server)
        .await;

    let handler = cache_aside();
    let client = ClientBuilder::new(Client::new())
        .with(CacheMiddleware::new(handler.clone()).with_status_header())
        .build();
    let url = format!("{}/data", server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(first.headers()["x-cache-status"], "MISS");
    assert_eq!(body(first).await, "hello");

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), 200);
    assert_eq!(second.headers()["x-cache-status"], "HIT");
    assert_eq!(body(second).await, "hello");

    assert_eq!(
        handler.stats().snapshot().status(200),
        StatsValue { hits: 1, misses: 1 }
    );
}

#[tokio::test]
async fn status_header_is_off_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain"))
        .mount(&server)
        .await;

    let client = ClientBuilder::new(Client::new())
        .with(CacheMiddleware::new(cache_aside()))
        .build();

    let response = client.get(server.uri()).send().await.unwrap();
    assert!(response.headers().get("x-cache-status").is_none());
}

#[tokio::test]
async fn post_requests_bypass_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;

    let client = ClientBuilder::new(Client::new())
        .with(CacheMiddleware::new(cache_aside()).with_status_header())
        .build();
    let url = format!("{}/items", server.uri());

    for _ in 0..2 {
        let response = client.post(&url).body("{}").send().await.unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(response.headers()["x-cache-status"], "BYPASS");
    }
}

#[tokio::test]
async fn cached_response_keeps_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/headers"))
        .respond_with(
            ResponseTemplate::new(203)
                .set_body_string("response body content")
                .insert_header("content-type", "text/plain")
                .insert_header("x-custom-header", "custom-value")
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ClientBuilder::new(Client::new())
        .with(CacheMiddleware::new(cache_aside()))
        .build();
    let url = format!("{}/headers", server.uri());

    client.get(&url).send().await.unwrap();
    let cached = client.get(&url).send().await.unwrap();

    assert_eq!(cached.status(), 203);
    assert_eq!(cached.headers()["x-custom-header"], "custom-value");
    assert_eq!(cached.headers()["content-type"], "text/plain");
    let cookies: Vec<_> = cached.headers().get_all("set-cookie").iter().collect();
    assert_eq!(cookies, ["a=1", "b=2"]);
    assert_eq!(body(cached).await, "response body content");
}

#[tokio::test]
async fn query_strings_are_part_of_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let client = ClientBuilder::new(Client::new())
        .with(CacheMiddleware::new(cache_aside()))
        .build();

    for query in ["q=a", "q=b", "q=a"] {
        let url = format!("{}/search?{query}", server.uri());
        client.get(&url).send().await.unwrap();
    }
}

#[tokio::test]
async fn slow_origin_is_answered_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("v2")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let handler = fallback(Duration::from_millis(50));
    let client = fallback_client(handler.clone());
    let url = format!("{}/rates", server.uri());

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.headers()["x-cache-status"], "MISS");
    assert_eq!(body(first).await, "v1");

    let start = Instant::now();
    let second = client.get(&url).send().await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert_eq!(second.headers()["x-cache-status"], "HIT");
    assert_eq!(body(second).await, "v1");

    handler.offload().wait_all().await;

    let third = client.get(&url).send().await.unwrap();
    assert_eq!(third.headers()["x-cache-status"], "HIT");
    assert_eq!(body(third).await, "v2");
}

#[tokio::test]
async fn server_error_falls_back_to_last_good_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("good"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let client = fallback_client(fallback(Duration::from_secs(1)));
    let url = server.uri();

    client.get(&url).send().await.unwrap();
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-cache-status"], "HIT");
    assert_eq!(body(response).await, "good");
}

/// URL of a local port nothing listens on.
fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}{path}")
}

#[tokio::test]
async fn unreachable_origin_falls_back_to_cache() {
    let url = closed_port_url("/status");
    let backend = MokaBackend::builder().max_entries(100).build();
    backend
        .set(
            &CacheKey::new("GET", url.as_str()),
            &CachedResponse::new(200).with_body("cached"),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    let handler = FallbackRace::builder()
        .backend(backend)
        .max_timeout(Duration::from_secs(1))
        .build()
        .unwrap();

    let response = fallback_client(handler).get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-cache-status"], "HIT");
    assert_eq!(body(response).await, "cached");
}

#[tokio::test]
async fn unreachable_origin_without_cache_is_an_error() {
    let client = fallback_client(fallback(Duration::from_millis(100)));
    assert!(client.get(closed_port_url("/never")).send().await.is_err());
}
