// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with feeds
// served by wiremock.
//
// Covered:
// - GET /health
// - GET /api/calendar/rss (query params, tier selection)
// - POST /api/calendar/rss (body precedence, garbage body, oversized body)
// - failing feeds reported in debug.errors with status 200

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calendar_rss::ingest::fetcher::{HttpFeedFetcher, DEFAULT_USER_AGENT};
use calendar_rss::{
    api, Aggregator, AppState, CalendarEntry, CalendarRegistry, FeedDescriptor, Tier,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn rss(title: &str, items: &[(&str, &str, chrono::DateTime<Utc>)]) -> String {
    let mut out = format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>{title}</title>"#
    );
    for (t, link, at) in items {
        out.push_str(&format!(
            "<item><title>{t}</title><link>{link}</link><pubDate>{}</pubDate></item>",
            at.to_rfc2822()
        ));
    }
    out.push_str("</channel></rss>");
    out
}

async fn mount(server: &MockServer, route: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Build the same Router the binary uses, over a registry pointing at `server`.
fn test_router(server: &MockServer, entries: Vec<(&str, Tier, &str)>) -> Router {
    let registry = CalendarRegistry::from_entries(
        entries
            .into_iter()
            .map(|(name, tier, route)| CalendarEntry {
                name: name.to_string(),
                tier,
                feeds: vec![FeedDescriptor::rss(format!("{}{}", server.uri(), route))],
            })
            .collect(),
    );
    let fetcher =
        HttpFeedFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT).expect("client");
    let aggregator = Aggregator::new(Arc::new(registry), Arc::new(fetcher));
    api::router(AppState { aggregator })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let server = MockServer::start().await;
    let app = test_router(&server, vec![]);

    let resp = app.oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    assert_eq!(String::from_utf8_lossy(&bytes).trim(), "ok");
}

#[tokio::test]
async fn major_tier_feed_with_three_items() {
    let server = MockServer::start().await;
    let now = Utc::now();
    mount(
        &server,
        "/major.xml",
        200,
        rss(
            "Major wire",
            &[
                ("older", "https://news.example/1", now - chrono::Duration::hours(3)),
                ("newest", "https://news.example/2", now - chrono::Duration::hours(1)),
                ("middle", "https://news.example/3", now - chrono::Duration::hours(2)),
            ],
        ),
    )
    .await;
    mount(&server, "/mid.xml", 200, rss("Mid", &[("mid item", "https://mid.example/1", now)])).await;

    let app = test_router(
        &server,
        vec![("Grand Final", Tier::Major, "/major.xml"), ("Round 3", Tier::Mid, "/mid.xml")],
    );
    let (status, v) = call(
        app,
        post(
            "/api/calendar/rss",
            json!({"tiers": ["major"], "maxPerFeed": 10}).to_string(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 3);
    let titles: Vec<&str> = v["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|i| i["title"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["newest", "middle", "older"]);
    assert!(v["items"].as_array().unwrap().iter().all(|i| i["source"] == "Grand Final"));
    assert_eq!(v["debug"]["feedsInEnv"], 1);
    assert_eq!(v["debug"]["errors"], json!([]));
}

#[tokio::test]
async fn failing_feed_is_reported_but_request_succeeds() {
    let server = MockServer::start().await;
    let now = Utc::now();
    mount(&server, "/ok.xml", 200, rss("OK", &[("fine", "https://ok.example/1", now)])).await;
    mount(&server, "/broken.xml", 500, String::new()).await;

    let app = test_router(
        &server,
        vec![("Healthy", Tier::Major, "/ok.xml"), ("Broken", Tier::Mid, "/broken.xml")],
    );
    let (status, v) = call(app, get("/api/calendar/rss")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 1);
    assert_eq!(v["items"][0]["source"], "Healthy");
    let errors = v["debug"]["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["source"], "Broken");
    assert_eq!(errors[0]["url"], format!("{}/broken.xml", server.uri()));
    assert!(errors[0]["error"].as_str().unwrap_or_default().contains("HTTP 500"));
}

#[tokio::test]
async fn shared_link_across_feeds_survives_once() {
    let server = MockServer::start().await;
    let now = Utc::now();
    let two_h = now - chrono::Duration::hours(2);
    let one_h = now - chrono::Duration::hours(1);
    mount(&server, "/a.xml", 200, rss("A", &[("from A", "https://shared.example/x", two_h)])).await;
    mount(&server, "/b.xml", 200, rss("B", &[("from B", "https://shared.example/x", one_h)])).await;

    let app = test_router(
        &server,
        vec![("First", Tier::Major, "/a.xml"), ("Second", Tier::Major, "/b.xml")],
    );
    let (_, v) = call(app, get("/api/calendar/rss?tiers=major")).await;

    assert_eq!(v["count"], 1);
    assert_eq!(v["items"][0]["title"], "from A");
    assert_eq!(v["items"][0]["source"], "First");
}

#[tokio::test]
async fn query_lookback_filters_old_items() {
    let server = MockServer::start().await;
    let now = Utc::now();
    mount(
        &server,
        "/feed.xml",
        200,
        rss(
            "Feed",
            &[
                ("recent", "https://f.example/1", now - chrono::Duration::hours(1)),
                ("stale", "https://f.example/2", now - chrono::Duration::days(3)),
            ],
        ),
    )
    .await;

    let app = test_router(&server, vec![("Event", Tier::Light, "/feed.xml")]);
    let (_, v) = call(app, get("/api/calendar/rss?lookbackHours=24&tiers=light")).await;

    assert_eq!(v["count"], 1);
    assert_eq!(v["items"][0]["title"], "recent");
}

#[tokio::test]
async fn post_garbage_body_uses_defaults() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", 200, rss("Feed", &[("x", "https://f.example/x", Utc::now())])).await;

    let app = test_router(&server, vec![("Event", Tier::Mid, "/feed.xml")]);
    let (status, v) = call(app, post("/api/calendar/rss", "{not json".to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 1);
    assert_eq!(v["debug"]["feedsInEnv"], 1);
}

#[tokio::test]
async fn post_oversized_body_is_still_200_with_defaults() {
    let server = MockServer::start().await;
    mount(&server, "/feed.xml", 200, rss("Feed", &[("x", "https://f.example/x", Utc::now())])).await;

    let app = test_router(&server, vec![("Event", Tier::Mid, "/feed.xml")]);
    // 3 MiB: past both our own cap and axum's 2 MB default. The tiers in it would select
    // nothing, so a non-empty result shows the defaults were used.
    let body = json!({"tiers": ["light"], "pad": "x".repeat(3 * 1024 * 1024)}).to_string();
    assert!(body.len() > api::MAX_BODY_BYTES);
    let (status, v) = call(app, post("/api/calendar/rss", body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 1);
    assert_eq!(v["debug"]["feedsInEnv"], 1);
}

#[tokio::test]
async fn no_matching_tier_is_an_empty_success() {
    let server = MockServer::start().await;
    let app = test_router(&server, vec![("Event", Tier::Major, "/never.xml")]);
    let (status, v) = call(app, get("/api/calendar/rss?tiers=light")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        v,
        json!({"count": 0, "items": [], "debug": {"feedsInEnv": 0, "errors": []}})
    );
}
