//! Request verification through the full HTTP stack.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use proptest::prelude::*;
use tower::ServiceExt;

use discord_sync_bot::clock::{Clock, ManualClock};
use discord_sync_bot::config::RateLimitConfig;
use discord_sync_bot::security::{InMemoryRateLimitStore, RateLimiter};

mod common;

use common::*;

#[tokio::test]
async fn test_hundred_and_first_request_is_limited() {
    let h = Harness::new();
    let ts = h.now_secs();

    for i in 0..100 {
        let response = h
            .router
            .clone()
            .oneshot(signed_post(&ts, &ping_body(), "198.51.100.20"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
    }

    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &ping_body(), "198.51.100.20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert!(json.get("error").is_some());

    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &ping_body(), "198.51.100.21"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    h.clock.advance(60_001);
    let ts = h.now_secs();
    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &ping_body(), "198.51.100.20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_payload_size_boundary() {
    let h = Harness::new();
    let ts = h.now_secs();
    let limit = 1024 * 1024;

    let mut exact = ping_body();
    exact.push_str(&" ".repeat(limit - exact.len()));
    assert_eq!(exact.len(), limit);

    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &exact, "198.51.100.30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let over = format!("{} ", exact);
    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &over, "198.51.100.30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_transport_body_cap_returns_413_with_security_headers() {
    let mut config = config();
    config.security.max_body_size = 4096;
    let h = Harness::with_config(config);
    let ts = h.now_secs();

    let mut body = ping_body();
    body.push_str(&" ".repeat(8192));

    let response = h
        .router
        .clone()
        .oneshot(signed_post(&ts, &body, "198.51.100.31"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_stale_timestamp_rejected_even_when_signed() {
    let h = Harness::new();
    let stale = (h.clock.now_secs() - 301).to_string();

    let response = h
        .router
        .clone()
        .oneshot(signed_post(&stale, &ping_body(), "198.51.100.40"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let future = (h.clock.now_secs() + 301).to_string();
    let response = h
        .router
        .clone()
        .oneshot(signed_post(&future, &ping_body(), "198.51.100.40"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_body_rejected() {
    let h = Harness::new();
    let ts = h.now_secs();
    let body = ping_body();

    let request = Request::post("/")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-signature-ed25519", sign(&ts, body.as_bytes()))
        .header("x-signature-timestamp", ts.as_str())
        .body(Body::from(body.replace("\"1\"", "\"9\"")))
        .unwrap();

    let response = h.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn test_header_problems_are_unauthorized() {
    let h = Harness::new();
    let ts = h.now_secs();
    let body = ping_body();
    let signature = sign(&ts, body.as_bytes());

    let cases = vec![
        Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-signature-timestamp", ts.as_str())
            .body(Body::from(body.clone()))
            .unwrap(),
        Request::post("/")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-signature-ed25519", signature.as_str())
            .body(Body::from(body.clone()))
            .unwrap(),
        Request::post("/")
            .header(header::CONTENT_TYPE, "text/plain")
            .header("x-signature-ed25519", signature.as_str())
            .header("x-signature-timestamp", ts.as_str())
            .body(Body::from(body.clone()))
            .unwrap(),
    ];

    for request in cases {
        let response = h.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let h = Harness::new();
    let ts = h.now_secs();
    h.router
        .clone()
        .oneshot(signed_post(&ts, &ping_body(), "198.51.100.50"))
        .await
        .unwrap();
    assert_eq!(h.state.rate_limiter.tracked_clients(), 1);

    h.clock.advance(60_001);
    assert_eq!(h.state.rate_limiter.sweep(), 1);
    assert_eq!(h.state.rate_limiter.sweep(), 0);
    assert_eq!(h.state.rate_limiter.tracked_clients(), 0);
}

proptest! {
    #[test]
    fn prop_clients_do_not_share_windows(
        a_requests in 0u32..150,
        b_requests in 1u32..100,
    ) {
        let clock = Arc::new(ManualClock::new(NOW_MS));
        let limiter = RateLimiter::new(
            Arc::new(InMemoryRateLimitStore::new()),
            clock.clone() as Arc<dyn Clock>,
            &RateLimitConfig::default(),
        );

        for _ in 0..a_requests {
            limiter.check_and_consume("a");
        }

        for i in 0..b_requests {
            prop_assert!(limiter.check_and_consume("b"), "b request {} denied", i + 1);
        }
    }
}
