use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json;

use super::{
    helpers::{idle_provider, json_post, notifier_expecting, TestContext, CALLBACK_PATH, NOTIFICATIONS_PATH, VERIFY_PATH},
    mocks::MockStatusProvider,
};
use crate::rate_limit::{RateLimitConfig, RateLimitPolicy};

fn tight_limits() -> RateLimitConfig {
    RateLimitConfig {
        callback: RateLimitPolicy::new(2, Duration::from_secs(60)),
        verify: RateLimitPolicy::new(1, Duration::from_secs(60)),
        notification: RateLimitPolicy::new(1, Duration::from_secs(60)),
    }
}

fn from(ip: &str, req: TestRequest) -> TestRequest {
    req.peer_addr(format!("{ip}:40000").parse().unwrap())
}

#[actix_web::test]
async fn excess_requests_are_refused() {
    let ctx = TestContext::with_config(notifier_expecting(0), idle_provider(), None, tight_limits()).await;
    let body = json!({"status": 1, "data": {"externalref": "ORD-1-1"}});

    for _ in 0..2 {
        let res = ctx.send(from("203.0.113.9", json_post(CALLBACK_PATH, body.clone()))).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
    let res = ctx.send(from("203.0.113.9", json_post(CALLBACK_PATH, body.clone()))).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.json(), json!({"success": false, "message": "Too many requests"}));
    assert_eq!(res.header("x-ratelimit-remaining"), Some("0"));
    let reset = res.header("x-ratelimit-reset").unwrap().parse::<u64>().unwrap();
    assert!((1..=60).contains(&reset));
    assert_eq!(res.header("retry-after").unwrap().parse::<u64>().unwrap(), reset);

    // Other callers have their own quota
    let res = ctx.send(from("203.0.113.10", json_post(CALLBACK_PATH, body))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    ctx.tear_down().await;
}

// Exhausting the webhook quota leaves verification and notifications untouched
#[actix_web::test]
async fn buckets_are_independent() {
    let ctx =
        TestContext::with_config(notifier_expecting(0), MockStatusProvider::new(), None, tight_limits()).await;
    let ip = "198.51.100.4";
    for _ in 0..3 {
        ctx.send(from(ip, json_post(CALLBACK_PATH, json!({"status": 1})))).await;
    }
    let res = ctx.send(from(ip, json_post(CALLBACK_PATH, json!({"status": 1})))).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);

    let res = ctx.send(from(ip, json_post(VERIFY_PATH, json!({"orderNumber": "ORD-1-1"})))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = ctx.send(from(ip, json_post(VERIFY_PATH, json!({"orderNumber": "ORD-1-1"})))).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);

    let res = ctx.send(from(ip, json_post(NOTIFICATIONS_PATH, json!({"type": "order_created"})))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn health_and_readiness_are_not_limited() {
    let limits = RateLimitConfig {
        callback: RateLimitPolicy::new(0, Duration::from_secs(60)),
        ..tight_limits()
    };
    let ctx = TestContext::with_config(notifier_expecting(0), idle_provider(), None, limits).await;
    for _ in 0..3 {
        let res = ctx.send(TestRequest::get().uri(CALLBACK_PATH)).await;
        assert_eq!(res.status, StatusCode::OK);
        let res = ctx.send(TestRequest::get().uri("/health")).await;
        assert_eq!(res.status, StatusCode::OK);
    }
    let res = ctx.send(json_post(CALLBACK_PATH, json!({"status": 1}))).await;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    ctx.tear_down().await;
}
