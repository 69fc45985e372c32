use actix_web::{http::StatusCode, test::TestRequest};
use paygate_common::Money;
use paygate_engine::{
    db_types::{OrderStatus, PaymentStatus},
    CustomerManagement,
};
use serde_json::{json, Value};
use url::form_urlencoded;

use super::{
    helpers::{idle_provider, json_post, notifier_expecting, raw_post, TestContext, CALLBACK_PATH, CALLBACK_SECRET},
    mocks::MockConfirmationNotifier,
};
use crate::rate_limit::RateLimitConfig;

const REFERENCE: &str = "ORD-1722500000-481";

fn moolre_webhook(reference: &str, amount: &str, secret: &str) -> Value {
    json!({
        "status": 1,
        "code": "TP14",
        "message": "Transaction Successful",
        "secret": secret,
        "data": {
            "txtstatus": 1,
            "payer": "233240000000",
            "terminalid": "",
            "accountnumber": "10203040",
            "name": "Kofi Mensah",
            "amount": amount,
            "value": amount,
            "transactionid": "30447781",
            "externalref": reference,
            "thirdpartyref": "49117721"
        }
    })
}

#[actix_web::test]
async fn readiness_probe() {
    let ctx = TestContext::new(MockConfirmationNotifier::new(), idle_provider()).await;
    let res = ctx.send(TestRequest::get().uri(CALLBACK_PATH)).await;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json();
    assert_eq!(body["message"], "Moolre callback endpoint ready");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    ctx.tear_down().await;
}

// A genuine webhook pays the order and sends exactly one confirmation
#[actix_web::test]
async fn successful_webhook_pays_the_order() {
    let ctx = TestContext::new(notifier_expecting(1), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "150.00", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"success": true, "message": "Payment verified and Order Updated"}));
    assert_eq!(res.header("x-ratelimit-remaining"), Some("59"));

    let order = ctx.order(REFERENCE).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.provider_reference(), Some("30447781"));
    let stats = ctx.db.fetch_customer_stats("kofi@example.com").await.unwrap().unwrap();
    assert_eq!(stats.order_count, 1);
    ctx.tear_down().await;
}

// Redelivery of the same webhook is acknowledged without a second confirmation
#[actix_web::test]
async fn redelivered_webhook_is_already_processed() {
    let ctx = TestContext::new(notifier_expecting(1), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;
    let webhook = moolre_webhook(REFERENCE, "150.00", CALLBACK_SECRET);

    let first = ctx.send(json_post(CALLBACK_PATH, webhook.clone())).await;
    assert_eq!(first.status, StatusCode::OK);
    let second = ctx.send(json_post(CALLBACK_PATH, webhook)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json(), json!({"success": true, "message": "Order already processed"}));
    let stats = ctx.db.fetch_customer_stats("kofi@example.com").await.unwrap().unwrap();
    assert_eq!(stats.order_count, 1);
    ctx.tear_down().await;
}

// A tampered amount is rejected and the order stays unpaid
#[actix_web::test]
async fn amount_mismatch_is_rejected() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "120", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json(), json!({"success": false, "message": "Payment amount does not match order total"}));
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn amount_within_a_cent_is_accepted() {
    let ctx = TestContext::new(notifier_expecting(1), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "149.99", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Paid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn wrong_secret_is_forbidden() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "150.00", "guessed-secret"))).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.json(), json!({"success": false, "message": "Invalid callback signature"}));

    let mut webhook = moolre_webhook(REFERENCE, "150.00", "");
    webhook.as_object_mut().unwrap().remove("secret");
    let res = ctx.send(json_post(CALLBACK_PATH, webhook)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

// Without a configured secret the webhook cannot be verified, but is still processed
#[actix_web::test]
async fn unverifiable_webhook_is_processed() {
    let ctx =
        TestContext::with_config(notifier_expecting(1), idle_provider(), None, RateLimitConfig::default()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let mut webhook = moolre_webhook(REFERENCE, "150.00", "");
    webhook.as_object_mut().unwrap().remove("secret");
    let res = ctx.send(json_post(CALLBACK_PATH, webhook)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Paid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn failure_wording_marks_the_payment_failed() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let mut webhook = moolre_webhook(REFERENCE, "150.00", CALLBACK_SECRET);
    webhook["message"] = json!("Transaction failed: insufficient balance");
    let res = ctx.send(json_post(CALLBACK_PATH, webhook.clone())).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"success": false, "message": "Payment not successful"}));
    let order = ctx.order(REFERENCE).await;
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.failure_reason(), Some("Transaction failed: insufficient balance"));

    // A later success report cannot revive a failed order
    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "150.00", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json(), json!({"success": false, "message": "Order already processed"}));
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Failed);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn unknown_order_is_not_found() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook("ORD-1722500000-999", "150.00", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json(), json!({"success": false, "message": "Order not found"}));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn bad_requests() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(raw_post(CALLBACK_PATH, "application/json", "{\"status\": 1,")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "Invalid Request Body");

    let res = ctx.send(json_post(CALLBACK_PATH, json!({"status": 1, "secret": CALLBACK_SECRET, "data": {}}))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "Missing order reference");

    let res = ctx.send(json_post(CALLBACK_PATH, moolre_webhook(REFERENCE, "one fifty", CALLBACK_SECRET))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "Invalid amount: one fifty");
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

// Form deliveries carry the nested data object as a JSON string, and the retry suffix is stripped
#[actix_web::test]
async fn form_encoded_webhook_with_retry_suffix() {
    let ctx = TestContext::new(notifier_expecting(1), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let data = json!({"txtstatus": "1", "amount": "150", "externalref": format!("{REFERENCE}-R2"), "transactionid": "5521"});
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("status", "1")
        .append_pair("message", "Transaction Successful")
        .append_pair("secret", CALLBACK_SECRET)
        .append_pair("data", &data.to_string())
        .finish();
    let res = ctx.send(raw_post(CALLBACK_PATH, "application/x-www-form-urlencoded", &body)).await;
    assert_eq!(res.status, StatusCode::OK);
    let order = ctx.order(REFERENCE).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.provider_reference(), Some("5521"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn plain_text_webhook() {
    let ctx = TestContext::new(notifier_expecting(1), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let body = format!("externalref={REFERENCE}&status=1&amount=150.00&message=Successful&secret={CALLBACK_SECRET}");
    let res = ctx.send(raw_post(CALLBACK_PATH, "text/plain", &body)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Paid);
    ctx.tear_down().await;
}
