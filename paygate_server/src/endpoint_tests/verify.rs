use actix_web::http::StatusCode;
use paygate_common::Money;
use paygate_engine::{
    db_types::{NewOrder, OrderReference, OrderStatus, PaymentStatus},
    traits::{ProviderStatus, ProviderStatusError},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::{
    helpers::{idle_provider, json_post, notifier_expecting, TestContext, VERIFY_PATH},
    mocks::MockStatusProvider,
};

const REFERENCE: &str = "ORD-1722500000-77";

fn provider_reporting(status: &'static str, amount: Decimal) -> MockStatusProvider {
    let mut provider = MockStatusProvider::new();
    provider.expect_query_status().times(1).returning(move |reference: &OrderReference| {
        assert_eq!(reference.as_str(), REFERENCE);
        Ok(ProviderStatus {
            succeeded: status == "successful",
            raw_status: status.to_string(),
            amount: Some(amount),
            transaction_id: Some("30447790".into()),
        })
    });
    provider
}

fn provider_failing(err: ProviderStatusError) -> MockStatusProvider {
    let mut provider = MockStatusProvider::new();
    provider.expect_query_status().times(1).returning(move |_| Err(err.clone()));
    provider
}

fn verify(order_number: &str) -> actix_web::test::TestRequest {
    json_post(VERIFY_PATH, json!({ "orderNumber": order_number }))
}

#[actix_web::test]
async fn provider_confirmation_pays_the_order() {
    let ctx = TestContext::new(notifier_expecting(1), provider_reporting("successful", dec!(150))).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.json(),
        json!({
            "success": true,
            "order_number": REFERENCE,
            "status": "processing",
            "payment_status": "paid",
            "message": "Payment verified and order updated"
        })
    );
    let order = ctx.order(REFERENCE).await;
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.provider_reference(), Some("30447790"));
    ctx.tear_down().await;
}

#[actix_web::test]
async fn paid_orders_are_not_queried_again() {
    let ctx = TestContext::new(notifier_expecting(1), provider_reporting("successful", dec!(150))).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let first = ctx.send(verify(REFERENCE)).await;
    assert_eq!(first.status, StatusCode::OK);
    // The provider mock allows exactly one query
    let second = ctx.send(verify(REFERENCE)).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.json()["success"], true);
    assert_eq!(second.json()["message"], "Order already paid");
    ctx.tear_down().await;
}

// Without provider credentials verification is unavailable, and the order is left as it was
#[actix_web::test]
async fn missing_credentials_are_unavailable() {
    let ctx =
        TestContext::new(notifier_expecting(0), provider_failing(ProviderStatusError::CredentialsMissing)).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        res.json(),
        json!({
            "success": false,
            "order_number": REFERENCE,
            "status": "pending",
            "payment_status": "unpaid",
            "message": "Payment verification unavailable"
        })
    );
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn unreachable_provider_is_not_yet_confirmed() {
    let provider = provider_failing(ProviderStatusError::Unavailable("connection refused".into()));
    let ctx = TestContext::new(notifier_expecting(0), provider).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["success"], false);
    assert_eq!(res.json()["message"], "Payment not yet confirmed by payment provider");
    ctx.tear_down().await;
}

// A pending provider status never marks the order as failed
#[actix_web::test]
async fn pending_payment_is_not_yet_confirmed() {
    let ctx = TestContext::new(notifier_expecting(0), provider_reporting("pending", dec!(150))).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["success"], false);
    assert_eq!(res.json()["payment_status"], "unpaid");
    assert_eq!(res.json()["message"], "Payment not yet confirmed by payment provider");
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn provider_amount_must_match() {
    let ctx = TestContext::new(notifier_expecting(0), provider_reporting("successful", dec!(15))).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json()["success"], false);
    assert_eq!(res.json()["message"], "Payment amount does not match order total");
    assert_eq!(ctx.order(REFERENCE).await.payment_status, PaymentStatus::Unpaid);
    ctx.tear_down().await;
}

#[actix_web::test]
async fn malformed_requests() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;

    let res = ctx.send(json_post(VERIFY_PATH, json!({}))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json(), json!({"success": false, "message": "Missing or invalid orderNumber"}));

    let res = ctx.send(json_post(VERIFY_PATH, json!({ "orderNumber": 1722500000 }))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "Missing or invalid orderNumber");

    let res = ctx.send(verify("ORD-1722500000-77; DROP TABLE orders")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "Invalid order number format");

    let res = ctx.send(verify("ORD-1722500000-78")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["message"], "Order not found");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn other_payment_methods_are_refused() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    let order = NewOrder::new(REFERENCE.into(), Money::from_major_units(150)).with_payment_method("cash_on_delivery");
    ctx.seed(order).await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json()["message"], "This order does not use Moolre payment");
    ctx.tear_down().await;
}

#[actix_web::test]
async fn store_failure_reports_unknown_state() {
    let ctx = TestContext::new(notifier_expecting(0), idle_provider()).await;
    ctx.seed_order(REFERENCE, Money::from_major_units(150)).await;
    ctx.db.pool().close().await;

    let res = ctx.send(verify(REFERENCE)).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.json(),
        json!({
            "success": false,
            "order_number": REFERENCE,
            "status": "unknown",
            "payment_status": "unknown",
            "message": "Internal server error"
        })
    );
    ctx.tear_down().await;
}
