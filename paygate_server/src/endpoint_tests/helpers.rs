use actix_web::{
    body::MessageBody,
    http::{
        header::{HeaderMap, CONTENT_TYPE},
        StatusCode,
    },
    test,
    test::TestRequest,
    web,
    App,
};
use log::debug;
use paygate_common::{Money, Secret};
use paygate_engine::{
    db_types::{NewOrder, Order, OrderReference},
    test_utils::prepare_env::{prepare_test_env, random_db_path, tear_down},
    PaymentGatewayDatabase,
    ReconciliationApi,
    SqliteDatabase,
};
use serde_json::Value;

use super::mocks::{MockConfirmationNotifier, MockStatusProvider};
use crate::{
    config::{CallbackConfig, ServerOptions},
    rate_limit::{RateLimitConfig, RateLimiter},
    server::configure_routes,
};

pub const CALLBACK_SECRET: &str = "moolre-test-secret";
pub const CALLBACK_PATH: &str = "/api/payment/moolre/callback";
pub const VERIFY_PATH: &str = "/api/payment/moolre/verify";
pub const NOTIFICATIONS_PATH: &str = "/api/notifications";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {}", self.body))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A server wired to a fresh SQLite database and mocked provider and notifier.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub api: web::Data<ReconciliationApi<SqliteDatabase, MockConfirmationNotifier>>,
    pub provider: web::Data<MockStatusProvider>,
    pub limiter: web::Data<RateLimiter>,
    pub options: web::Data<ServerOptions>,
    pub callback: web::Data<CallbackConfig>,
    url: String,
}

impl TestContext {
    pub async fn new(notifier: MockConfirmationNotifier, provider: MockStatusProvider) -> Self {
        Self::with_config(notifier, provider, Some(CALLBACK_SECRET), RateLimitConfig::default()).await
    }

    pub async fn with_config(
        notifier: MockConfirmationNotifier,
        provider: MockStatusProvider,
        secret: Option<&str>,
        limits: RateLimitConfig,
    ) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error opening test database");
        let api = ReconciliationApi::new(db.clone(), notifier, std::time::Duration::from_secs(2));
        Self {
            db,
            api: web::Data::new(api),
            provider: web::Data::new(provider),
            limiter: web::Data::new(RateLimiter::new(limits)),
            options: web::Data::new(ServerOptions::default()),
            callback: web::Data::new(CallbackConfig::new(secret.map(|s| Secret::new(s.to_string())))),
            url,
        }
    }

    pub async fn seed_order(&self, reference: &str, total: Money) -> Order {
        let order = NewOrder::new(OrderReference::from(reference), total)
            .with_email("kofi@example.com")
            .with_phone("+233240000000")
            .with_payment_method("moolre");
        self.db.insert_order(order).await.expect("Error seeding order")
    }

    pub async fn seed(&self, order: NewOrder) -> Order {
        self.db.insert_order(order).await.expect("Error seeding order")
    }

    pub async fn order(&self, reference: &str) -> Order {
        self.db
            .fetch_order_by_reference(&OrderReference::from(reference))
            .await
            .expect("Error fetching order")
            .expect("Order does not exist")
    }

    /// Sends a request through a freshly built app. All state lives in the shared app data, so consecutive calls see
    /// each other's effects.
    pub async fn send(&self, req: TestRequest) -> TestResponse {
        let app = test::init_service(
            App::new()
                .app_data(self.api.clone())
                .app_data(self.provider.clone())
                .app_data(self.limiter.clone())
                .app_data(self.options.clone())
                .app_data(self.callback.clone())
                .configure(configure_routes::<SqliteDatabase, MockConfirmationNotifier, MockStatusProvider>),
        )
        .await;
        match test::try_call_service(&app, req.to_request()).await {
            Ok(res) => {
                let (_, res) = res.into_parts();
                let status = res.status();
                let headers = res.headers().clone();
                let body = res.into_body().try_into_bytes().unwrap_or_default();
                TestResponse { status, headers, body: String::from_utf8_lossy(&body).into_owned() }
            },
            Err(e) => {
                debug!("Request was refused by middleware: {e}");
                let res = e.error_response();
                let status = res.status();
                let headers = res.headers().clone();
                let body = res.into_body().try_into_bytes().unwrap_or_default();
                TestResponse { status, headers, body: String::from_utf8_lossy(&body).into_owned() }
            },
        }
    }

    pub async fn tear_down(self) {
        self.db.pool().close().await;
        tear_down(&self.url).await;
    }
}

pub fn json_post(path: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(path).insert_header((CONTENT_TYPE, "application/json")).set_payload(body.to_string())
}

pub fn raw_post(path: &str, content_type: &str, body: &str) -> TestRequest {
    TestRequest::post().uri(path).insert_header((CONTENT_TYPE, content_type)).set_payload(body.to_string())
}

/// A notifier that must be called exactly `times` times.
pub fn notifier_expecting(times: usize) -> MockConfirmationNotifier {
    let mut notifier = MockConfirmationNotifier::new();
    notifier.expect_send_confirmation().times(times).returning(|_| Ok(()));
    notifier
}

/// A provider that must never be asked.
pub fn idle_provider() -> MockStatusProvider {
    let mut provider = MockStatusProvider::new();
    provider.expect_query_status().never();
    provider
}
