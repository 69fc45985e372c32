use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use paygate_common::Money;
use paygate_engine::{
    db_types::{NewOrder, Order, OrderReference},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    Notifier,
    NotifierError,
    PaymentGatewayDatabase,
    ReconciliationApi,
    SqliteDatabase,
};

pub async fn new_database() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn setup<N: Notifier>(notifier: N) -> ReconciliationApi<SqliteDatabase, N> {
    ReconciliationApi::new(new_database().await, notifier, Duration::from_secs(2))
}

pub async fn tear_down<N: Notifier>(mut api: ReconciliationApi<SqliteDatabase, N>) {
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    paygate_engine::test_utils::prepare_env::tear_down(api.db().url()).await;
}

pub async fn seed_order(db: &SqliteDatabase, reference: &str, total: Money) -> Order {
    let order = NewOrder::new(OrderReference::from(reference), total)
        .with_email("ama@example.com")
        .with_phone("+233200000000")
        .with_payment_method("moolre");
    db.insert_order(order).await.expect("Error seeding order")
}

/// Counts confirmation notices.
#[derive(Default, Clone)]
pub struct NotificationCounter {
    called: Arc<AtomicI32>,
}

impl NotificationCounter {
    pub fn count(&self) -> i32 {
        self.called.load(Ordering::SeqCst)
    }
}

impl Notifier for NotificationCounter {
    async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError> {
        let _ = self.called.fetch_add(1, Ordering::SeqCst);
        debug!("Confirmation sent for {}", order.order_number);
        Ok(())
    }
}
