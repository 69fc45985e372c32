use std::fmt::Debug;

use log::*;
use paygate_common::Money;
use sqlx::SqlitePool;

use super::{customers, db_url, new_pool, orders};
use crate::{
    db::traits::{CustomerManagement, PaymentGatewayDatabase, PaymentGatewayError},
    db_types::{CustomerStats, NewOrder, Order, OrderReference},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in the `PAYGATE_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, PaymentGatewayError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), PaymentGatewayError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PaymentGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn fetch_order_by_reference(&self, reference: &OrderReference) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_reference(reference, &mut conn).await
    }

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await
    }

    async fn mark_order_paid(
        &self,
        reference: &OrderReference,
        provider_reference: &str,
    ) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_order_paid(reference, provider_reference, &mut conn).await?;
        if order.is_some() {
            debug!("🗃️ Order {reference} marked as paid (provider reference {provider_reference})");
        }
        Ok(order)
    }

    async fn mark_order_failed(
        &self,
        reference: &OrderReference,
        provider_reference: &str,
        reason: &str,
    ) -> Result<Option<Order>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_order_failed(reference, provider_reference, reason, &mut conn).await?;
        if order.is_some() {
            debug!("🗃️ Order {reference} marked as failed: {reason}");
        }
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CustomerManagement for SqliteDatabase {
    async fn update_customer_stats(&self, email: &str, order_total: Money) -> Result<CustomerStats, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        customers::update_customer_stats(email, order_total, &mut conn).await
    }

    async fn fetch_customer_stats(&self, email: &str) -> Result<Option<CustomerStats>, PaymentGatewayError> {
        let mut conn = self.pool.acquire().await?;
        customers::fetch_customer_stats(email, &mut conn).await
    }
}
