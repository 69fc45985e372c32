use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db::traits::PaymentGatewayError,
    db_types::{NewOrder, Order, OrderReference},
};

// Statements with a RETURNING clause are always run to completion with `fetch_all`. SQLite only commits the write once
// the statement is stepped past its last row, so stopping at the first row leaves it pending on the pooled connection.

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentGatewayError> {
    let metadata = serde_json::to_string(&order.metadata)
        .map_err(|e| PaymentGatewayError::DatabaseError(format!("Order metadata is not serializable: {e}")))?;
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (order_number, email, phone, total, metadata)
            VALUES ($1, $2, $3, $4, json($5))
            RETURNING id, order_number, email, phone, total, status, payment_status, metadata, created_at, updated_at;
        "#,
    )
    .bind(&order.order_number)
    .bind(&order.email)
    .bind(&order.phone)
    .bind(order.total)
    .bind(metadata)
    .fetch_all(conn)
    .await;
    match result.map(|mut rows| rows.pop()) {
        Ok(Some(o)) => {
            debug!("🗃️ Order {} has been saved in the DB with id {}", o.order_number, o.id);
            Ok(o)
        },
        Ok(None) => Err(PaymentGatewayError::DatabaseError(format!("Order {} was not inserted", order.order_number))),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(PaymentGatewayError::OrderAlreadyExists(order.order_number))
        },
        Err(e) => Err(e.into()),
    }
}

/// Returns the order with the given order number, if it exists.
pub async fn fetch_order_by_reference(
    reference: &OrderReference,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentGatewayError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, order_number, email, phone, total, status, payment_status, metadata, created_at, updated_at
            FROM orders
            WHERE order_number = $1
            LIMIT 1;
        "#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Returns the order with the given row id, if it exists.
pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, PaymentGatewayError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            SELECT id, order_number, email, phone, total, status, payment_status, metadata, created_at, updated_at
            FROM orders
            WHERE id = $1;
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Marks the order as paid, but only if it is currently unpaid. The check and the write happen in one statement, so
/// of two concurrent callers exactly one receives the updated row and the other receives `None`.
pub async fn mark_order_paid(
    reference: &OrderReference,
    provider_reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentGatewayError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders
            SET
                payment_status = 'paid',
                status = CASE WHEN status = 'pending' THEN 'processing' ELSE status END,
                metadata = json_set(
                    COALESCE(metadata, '{}'),
                    '$.provider_reference', $2,
                    '$.paid_at', strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $1 AND payment_status = 'unpaid'
            RETURNING id, order_number, email, phone, total, status, payment_status, metadata, created_at, updated_at;
        "#,
    )
    .bind(reference)
    .bind(provider_reference)
    .fetch_all(conn)
    .await?
    .pop();
    trace!("🗃️ mark_order_paid({reference}) changed a row: {}", order.is_some());
    Ok(order)
}

/// Marks the order as failed, but only if it is currently unpaid.
pub async fn mark_order_failed(
    reference: &OrderReference,
    provider_reference: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, PaymentGatewayError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders
            SET
                payment_status = 'failed',
                metadata = json_set(
                    COALESCE(metadata, '{}'),
                    '$.provider_reference', $2,
                    '$.failure_reason', $3,
                    '$.failed_at', strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE order_number = $1 AND payment_status = 'unpaid'
            RETURNING id, order_number, email, phone, total, status, payment_status, metadata, created_at, updated_at;
        "#,
    )
    .bind(reference)
    .bind(provider_reference)
    .bind(reason)
    .fetch_all(conn)
    .await?
    .pop();
    trace!("🗃️ mark_order_failed({reference}) changed a row: {}", order.is_some());
    Ok(order)
}
