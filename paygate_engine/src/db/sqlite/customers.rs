use paygate_common::Money;
use sqlx::SqliteConnection;

use crate::{db::traits::PaymentGatewayError, db_types::CustomerStats};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Adds the order total to the customer's running totals, creating the customer if necessary.
pub async fn update_customer_stats(
    email: &str,
    order_total: Money,
    conn: &mut SqliteConnection,
) -> Result<CustomerStats, PaymentGatewayError> {
    let stats = sqlx::query_as::<_, CustomerStats>(
        r#"
            INSERT INTO customers (email, total_spent, order_count, last_order_at)
            VALUES ($1, $2, 1, CURRENT_TIMESTAMP)
            ON CONFLICT (email) DO UPDATE SET
                total_spent = total_spent + excluded.total_spent,
                order_count = order_count + 1,
                last_order_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id, email, total_spent, order_count, last_order_at, created_at, updated_at;
        "#,
    )
    .bind(normalize_email(email))
    .bind(order_total)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or_else(|| PaymentGatewayError::DatabaseError(format!("Customer statistics for {email} were not updated")))?;
    Ok(stats)
}

pub async fn fetch_customer_stats(
    email: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<CustomerStats>, PaymentGatewayError> {
    let stats = sqlx::query_as::<_, CustomerStats>(
        r#"
            SELECT id, email, total_spent, order_count, last_order_at, created_at, updated_at
            FROM customers
            WHERE email = $1;
        "#,
    )
    .bind(normalize_email(email))
    .fetch_optional(conn)
    .await?;
    Ok(stats)
}
