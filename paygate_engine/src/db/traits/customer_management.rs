use paygate_common::Money;

use crate::{db::traits::PaymentGatewayError, db_types::CustomerStats};

/// Behaviour for maintaining the running purchase totals of customers.
///
/// Customers are identified by email address. Addresses are compared case-insensitively.
#[allow(async_fn_in_trait)]
pub trait CustomerManagement {
    /// Adds `order_total` to the customer's total spend and increments their order count, creating the customer record
    /// if it does not exist yet.
    async fn update_customer_stats(&self, email: &str, order_total: Money) -> Result<CustomerStats, PaymentGatewayError>;

    /// Fetches the statistics for the given customer. If the customer has no record, `None` is returned.
    async fn fetch_customer_stats(&self, email: &str) -> Result<Option<CustomerStats>, PaymentGatewayError>;
}
