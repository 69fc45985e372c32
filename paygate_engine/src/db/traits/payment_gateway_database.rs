use crate::{
    db::traits::{CustomerManagement, PaymentGatewayError},
    db_types::{NewOrder, Order, OrderReference},
};

/// This trait defines the order store behaviour that the reconciler relies on.
///
/// The two `mark_order_*` methods are the only way payment state changes. Implementations MUST perform them as a
/// single conditional write that matches the order only while its payment status is `unpaid`, and report whether a
/// row was changed. A read followed by a write is not acceptable, since the webhook and the verification poll race
/// each other.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayDatabase: Clone + CustomerManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order in the `unpaid` payment state. Orders are normally created by checkout; this is provided
    /// for seeding and tests.
    ///
    /// If an order with the same order number exists, [`PaymentGatewayError::OrderAlreadyExists`] is returned.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, PaymentGatewayError>;

    /// Fetches the order with the given reference. If no such order exists, `None` is returned.
    async fn fetch_order_by_reference(&self, reference: &OrderReference) -> Result<Option<Order>, PaymentGatewayError>;

    /// Fetches the order with the given row id. If no such order exists, `None` is returned.
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, PaymentGatewayError>;

    /// Transitions the order from `unpaid` to `paid`, recording the provider transaction id and the payment time in
    /// the order metadata. A `pending` fulfilment status advances to `processing`.
    ///
    /// Returns the updated order, or `None` if no `unpaid` order with this reference exists (including the case where
    /// a concurrent caller has already transitioned it).
    async fn mark_order_paid(
        &self,
        reference: &OrderReference,
        provider_reference: &str,
    ) -> Result<Option<Order>, PaymentGatewayError>;

    /// Transitions the order from `unpaid` to `failed`, recording the failure reason and provider transaction id.
    ///
    /// Returns the updated order, or `None` if no `unpaid` order with this reference exists.
    async fn mark_order_failed(
        &self,
        reference: &OrderReference,
        provider_reference: &str,
        reason: &str,
    ) -> Result<Option<Order>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}
