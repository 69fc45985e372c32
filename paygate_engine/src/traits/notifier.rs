use thiserror::Error;

use crate::db_types::Order;

#[derive(Debug, Clone, Error)]
#[error("Could not send order confirmation: {0}")]
pub struct NotifierError(pub String);

#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Sends the order confirmation (email, SMS or both) for a paid order.
    async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError>;
}
