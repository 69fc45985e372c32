use std::{future::Future, time::Duration};

use log::*;

use crate::{
    db::traits::CustomerManagement,
    db_types::Order,
    traits::Notifier,
};

pub const DEFAULT_EFFECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectStatus {
    Completed,
    /// The effect does not apply to this order (e.g. there is no email address to key customer statistics on).
    Skipped,
    Failed(String),
    TimedOut,
}

impl EffectStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, EffectStatus::Completed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectsReport {
    pub customer_stats: EffectStatus,
    pub notification: EffectStatus,
}

/// Runs the side effects of a successful payment: the customer statistics update and the confirmation notice.
///
/// The effects run concurrently, each under its own timeout. A failure in one never affects the other, and nothing
/// is propagated to the caller beyond the [`EffectsReport`].
pub struct PaymentEffects<C, N> {
    customers: C,
    notifier: N,
    timeout: Duration,
}

impl<C, N> PaymentEffects<C, N>
where
    C: CustomerManagement,
    N: Notifier,
{
    pub fn new(customers: C, notifier: N, timeout: Duration) -> Self {
        Self { customers, notifier, timeout }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn dispatch(&self, order: &Order) -> EffectsReport {
        let stats = self.run_effect("customer statistics", order, self.update_customer_stats(order));
        let notification = self.run_effect("confirmation", order, self.send_confirmation(order));
        let (customer_stats, notification) = futures_util::join!(stats, notification);
        EffectsReport { customer_stats, notification }
    }

    /// Resends the confirmation for an order without touching customer statistics.
    pub async fn resend_confirmation(&self, order: &Order) -> EffectStatus {
        self.run_effect("confirmation", order, self.send_confirmation(order)).await
    }

    async fn update_customer_stats(&self, order: &Order) -> Option<Result<(), String>> {
        let email = order.email.as_deref().filter(|e| !e.trim().is_empty())?;
        let result = self.customers.update_customer_stats(email, order.total).await;
        Some(result.map(|stats| trace!("📨️ {} now has {} orders", stats.email, stats.order_count)).map_err(|e| e.to_string()))
    }

    async fn send_confirmation(&self, order: &Order) -> Option<Result<(), String>> {
        Some(self.notifier.send_confirmation(order).await.map_err(|e| e.to_string()))
    }

    async fn run_effect<F>(&self, name: &str, order: &Order, effect: F) -> EffectStatus
    where
        F: Future<Output = Option<Result<(), String>>>,
    {
        let reference = &order.order_number;
        match tokio::time::timeout(self.timeout, effect).await {
            Ok(Some(Ok(()))) => {
                debug!("📨️ {name} for order {reference} completed");
                EffectStatus::Completed
            },
            Ok(None) => {
                debug!("📨️ {name} for order {reference} skipped");
                EffectStatus::Skipped
            },
            Ok(Some(Err(e))) => {
                warn!("📨️ {name} for order {reference} failed: {e}. The payment is still recorded.");
                EffectStatus::Failed(e)
            },
            Err(_) => {
                warn!(
                    "📨️ {name} for order {reference} timed out after {}s. The payment is still recorded.",
                    self.timeout.as_secs_f32()
                );
                EffectStatus::TimedOut
            },
        }
    }
}
