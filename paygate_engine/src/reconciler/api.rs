use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    db::traits::PaymentGatewayDatabase,
    db_types::{Order, OrderIdentifier, OrderReference, PaymentStatus},
    reconciler::{PaymentEffects, ReconcileError, ReconcileOutcome},
    signals::{callback_auth::SECURITY_LOG_TARGET, CallbackTrust, PaymentSignal, ReportedStatus, SignalSource},
    traits::Notifier,
};

/// The single authority for changing the payment state of an order.
pub struct ReconciliationApi<B, N> {
    db: B,
    effects: PaymentEffects<B, N>,
}

impl<B, N> Debug for ReconciliationApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B, N> ReconciliationApi<B, N>
where
    B: PaymentGatewayDatabase,
    N: Notifier,
{
    pub fn new(db: B, notifier: N, effect_timeout: Duration) -> Self {
        let effects = PaymentEffects::new(db.clone(), notifier, effect_timeout);
        Self { db, effects }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn effects(&self) -> &PaymentEffects<B, N> {
        &self.effects
    }

    pub async fn fetch_order(&self, reference: &OrderReference) -> Result<Option<Order>, ReconcileError> {
        let order = self.db.fetch_order_by_reference(reference).await?;
        Ok(order)
    }

    pub async fn fetch_order_by_identifier(&self, identifier: &OrderIdentifier) -> Result<Option<Order>, ReconcileError> {
        match identifier {
            OrderIdentifier::Reference(reference) => self.fetch_order(reference).await,
            OrderIdentifier::Id(id) => Ok(self.db.fetch_order_by_id(*id).await?),
        }
    }

    /// Reconciles a payment signal against the order it refers to.
    ///
    /// Unknown orders are never created. Terminal orders are reported as they are, without any writes. A successful
    /// signal whose amount differs from the order total by more than the tolerance leaves the order untouched.
    ///
    /// The post-payment effects run only when this call is the one that moved the order to `paid`.
    pub async fn reconcile(&self, signal: PaymentSignal) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = &signal.order_reference;
        let order = self
            .db
            .fetch_order_by_reference(reference)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound(reference.clone()))?;
        match order.payment_status {
            PaymentStatus::Paid => {
                debug!("🔄️ Order {reference} is already paid. Ignoring signal from {:?}", signal.source);
                return Ok(ReconcileOutcome::AlreadyPaid(order));
            },
            PaymentStatus::Failed => {
                debug!("🔄️ Order {reference} has already failed. Ignoring signal from {:?}", signal.source);
                return Ok(ReconcileOutcome::AlreadyFailed(order));
            },
            PaymentStatus::Unpaid => {},
        }
        if signal.source == SignalSource::Webhook(CallbackTrust::Unverifiable) {
            warn!(target: SECURITY_LOG_TARGET, "🔄️ Reconciling order {reference} from an unverifiable webhook");
        }
        match &signal.status {
            ReportedStatus::Succeeded => self.record_payment(order, &signal).await,
            ReportedStatus::Failed { reason } if signal.is_webhook() => self.record_failure(order, &signal, reason).await,
            ReportedStatus::Failed { .. } | ReportedStatus::Pending => {
                debug!("🔄️ Payment for order {reference} is not confirmed yet ({})", signal.message);
                Ok(ReconcileOutcome::NotYetConfirmed(order))
            },
        }
    }

    async fn record_payment(&self, order: Order, signal: &PaymentSignal) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = &order.order_number;
        if let Some(reported) = signal.amount {
            if !order.total.matches_within_tolerance(reported) {
                warn!(
                    target: SECURITY_LOG_TARGET,
                    "🔄️ Amount mismatch for order {reference}: expected {}, {:?} reported {reported}. The order is left \
                     unpaid.",
                    order.total,
                    signal.source
                );
                let expected = order.total;
                return Ok(ReconcileOutcome::AmountMismatch { order, expected, reported });
            }
        }
        match self.db.mark_order_paid(reference, &signal.provider_reference).await? {
            Some(paid) => {
                info!(
                    "🔄️ Order {reference} is paid ({} via {:?})",
                    signal.provider_reference, signal.source
                );
                let effects = self.effects.dispatch(&paid).await;
                Ok(ReconcileOutcome::Paid { order: paid, effects })
            },
            None => self.resolve_unapplied_write(reference).await,
        }
    }

    async fn record_failure(
        &self,
        order: Order,
        signal: &PaymentSignal,
        reason: &str,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let reference = &order.order_number;
        match self.db.mark_order_failed(reference, &signal.provider_reference, reason).await? {
            Some(failed) => {
                info!("🔄️ Payment for order {reference} failed: {reason}");
                Ok(ReconcileOutcome::Failed(failed))
            },
            None => self.resolve_unapplied_write(reference).await,
        }
    }

    /// A conditional write matched no row, so another caller changed the order between our read and our write.
    /// Report the state it ended up in.
    async fn resolve_unapplied_write(&self, reference: &OrderReference) -> Result<ReconcileOutcome, ReconcileError> {
        let order = self
            .db
            .fetch_order_by_reference(reference)
            .await?
            .ok_or_else(|| ReconcileError::OrderNotFound(reference.clone()))?;
        match order.payment_status {
            PaymentStatus::Paid => {
                debug!("🔄️ Order {reference} was paid by a concurrent confirmation");
                Ok(ReconcileOutcome::AlreadyPaid(order))
            },
            PaymentStatus::Failed => {
                debug!("🔄️ Order {reference} was failed by a concurrent confirmation");
                Ok(ReconcileOutcome::AlreadyFailed(order))
            },
            PaymentStatus::Unpaid => {
                error!("🔄️ Order {reference} is unpaid, but the conditional payment update did not match it");
                Err(ReconcileError::DatabaseError(format!("Payment state of order {reference} could not be updated")))
            },
        }
    }
}
