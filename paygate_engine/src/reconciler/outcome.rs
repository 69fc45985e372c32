use std::fmt::Display;

use paygate_common::Money;
use rust_decimal::Decimal;

use crate::{db_types::Order, reconciler::EffectsReport};

/// The result of reconciling a payment signal against an order. Every variant carries the order as it stands after
/// reconciliation.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// This call moved the order from `unpaid` to `paid`, and the post-payment effects were run.
    Paid { order: Order, effects: EffectsReport },
    /// The order had already been paid, possibly by a concurrent caller. Nothing was changed.
    AlreadyPaid(Order),
    /// This call moved the order from `unpaid` to `failed`.
    Failed(Order),
    /// The order had already been marked as failed. Nothing was changed.
    AlreadyFailed(Order),
    /// The signal does not confirm the payment yet. Nothing was changed.
    NotYetConfirmed(Order),
    /// The reported amount does not match the order total. Nothing was changed.
    AmountMismatch { order: Order, expected: Money, reported: Decimal },
}

impl ReconcileOutcome {
    pub fn order(&self) -> &Order {
        match self {
            ReconcileOutcome::Paid { order, .. } => order,
            ReconcileOutcome::AlreadyPaid(order) => order,
            ReconcileOutcome::Failed(order) => order,
            ReconcileOutcome::AlreadyFailed(order) => order,
            ReconcileOutcome::NotYetConfirmed(order) => order,
            ReconcileOutcome::AmountMismatch { order, .. } => order,
        }
    }

    /// True if the order is paid, whether or not this call was the one that paid it.
    pub fn is_paid(&self) -> bool {
        matches!(self, ReconcileOutcome::Paid { .. } | ReconcileOutcome::AlreadyPaid(_))
    }

    /// True if this call changed the payment state of the order.
    pub fn is_transition(&self) -> bool {
        matches!(self, ReconcileOutcome::Paid { .. } | ReconcileOutcome::Failed(_))
    }
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reference = &self.order().order_number;
        match self {
            ReconcileOutcome::Paid { .. } => write!(f, "order {reference} paid"),
            ReconcileOutcome::AlreadyPaid(_) => write!(f, "order {reference} was already paid"),
            ReconcileOutcome::Failed(_) => write!(f, "order {reference} payment failed"),
            ReconcileOutcome::AlreadyFailed(_) => write!(f, "order {reference} payment had already failed"),
            ReconcileOutcome::NotYetConfirmed(_) => write!(f, "order {reference} payment not yet confirmed"),
            ReconcileOutcome::AmountMismatch { expected, reported, .. } => {
                write!(f, "order {reference} amount mismatch (expected {expected}, reported {reported})")
            },
        }
    }
}
