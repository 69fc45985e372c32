//! # Order reconciliation
//!
//! [`ReconciliationApi`] is the only component that changes the payment state of an order. The provider webhook and
//! the client-initiated verification poll both end up here, and may do so at the same moment for the same order.
//!
//! ## State machine
//! ```text
//!            ┌──────────► paid    (terminal, re-entrant confirmations are no-ops)
//!  unpaid ───┤
//!            └──────────► failed  (terminal)
//! ```
//! The lookup at the start of [`ReconciliationApi::reconcile`] is only a fast path. Correctness rests on the store's
//! conditional writes, which match an order only while it is still `unpaid`. When a write matches nothing, the order is
//! re-read and the state some other caller moved it to is reported instead.
//!
//! After an applied `unpaid → paid` transition, and only then, [`PaymentEffects`] runs the post-payment side effects.
//! Their failures are reported but never change the outcome: the payment has been recorded regardless.
mod api;
mod effects;
mod errors;
mod outcome;

pub use api::ReconciliationApi;
pub use effects::{EffectStatus, EffectsReport, PaymentEffects, DEFAULT_EFFECT_TIMEOUT};
pub use errors::ReconcileError;
pub use outcome::ReconcileOutcome;
