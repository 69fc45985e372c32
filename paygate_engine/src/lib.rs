//! Storefront Payment Gateway Engine
//!
//! This library contains the provider-agnostic core of the payment gateway: deciding, from untrusted and possibly
//! racing confirmation signals, whether an order has been paid, and recording that fact exactly once.
//!
//! The library is divided into the following sections:
//! 1. Storage ([`mod@db`]). The [`PaymentGatewayDatabase`] and [`CustomerManagement`] traits define what a backend must
//!    provide; SQLite is the supported backend. The data types used by the store are defined in [`mod@db_types`].
//! 2. Inbound signals ([`mod@signals`]). Provider webhooks of varying shape are normalized into a strict
//!    [`CallbackPayload`], authenticated against the shared callback secret, and turned into a [`PaymentSignal`].
//! 3. Reconciliation ([`mod@reconciler`]). [`ReconciliationApi`] applies a signal to its order and runs the
//!    post-payment effects after a successful transition.
//! 4. Integration contracts ([`mod@traits`]). The payment provider status API and the customer notifier are traits,
//!    implemented by the server.
pub mod db;
pub mod db_types;
pub mod reconciler;
pub mod signals;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{CustomerManagement, PaymentGatewayDatabase, PaymentGatewayError};
pub use reconciler::{
    EffectStatus,
    EffectsReport,
    PaymentEffects,
    ReconcileError,
    ReconcileOutcome,
    ReconciliationApi,
};
pub use signals::{CallbackPayload, CallbackTrust, NormalizeError, PaymentSignal, ReportedStatus, SignalSource};
pub use traits::{Notifier, NotifierError, PaymentStatusProvider, ProviderStatus, ProviderStatusError};
