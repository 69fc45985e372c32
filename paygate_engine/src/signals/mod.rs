//! # Inbound payment signals
//!
//! Everything that tells the engine "this order may have been paid" is turned into a [`PaymentSignal`] before it
//! reaches the reconciler.
//!
//! Provider webhooks arrive in whatever shape the provider (or an intermediary) chose that day: JSON, form-encoded,
//! or a raw body with a misleading content type. The fields of interest may be at the top level or wrapped in a
//! `data` object, and `data` itself may be a JSON string. [`InboundPayload`] captures the transport shape and
//! [`CallbackPayload`] is the single strict view extracted from it.
//!
//! The success decision for webhooks is made exactly once, in [`CallbackPayload::reported_status`].
pub mod callback_auth;
mod errors;
mod payload;
mod signal;

pub use callback_auth::{authenticate, CallbackAuth};
pub use errors::NormalizeError;
pub use payload::{CallbackPayload, InboundPayload, DEFAULT_PROVIDER_REFERENCE};
pub use signal::{CallbackTrust, PaymentSignal, ReportedStatus, SignalSource, POLL_PROVIDER_REFERENCE};
