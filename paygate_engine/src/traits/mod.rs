//! #  Integration contracts.
//!
//! The engine never talks to the outside world directly. Anything that crosses a network boundary is expressed as a
//! trait here and implemented by the server crate.
//!
//! * [`PaymentStatusProvider`] asks the payment provider for the authoritative state of a transaction. This is the
//!   polling half of the confirmation flow.
//! * [`Notifier`] delivers the order confirmation to the customer once a payment has been recorded.
mod notifier;
mod payment_status_provider;

pub use notifier::{Notifier, NotifierError};
pub use payment_status_provider::{PaymentStatusProvider, ProviderStatus, ProviderStatusError};
