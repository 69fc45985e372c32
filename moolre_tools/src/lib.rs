//! A small client for the parts of the Moolre API the payment gateway uses.
//!
//! Only the payment status check is needed: given the external reference the storefront attached to a payment,
//! Moolre reports whether the mobile money transaction went through.
mod api;
mod config;
mod error;
mod helpers;

mod data_objects;

pub use api::MoolreApi;
pub use config::{MoolreConfig, DEFAULT_STATUS_URL, DEFAULT_TIMEOUT};
pub use data_objects::{StatusData, StatusRequest, StatusResponse, SUCCESS_STATUSES};
pub use error::MoolreApiError;
pub use helpers::parse_amount;
