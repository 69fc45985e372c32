//! # Payment gateway server
//! This crate hosts the HTTP server for the payment gateway. It is responsible for:
//! * Receiving payment webhooks from Moolre, checking their origin and reconciling them against the order they name.
//! * Letting the storefront ask for a payment to be verified with Moolre directly, for when the webhook is late.
//! * Resending order confirmations for freshly created orders.
//! * Rate limiting all of the above per caller.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information, or run
//! the binary with any argument to print a summary.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/payment/moolre/callback`: The Moolre payment webhook.
//! * `GET /api/payment/moolre/callback`: Readiness probe for the webhook.
//! * `POST /api/payment/moolre/verify`: Client-initiated payment verification.
//! * `POST /api/notifications`: Order confirmation (re)sends.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod rate_limit;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
