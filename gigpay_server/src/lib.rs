//! # GigPay settlement server
//! This module hosts the HTTP surface of the settlement engine. It is responsible for:
//! Authenticating marketplace users and feeding their identity to the settlement API.
//! Listening for incoming webhook deliveries from the payment providers and verifying their signatures.
//! Mapping settlement outcomes and errors onto HTTP responses.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/gateways`: Public metadata about the supported payment providers.
//! * `/contracts/...`: The contract lifecycle (accept, fund, submit, approve, revise, cancel, refund).
//! * `/payments/withdraw`: Balance withdrawals.
//! * `/dashboard`: Per-user money summary.
//! * `/webhook/{provider}`: Signature-checked webhook deliveries from the payment providers.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
