//! # Payment reconciliation server
//! This crate hosts the HTTP surface of the reconciliation subsystem. It is responsible for:
//! * Accepting order intake requests from the storefront and creating the matching gateway order.
//! * Handling the storefront's post-checkout verification callback.
//! * Listening for the gateway's asynchronous webhook events (behind an HMAC check).
//! * Processing administrative refund requests.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/payments/create-order`: Order intake.
//! * `/payments/verify`: Client-driven payment verification.
//! * `/payments/webhook`: The gateway's webhook dispatcher.
//! * `/payments/refund`: Administrative refunds.
//! * `/payments/{order_id}`: Order status polling.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sweep_worker;

#[cfg(test)]
mod endpoint_tests;
