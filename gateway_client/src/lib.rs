//! A typed façade over a Razorpay-style payment gateway's REST API.
//!
//! The rest of the system never sees the gateway's wire format. [`GatewayApi`] maps the external JSON into the
//! structs in [`data_objects`], and every consumer programs against the [`PaymentGateway`] trait so that test
//! doubles can stand in for the live gateway.

mod api;
mod config;
mod error;
mod traits;

pub mod data_objects;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{RemoteOrder, RemotePayment, RemoteRefund};
pub use error::GatewayError;
pub use traits::PaymentGateway;
