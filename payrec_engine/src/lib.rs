//! Payment Reconciliation Engine
//!
//! The engine contains the core logic for keeping an order's local state consistent with an external payment
//! gateway across three independent sources of truth: the customer's browser, the gateway's synchronous
//! verification API, and the gateway's asynchronous webhook stream.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@sqlite`]). SQLite is the supported backend. You should never need to access the database
//!    directly; use the public flow API instead. The exception is the data types used in the database, defined in
//!    the public `db_types` module.
//! 2. The flow API ([`PaymentFlowApi`]). This carries the public-facing reconciliation flows: order intake,
//!    payment verification, webhook processing, refunds, and the stale-order sweep. Storage backends implement
//!    the [`OrderStore`] trait to serve the flows.
pub mod db_types;
pub mod helpers;

mod flow;
mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use flow::{
    Entity,
    EventKind,
    OrderIntakeRequest,
    OrderIntakeResult,
    OrderProjection,
    PaymentEventData,
    PaymentFlowApi,
    PaymentFlowError,
    RefundEventData,
    RefundRequest,
    RefundResult,
    SweepSummary,
    VerifyPaymentRequest,
    VerifyPaymentResult,
    WebhookEvent,
    WebhookOutcome,
    WebhookPayload,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteOrderStore;
pub use traits::{OrderStore, OrderStoreError};
