use payrec_common::Money;

use crate::{
    data_objects::{RemoteOrder, RemotePayment, RemoteRefund},
    GatewayError,
};

/// The contract the reconciliation flows hold against the payment gateway.
///
/// [`crate::GatewayApi`] is the live implementation. Handlers receive an explicit instance (no globals), so tests
/// can substitute a double that scripts gateway behaviour.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway: Clone {
    /// Create a gateway order for the given amount (in minor units). `receipt` is the merchant's reference,
    /// typically the local order number.
    ///
    /// This is a write. It is never retried internally: a timeout after the request was accepted would otherwise
    /// mint a second remote order.
    async fn create_order(&self, amount: Money, currency: &str, receipt: &str) -> Result<RemoteOrder, GatewayError>;

    /// Fetch a payment directly from the gateway. Idempotent read; retried with backoff up to the configured
    /// budget on transient failures.
    async fn fetch_payment(&self, payment_id: &str) -> Result<RemotePayment, GatewayError>;

    /// Fetch all payments the gateway has recorded against a remote order. Used by the reconciliation sweep for
    /// orders whose webhook never arrived and whose client never called back.
    async fn fetch_payments_for_order(&self, remote_order_id: &str) -> Result<Vec<RemotePayment>, GatewayError>;

    /// Issue a refund against a captured payment. `amount` of `None` refunds the full captured amount.
    ///
    /// Never retried internally: double-refunding is a financial error, not a transient one.
    async fn issue_refund(&self, payment_id: &str, amount: Option<Money>) -> Result<RemoteRefund, GatewayError>;
}
