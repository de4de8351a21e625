use chrono::Duration;
use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderNumber, RefundStatus};

/// The storage contract for orders. This is the authoritative home of the state transition rules: the
/// payment-completion and payment-failure transitions are *conditional writes*, applied as a single atomic update
/// filtered by the pre-image `payment_status`, so they stay correct when multiple processes race on the same order.
#[allow(async_fn_in_trait)]
pub trait OrderStore: Clone {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Persists a brand-new order in `Pending`/`Pending` state.
    ///
    /// Fails with [`OrderStoreError::DuplicateOrderNumber`] if the order number is already taken; callers
    /// regenerate the number and retry.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Deletes an order outright. Only used as the compensating action when remote order creation fails during
    /// intake; nothing else in the subsystem ever removes an order.
    async fn delete_order(&self, id: i64) -> Result<(), OrderStoreError>;

    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderStoreError>;

    /// Webhook payment events identify orders by the gateway's order id, not the local id.
    async fn fetch_order_by_remote_order_id(&self, remote_order_id: &str) -> Result<Option<Order>, OrderStoreError>;

    /// Webhook refund events identify orders by the gateway's payment id.
    async fn fetch_order_by_remote_payment_id(&self, remote_payment_id: &str)
        -> Result<Option<Order>, OrderStoreError>;

    /// Links the gateway's order id to a local order. Set-once: fails if a remote order id is already recorded.
    async fn set_remote_order_id(&self, id: i64, remote_order_id: &str) -> Result<Order, OrderStoreError>;

    /// The idempotent conditional write at the heart of the verify/webhook race (see the flow API docs):
    /// sets `payment_status = Completed`, `status = Processing` and records the remote payment id, but only if the
    /// order's current `payment_status` is not already `Completed`.
    ///
    /// Returns the updated order, or `None` if the condition did not hold (the transition had already been
    /// applied by the other path) — a no-op, not an error.
    async fn mark_payment_completed(&self, id: i64, remote_payment_id: &str)
        -> Result<Option<Order>, OrderStoreError>;

    /// Conditionally marks the payment failed (`payment_status = Failed`, `status = Cancelled`), unless a
    /// completed payment has already been recorded. Returns `None` when the write did not apply.
    async fn mark_payment_failed(&self, id: i64) -> Result<Option<Order>, OrderStoreError>;

    /// Records a refund against an order: persists the remote refund id, sets the refund status and cancels the
    /// order. The refund id is set-once; recording a second refund id for the same order is an error.
    async fn record_refund(
        &self,
        id: i64,
        remote_refund_id: &str,
        refund_status: RefundStatus,
    ) -> Result<Order, OrderStoreError>;

    /// Orders still `Pending`/`Pending` that were created longer than `older_than` ago and have a remote order id.
    /// These are candidates for the reconciliation sweep: their webhook never arrived and their client never
    /// called back.
    async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderNotFound(i64),
    #[error("Order number {0} already exists")]
    DuplicateOrderNumber(OrderNumber),
    #[error("Order {0} already has a remote {1} id recorded")]
    LinkageAlreadySet(i64, &'static str),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}
