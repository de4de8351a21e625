use chrono::Duration;
use log::{debug, trace};
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderNumber, RefundStatus},
    traits::OrderStoreError,
};

/// Inserts a new order into the database using the given connection. The DB assigns the id and timestamps; the
/// order starts in 'Pending'/'Pending' state with no gateway linkage.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                customer_name,
                customer_email,
                customer_phone,
                shipping_address,
                items,
                subtotal,
                discount,
                shipping,
                total,
                currency
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.clone())
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(order.customer_phone)
    .bind(order.shipping_address)
    .bind(Json(order.items))
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.shipping)
    .bind(order.total)
    .bind(order.currency)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(e) if is_unique_violation(&e) => Err(OrderStoreError::DuplicateOrderNumber(order.order_number)),
        Err(e) => Err(e.into()),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|de| de.is_unique_violation())
}

/// Removes an order record. This is the compensating action for a failed remote order creation, so it refuses to
/// touch orders that already carry a remote order id.
pub async fn delete_unlinked_order(id: i64, conn: &mut SqliteConnection) -> Result<(), OrderStoreError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND remote_order_id IS NULL")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(OrderStoreError::OrderNotFound(id));
    }
    debug!("📝️ Order with id {id} removed after remote order creation failed");
    Ok(())
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_order_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_remote_order_id(
    remote_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE remote_order_id = $1")
        .bind(remote_order_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_remote_payment_id(
    remote_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE remote_payment_id = $1")
        .bind(remote_payment_id)
        .fetch_optional(conn)
        .await
}

/// Links the gateway order id. Set-once: the filter on `remote_order_id IS NULL` makes a second link attempt a
/// no-op, which is then surfaced as [`OrderStoreError::LinkageAlreadySet`].
pub async fn set_remote_order_id(
    id: i64,
    remote_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET remote_order_id = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND remote_order_id IS NULL RETURNING *",
    )
    .bind(remote_order_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => {
            debug!("📝️ Order {} linked to gateway order {remote_order_id}", order.order_number);
            Ok(order)
        },
        None => match fetch_order_by_id(id, conn).await? {
            Some(_) => Err(OrderStoreError::LinkageAlreadySet(id, "order")),
            None => Err(OrderStoreError::OrderNotFound(id)),
        },
    }
}

/// The conditional completion write. The `payment_status <> 'Completed'` filter is what makes the verify/webhook
/// race safe across processes: whichever path runs second matches zero rows and gets `None` back.
pub async fn mark_payment_completed(
    id: i64,
    remote_payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderStoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = 'Completed', status = 'Processing', remote_payment_id = $1, \
         updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND payment_status <> 'Completed' RETURNING *",
    )
    .bind(remote_payment_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    if let Some(order) = &updated {
        debug!("📝️ Order {} marked as paid with payment {remote_payment_id}", order.order_number);
    } else {
        trace!("📝️ Completion write for order id {id} did not apply (already completed or missing)");
    }
    Ok(updated)
}

/// Conditionally records a failed payment. A completed payment is never downgraded: if verification or a captured
/// webhook already landed, a late `payment.failed` event matches zero rows.
pub async fn mark_payment_failed(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, OrderStoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET payment_status = 'Failed', status = 'Cancelled', updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND payment_status <> 'Completed' RETURNING *",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    if let Some(order) = &updated {
        debug!("📝️ Order {} marked as failed and cancelled", order.order_number);
    }
    Ok(updated)
}

/// Records a refund. The filter allows the same refund to progress from `Partial` (refund.created) to `Full`
/// (refund.processed) but never back, so a redelivered `refund.created` arriving after `refund.processed` cannot
/// downgrade the status. A different refund id is refused outright. Non-applying writes surface as
/// [`OrderStoreError::LinkageAlreadySet`].
pub async fn record_refund(
    id: i64,
    remote_refund_id: &str,
    refund_status: RefundStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderStoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET remote_refund_id = $1, refund_status = $2, status = 'Cancelled', \
         updated_at = CURRENT_TIMESTAMP \
         WHERE id = $3 AND (remote_refund_id IS NULL OR remote_refund_id = $1) \
         AND NOT (refund_status = 'Full' AND $2 = 'Partial') RETURNING *",
    )
    .bind(remote_refund_id)
    .bind(refund_status.to_string())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => {
            debug!("📝️ Refund {remote_refund_id} ({refund_status}) recorded against order {}", order.order_number);
            Ok(order)
        },
        None => match fetch_order_by_id(id, conn).await? {
            Some(_) => Err(OrderStoreError::LinkageAlreadySet(id, "refund")),
            None => Err(OrderStoreError::OrderNotFound(id)),
        },
    }
}

/// Orders that have a gateway order but have seen neither a verification call nor a webhook for longer than
/// `older_than`. The reconciliation sweep polls the gateway for these.
pub async fn fetch_stale_pending_orders(
    older_than: Duration,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, OrderStoreError> {
    let rows = sqlx::query_as(
        format!(
            "SELECT * FROM orders WHERE payment_status = 'Pending' AND status = 'Pending' AND \
             remote_order_id IS NOT NULL AND \
             (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) > {} ORDER BY created_at ASC",
            older_than.num_seconds()
        )
        .as_str(),
    )
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
