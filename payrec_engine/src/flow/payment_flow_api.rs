use std::fmt::Debug;

use chrono::Duration;
use gateway_client::PaymentGateway;
use log::*;
use payrec_common::Secret;

use crate::{
    db_types::{Order, PaymentStatus, RefundStatus},
    flow::{
        objects::{
            OrderIntakeRequest, OrderIntakeResult, OrderProjection, RefundRequest, RefundResult, SweepSummary,
            VerifyPaymentRequest, VerifyPaymentResult,
        },
        webhook_events::{EventKind, WebhookEvent, WebhookOutcome},
        PaymentFlowError,
    },
    helpers::verify_payment_signature,
    traits::{OrderStore, OrderStoreError},
};

/// Order numbers are random enough that a collision is rare; this bounds the regenerate-and-retry loop on the
/// unique constraint all the same.
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 3;

/// `PaymentFlowApi` is the primary API for the reconciliation subsystem. It owns the four flows that keep the
/// local order store, the customer's browser, and the payment gateway consistent with each other: order intake,
/// client-driven payment verification, gateway-driven webhook processing, and refunds.
///
/// The verification and webhook flows both funnel into [`OrderStore::mark_payment_completed`], a conditional
/// write, so the two paths are commutative: whichever runs first wins and the other is a no-op.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
    signing_secret: Secret<String>,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G, signing_secret: Secret<String>) -> Self {
        Self { db, gateway, signing_secret }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: OrderStore,
    G: PaymentGateway,
{
    /// Order intake. Validates the request, persists a local order in `Pending`/`Pending`, creates the matching
    /// remote order at the gateway, and links the two.
    ///
    /// If the gateway call fails, the freshly-inserted local order is deleted again (the compensating action), so
    /// a gateway outage never leaves half-created orders behind. If the generated order number collides with an
    /// existing one, a fresh number is generated and the insert retried up to [`MAX_ORDER_NUMBER_ATTEMPTS`] times.
    pub async fn process_intake(&self, request: OrderIntakeRequest) -> Result<OrderIntakeResult, PaymentFlowError> {
        let mut new_order = request.into_new_order()?;
        let mut attempt = 1;
        let order = loop {
            match self.db.insert_order(new_order.clone()).await {
                Ok(order) => break order,
                Err(OrderStoreError::DuplicateOrderNumber(n)) if attempt < MAX_ORDER_NUMBER_ATTEMPTS => {
                    warn!("🔄️📦️ Order number {n} collided with an existing order. Regenerating.");
                    new_order = new_order.with_fresh_order_number();
                    attempt += 1;
                },
                Err(e) => return Err(e.into()),
            }
        };
        debug!("🔄️📦️ Order {} (id {}) persisted locally. Creating the remote order.", order.order_number, order.id);
        let remote = match self.gateway.create_order(order.total, &order.currency, order.order_number.as_str()).await
        {
            Ok(remote) => remote,
            Err(e) => {
                warn!("🔄️📦️ Remote order creation failed for {}: {e}. Deleting the local order.", order.order_number);
                if let Err(del) = self.db.delete_order(order.id).await {
                    error!("🔄️📦️ Compensating delete of order id {} failed: {del}", order.id);
                }
                return Err(if e.is_transient() {
                    PaymentFlowError::GatewayUnreachable(e.to_string())
                } else {
                    PaymentFlowError::GatewayError(e)
                });
            },
        };
        let order = self.db.set_remote_order_id(order.id, &remote.id).await?;
        info!(
            "🔄️📦️ Order {} is payable. Remote order {} created for {}.",
            order.order_number, remote.id, order.total
        );
        Ok(OrderIntakeResult {
            order_id: order.id,
            order_number: order.order_number,
            remote_order_id: remote.id,
            amount: order.total,
            currency: order.currency,
        })
    }

    /// Client-driven payment verification, called by the storefront after the gateway's checkout UI reports
    /// success. Nothing the client sends is trusted: the signature is recomputed from stored data, and the
    /// payment's status and amount are fetched from the gateway directly.
    pub async fn verify_payment(&self, request: VerifyPaymentRequest) -> Result<VerifyPaymentResult, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_id(request.order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(request.order_id.to_string()))?;
        let remote_order_id = order
            .remote_order_id
            .as_deref()
            .ok_or_else(|| PaymentFlowError::NotFound(request.order_id.to_string()))?;
        if !verify_payment_signature(
            self.signing_secret.reveal(),
            remote_order_id,
            &request.remote_payment_id,
            &request.signature,
        ) {
            warn!(
                "🔄️🔐️ Signature mismatch verifying payment {} for order {}. Possible forged callback.",
                request.remote_payment_id, order.order_number
            );
            return Err(PaymentFlowError::SignatureMismatch);
        }
        let payment = self.gateway.fetch_payment(&request.remote_payment_id).await.map_err(|e| {
            if e.is_transient() {
                PaymentFlowError::GatewayUnreachable(e.to_string())
            } else {
                PaymentFlowError::GatewayError(e)
            }
        })?;
        if !payment.is_settled() {
            info!(
                "🔄️💰️ Payment {} for order {} is '{}' at the gateway. Not completing.",
                payment.id, order.order_number, payment.status
            );
            return Err(PaymentFlowError::PaymentNotCompleted(payment.status));
        }
        // Amounts are integer minor units on both sides, so equality is exact.
        if payment.amount != order.total {
            warn!(
                "🔄️💰️ Payment {} amount {} does not match order {} total {}.",
                payment.id, payment.amount, order.order_number, order.total
            );
            return Err(PaymentFlowError::AmountMismatch);
        }
        let order = match self.db.mark_payment_completed(order.id, &payment.id).await? {
            Some(order) => {
                info!("🔄️💰️ Order {} verified and marked completed.", order.order_number);
                order
            },
            // The webhook got there first. Report the (identical) final state.
            None => self
                .db
                .fetch_order_by_id(request.order_id)
                .await?
                .ok_or_else(|| PaymentFlowError::NotFound(request.order_id.to_string()))?,
        };
        Ok(VerifyPaymentResult {
            order_id: order.id,
            order_number: order.order_number,
            payment_status: order.payment_status,
            status: order.status,
        })
    }

    /// Webhook processing. Dispatches on the event tag and applies the corresponding conditional transition.
    ///
    /// The HTTP layer always acknowledges the delivery, whatever this returns; the [`WebhookOutcome`] exists so
    /// that the effect is observable in logs and tests. Only storage failures surface as errors.
    pub async fn process_webhook_event(&self, event: WebhookEvent) -> Result<WebhookOutcome, PaymentFlowError> {
        let kind = event.kind();
        match kind {
            EventKind::PaymentAuthorized | EventKind::PaymentCaptured => {
                let Some(payment) = event.payload.payment.map(|p| p.entity) else {
                    warn!("🔄️🪝️ '{}' event arrived without a payment object.", event.event);
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(remote_order_id) = payment.order_id.as_deref() else {
                    warn!("🔄️🪝️ '{}' event for payment {} carries no order id.", event.event, payment.id);
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(order) = self.db.fetch_order_by_remote_order_id(remote_order_id).await? else {
                    warn!("🔄️🪝️ No order matches remote order id {remote_order_id}. Acknowledging anyway.");
                    return Ok(WebhookOutcome::OrderNotFound);
                };
                match self.db.mark_payment_completed(order.id, &payment.id).await? {
                    Some(order) => {
                        info!("🔄️🪝️ Webhook '{}' marked order {} completed.", event.event, order.order_number);
                        Ok(WebhookOutcome::Applied(order.order_number))
                    },
                    None => {
                        debug!("🔄️🪝️ Order {} already completed. Duplicate delivery.", order.order_number);
                        Ok(WebhookOutcome::AlreadyApplied)
                    },
                }
            },
            EventKind::PaymentFailed => {
                let Some(payment) = event.payload.payment.map(|p| p.entity) else {
                    warn!("🔄️🪝️ 'payment.failed' event arrived without a payment object.");
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(remote_order_id) = payment.order_id.as_deref() else {
                    warn!("🔄️🪝️ 'payment.failed' event for payment {} carries no order id.", payment.id);
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(order) = self.db.fetch_order_by_remote_order_id(remote_order_id).await? else {
                    warn!("🔄️🪝️ No order matches remote order id {remote_order_id}. Acknowledging anyway.");
                    return Ok(WebhookOutcome::OrderNotFound);
                };
                match self.db.mark_payment_failed(order.id).await? {
                    Some(order) => {
                        info!("🔄️🪝️ Webhook marked order {} failed and cancelled.", order.order_number);
                        Ok(WebhookOutcome::Applied(order.order_number))
                    },
                    None => {
                        // A completed payment is never demoted by a late failure event.
                        debug!("🔄️🪝️ Order {} already completed. Ignoring failure event.", order.order_number);
                        Ok(WebhookOutcome::AlreadyApplied)
                    },
                }
            },
            EventKind::RefundCreated | EventKind::RefundProcessed => {
                let Some(refund) = event.payload.refund.map(|r| r.entity) else {
                    warn!("🔄️🪝️ '{}' event arrived without a refund object.", event.event);
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(remote_payment_id) = refund.payment_id.as_deref() else {
                    warn!("🔄️🪝️ '{}' event for refund {} carries no payment id.", event.event, refund.id);
                    return Ok(WebhookOutcome::MalformedPayload);
                };
                let Some(order) = self.db.fetch_order_by_remote_payment_id(remote_payment_id).await? else {
                    warn!("🔄️🪝️ No order matches remote payment id {remote_payment_id}. Acknowledging anyway.");
                    return Ok(WebhookOutcome::OrderNotFound);
                };
                let refund_status = match kind {
                    EventKind::RefundProcessed => RefundStatus::Full,
                    _ => RefundStatus::Partial,
                };
                match self.db.record_refund(order.id, &refund.id, refund_status).await {
                    Ok(order) => {
                        info!(
                            "🔄️🪝️ Webhook '{}' recorded refund {} against order {}.",
                            event.event, refund.id, order.order_number
                        );
                        Ok(WebhookOutcome::Applied(order.order_number))
                    },
                    Err(OrderStoreError::LinkageAlreadySet(_, _)) => {
                        // Either a different refund id, or a stale event that would lower the recorded status.
                        debug!("🔄️🪝️ Refund event for order {} did not apply.", order.order_number);
                        Ok(WebhookOutcome::AlreadyApplied)
                    },
                    Err(e) => Err(e.into()),
                }
            },
            EventKind::Unknown => {
                debug!("🔄️🪝️ Ignoring unsupported event '{}'.", event.event);
                Ok(WebhookOutcome::Ignored)
            },
        }
    }

    /// Administrative refund. All preconditions are checked before the gateway is touched, and a gateway failure
    /// leaves the order untouched. Refunds are never retried here: double-refunding is a financial error, not a
    /// transient one.
    pub async fn process_refund(&self, request: RefundRequest) -> Result<RefundResult, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_id(request.order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(request.order_id.to_string()))?;
        let Some(remote_payment_id) = order.remote_payment_id.as_deref() else {
            return Err(PaymentFlowError::RefundNotAllowed("No payment is recorded against this order.".to_string()));
        };
        if order.payment_status != PaymentStatus::Completed {
            return Err(PaymentFlowError::RefundNotAllowed(format!(
                "Payment status is '{}', not 'Completed'.",
                order.payment_status
            )));
        }
        if order.refund_status != RefundStatus::None {
            return Err(PaymentFlowError::AlreadyRefunded);
        }
        let amount = request.amount.unwrap_or(order.total);
        if !amount.is_positive() || amount > order.total {
            return Err(PaymentFlowError::RefundAmountOutOfRange { amount, total: order.total });
        }
        let refund = self.gateway.issue_refund(remote_payment_id, request.amount).await.map_err(|e| {
            warn!("🔄️↩️ Refund of {amount} for order {} failed at the gateway: {e}", order.order_number);
            if e.is_transient() {
                PaymentFlowError::GatewayUnreachable(e.to_string())
            } else {
                PaymentFlowError::GatewayError(e)
            }
        })?;
        let refund_status = if amount == order.total {
            RefundStatus::Full
        } else {
            RefundStatus::Partial
        };
        let order = self.db.record_refund(order.id, &refund.id, refund_status).await?;
        info!("🔄️↩️ Refund {} of {amount} recorded against order {}.", refund.id, order.order_number);
        Ok(RefundResult {
            order_id: order.id,
            order_number: order.order_number,
            remote_refund_id: refund.id,
            amount,
            refund_status: order.refund_status,
            status: order.status,
        })
    }

    /// Read-only status projection for the storefront's polling endpoint.
    pub async fn order_status(&self, order_id: i64) -> Result<OrderProjection, PaymentFlowError> {
        let order = self
            .db
            .fetch_order_by_id(order_id)
            .await?
            .ok_or_else(|| PaymentFlowError::NotFound(order_id.to_string()))?;
        Ok(OrderProjection::from(order))
    }

    /// One pass of the reconciliation sweep. Finds orders still `Pending`/`Pending` older than `older_than`,
    /// asks the gateway for their payments, and completes any order the gateway holds a settled, amount-matching
    /// payment for. Orders whose gateway lookup fails transiently are left for the next pass.
    pub async fn reconcile_stale_orders(&self, older_than: Duration) -> Result<SweepSummary, PaymentFlowError> {
        let stale = self.db.fetch_stale_pending_orders(older_than).await?;
        let mut summary = SweepSummary { scanned: stale.len(), ..SweepSummary::default() };
        for order in stale {
            match self.reconcile_one(&order).await {
                Ok(true) => summary.completed.push(order.order_number),
                Ok(false) => {},
                Err(PaymentFlowError::GatewayUnreachable(e)) => {
                    debug!("🔄️🕰️ Gateway unreachable while sweeping order {}: {e}", order.order_number);
                    summary.deferred += 1;
                },
                Err(e) => {
                    warn!("🔄️🕰️ Sweep failed for order {}: {e}", order.order_number);
                    summary.deferred += 1;
                },
            }
        }
        if !summary.completed.is_empty() {
            info!(
                "🔄️🕰️ Sweep completed {} of {} stale orders: {:?}",
                summary.completed.len(),
                summary.scanned,
                summary.completed
            );
        }
        Ok(summary)
    }

    async fn reconcile_one(&self, order: &Order) -> Result<bool, PaymentFlowError> {
        let Some(remote_order_id) = order.remote_order_id.as_deref() else {
            // Intake's compensating delete should make this unreachable, but an unlinked order is not sweepable.
            return Ok(false);
        };
        let payments = self.gateway.fetch_payments_for_order(remote_order_id).await.map_err(|e| {
            if e.is_transient() {
                PaymentFlowError::GatewayUnreachable(e.to_string())
            } else {
                PaymentFlowError::GatewayError(e)
            }
        })?;
        let Some(payment) = payments.iter().find(|p| p.is_settled() && p.amount == order.total) else {
            return Ok(false);
        };
        let applied = self.db.mark_payment_completed(order.id, &payment.id).await?.is_some();
        if applied {
            info!("🔄️🕰️ Sweep found settled payment {} for order {}. Marked completed.", payment.id, order.order_number);
        }
        Ok(applied)
    }
}
