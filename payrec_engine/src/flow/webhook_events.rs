//! Deserialization types for the gateway's webhook envelope.
//!
//! The gateway posts `{"event": "<tag>", "payload": {...}}` with at-least-once delivery. Only the fields the
//! reconciliation logic needs are modelled; everything else in the payload is ignored so that new gateway
//! fields never break deserialization.

use payrec_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderNumber;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

impl WebhookEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_tag(&self.event)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub payment: Option<Entity<PaymentEventData>>,
    #[serde(default)]
    pub refund: Option<Entity<RefundEventData>>,
}

/// The gateway nests each event object one level deep, as `{"entity": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity<T> {
    pub entity: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub id: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEventData {
    pub id: String,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub status: Option<String>,
}

/// The event tags this subsystem understands. Anything else maps to `Unknown` and is acknowledged but ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentAuthorized,
    PaymentCaptured,
    PaymentFailed,
    RefundCreated,
    RefundProcessed,
    Unknown,
}

impl EventKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "payment.authorized" => Self::PaymentAuthorized,
            "payment.captured" => Self::PaymentCaptured,
            "payment.failed" => Self::PaymentFailed,
            "refund.created" => Self::RefundCreated,
            "refund.processed" => Self::RefundProcessed,
            _ => Self::Unknown,
        }
    }
}

/// What a webhook delivery actually did. The HTTP layer always answers 200 no matter which variant comes back;
/// this exists so callers and tests can observe the effect, and so the handler can log precisely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event transitioned the order.
    Applied(OrderNumber),
    /// The order was already in the target state. Harmless duplicate delivery.
    AlreadyApplied,
    /// No order matched the event's gateway ids. Logged as a warning, acknowledged anyway.
    OrderNotFound,
    /// The event tag is not one this version understands.
    Ignored,
    /// The payload was missing the object the event tag promised.
    MalformedPayload,
}
