use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use payrec_common::Money;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
pub use sqlx::types::Json;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    OrderNumber      ---------------------------------------------------------
/// The customer-facing order reference. Time-derived with a random suffix; uniqueness is enforced by the store's
/// unique constraint and generation is retried on conflict.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl OrderNumber {
    pub fn generate() -> Self {
        let now = Utc::now();
        let suffix = rand::thread_rng().gen_range(0..10_000u32);
        Self(format!("ORD-{}-{suffix:04}", now.format("%Y%m%d%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------    OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been created but payment has not been confirmed.
    Pending,
    /// Payment is confirmed and the order is being prepared.
    Processing,
    /// Fulfilment states. Set by downstream systems, never by the reconciliation flows.
    Shipped,
    Delivered,
    /// The order was cancelled, either because payment failed or because it was refunded.
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatus::Pending
        })
    }
}

//--------------------------------------   PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No payment has been confirmed for the order yet.
    Pending,
    /// A settled gateway payment has been cross-checked and linked to the order.
    Completed,
    /// The gateway reported the payment as failed.
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------    RefundStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RefundStatus {
    None,
    Partial,
    Full,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::None => write!(f, "None"),
            RefundStatus::Partial => write!(f, "Partial"),
            RefundStatus::Full => write!(f, "Full"),
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Partial" => Ok(Self::Partial),
            "Full" => Ok(Self::Full),
            s => Err(ConversionError(format!("Invalid refund status: {s}"))),
        }
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

//--------------------------------------        Order        ---------------------------------------------------------
/// The central entity of the reconciliation subsystem.
///
/// Financial fields and the order number are immutable after creation. The state fields (`status`,
/// `payment_status`, `refund_status`) are the only mutable surface, besides the gateway linkage fields which are
/// monotonic: set once, never cleared.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Json<Vec<LineItem>>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    pub total: Money,
    pub currency: String,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub remote_refund_id: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub refund_status: RefundStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping: Money,
    /// Always `subtotal - discount + shipping`. Computed at intake, immutable thereafter.
    pub total: Money,
    pub currency: String,
}

impl NewOrder {
    /// Regenerate the order number after a unique-constraint conflict.
    pub fn with_fresh_order_number(mut self) -> Self {
        self.order_number = OrderNumber::generate();
        self
    }
}
