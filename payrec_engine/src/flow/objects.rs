use payrec_common::{Money, INR_CURRENCY_CODE};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderNumber, OrderStatus, PaymentStatus, RefundStatus},
    flow::PaymentFlowError,
};

//--------------------------------------  OrderIntakeRequest  --------------------------------------------------------
/// The storefront's checkout payload. Amounts are integer minor units (paise); the financial breakdown is supplied
/// pre-computed by the (out of scope) cart logic and re-validated here before anything touches the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntakeRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
    pub items: Vec<LineItem>,
    pub subtotal: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub shipping: Money,
}

impl OrderIntakeRequest {
    /// Rejects the request before any remote call is made. Returns the computed total on success.
    pub fn validate(&self) -> Result<Money, PaymentFlowError> {
        let missing = |field: &str| PaymentFlowError::MissingFields(format!("{field} must not be empty"));
        if self.customer_name.trim().is_empty() {
            return Err(missing("customer_name"));
        }
        if self.customer_email.trim().is_empty() {
            return Err(missing("customer_email"));
        }
        if self.customer_phone.trim().is_empty() {
            return Err(missing("customer_phone"));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(missing("shipping_address"));
        }
        if self.items.is_empty() {
            return Err(PaymentFlowError::MissingFields("items must not be empty".to_string()));
        }
        if !self.subtotal.is_positive() {
            return Err(PaymentFlowError::MissingFields("subtotal must be positive".to_string()));
        }
        if self.discount.is_negative() || self.shipping.is_negative() {
            return Err(PaymentFlowError::MissingFields("discount and shipping must not be negative".to_string()));
        }
        let total = self.total();
        if !total.is_positive() {
            return Err(PaymentFlowError::MissingFields("computed total must be positive".to_string()));
        }
        Ok(total)
    }

    pub fn total(&self) -> Money {
        self.subtotal - self.discount + self.shipping
    }

    pub fn into_new_order(self) -> Result<NewOrder, PaymentFlowError> {
        let total = self.validate()?;
        Ok(NewOrder {
            order_number: OrderNumber::generate(),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: self.shipping_address,
            items: self.items,
            subtotal: self.subtotal,
            discount: self.discount,
            shipping: self.shipping,
            total,
            currency: INR_CURRENCY_CODE.to_string(),
        })
    }
}

//--------------------------------------  OrderIntakeResult  ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntakeResult {
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub remote_order_id: String,
    pub amount: Money,
    pub currency: String,
}

//------------------------------------- VerifyPaymentRequest  --------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: i64,
    pub remote_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentResult {
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

//--------------------------------------    RefundRequest    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub order_id: i64,
    /// Minor units. Omitted means a full refund of the order total.
    #[serde(default)]
    pub amount: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub remote_refund_id: String,
    pub amount: Money,
    pub refund_status: RefundStatus,
    pub status: OrderStatus,
}

//--------------------------------------   OrderProjection   ---------------------------------------------------------
/// Read-only view of an order's payment and refund fields, for status polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProjection {
    pub order_id: i64,
    pub order_number: OrderNumber,
    pub total: Money,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub refund_status: RefundStatus,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub remote_refund_id: Option<String>,
}

impl From<Order> for OrderProjection {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number,
            total: order.total,
            currency: order.currency,
            status: order.status,
            payment_status: order.payment_status,
            refund_status: order.refund_status,
            remote_order_id: order.remote_order_id,
            remote_payment_id: order.remote_payment_id,
            remote_refund_id: order.remote_refund_id,
        }
    }
}

//--------------------------------------     SweepSummary    ---------------------------------------------------------
/// Result of one reconciliation sweep pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Orders examined in this pass.
    pub scanned: usize,
    /// Orders completed because the gateway held a settled, amount-matching payment for them.
    pub completed: Vec<OrderNumber>,
    /// Orders skipped because the gateway could not be reached; they stay pending for the next pass.
    pub deferred: usize,
}
